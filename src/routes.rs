//! Axum router exposing one resource.
//!
//! | Method | Path              | Body                                  | Response            |
//! |--------|-------------------|---------------------------------------|---------------------|
//! | POST   | `/list/by_filter` | [`ListRequest`]                       | `{items, meta}`     |
//! | POST   | `/`               | row object                            | created row (201)   |
//! | GET    | `/{id}`           |                                       | row                 |
//! | PATCH  | `/{id}`           | partial row object                    | updated row         |
//! | DELETE | `/{id}`           |                                       | `{ok, deleted}`     |
//! | POST   | `/bulk/upsert`    | [`UpsertRequest`]                     | buckets or counts   |
//! | POST   | `/bulk/update`    | `{ids, patch}`                        | `{updated}`         |
//! | POST   | `/bulk/delete`    | `{ids}`                               | `{deleted}`         |
//!
//! The caller is read from an optional `Extension<Principal>` that an
//! authentication layer inserts. Without it requests run unscoped.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::core::{CrudEngine, CrudResource, Principal};
use crate::errors::{CrudError, ErrorKind};
use crate::models::{
    BulkDeleteRequest, BulkDeleted, BulkUpdateRequest, BulkUpdated, ByIdOutcome, Deleted,
    ListQuery, ListRequest, ListResponse, UpsertOutcome, UpsertRequest,
};

/// Shared state for one resource's routes
pub struct CrudState<R: CrudResource> {
    pub db: DatabaseConnection,
    pub engine: CrudEngine<R>,
}

impl<R: CrudResource> Clone for CrudState<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<R: CrudResource> CrudState<R> {
    /// # Errors
    /// When the resource's column configuration is invalid
    pub fn new(db: DatabaseConnection) -> Result<Self, CrudError> {
        Ok(Self {
            db,
            engine: CrudEngine::new()?,
        })
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// HTTP status for each error kind
#[must_use]
pub const fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownColumn => StatusCode::BAD_REQUEST,
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ConstraintViolation => StatusCode::CONFLICT,
        ErrorKind::Database => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        // Internal details are logged, never sent
        self.log_internal();

        let body = match &self {
            Self::Validation { errors } if errors.len() > 1 => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.message(),
                details: None,
            },
        };
        (status_code(self.kind()), Json(body)).into_response()
    }
}

/// `/bulk/upsert` answers with buckets when a uniqueness field was given,
/// counts otherwise
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpsertResponse<Id: Ord, M> {
    Buckets(UpsertOutcome<Id, M>),
    Counts(ByIdOutcome),
}

fn caller(principal: Option<&Extension<Principal>>) -> Option<&Principal> {
    principal.map(|Extension(p)| p)
}

async fn list_by_filter<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Json(request): Json<ListRequest>,
) -> Result<Json<ListResponse<R::Model>>, CrudError> {
    let query = ListQuery::from(request);
    let page = state
        .engine
        .list(&state.db, &query, caller(principal.as_ref()))
        .await?;
    Ok(Json(page))
}

async fn create_one<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Json(payload): Json<JsonValue>,
) -> Result<(StatusCode, Json<R::Model>), CrudError> {
    let record = state.engine.record(&payload)?;
    let created = state
        .engine
        .create(&state.db, record, caller(principal.as_ref()))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_one<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<R::Id>,
) -> Result<Json<R::Model>, CrudError> {
    let row = state
        .engine
        .get(&state.db, id, caller(principal.as_ref()))
        .await?;
    Ok(Json(row))
}

async fn update_one<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<R::Id>,
    Json(patch): Json<JsonValue>,
) -> Result<Json<R::Model>, CrudError> {
    let patch = state.engine.record(&patch)?;
    let row = state
        .engine
        .update(&state.db, id, patch, caller(principal.as_ref()))
        .await?;
    Ok(Json(row))
}

async fn delete_one<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<R::Id>,
) -> Result<Json<Deleted>, CrudError> {
    let deleted = state
        .engine
        .delete(&state.db, id, caller(principal.as_ref()))
        .await?;
    Ok(Json(deleted))
}

async fn bulk_upsert<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse<R::Id, R::Model>>, CrudError> {
    let records = state.engine.records(&request.rows)?;
    let principal = caller(principal.as_ref());
    let response = match request.unique_field.as_deref() {
        Some(field) => UpsertResponse::Buckets(
            state
                .engine
                .upsert_many(&state.db, records, field, principal)
                .await?,
        ),
        None => UpsertResponse::Counts(
            state
                .engine
                .upsert_many_by_id(&state.db, records, principal)
                .await?,
        ),
    };
    Ok(Json(response))
}

async fn bulk_update<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Json(request): Json<BulkUpdateRequest<R::Id>>,
) -> Result<Json<BulkUpdated>, CrudError> {
    let patch = state.engine.record(&request.patch)?;
    let updated = state
        .engine
        .bulk_update(&state.db, &request.ids, patch, caller(principal.as_ref()))
        .await?;
    Ok(Json(BulkUpdated { updated }))
}

async fn bulk_delete<R: CrudResource>(
    State(state): State<CrudState<R>>,
    principal: Option<Extension<Principal>>,
    Json(request): Json<BulkDeleteRequest<R::Id>>,
) -> Result<Json<BulkDeleted>, CrudError> {
    let deleted = state
        .engine
        .bulk_delete(&state.db, &request.ids, caller(principal.as_ref()))
        .await?;
    Ok(Json(BulkDeleted { deleted }))
}

/// Router with every CRUD endpoint for `R`, ready to be nested
///
/// ```rust,ignore
/// let app = Router::new().nest("/words", crud_router(CrudState::<Words>::new(db)?));
/// ```
pub fn crud_router<R: CrudResource>(state: CrudState<R>) -> Router {
    Router::new()
        .route("/", post(create_one::<R>))
        .route("/list/by_filter", post(list_by_filter::<R>))
        .route("/bulk/upsert", post(bulk_upsert::<R>))
        .route("/bulk/update", post(bulk_update::<R>))
        .route("/bulk/delete", post(bulk_delete::<R>))
        .route(
            "/{id}",
            get(get_one::<R>)
                .patch(update_one::<R>)
                .delete(delete_one::<R>),
        )
        .with_state(state)
}
