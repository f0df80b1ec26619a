use utoipa::OpenApi;

use crate::core::Principal;
use crate::filtering::{Combine, PageMeta};
use crate::models::{
    BulkDeleted, BulkUpdated, ByIdOutcome, Deleted, ListRequest, UpsertRequest,
};

/// Schemas of the request and response bodies shared by every resource.
/// Merge into an application's document with `OpenApi::merge`.
#[derive(OpenApi)]
#[openapi(components(schemas(
    ListRequest,
    Combine,
    PageMeta,
    UpsertRequest,
    ByIdOutcome,
    Deleted,
    BulkUpdated,
    BulkDeleted,
    Principal
)))]
pub struct CrudApiDoc;
