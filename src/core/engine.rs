use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, UpdateMany, Value,
    sea_query::{Expr, ValueType},
};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::descriptor::{ColumnInfo, EntityDescriptor};
use super::scope::{Principal, UserScope};
use super::traits::CrudResource;
use super::upsert::{Candidate, Decision, UniqueKey, classify};
use crate::errors::{CrudError, CrudResult};
use crate::filtering::{PageMeta, compile_filters, compile_search, compile_sort};
use crate::models::{ByIdOutcome, Deleted, ListQuery, ListResponse, UpsertOutcome};
use crate::validation::{Field, Record};

type Entity<R> = <R as CrudResource>::EntityType;
type Column<R> = <Entity<R> as EntityTrait>::Column;

/// CRUD operations for one resource.
///
/// Built once; every call takes the connection (a pooled `DatabaseConnection`
/// or an open transaction) and the calling principal explicitly. With an owner
/// column configured, every operation is confined to the principal's rows and
/// rows of other principals are reported as `NotFound`.
pub struct CrudEngine<R: CrudResource> {
    descriptor: Arc<EntityDescriptor<Entity<R>>>,
}

impl<R: CrudResource> Clone for CrudEngine<R> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

impl<R: CrudResource> CrudEngine<R> {
    /// # Errors
    /// When the resource's column configuration is invalid (see
    /// [`CrudResource::descriptor`])
    pub fn new() -> CrudResult<Self> {
        Ok(Self {
            descriptor: Arc::new(R::descriptor()?),
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &EntityDescriptor<Entity<R>> {
        &self.descriptor
    }

    /// Validate a JSON payload into a typed record
    ///
    /// # Errors
    /// `UnknownColumn` or `ValidationError`, see [`Record::from_json`]
    pub fn record(&self, payload: &JsonValue) -> CrudResult<Record<Entity<R>>> {
        Record::from_json(&self.descriptor, payload)
    }

    /// Validate a batch of JSON payloads; the first invalid one fails the batch
    ///
    /// # Errors
    /// As [`CrudEngine::record`]
    pub fn records(&self, payloads: &[JsonValue]) -> CrudResult<Vec<Record<Entity<R>>>> {
        payloads.iter().map(|p| self.record(p)).collect()
    }

    fn id_column(&self) -> CrudResult<&ColumnInfo<Column<R>>> {
        self.descriptor.id_column().ok_or_else(|| {
            CrudError::validation(format!(
                "{} needs a single-column primary key",
                R::RESOURCE_NAME_SINGULAR
            ))
        })
    }

    fn scope(&self, principal: Option<&Principal>) -> CrudResult<UserScope<Column<R>>> {
        UserScope::resolve(&self.descriptor, principal)
    }

    fn not_found(id: &R::Id) -> CrudError {
        CrudError::not_found(R::RESOURCE_NAME_SINGULAR, Some(id.to_string()))
    }

    fn to_id(value: Value) -> CrudResult<R::Id> {
        <R::Id as ValueType>::try_from(value).map_err(|_| {
            CrudError::validation(format!("Invalid {} id", R::RESOURCE_NAME_SINGULAR))
        })
    }

    fn id_of(&self, model: &R::Model) -> CrudResult<R::Id> {
        Self::to_id(model.get(self.id_column()?.column()))
    }

    fn record_id(&self, record: &Record<Entity<R>>) -> CrudResult<Option<R::Id>> {
        record
            .get_non_null(self.id_column()?.name())
            .cloned()
            .map(Self::to_id)
            .transpose()
    }

    /// Set one field on an active model. `DateTimeUtc` and
    /// `DateTimeWithTimeZone` fields share a column type, so an offset
    /// timestamp that the model rejects is retried in UTC.
    fn assign(active: &mut R::ActiveModelType, field: &Field<Column<R>>) -> CrudResult<()> {
        let Err(err) = active.try_set(field.column, field.value.clone()) else {
            return Ok(());
        };
        let retried = match &field.value {
            Value::ChronoDateTimeWithTimeZone(at) => {
                let utc: Option<DateTime<Utc>> = at.as_ref().map(|at| at.with_timezone(&Utc));
                active.try_set(field.column, utc.into()).is_ok()
            }
            _ => false,
        };
        if retried {
            return Ok(());
        }
        tracing::debug!(field = %field.name, error = %err, "Rejected field value");
        Err(CrudError::validation(format!(
            "{}: value does not match the column type",
            field.name
        )))
    }

    fn new_active_model(record: &Record<Entity<R>>) -> CrudResult<R::ActiveModelType> {
        let mut active = <R::ActiveModelType as ActiveModelBehavior>::new();
        for field in record.fields() {
            Self::assign(&mut active, field)?;
        }
        Ok(active)
    }

    fn update_statement(record: &Record<Entity<R>>) -> UpdateMany<Entity<R>> {
        record
            .fields()
            .fold(Entity::<R>::update_many(), |statement, field| {
                statement.col_expr(field.column, Expr::value(field.value.clone()))
            })
    }

    /// Drop the id from a patch and reject what is left if empty
    fn prepare_patch(&self, patch: &mut Record<Entity<R>>) -> CrudResult<()> {
        patch.remove(self.id_column()?.name());
        if patch.is_empty() {
            return Err(CrudError::validation("Patch must contain at least one column"));
        }
        Ok(())
    }

    /// Fetch one row
    ///
    /// # Errors
    /// `NotFound` when the row is absent or outside the caller's scope
    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        id: R::Id,
        principal: Option<&Principal>,
    ) -> CrudResult<R::Model> {
        let id_column = self.id_column()?;
        let scope = self.scope(principal)?;
        scope
            .apply(Entity::<R>::find().filter(id_column.column().eq(id.clone())))
            .one(db)
            .await?
            .ok_or_else(|| Self::not_found(&id))
    }

    /// Filtered, searched, sorted page of rows plus page metadata.
    ///
    /// The count runs with the same filter, search and scope as the page
    /// query, without sort or window.
    ///
    /// # Errors
    /// `UnknownColumn` or `ValidationError` from the compilers, or a database error
    pub async fn list<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery,
        principal: Option<&Principal>,
    ) -> CrudResult<ListResponse<R::Model>> {
        let descriptor = &*self.descriptor;
        let scope = self.scope(principal)?;
        let condition = Condition::all()
            .add_option(compile_filters(descriptor, &query.filters, query.combine)?)
            .add_option(compile_search(
                descriptor,
                query.q.as_deref(),
                query.search_columns.as_slice(),
            )?)
            .add_option(scope.condition());
        let sort = compile_sort(descriptor, query.sort.as_slice())?;

        let select = Entity::<R>::find().filter(condition);
        let total = select.clone().count(db).await?;

        let pagination = query.pagination;
        let items = sort
            .into_iter()
            .fold(select, |select, key| select.order_by(key.column, key.order))
            .offset(pagination.offset())
            .limit(pagination.limit())
            .all(db)
            .await?;

        tracing::debug!(
            resource = R::RESOURCE_NAME_PLURAL,
            total,
            offset = pagination.offset(),
            limit = pagination.limit(),
            returned = items.len(),
            "Listed rows"
        );
        Ok(ListResponse {
            items,
            meta: PageMeta::new(&pagination, total),
        })
    }

    /// Insert one row. The owner column defaults to the caller.
    ///
    /// # Errors
    /// `ConstraintViolation` when the store rejects the row
    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        mut record: Record<Entity<R>>,
        principal: Option<&Principal>,
    ) -> CrudResult<R::Model> {
        self.scope(principal)?.stamp(&mut record);
        let model = Self::new_active_model(&record)?.insert(db).await?;
        tracing::debug!(resource = R::RESOURCE_NAME_SINGULAR, "Created row");
        Ok(model)
    }

    /// Apply a patch to one row. An id inside the patch is ignored.
    ///
    /// # Errors
    /// - `ValidationError` for an empty patch
    /// - `NotFound` when the row is absent or outside the caller's scope
    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        id: R::Id,
        mut patch: Record<Entity<R>>,
        principal: Option<&Principal>,
    ) -> CrudResult<R::Model> {
        self.prepare_patch(&mut patch)?;
        let existing = self.get(db, id, principal).await?;

        let mut active: R::ActiveModelType = existing.into_active_model();
        for field in patch.fields() {
            Self::assign(&mut active, field)?;
        }
        Ok(active.update(db).await?)
    }

    /// Delete one row
    ///
    /// # Errors
    /// `NotFound` when nothing in the caller's scope matched
    pub async fn delete<C: ConnectionTrait>(
        &self,
        db: &C,
        id: R::Id,
        principal: Option<&Principal>,
    ) -> CrudResult<Deleted> {
        let id_column = self.id_column()?;
        let scope = self.scope(principal)?;
        let result = scope
            .apply(Entity::<R>::delete_many().filter(id_column.column().eq(id.clone())))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Self::not_found(&id));
        }
        Ok(Deleted {
            ok: true,
            deleted: result.rows_affected,
        })
    }

    /// Apply one patch to every in-scope row of `ids`; returns the affected count
    ///
    /// # Errors
    /// `ValidationError` for an empty patch
    pub async fn bulk_update<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[R::Id],
        mut patch: Record<Entity<R>>,
        principal: Option<&Principal>,
    ) -> CrudResult<u64> {
        self.prepare_patch(&mut patch)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let id_column = self.id_column()?;
        let scope = self.scope(principal)?;
        let result = scope
            .apply(Self::update_statement(&patch).filter(id_column.column().is_in(ids.to_vec())))
            .exec(db)
            .await?;

        tracing::info!(
            resource = R::RESOURCE_NAME_PLURAL,
            requested = ids.len(),
            updated = result.rows_affected,
            "Bulk update"
        );
        Ok(result.rows_affected)
    }

    /// Delete every in-scope row of `ids`; returns the affected count
    ///
    /// # Errors
    /// Database errors only
    pub async fn bulk_delete<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[R::Id],
        principal: Option<&Principal>,
    ) -> CrudResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let id_column = self.id_column()?;
        let scope = self.scope(principal)?;
        let result = scope
            .apply(Entity::<R>::delete_many().filter(id_column.column().is_in(ids.to_vec())))
            .exec(db)
            .await?;

        tracing::info!(
            resource = R::RESOURCE_NAME_PLURAL,
            requested = ids.len(),
            deleted = result.rows_affected,
            "Bulk delete"
        );
        Ok(result.rows_affected)
    }

    /// Upsert a batch under a uniqueness column.
    ///
    /// Records are classified by [`classify`] against the in-scope rows
    /// holding their uniqueness values or ids. Updates are written and
    /// committed first, inserts second in their own transaction; an insert
    /// failure does not undo the committed updates.
    ///
    /// # Errors
    /// `UnknownColumn` for `unique_field`, `ConstraintViolation` from either
    /// phase, or a database error
    pub async fn upsert_many<C>(
        &self,
        db: &C,
        records: Vec<Record<Entity<R>>>,
        unique_field: &str,
        principal: Option<&Principal>,
    ) -> CrudResult<UpsertOutcome<R::Id, R::Model>>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id_column = self.id_column()?;
        let unique = self.descriptor.resolve(unique_field)?;
        let scope = self.scope(principal)?;

        let candidates = records
            .iter()
            .map(|record| -> CrudResult<Candidate<R::Id>> {
                Ok(Candidate {
                    id: self.record_id(record)?,
                    unique: record.get(unique.name()).and_then(UniqueKey::of),
                })
            })
            .collect::<CrudResult<Vec<_>>>()?;

        // Rows in scope that hold a submitted uniqueness value or id
        let mut existing: BTreeMap<R::Id, R::Model> = BTreeMap::new();
        let mut by_unique: HashMap<UniqueKey, R::Id> = HashMap::new();

        let unique_values: Vec<Value> = records
            .iter()
            .filter_map(|record| record.get_non_null(unique.name()).cloned())
            .collect();
        if !unique_values.is_empty() {
            let rows = scope
                .apply(Entity::<R>::find().filter(unique.column().is_in(unique_values)))
                .all(db)
                .await?;
            for row in rows {
                let id = self.id_of(&row)?;
                if let Some(key) = UniqueKey::of(&row.get(unique.column())) {
                    by_unique.insert(key, id.clone());
                }
                existing.insert(id, row);
            }
        }

        let ids: Vec<R::Id> = candidates.iter().filter_map(|c| c.id.clone()).collect();
        if !ids.is_empty() {
            let rows = scope
                .apply(Entity::<R>::find().filter(id_column.column().is_in(ids)))
                .all(db)
                .await?;
            for row in rows {
                existing.insert(self.id_of(&row)?, row);
            }
        }

        let existing_ids: BTreeSet<R::Id> = existing.keys().cloned().collect();
        let decisions = classify(&candidates, &by_unique, &existing_ids);

        let mut outcome = UpsertOutcome::default();
        let mut updates = Vec::new();
        let mut inserts = Vec::new();
        for (record, decision) in records.into_iter().zip(decisions) {
            match decision {
                Decision::Update(id) => updates.push((id, record)),
                Decision::Insert => inserts.push(record),
                Decision::Duplicate => outcome.duplicates.push(record.into_raw()),
            }
        }

        if !updates.is_empty() {
            let txn = db.begin().await?;
            for (id, record) in updates {
                let current = existing.remove(&id).ok_or_else(|| Self::not_found(&id))?;
                let mut changed = false;
                let mut active: R::ActiveModelType = current.clone().into_active_model();
                for field in record.fields().filter(|f| f.name != id_column.name()) {
                    Self::assign(&mut active, field)?;
                    changed = true;
                }
                let model = if changed {
                    active.update(&txn).await?
                } else {
                    current
                };
                existing.insert(id.clone(), model.clone());
                outcome.updated.insert(id, model);
            }
            txn.commit().await?;
        }

        if !inserts.is_empty() {
            let txn = db.begin().await?;
            for mut record in inserts {
                record.remove(id_column.name());
                scope.stamp(&mut record);
                let model = Self::new_active_model(&record)?.insert(&txn).await?;
                outcome.inserted.insert(self.id_of(&model)?, model);
            }
            txn.commit().await?;
        }

        tracing::info!(
            resource = R::RESOURCE_NAME_PLURAL,
            unique_field,
            inserted = outcome.inserted.len(),
            updated = outcome.updated.len(),
            duplicates = outcome.duplicates.len(),
            "Upsert complete"
        );
        Ok(outcome)
    }

    /// Upsert matched by id only: records with an id update that row within
    /// scope, records without one are inserted. One transaction for the batch.
    ///
    /// # Errors
    /// `ConstraintViolation` or a database error; nothing is committed then
    pub async fn upsert_many_by_id<C>(
        &self,
        db: &C,
        records: Vec<Record<Entity<R>>>,
        principal: Option<&Principal>,
    ) -> CrudResult<ByIdOutcome>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id_column = self.id_column()?;
        let scope = self.scope(principal)?;
        let mut outcome = ByIdOutcome::default();

        let txn = db.begin().await?;
        for mut record in records {
            let id = self.record_id(&record)?;
            record.remove(id_column.name());
            if let Some(id) = id {
                if record.is_empty() {
                    continue;
                }
                let result = scope
                    .apply(Self::update_statement(&record).filter(id_column.column().eq(id)))
                    .exec(&txn)
                    .await?;
                outcome.updated += result.rows_affected;
            } else {
                scope.stamp(&mut record);
                Self::new_active_model(&record)?.insert(&txn).await?;
                outcome.created += 1;
            }
        }
        txn.commit().await?;

        tracing::info!(
            resource = R::RESOURCE_NAME_PLURAL,
            created = outcome.created,
            updated = outcome.updated,
            "Upsert by id complete"
        );
        Ok(outcome)
    }
}
