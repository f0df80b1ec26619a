use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult, IntoActiveModel, ModelTrait,
    Value,
    sea_query::ValueType,
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::{Debug, Display};

use super::descriptor::EntityDescriptor;
use crate::errors::{CrudError, CrudResult};

/// Binds one Sea-ORM entity to the CRUD engine.
///
/// Implementors are usually unit structs:
///
/// ```rust,ignore
/// pub struct Words;
///
/// impl CrudResource for Words {
///     type EntityType = word::Entity;
///     type Model = word::Model;
///     type ActiveModelType = word::ActiveModel;
///     type Id = i32;
///
///     const RESOURCE_NAME_SINGULAR: &'static str = "word";
///     const RESOURCE_NAME_PLURAL: &'static str = "words";
///     const OWNER_COLUMN: Option<&'static str> = Some("user_id");
/// }
/// ```
pub trait CrudResource: Send + Sync + 'static {
    type EntityType: EntityTrait<Model = Self::Model> + Sync;
    type Model: ModelTrait<Entity = Self::EntityType>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModelType>
        + Serialize
        + Clone
        + Send
        + Sync
        + 'static;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + Send
        + Sync
        + 'static;
    /// Rust type of the single primary key column
    type Id: ValueType
        + Into<Value>
        + Clone
        + Ord
        + Debug
        + Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    /// Column holding the owning principal's id. `None` makes the entity global.
    const OWNER_COLUMN: Option<&'static str> = None;

    /// Sort column used when a list request names none. Ignored if it does
    /// not name a column.
    const DEFAULT_SORT_COLUMN: Option<&'static str> = None;

    /// Column registry for the entity
    ///
    /// # Errors
    /// `UnknownColumn` for a bad `OWNER_COLUMN`; `ValidationError` when the
    /// entity does not have exactly one primary key column
    fn descriptor() -> CrudResult<EntityDescriptor<Self::EntityType>> {
        let mut descriptor = EntityDescriptor::from_entity(Self::RESOURCE_NAME_SINGULAR);
        if descriptor.id_column().is_none() {
            return Err(CrudError::validation(format!(
                "{} needs a single-column primary key",
                Self::RESOURCE_NAME_SINGULAR
            )));
        }
        if let Some(owner) = Self::OWNER_COLUMN {
            descriptor = descriptor.with_owner(owner)?;
        }
        if let Some(column) = Self::DEFAULT_SORT_COLUMN {
            if descriptor.resolve(column).is_ok() {
                descriptor = descriptor.with_default_sort(column)?;
            } else {
                tracing::warn!(
                    resource = Self::RESOURCE_NAME_SINGULAR,
                    column,
                    "Ignoring unknown default sort column"
                );
            }
        }
        Ok(descriptor)
    }
}
