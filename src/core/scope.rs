//! Owner scoping.
//!
//! Entities with an owner column are partitioned by principal: every read,
//! update and delete gets `owner = principal.id` added, and every insert gets
//! the principal's id as its default owner. Entities without an owner column,
//! and calls made without a principal, are global.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Value, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::descriptor::{ColumnInfo, EntityDescriptor};
use crate::errors::{CrudError, CrudResult};
use crate::filtering::values::coerce_text;
use crate::validation::Record;

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// Opaque id, converted to the owner column's type when scoping
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Row visibility for one call
#[derive(Debug, Clone)]
pub enum UserScope<C> {
    Global,
    Owned { owner: ColumnInfo<C>, value: Value },
}

impl<C: ColumnTrait> UserScope<C> {
    /// # Errors
    /// `ValidationError` when the principal id cannot be expressed in the
    /// owner column's type
    pub fn resolve<E>(
        descriptor: &EntityDescriptor<E>,
        principal: Option<&Principal>,
    ) -> CrudResult<Self>
    where
        E: EntityTrait<Column = C>,
    {
        let (Some(owner), Some(principal)) = (descriptor.owner_column(), principal) else {
            return Ok(Self::Global);
        };
        let value = coerce_text(owner, &principal.id).map_err(|_| {
            CrudError::validation(format!(
                "Principal id is not a valid value for '{}'",
                owner.name()
            ))
        })?;
        Ok(Self::Owned {
            owner: owner.clone(),
            value,
        })
    }

    #[must_use]
    pub const fn is_owned(&self) -> bool {
        matches!(self, Self::Owned { .. })
    }

    /// `owner = principal.id`, or `None` for global scope
    #[must_use]
    pub fn condition(&self) -> Option<SimpleExpr> {
        match self {
            Self::Global => None,
            Self::Owned { owner, value } => Some(owner.column().eq(value.clone())),
        }
    }

    /// Restrict any filterable statement (select, update, delete)
    pub fn apply<Q: QueryFilter>(&self, query: Q) -> Q {
        match self.condition() {
            Some(condition) => query.filter(condition),
            None => query,
        }
    }

    /// Default the owner column of a write payload to the principal's id
    pub fn stamp<E>(&self, record: &mut Record<E>)
    where
        E: EntityTrait<Column = C>,
    {
        if let Self::Owned { owner, value } = self {
            record.insert_if_absent(owner, value.clone());
        }
    }
}
