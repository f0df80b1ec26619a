//! Per-entity column registry.
//!
//! An [`EntityDescriptor`] is built once from Sea-ORM metadata and answers one
//! question for the rest of the engine: does this request-supplied name refer to
//! a real column, and if so which one and of what type. Every dynamically named
//! field (filter keys, sort tokens, search columns, payload keys, the upsert
//! uniqueness field) goes through [`EntityDescriptor::resolve`].

use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn};
use std::collections::HashMap;

use crate::errors::{CrudError, CrudResult};

/// Semantic type of a column, derived from its Sea-ORM `ColumnType`.
///
/// The variant decides which `sea_orm::Value` a request value is coerced into,
/// so it mirrors the Rust field types Sea-ORM generates for each column type:
/// `TimestampTz` is `DateTimeWithTimeZone`, `Timestamp` is a naive `DateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    String,
    TinyInteger,
    SmallInteger,
    Integer,
    BigInteger,
    Float,
    Double,
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Uuid,
    Json,
    Binary,
    Other,
}

impl ColumnKind {
    #[must_use]
    pub fn of(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Char(_)
            | ColumnType::String(_)
            | ColumnType::Text
            | ColumnType::Enum { .. } => Self::String,
            ColumnType::TinyInteger => Self::TinyInteger,
            ColumnType::SmallInteger => Self::SmallInteger,
            ColumnType::Integer => Self::Integer,
            ColumnType::BigInteger => Self::BigInteger,
            ColumnType::Float => Self::Float,
            ColumnType::Double => Self::Double,
            ColumnType::Boolean => Self::Boolean,
            ColumnType::DateTime | ColumnType::Timestamp => Self::Timestamp,
            ColumnType::TimestampWithTimeZone => Self::TimestampTz,
            ColumnType::Date => Self::Date,
            ColumnType::Uuid => Self::Uuid,
            ColumnType::Json | ColumnType::JsonBinary => Self::Json,
            ColumnType::Binary(_) | ColumnType::VarBinary(_) | ColumnType::Blob => Self::Binary,
            _ => Self::Other,
        }
    }

    /// Columns a free-text search may target
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::String)
    }

    /// Columns a payload may write
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// A resolved column reference
#[derive(Debug, Clone)]
pub struct ColumnInfo<C> {
    name: String,
    column: C,
    kind: ColumnKind,
    nullable: bool,
}

impl<C: ColumnTrait> ColumnInfo<C> {
    fn from_column(column: C) -> Self {
        let def = column.def();
        Self {
            name: column.as_str().to_owned(),
            kind: ColumnKind::of(def.get_column_type()),
            nullable: def.is_null(),
            column,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column(&self) -> C {
        self.column
    }

    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        self.kind
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Read-only metadata for one entity
#[derive(Debug, Clone)]
pub struct EntityDescriptor<E: EntityTrait> {
    name: String,
    table: String,
    columns: Vec<ColumnInfo<E::Column>>,
    by_name: HashMap<String, usize>,
    primary_key: Vec<usize>,
    owner: Option<usize>,
    default_sort: Option<usize>,
}

impl<E: EntityTrait> EntityDescriptor<E> {
    /// Build the registry from the entity's column and primary key metadata.
    /// `name` is the resource name used in messages.
    pub fn from_entity(name: impl Into<String>) -> Self {
        let columns: Vec<ColumnInfo<E::Column>> =
            E::Column::iter().map(ColumnInfo::from_column).collect();
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(idx, info)| (info.name.clone(), idx))
            .collect::<HashMap<_, _>>();
        let primary_key = E::PrimaryKey::iter()
            .filter_map(|pk| by_name.get(pk.into_column().as_str()).copied())
            .collect();

        Self {
            name: name.into(),
            table: E::default().table_name().to_owned(),
            columns,
            by_name,
            primary_key,
            owner: None,
            default_sort: None,
        }
    }

    /// Mark `column` as the owner reference used for user scoping
    ///
    /// # Errors
    /// `UnknownColumn` when the entity has no such column
    pub fn with_owner(mut self, column: &str) -> CrudResult<Self> {
        self.owner = Some(self.position(column)?);
        Ok(self)
    }

    /// Configure the sort column used when a request names none
    ///
    /// # Errors
    /// `UnknownColumn` when the entity has no such column
    pub fn with_default_sort(mut self, column: &str) -> CrudResult<Self> {
        self.default_sort = Some(self.position(column)?);
        Ok(self)
    }

    /// Look up a request-supplied column name.
    ///
    /// # Errors
    /// `UnknownColumn` for any name not declared on the entity
    pub fn resolve(&self, name: &str) -> CrudResult<&ColumnInfo<E::Column>> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    fn position(&self, name: &str) -> CrudResult<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CrudError::unknown_column(&self.name, name))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in declaration order
    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo<E::Column>] {
        &self.columns
    }

    #[must_use]
    pub fn primary_key(&self) -> Vec<&ColumnInfo<E::Column>> {
        self.primary_key.iter().map(|&idx| &self.columns[idx]).collect()
    }

    /// The single primary key column, `None` for composite keys
    #[must_use]
    pub fn id_column(&self) -> Option<&ColumnInfo<E::Column>> {
        match self.primary_key.as_slice() {
            [idx] => Some(&self.columns[*idx]),
            _ => None,
        }
    }

    #[must_use]
    pub fn owner_column(&self) -> Option<&ColumnInfo<E::Column>> {
        self.owner.map(|idx| &self.columns[idx])
    }

    /// Sort column when the request has none: configured column, then the
    /// single primary key, then the first declared column.
    #[must_use]
    pub fn fallback_sort_column(&self) -> Option<&ColumnInfo<E::Column>> {
        self.default_sort
            .map(|idx| &self.columns[idx])
            .or_else(|| self.id_column())
            .or_else(|| self.columns.first())
    }
}
