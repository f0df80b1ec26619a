//! # crudscope
//!
//! Generic CRUD over Sea-ORM entities with per-user row scoping.
//!
//! Implement [`CrudResource`] for an entity and every operation comes for
//! free: get, filtered/searched/sorted/paginated list, create, update, delete,
//! bulk update/delete and a uniqueness-aware bulk upsert. When the resource
//! names an owner column, every operation is confined to the calling
//! [`Principal`]'s rows.
//!
//! ```rust,ignore
//! use crudscope::{CrudEngine, ListQuery, Principal};
//!
//! let engine = CrudEngine::<Words>::new()?;
//! let page = engine
//!     .list(&db, &ListQuery::new().filter("level__in", ["N2", "N3"]).sort("-created_at").page(2, 10),
//!           Some(&Principal::new("1")))
//!     .await?;
//! ```
//!
//! [`routes::crud_router`] mounts the same operations as Axum endpoints.

pub mod config;
pub mod core;
pub mod database;
pub mod errors;
pub mod filtering;
pub mod logging;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod validation;

#[cfg(test)]
mod test_fixtures;

pub use crate::core::{CrudEngine, CrudResource, EntityDescriptor, Principal, UserScope};
pub use config::Settings;
pub use errors::{CrudError, CrudResult, ErrorKind};
pub use filtering::{Combine, FilterExpression, FilterOperator, PageMeta, Pagination};
pub use models::{ListQuery, ListRequest, ListResponse, UpsertOutcome};
pub use routes::{CrudState, crud_router};
pub use validation::Record;
