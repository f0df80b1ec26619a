// Resource binding, column metadata, scoping and the CRUD engine

pub mod descriptor;
pub mod engine;
pub mod scope;
pub mod traits;
pub mod upsert;

// Re-export commonly used items
pub use descriptor::{ColumnInfo, ColumnKind, EntityDescriptor};
pub use engine::CrudEngine;
pub use scope::{Principal, UserScope};
pub use traits::CrudResource;
pub use upsert::{Candidate, Decision, UniqueKey, classify};
