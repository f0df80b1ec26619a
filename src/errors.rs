//! # Error Handling
//!
//! Every engine operation returns [`CrudResult`]. Errors carry a kind and a
//! user-facing message; the transport layer decides how to present them (see
//! [`crate::routes`] for the HTTP mapping).
//!
//! Database failures that are not a recognised constraint violation keep the
//! original [`DbErr`] so it can be logged, but its text never becomes part of
//! the user-facing message.

use sea_orm::{DbErr, SqlErr};
use std::fmt;

/// Result alias used throughout the engine
pub type CrudResult<T> = Result<T, CrudError>;

/// Coarse classification of a [`CrudError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownColumn,
    NotFound,
    ConstraintViolation,
    ValidationError,
    Database,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownColumn => "unknown_column",
            Self::NotFound => "not_found",
            Self::ConstraintViolation => "constraint_violation",
            Self::ValidationError => "validation_error",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum CrudError {
    /// A filter, sort, search or payload field is not a column of the entity
    UnknownColumn {
        /// Entity the lookup ran against
        entity: String,
        /// Name as received from the caller
        column: String,
    },

    /// The row does not exist, or exists outside the caller's scope.
    /// The two cases are reported identically.
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// The store rejected a write (unique or foreign key constraint)
    ConstraintViolation { message: String },

    /// Malformed payload or request shape
    Validation { errors: Vec<String> },

    /// Any other database failure (details logged, not exposed)
    Database { internal: DbErr },
}

impl CrudError {
    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Single-message validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![message.into()],
        }
    }

    #[must_use]
    pub fn validation_many(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Database { .. } => ErrorKind::Database,
        }
    }

    /// User-facing message (sanitized)
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnknownColumn { column, .. } => format!("Unknown column: {column}"),
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::ConstraintViolation { message } => message.clone(),
            Self::Validation { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::Database { .. } => "A database error occurred".to_string(),
        }
    }

    /// The `(kind, message)` pair handed to transport layers
    #[must_use]
    pub fn to_pair(&self) -> (ErrorKind, String) {
        (self.kind(), self.message())
    }

    /// Log internal details; only database errors carry any
    pub fn log_internal(&self) {
        match self {
            Self::Database { internal } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::ConstraintViolation { message } => {
                tracing::warn!(details = %message, "Constraint violation");
            }
            _ => {
                tracing::debug!(kind = %self.kind(), error = %self.message(), "CRUD error");
            }
        }
    }
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal } => Some(internal),
            _ => None,
        }
    }
}

/// Convert a Sea-ORM error
///
/// - unique / foreign key violations become `ConstraintViolation`
/// - `RecordNotFound` and `RecordNotUpdated` become `NotFound`
/// - everything else is kept as `Database`
impl From<DbErr> for CrudError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                return Self::constraint(format!("Conflict: {detail}"));
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return Self::constraint(format!("Foreign key violation: {detail}"));
            }
            _ => {}
        }
        match err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::not_found(resource, None)
            }
            DbErr::RecordNotUpdated => Self::not_found("Resource", None),
            other => Self::Database { internal: other },
        }
    }
}
