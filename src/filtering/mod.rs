//! # Query compilation
//!
//! Request-shaped inputs become Sea-ORM query parts here. Every column named
//! by a request is resolved through [`EntityDescriptor`](crate::core::descriptor::EntityDescriptor)
//! before any SQL is built.
//!
//! - [`conditions`]: `column[__operator] -> values` filters
//! - [`search`]: free-text search over an explicit column list
//! - [`sort`]: `"created_at,-word"` style ordering
//! - [`pagination`]: page/page_size and start/limit windows
//! - [`values`]: typed coercion of request values
//!
//! ```rust,ignore
//! let filters = FilterExpression::new().with("level__in", vec!["N2".into(), "N3".into()]);
//! let condition = compile_filters(&descriptor, &filters, Combine::And)?;
//! ```

pub mod conditions;
pub mod pagination;
pub mod search;
pub mod sort;
pub mod values;

pub use conditions::{Combine, FilterExpression, FilterOperator, compile_filters};
pub use pagination::{PageMeta, Pagination};
pub use search::compile_search;
pub use sort::{SortKey, compile_sort, parse_sort_tokens};
