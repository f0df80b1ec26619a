use sea_orm::{
    ColumnTrait, Condition, EntityTrait,
    sea_query::{Expr, Func, LikeExpr},
};

use crate::core::descriptor::EntityDescriptor;
use crate::errors::{CrudError, CrudResult};

// Basic safety limit
const MAX_SEARCH_QUERY_LENGTH: usize = 1_000;

/// Escape LIKE wildcards so user text only matches literally.
/// Backslash goes first since it is the escape character.
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn truncate(query: &str) -> &str {
    match query.char_indices().nth(MAX_SEARCH_QUERY_LENGTH) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

/// Case-insensitive substring match of `q` against an explicit column list.
///
/// Returns `None` when `q` is blank or no columns are given; there is no
/// implicit search over every column. Each column must exist and be textual.
///
/// # Errors
/// `UnknownColumn`, or `ValidationError` for a non-text column
pub fn compile_search<E: EntityTrait, S: AsRef<str>>(
    descriptor: &EntityDescriptor<E>,
    q: Option<&str>,
    columns: &[S],
) -> CrudResult<Option<Condition>> {
    let query = truncate(q.unwrap_or_default().trim());
    if query.is_empty() || columns.is_empty() {
        return Ok(None);
    }

    let pattern = format!("%{}%", escape_like_wildcards(query).to_uppercase());
    let mut condition = Condition::any();
    for name in columns {
        let info = descriptor.resolve(name.as_ref())?;
        if !info.kind().is_textual() {
            return Err(CrudError::validation(format!(
                "Column '{}' is not searchable",
                info.name()
            )));
        }
        let column = Expr::col(info.column().as_column_ref());
        condition = condition.add(
            Expr::expr(Func::upper(column)).like(LikeExpr::new(pattern.clone()).escape('\\')),
        );
    }
    Ok(Some(condition))
}
