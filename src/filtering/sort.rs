use sea_orm::{EntityTrait, sea_query::Order};

use crate::core::descriptor::EntityDescriptor;
use crate::errors::{CrudError, CrudResult};

/// One resolved `ORDER BY` entry
#[derive(Debug, Clone)]
pub struct SortKey<C> {
    pub column: C,
    pub order: Order,
}

/// Split a comma separated sort string into tokens, dropping blanks
#[must_use]
pub fn parse_sort_tokens(sort: &str) -> Vec<String> {
    sort.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Convert a `sort_column` / `sort_order` pair into a single token
#[must_use]
pub fn token_from_column_order(column: &str, order: Option<&str>) -> String {
    match order.map(str::trim) {
        Some(o) if o.eq_ignore_ascii_case("desc") => format!("-{column}"),
        _ => column.to_owned(),
    }
}

fn split_direction(token: &str) -> (&str, Order) {
    if let Some(name) = token.strip_prefix('-') {
        (name, Order::Desc)
    } else {
        (token.strip_prefix('+').unwrap_or(token), Order::Asc)
    }
}

/// Resolve sort tokens (`-` prefix for descending) into sort keys.
///
/// With no usable token the descriptor's fallback column is used ascending.
/// The primary key is appended ascending when not already a key, so rows that
/// tie on the requested columns keep a stable order across pages.
///
/// # Errors
/// `UnknownColumn` for any token that does not name a column
pub fn compile_sort<E: EntityTrait, S: AsRef<str>>(
    descriptor: &EntityDescriptor<E>,
    tokens: &[S],
) -> CrudResult<Vec<SortKey<E::Column>>> {
    let mut keys = Vec::with_capacity(tokens.len() + 1);
    let mut names: Vec<&str> = Vec::with_capacity(tokens.len() + 1);
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let (name, order) = split_direction(token);
        let info = descriptor.resolve(name)?;
        names.push(info.name());
        keys.push(SortKey {
            column: info.column(),
            order,
        });
    }

    if keys.is_empty() {
        let fallback = descriptor
            .fallback_sort_column()
            .ok_or_else(|| CrudError::validation(format!("{} has no columns", descriptor.name())))?;
        names.push(fallback.name());
        keys.push(SortKey {
            column: fallback.column(),
            order: Order::Asc,
        });
    }

    if let Some(id) = descriptor.id_column() {
        if !names.contains(&id.name()) {
            keys.push(SortKey {
                column: id.column(),
                order: Order::Asc,
            });
        }
    }
    Ok(keys)
}
