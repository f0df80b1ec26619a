use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Value,
    sea_query::{BinOper, Expr, Func, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::values::coerce_text;
use crate::core::descriptor::{ColumnInfo, EntityDescriptor};
use crate::errors::{CrudError, CrudResult};

/// Separator between a column name and its operator in a filter key
pub const OPERATOR_SEPARATOR: &str = "__";

/// Comparison operators accepted in filter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Like,
    Ilike,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

const OPERATORS: [(&str, FilterOperator); 9] = [
    ("eq", FilterOperator::Eq),
    ("ne", FilterOperator::Ne),
    ("like", FilterOperator::Like),
    ("ilike", FilterOperator::Ilike),
    ("gt", FilterOperator::Gt),
    ("gte", FilterOperator::Gte),
    ("lt", FilterOperator::Lt),
    ("lte", FilterOperator::Lte),
    ("in", FilterOperator::In),
];

impl FilterOperator {
    /// Look up an operator by its key suffix
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, op)| *op)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("eq", |(name, _)| name)
    }

    /// Pattern operators compare against the raw value, never a coerced one
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::Ilike)
    }

    const fn bin_oper(self) -> BinOper {
        match self {
            Self::Eq | Self::In => BinOper::Equal,
            Self::Ne => BinOper::NotEqual,
            Self::Like | Self::Ilike => BinOper::Like,
            Self::Gt => BinOper::GreaterThan,
            Self::Gte => BinOper::GreaterThanOrEqual,
            Self::Lt => BinOper::SmallerThan,
            Self::Lte => BinOper::SmallerThanOrEqual,
        }
    }
}

/// How per-key predicates are joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    #[default]
    And,
    Or,
}

/// `column[__operator]` keys mapped to string-encoded values.
///
/// Keys are kept sorted so the compiled condition is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression(BTreeMap<String, Vec<String>>);

impl FilterExpression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.0.insert(key.into(), values);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for FilterExpression {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Split a filter key on the first separator and resolve both halves.
///
/// Without an operator, `in` is implied for multi-value lists and `eq` otherwise.
///
/// # Errors
/// `UnknownColumn` for an unresolvable column, `ValidationError` for an
/// unknown operator
pub fn parse_filter_key<'d, E: EntityTrait>(
    descriptor: &'d EntityDescriptor<E>,
    key: &str,
    value_count: usize,
) -> CrudResult<(&'d ColumnInfo<E::Column>, FilterOperator)> {
    let (column, operator) = match key.split_once(OPERATOR_SEPARATOR) {
        Some((column, token)) => {
            let op = FilterOperator::from_token(token)
                .ok_or_else(|| CrudError::validation(format!("Unknown filter operator: {token}")))?;
            (column, op)
        }
        None if value_count > 1 => (key, FilterOperator::In),
        None => (key, FilterOperator::Eq),
    };
    Ok((descriptor.resolve(column)?, operator))
}

fn predicate<C: ColumnTrait>(
    info: &ColumnInfo<C>,
    operator: FilterOperator,
    values: &[String],
) -> CrudResult<SimpleExpr> {
    let column = Expr::col(info.column().as_column_ref());
    let expr = match operator {
        FilterOperator::In => {
            let typed = values
                .iter()
                .map(|raw| coerce_text(info, raw))
                .collect::<CrudResult<Vec<Value>>>()?;
            column.is_in(typed)
        }
        FilterOperator::Like => column.like(values[0].clone()),
        FilterOperator::Ilike => {
            Expr::expr(Func::upper(column)).like(values[0].to_uppercase())
        }
        scalar => column.binary(scalar.bin_oper(), coerce_text(info, &values[0])?),
    };
    Ok(expr)
}

/// Compile a filter expression into one condition.
///
/// Keys with an empty value list are skipped. Non-`in` operators only look at
/// the first value of their list.
///
/// # Errors
/// `UnknownColumn`, or `ValidationError` for unknown operators and values
/// that do not parse as the column type
pub fn compile_filters<E: EntityTrait>(
    descriptor: &EntityDescriptor<E>,
    expression: &FilterExpression,
    combine: Combine,
) -> CrudResult<Option<Condition>> {
    let mut condition = match combine {
        Combine::And => Condition::all(),
        Combine::Or => Condition::any(),
    };
    let mut used = false;

    for (key, values) in expression.iter() {
        if values.is_empty() {
            continue;
        }
        let (info, operator) = parse_filter_key(descriptor, key, values.len())?;
        if values.len() > 1 && operator != FilterOperator::In {
            tracing::debug!(key, count = values.len(), "Only the first value is used");
        }
        condition = condition.add(predicate(info, operator, values)?);
        used = true;
    }

    Ok(used.then_some(condition))
}
