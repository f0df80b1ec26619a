use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_with::{OneOrMany, formats::PreferMany, serde_as};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

use crate::filtering::sort::{parse_sort_tokens, token_from_column_order};
use crate::filtering::{Combine, FilterExpression, PageMeta, Pagination};

/// One filter value as it may appear in JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterScalar {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for FilterScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Sort given as `"created_at,-word"` or `["created_at", "-word"]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SortInput {
    Text(String),
    Tokens(Vec<String>),
}

/// Body of a list request.
///
/// Two shapes are accepted:
///
/// ```json
/// {"filter_values": {"level__in": ["N2", "N3"]}, "sort": "-created_at", "page": 2, "page_size": 10}
/// ```
///
/// ```json
/// {"search_dict": {"level": "N2"}, "sort_column": "created_at", "sort_order": "desc", "start": 0, "limit": 30}
/// ```
///
/// Page parameters win over start/limit when both are present.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListRequest {
    /// `column[__operator]` mapped to one value or a list of values.
    /// Operators: eq, ne, like, ilike, gt, gte, lt, lte, in
    #[serde(default, alias = "search_dict")]
    #[serde_as(as = "Option<BTreeMap<_, OneOrMany<_, PreferMany>>>")]
    #[schema(value_type = Option<Object>, example = json!({"level__in": ["N2", "N3"], "count__gte": 3}))]
    pub filter_values: Option<BTreeMap<String, Vec<FilterScalar>>>,
    /// How filters are joined: `and` (default) or `or`
    #[serde(default)]
    pub combine: Combine,
    /// Free-text search, matched against `search_columns`
    pub q: Option<String>,
    #[serde(default)]
    pub search_columns: Vec<String>,
    /// Comma separated columns, `-` prefix for descending
    #[schema(value_type = Option<String>, example = "created_at,-word")]
    pub sort: Option<SortInput>,
    pub sort_column: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    /// 1-based page number
    pub page: Option<i64>,
    /// Clamped to `[1, 200]`
    pub page_size: Option<i64>,
    pub start: Option<i64>,
    /// Clamped to `[1, 200]`
    pub limit: Option<i64>,
}

impl From<ListRequest> for ListQuery {
    fn from(request: ListRequest) -> Self {
        let filters = request
            .filter_values
            .unwrap_or_default()
            .into_iter()
            .map(|(key, values)| (key, values.iter().map(ToString::to_string).collect::<Vec<_>>()))
            .collect();

        let sort = match (request.sort, request.sort_column) {
            (Some(SortInput::Text(s)), _) => parse_sort_tokens(&s),
            (Some(SortInput::Tokens(tokens)), _) => tokens,
            (None, Some(column)) => vec![token_from_column_order(
                &column,
                request.sort_order.as_deref(),
            )],
            (None, None) => Vec::new(),
        };

        let pagination = if request.page.is_some() || request.page_size.is_some() {
            Pagination::from_page(request.page, request.page_size)
        } else if request.start.is_some() || request.limit.is_some() {
            Pagination::from_range(request.start, request.limit)
        } else {
            Pagination::default()
        };

        Self {
            filters,
            combine: request.combine,
            q: request.q,
            search_columns: request.search_columns,
            sort,
            pagination,
        }
    }
}

/// A normalised list request
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: FilterExpression,
    pub combine: Combine,
    pub q: Option<String>,
    pub search_columns: Vec<String>,
    pub sort: Vec<String>,
    pub pagination: Pagination,
}

impl ListQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .insert(key, values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    #[must_use]
    pub fn search(mut self, q: &str, columns: &[&str]) -> Self {
        self.q = Some(q.to_owned());
        self.search_columns = columns.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    /// Comma separated sort string
    #[must_use]
    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = parse_sort_tokens(sort);
        self
    }

    #[must_use]
    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.pagination = Pagination::from_page(Some(page), Some(page_size));
        self
    }

    #[must_use]
    pub fn range(mut self, start: i64, limit: i64) -> Self {
        self.pagination = Pagination::from_range(Some(start), Some(limit));
        self
    }
}

/// One page of rows
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertRequest {
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<JsonValue>,
    /// Column that must be unique within the caller's scope. Without it rows
    /// are matched by id only.
    pub unique_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateRequest<Id> {
    pub ids: Vec<Id>,
    pub patch: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest<Id> {
    pub ids: Vec<Id>,
}

/// Result of a uniqueness-aware upsert
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome<Id: Ord, M> {
    pub inserted: BTreeMap<Id, M>,
    pub updated: BTreeMap<Id, M>,
    /// Rejected records, exactly as submitted
    pub duplicates: Vec<JsonValue>,
}

impl<Id: Ord, M> Default for UpsertOutcome<Id, M> {
    fn default() -> Self {
        Self {
            inserted: BTreeMap::new(),
            updated: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }
}

/// Result of an id-matched upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ByIdOutcome {
    pub created: u64,
    pub updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    pub ok: bool,
    pub deleted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkUpdated {
    pub updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleted {
    pub deleted: u64,
}
