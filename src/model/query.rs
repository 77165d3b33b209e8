use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(rename = "perPage", default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// "asc" or "desc", any case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            order: Some(order.into()),
        }
    }
}

/// Filter as sent by the admin UI. Values may be nested objects.
pub type Filter = Map<String, Value>;

/// The list-shaped part of an operation's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescription<'a> {
    pub pagination: Option<&'a Pagination>,
    pub sort: Option<&'a Sort>,
    pub filter: Option<&'a Filter>,
}

/// Pagination vocabulary understood by the target API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    /// `page` and `perPage` passed through unchanged
    #[default]
    Page,
    /// `offset = (page - 1) * perPage`, `limit = perPage`
    Offset,
}

/// Flat parameter mapping handed to the hypermedia client. Keys keep
/// insertion order.
pub type Params = Map<String, Value>;
