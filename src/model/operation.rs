use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::DataProviderError;
use crate::model::{FlatResource, Id, Pagination, QueryDescription, Sort, Filter};

/// Data access operations the provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    #[serde(rename = "GET_LIST")]
    List,
    #[serde(rename = "GET_ONE")]
    ReadOne,
    #[serde(rename = "GET_MANY")]
    ReadMany,
    #[serde(rename = "GET_MANY_REFERENCE")]
    ReadManyByReference,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "GET_LIST",
            OperationKind::ReadOne => "GET_ONE",
            OperationKind::ReadMany => "GET_MANY",
            OperationKind::ReadManyByReference => "GET_MANY_REFERENCE",
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }

    /// Fallback error message used when an error response carries no
    /// error context.
    pub fn failure_message(&self) -> &'static str {
        match self {
            OperationKind::List
            | OperationKind::ReadOne
            | OperationKind::ReadMany
            | OperationKind::ReadManyByReference => "Error has happened fetching resource",
            OperationKind::Create => "Error has happened creating resource",
            OperationKind::Update => "Error has happened updating resource",
            OperationKind::Delete => "Error has happened deleting resource",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = DataProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET_LIST" => Ok(OperationKind::List),
            "GET_ONE" => Ok(OperationKind::ReadOne),
            "GET_MANY" => Ok(OperationKind::ReadMany),
            "GET_MANY_REFERENCE" => Ok(OperationKind::ReadManyByReference),
            "CREATE" => Ok(OperationKind::Create),
            "UPDATE" => Ok(OperationKind::Update),
            "DELETE" => Ok(OperationKind::Delete),
            other => Err(DataProviderError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Parameters of a single operation, in the admin UI's JSON shape.
/// Which fields matter depends on the operation kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<Id>,
    /// Foreign key name for GET_MANY_REFERENCE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<Map<String, Value>>,
    /// Per-call headers, these win over configured ones
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl OperationParams {
    pub fn query(&self) -> QueryDescription<'_> {
        QueryDescription {
            pagination: self.pagination.as_ref(),
            sort: self.sort.as_ref(),
            filter: self.filter.as_ref(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids<I: Into<Id>>(mut self, ids: impl IntoIterator<Item = I>) -> Self {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderData {
    One(FlatResource),
    Many(Vec<FlatResource>),
}

/// What the admin UI receives back: `{ data, total? }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResponse {
    pub data: ProviderData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ProviderResponse {
    pub fn one(resource: FlatResource) -> Self {
        Self {
            data: ProviderData::One(resource),
            total: None,
        }
    }

    pub fn many(resources: Vec<FlatResource>, total: Option<u64>) -> Self {
        Self {
            data: ProviderData::Many(resources),
            total,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
