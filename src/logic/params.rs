//! Query parameter building for list-shaped operations.
//!
//! Pagination, sort and filter descriptions from the admin UI are turned into
//! one flat, insertion-ordered parameter map. Sort and filter entries are
//! sent as JSON-encoded `[field, value]` pairs.

use serde_json::{json, Map, Value};

use crate::model::{Filter, Pagination, PaginationStyle, Params, QueryDescription, Sort};

pub fn build_pagination_params(pagination: Option<&Pagination>, style: PaginationStyle) -> Params {
    let mut params = Params::new();
    let Some(Pagination {
        page: Some(page),
        per_page: Some(per_page),
    }) = pagination
    else {
        return params;
    };
    if *page == 0 || *per_page == 0 {
        return params;
    }

    match style {
        PaginationStyle::Page => {
            params.insert("page".to_string(), Value::from(*page));
            params.insert("perPage".to_string(), Value::from(*per_page));
        }
        PaginationStyle::Offset => {
            // A window starting past u64::MAX cannot be addressed.
            let Some(offset) = (page - 1).checked_mul(*per_page) else {
                log::warn!("page {} of size {} overflows the offset, pagination omitted", page, per_page);
                return params;
            };
            params.insert("offset".to_string(), Value::from(offset));
            params.insert("limit".to_string(), Value::from(*per_page));
        }
    }
    params
}

pub fn build_sort_params(sort: Option<&Sort>) -> Params {
    let mut params = Params::new();
    if let Some(Sort {
        field: Some(field),
        order: Some(order),
    }) = sort
    {
        if !field.is_empty() && !order.is_empty() {
            let pair = json!([field, order.to_lowercase()]);
            params.insert("sort".to_string(), Value::String(pair.to_string()));
        }
    }
    params
}

/// Flattens nested filter objects into dotted paths, in key order.
/// Objects are recursed into; arrays, null and scalars are leaves.
pub fn flatten_filter(filter: &Filter) -> Vec<(String, Value)> {
    let mut entries = Vec::new();
    flatten_into(filter, "", &mut entries);
    entries
}

fn flatten_into(object: &Map<String, Value>, prefix: &str, entries: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let path = format!("{}{}", prefix, key);
        match value {
            Value::Object(nested) => flatten_into(nested, &format!("{}.", path), entries),
            leaf => entries.push((path, leaf.clone())),
        }
    }
}

/// Always emits a `filter` key, an empty list when there is no filter.
pub fn build_filter_params(filter: Option<&Filter>) -> Params {
    let pairs = filter
        .map(flatten_filter)
        .unwrap_or_default()
        .into_iter()
        .map(|(path, value)| Value::String(json!([path, value]).to_string()))
        .collect();

    let mut params = Params::new();
    params.insert("filter".to_string(), Value::Array(pairs));
    params
}

pub fn build_query_params(query: &QueryDescription<'_>, style: PaginationStyle) -> Params {
    let mut params = build_pagination_params(query.pagination, style);
    params.extend(build_sort_params(query.sort));
    params.extend(build_filter_params(query.filter));
    params
}

/// List parameters plus the foreign key restricting the list to one
/// referencing record (`{target: id}`).
pub fn build_reference_params(
    query: &QueryDescription<'_>,
    target: &str,
    id: Value,
    style: PaginationStyle,
) -> Params {
    let mut params = build_query_params(query, style);
    params.insert(target.to_string(), id);
    params
}
