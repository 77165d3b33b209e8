use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier as sent by the admin UI. Ids may arrive as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl Id {
    /// The part of the id that addresses the API: everything after the last
    /// colon of a prefixed id ("namespace:123" -> "123").
    pub fn normalized(&self) -> Id {
        match self {
            Id::Text(text) => Id::Text(normalize_id(text).to_string()),
            Id::Number(n) => Id::Number(*n),
        }
    }

    pub fn is_prefixed(&self) -> bool {
        matches!(self, Id::Text(text) if text.contains(':'))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Id::Text(text) => Value::String(text.clone()),
            Id::Number(n) => Value::from(*n),
        }
    }

    pub fn from_value(value: &Value) -> Option<Id> {
        match value {
            Value::String(text) => Some(Id::Text(text.clone())),
            Value::Number(n) => n.as_i64().map(Id::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Id::Text(text) => write!(f, "{}", text),
            Id::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Text(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Text(value)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value)
    }
}

pub fn normalize_id(id: &str) -> &str {
    match id.rfind(':') {
        Some(pos) => &id[pos + 1..],
        None => id,
    }
}

/// Upper-cases the first character and lower-cases the rest
/// ("posts" -> "Posts", "postComments" -> "Postcomments").
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Name of the property carrying the collection size of a list response.
pub fn total_property_name(resource_name: &str) -> String {
    format!("total{}", capitalize(resource_name))
}

pub fn singularize(resource_name: &str) -> String {
    inflector::string::singularize::to_singular(resource_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_everything_up_to_last_colon() {
        assert_eq!(normalize_id("ns:123"), "123");
        assert_eq!(normalize_id("a:b:c"), "c");
        assert_eq!(normalize_id("123"), "123");
        assert_eq!(normalize_id("trailing:"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for id in ["ns:123", "123", "a:b:c", "", ":"] {
            let once = normalize_id(id);
            assert_eq!(normalize_id(once), once);
        }
        let id = Id::from("users:42");
        assert_eq!(id.normalized().normalized(), id.normalized());
    }

    #[test]
    fn numeric_ids_are_left_alone() {
        let id = Id::from(42);
        assert_eq!(id.normalized(), Id::Number(42));
        assert!(!id.is_prefixed());
        assert_eq!(id.to_value(), serde_json::json!(42));
    }

    #[test]
    fn ids_deserialize_from_strings_and_numbers() {
        let ids: Vec<Id> = serde_json::from_str(r#"["ns:1", 2]"#).unwrap();
        assert_eq!(ids, vec![Id::from("ns:1"), Id::from(2)]);
        assert!(ids[0].is_prefixed());
    }

    #[test]
    fn total_property_uses_capitalized_name() {
        assert_eq!(total_property_name("posts"), "totalPosts");
        assert_eq!(total_property_name("postComments"), "totalPostcomments");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn singularizes_resource_names() {
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("comments"), "comment");
        assert_eq!(singularize("categories"), "category");
    }
}
