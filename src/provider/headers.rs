use std::collections::BTreeMap;
use std::sync::Arc;

/// A configured header value: fixed, or computed right before each
/// operation (rotating tokens and the like).
#[derive(Clone)]
pub enum HeaderSource {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl HeaderSource {
    pub fn dynamic<F>(produce: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        HeaderSource::Dynamic(Arc::new(produce))
    }

    pub fn resolve(&self) -> String {
        match self {
            HeaderSource::Static(value) => value.clone(),
            HeaderSource::Dynamic(produce) => produce(),
        }
    }
}

impl std::fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            HeaderSource::Static(value) => f.debug_tuple("Static").field(value).finish(),
            HeaderSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for HeaderSource {
    fn from(value: &str) -> Self {
        HeaderSource::Static(value.to_string())
    }
}

impl From<String> for HeaderSource {
    fn from(value: String) -> Self {
        HeaderSource::Static(value)
    }
}

pub type HeaderConfig = BTreeMap<String, HeaderSource>;

/// Overlays the per-call headers on the configured ones. Names are compared
/// case-insensitively and kept lower-cased; per-call values win. Nothing is
/// evaluated here.
pub fn merge_headers(per_call: &BTreeMap<String, String>, configured: &HeaderConfig) -> HeaderConfig {
    let mut headers: HeaderConfig = configured
        .iter()
        .map(|(name, source)| (name.to_lowercase(), source.clone()))
        .collect();
    for (name, value) in per_call {
        headers.insert(name.to_lowercase(), HeaderSource::Static(value.clone()));
    }
    headers
}

/// Evaluates every header source. Dynamic sources run once per call.
pub fn resolve_headers(headers: &HeaderConfig) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, source)| (name.clone(), source.resolve()))
        .collect()
}

/// Mask header values for logging
pub fn mask_header_value(value: &str) -> String {
    if value.len() <= 8 {
        "*".repeat(value.len())
    } else {
        let head: String = value.chars().take(4).collect();
        format!("{}...", head)
    }
}
