use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{HalResource, Params};
use crate::provider::headers::{resolve_headers, HeaderConfig};

/// Transport settings applied to discovery and every request that follows
/// from it.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderConfig,
}

impl RequestOptions {
    pub fn with_headers(headers: HeaderConfig) -> Self {
        Self { headers }
    }

    /// Header values for one outgoing request. Dynamic sources are evaluated
    /// on every call.
    pub fn resolve_headers(&self) -> BTreeMap<String, String> {
        resolve_headers(&self.headers)
    }
}

/// A position in a hypermedia API: the last response received and the links
/// it offers. Verbs follow a named link relation of the current resource and
/// return the navigator positioned at the response.
#[async_trait::async_trait]
pub trait Navigator: Send + Sync + Sized {
    /// Follows `rel` with GET. Params not consumed by the link template are
    /// sent as a repeated-key query string.
    async fn get(&self, rel: &str, params: &Params) -> Result<Self>;
    /// Posts `body` as JSON to `rel`, expanded with `params`.
    async fn post(&self, rel: &str, body: &Value, params: &Params) -> Result<Self>;
    /// Puts `body` as JSON to `rel`, expanded with `params`.
    async fn put(&self, rel: &str, body: &Value, params: &Params) -> Result<Self>;
    async fn delete(&self, rel: &str, params: &Params) -> Result<Self>;

    /// HTTP status of the response this navigator sits on.
    fn status(&self) -> u16;
    fn resource(&self) -> &HalResource;
}

/// Entry point into a hypermedia API.
#[async_trait::async_trait]
pub trait HypermediaClient: Send + Sync {
    type Navigator: Navigator;

    /// Fetches the root document at `base_url`. Fails when the root cannot
    /// be fetched or is not a HAL document.
    async fn discover(&self, base_url: &str, options: RequestOptions) -> Result<Self::Navigator>;
}
