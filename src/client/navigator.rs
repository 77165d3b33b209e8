//! HAL client over `reqwest`.
//!
//! Discovery fetches the API root; each verb then resolves a link relation on
//! the current resource, expands it as a URI template and issues the request.
//! Relative hrefs resolve against the URL of the document they came from.

use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::client::template::{append_query, expand, to_query_string};
use crate::client::traits::{HypermediaClient, Navigator, RequestOptions};
use crate::error::{DataProviderError, Result};
use crate::model::{HalResource, Params};

const HAL_JSON: &str = "application/hal+json";

#[derive(Debug, Clone)]
pub struct HalClient {
    http: Client,
}

impl HalClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?))
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl HypermediaClient for HalClient {
    type Navigator = HalNavigator;

    async fn discover(&self, base_url: &str, options: RequestOptions) -> Result<HalNavigator> {
        let location = Url::parse(base_url)?;
        let options = Arc::new(options);
        let response = send(&self.http, &options, Method::GET, location, None).await?;

        if response.status >= 400 {
            return Err(DataProviderError::Discovery {
                url: base_url.to_string(),
                status: response.status,
            });
        }
        let root: Value = serde_json::from_str(&response.body)?;

        Ok(HalNavigator {
            http: self.http.clone(),
            options,
            location: response.location,
            status: response.status,
            resource: HalResource::from_value(&root),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HalNavigator {
    http: Client,
    options: Arc<RequestOptions>,
    location: Url,
    status: u16,
    resource: HalResource,
}

impl HalNavigator {
    /// Expands `rel` with `params` and resolves it against the current
    /// location. Returns the URL and the params the template left unused.
    fn resolve(&self, rel: &str, params: &Params) -> Result<(Url, Params)> {
        let href = self
            .resource
            .href(rel)
            .ok_or_else(|| DataProviderError::MissingRelation(rel.to_string()))?;
        let expansion = expand(href, params)?;
        let url = self.location.join(&expansion.url)?;
        Ok((url, expansion.unused(params)))
    }

    async fn follow(&self, method: Method, rel: &str, params: &Params, body: Option<&Value>) -> Result<Self> {
        let (url, unused) = self.resolve(rel, params)?;
        let url = match body {
            // Bodies carry the data; only reads put leftovers in the query.
            Some(_) => url,
            None => Url::parse(&append_query(url.as_str(), &to_query_string(&unused)))?,
        };

        let response = send(&self.http, &self.options, method, url, body).await?;
        let resource = parse_document(&response)?;

        Ok(HalNavigator {
            http: self.http.clone(),
            options: Arc::clone(&self.options),
            location: response.location,
            status: response.status,
            resource,
        })
    }
}

#[async_trait::async_trait]
impl Navigator for HalNavigator {
    async fn get(&self, rel: &str, params: &Params) -> Result<Self> {
        self.follow(Method::GET, rel, params, None).await
    }

    async fn post(&self, rel: &str, body: &Value, params: &Params) -> Result<Self> {
        self.follow(Method::POST, rel, params, Some(body)).await
    }

    async fn put(&self, rel: &str, body: &Value, params: &Params) -> Result<Self> {
        self.follow(Method::PUT, rel, params, Some(body)).await
    }

    async fn delete(&self, rel: &str, params: &Params) -> Result<Self> {
        self.follow(Method::DELETE, rel, params, None).await
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn resource(&self) -> &HalResource {
        &self.resource
    }
}

struct RawResponse {
    location: Url,
    status: u16,
    body: String,
}

async fn send(
    http: &Client,
    options: &RequestOptions,
    method: Method,
    url: Url,
    body: Option<&Value>,
) -> Result<RawResponse> {
    log::debug!("{} {}", method, url);

    let mut req = http.request(method.clone(), url).header("accept", HAL_JSON);
    for (k, v) in options.resolve_headers() {
        req = req.header(k, v);
    }
    if let Some(body) = body {
        req = req.json(body);
    }

    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let location = resp.url().clone();
    let body = resp.text().await?;

    log::debug!("{} {} -> {}", method, location, status);

    Ok(RawResponse {
        location,
        status,
        body,
    })
}

/// Empty bodies, and unparseable bodies of error responses, give an empty
/// resource so the caller still sees the status.
fn parse_document(response: &RawResponse) -> Result<HalResource> {
    if response.body.trim().is_empty() {
        return Ok(HalResource::new());
    }
    match serde_json::from_str::<Value>(&response.body) {
        Ok(document) => Ok(HalResource::from_value(&document)),
        Err(_) if response.status >= 400 => Ok(HalResource::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;
    use serde_json::json;

    fn navigator_at(location: &str, resource: HalResource) -> HalNavigator {
        HalNavigator {
            http: Client::new(),
            options: Arc::new(RequestOptions::default()),
            location: Url::parse(location).unwrap(),
            status: 200,
            resource,
        }
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn resolves_templated_relation_and_keeps_leftovers() {
        let root = HalResource::new()
            .with_link("comments", Link::templated("http://api.test/comments{?post}"));
        let navigator = navigator_at("http://api.test/", root);

        let (url, unused) = navigator
            .resolve("comments", &params(json!({ "post": "9", "filter": [] })))
            .unwrap();
        assert_eq!(url.as_str(), "http://api.test/comments?post=9");
        assert_eq!(Value::Object(unused), json!({ "filter": [] }));
    }

    #[test]
    fn resolves_relative_hrefs_against_location() {
        let resource = HalResource::new().with_link("self", Link::new("/posts/1"));
        let navigator = navigator_at("http://api.test/v1/posts/1?x=y", resource);

        let (url, _) = navigator.resolve("self", &Params::new()).unwrap();
        assert_eq!(url.as_str(), "http://api.test/posts/1");
    }

    #[test]
    fn missing_relation_is_an_error() {
        let navigator = navigator_at("http://api.test/", HalResource::new());
        let err = navigator.resolve("posts", &Params::new()).unwrap_err();
        assert!(matches!(err, DataProviderError::MissingRelation(ref rel) if rel == "posts"));
    }

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            location: Url::parse("http://api.test/").unwrap(),
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn parses_documents_leniently_for_errors_only() {
        assert_eq!(parse_document(&raw(204, "")).unwrap(), HalResource::new());
        assert_eq!(parse_document(&raw(500, "<html>")).unwrap(), HalResource::new());
        assert!(parse_document(&raw(200, "<html>")).is_err());

        let resource = parse_document(&raw(422, r#"{"errorContext":{"problem":"no"}}"#)).unwrap();
        assert_eq!(resource.property("errorContext"), Some(&json!({ "problem": "no" })));
    }
}
