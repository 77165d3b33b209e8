use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::client::{HalClient, HypermediaClient, Navigator, RequestOptions};
use crate::config::ApiConfig;
use crate::error::{DataProviderError, Result};
use crate::logic::{build_query_params, build_reference_params};
use crate::model::{
    singularize, total_property_name, FlatResource, HalResource, Id, OperationKind,
    OperationParams, PaginationStyle, Params, ProviderResponse,
};
use crate::provider::headers::{merge_headers, HeaderConfig, HeaderSource};
use crate::provider::trace::{LogTraceObserver, Outcome, TraceObserver, TraceRecord};

const ERROR_CONTEXT: &str = "errorContext";
const PROBLEM: &str = "problem";
const SELF_REL: &str = "self";

#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub debug: bool,
    pub headers: HeaderConfig,
    pub pagination: PaginationStyle,
}

impl ProviderOptions {
    pub fn with_header(mut self, name: impl Into<String>, source: HeaderSource) -> Self {
        self.headers.insert(name.into(), source);
        self
    }
}

impl From<&ApiConfig> for ProviderOptions {
    fn from(config: &ApiConfig) -> Self {
        Self {
            debug: config.debug,
            headers: config
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), HeaderSource::Static(value.clone())))
                .collect(),
            pagination: config.pagination,
        }
    }
}

/// Serves admin-UI data operations from a HAL API. Every operation starts
/// with a fresh discovery of the API root.
pub struct DataProvider<C: HypermediaClient> {
    client: C,
    base_url: String,
    options: ProviderOptions,
    observer: Arc<dyn TraceObserver>,
}

impl DataProvider<HalClient> {
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = HalClient::new(config.request_timeout())?;
        Ok(Self::new(client, config.base_url.clone(), ProviderOptions::from(config)))
    }
}

impl<C: HypermediaClient> DataProvider<C> {
    pub fn new(client: C, base_url: impl Into<String>, options: ProviderOptions) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            options,
            observer: Arc::new(LogTraceObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TraceObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Like [`DataProvider::handle`], taking the admin UI's operation name
    /// (`GET_LIST`, `CREATE`, ...). Unknown names fail before any request.
    pub async fn handle_named(
        &self,
        kind: &str,
        resource: &str,
        params: OperationParams,
    ) -> Result<ProviderResponse> {
        let kind: OperationKind = kind.parse()?;
        self.handle(kind, resource, params).await
    }

    pub async fn handle(
        &self,
        kind: OperationKind,
        resource: &str,
        params: OperationParams,
    ) -> Result<ProviderResponse> {
        if !self.options.debug {
            return self.dispatch(kind, resource, &params).await;
        }

        let record = TraceRecord::new(kind, resource, &params);
        self.observer.on_request(&record);
        let result = self.dispatch(kind, resource, &params).await;
        let outcome = match &result {
            Ok(response) => Outcome::Success(response.clone()),
            Err(error) => Outcome::failure(error),
        };
        self.observer.on_outcome(&record, &outcome);
        result
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let headers = merge_headers(&params.headers, &self.options.headers);
        let root = self
            .client
            .discover(&self.base_url, RequestOptions::with_headers(headers))
            .await?;

        match kind {
            OperationKind::List => self.get_list(&root, resource, params).await,
            OperationKind::ReadOne => self.get_one(&root, resource, params).await,
            OperationKind::ReadMany => self.get_many(&root, resource, params).await,
            OperationKind::ReadManyByReference => {
                self.get_many_reference(&root, resource, params).await
            }
            OperationKind::Create => self.create(&root, resource, params).await,
            OperationKind::Update => self.update(&root, resource, params).await,
            OperationKind::Delete => self.delete(&root, resource, params).await,
        }
    }

    async fn get_list(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let query = build_query_params(&params.query(), self.options.pagination);
        let result = root.get(resource, &query).await?;
        check_status(&result, OperationKind::List)?;

        let document = result.resource();
        Ok(ProviderResponse::many(
            collection(document, resource),
            total(document, resource),
        ))
    }

    async fn get_one(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let id = required_id(params, OperationKind::ReadOne)?;
        let data = read_single(root, resource, id, OperationKind::ReadOne).await?;
        Ok(ProviderResponse::one(data))
    }

    async fn get_many(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let data = try_join_all(
            params
                .ids
                .iter()
                .map(|id| read_single(root, resource, id, OperationKind::ReadMany)),
        )
        .await?;
        let total = data.len() as u64;
        Ok(ProviderResponse::many(data, Some(total)))
    }

    async fn get_many_reference(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let kind = OperationKind::ReadManyByReference;
        let target = params.target.as_deref().ok_or_else(|| {
            DataProviderError::InvalidParams(format!("{} requires a target", kind))
        })?;
        let id = required_id(params, kind)?;

        let query = build_reference_params(&params.query(), target, id.to_value(), self.options.pagination);
        let result = root.get(resource, &query).await?;
        check_status(&result, kind)?;

        let document = result.resource();
        let data = collection(document, resource);
        let total = total(document, resource).unwrap_or(data.len() as u64);
        Ok(ProviderResponse::many(data, Some(total)))
    }

    async fn create(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let (body, original_id) = request_body(params.data.as_ref(), None);
        let result = root
            .post(resource, &Value::Object(body.clone()), &body)
            .await?;
        check_status(&result, OperationKind::Create)?;

        Ok(ProviderResponse::one(unwrap_with_id(
            result.resource(),
            original_id.as_ref(),
        )))
    }

    async fn update(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let (body, original_id) = request_body(params.data.as_ref(), params.id.as_ref());
        let result = root
            .put(&singularize(resource), &Value::Object(body.clone()), &body)
            .await?;
        check_status(&result, OperationKind::Update)?;

        Ok(ProviderResponse::one(unwrap_with_id(
            result.resource(),
            original_id.as_ref(),
        )))
    }

    /// Fetches the resource, then deletes it through its own `self` link.
    /// Answers with the representation seen before the delete.
    async fn delete(
        &self,
        root: &C::Navigator,
        resource: &str,
        params: &OperationParams,
    ) -> Result<ProviderResponse> {
        let kind = OperationKind::Delete;
        let id = required_id(params, kind)?;
        let current = fetch_single(root, resource, id, kind).await?;
        let data = unwrap_with_id(current.resource(), Some(id));

        let deleted = current.delete(SELF_REL, &Params::new()).await?;
        check_status(&deleted, kind)?;

        Ok(ProviderResponse::one(data))
    }
}

async fn fetch_single<N: Navigator>(
    root: &N,
    resource: &str,
    id: &Id,
    kind: OperationKind,
) -> Result<N> {
    let mut params = Params::new();
    params.insert("id".to_string(), id.normalized().to_value());
    let result = root.get(&singularize(resource), &params).await?;
    check_status(&result, kind)?;
    Ok(result)
}

async fn read_single<N: Navigator>(
    root: &N,
    resource: &str,
    id: &Id,
    kind: OperationKind,
) -> Result<FlatResource> {
    let result = fetch_single(root, resource, id, kind).await?;
    Ok(unwrap_with_id(result.resource(), Some(id)))
}

fn required_id(params: &OperationParams, kind: OperationKind) -> Result<&Id> {
    params
        .id
        .as_ref()
        .ok_or_else(|| DataProviderError::InvalidParams(format!("{} requires an id", kind)))
}

/// The caller's data with its id normalized. Returns the id as the caller
/// sent it, taken from the data or else from `fallback`.
fn request_body(
    data: Option<&Map<String, Value>>,
    fallback: Option<&Id>,
) -> (Map<String, Value>, Option<Id>) {
    let mut body = data.cloned().unwrap_or_default();
    let original = body
        .get("id")
        .and_then(Id::from_value)
        .or_else(|| fallback.cloned());
    if let Some(id) = &original {
        body.insert("id".to_string(), id.normalized().to_value());
    }
    (body, original)
}

fn unwrap_with_id(resource: &HalResource, original_id: Option<&Id>) -> FlatResource {
    let mut flat = resource.to_flat();
    if let Some(id) = original_id {
        flat.restore_id(id);
    }
    flat
}

fn collection(document: &HalResource, resource: &str) -> Vec<FlatResource> {
    document
        .embedded_resources(resource)
        .into_iter()
        .map(HalResource::to_flat)
        .collect()
}

fn total(document: &HalResource, resource: &str) -> Option<u64> {
    document
        .property(&total_property_name(resource))
        .and_then(count)
}

/// A non-negative whole number, also when sent as `36.0` or `"36"`.
fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_status<N: Navigator>(result: &N, kind: OperationKind) -> Result<()> {
    let status = result.status();
    if status >= 400 {
        return Err(DataProviderError::Http {
            status,
            message: error_message(result.resource(), kind),
        });
    }
    Ok(())
}

/// `errorContext.problem`, else `errorContext` itself, else a fixed message.
pub fn error_message(resource: &HalResource, kind: OperationKind) -> String {
    let context = resource.property(ERROR_CONTEXT).filter(|v| truthy(v));
    let problem = context
        .and_then(|context| context.get(PROBLEM))
        .filter(|v| truthy(v));

    match problem.or(context) {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => kind.failure_message().to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}
