use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DataProviderError;
use crate::model::{OperationKind, OperationParams, ProviderResponse};
use crate::provider::headers::mask_header_value;

/// What an operation was asked to do. Header values are masked.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub kind: OperationKind,
    pub resource: String,
    pub params: OperationParams,
    pub at: DateTime<Utc>,
}

impl TraceRecord {
    pub fn new(kind: OperationKind, resource: &str, params: &OperationParams) -> Self {
        let mut params = params.clone();
        for value in params.headers.values_mut() {
            *value = mask_header_value(value);
        }
        Self {
            kind,
            resource: resource.to_string(),
            params,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success(ProviderResponse),
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl Outcome {
    pub fn failure(error: &DataProviderError) -> Self {
        Outcome::Failure {
            message: error.to_string(),
            status: error.status(),
        }
    }
}

/// Observes operations when debug tracing is on. Called before dispatch and
/// again with the outcome; it cannot change either.
pub trait TraceObserver: Send + Sync {
    fn on_request(&self, record: &TraceRecord);
    fn on_outcome(&self, record: &TraceRecord, outcome: &Outcome);
}

/// Writes trace records as JSON through `log::debug!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceObserver;

impl TraceObserver for LogTraceObserver {
    fn on_request(&self, record: &TraceRecord) {
        log::debug!(
            "{} {} request: {}",
            record.kind,
            record.resource,
            serde_json::to_string(record).unwrap_or_default()
        );
    }

    fn on_outcome(&self, record: &TraceRecord, outcome: &Outcome) {
        let rendered = serde_json::to_string(outcome).unwrap_or_default();
        match outcome {
            Outcome::Success(_) => log::debug!("{} {} result: {}", record.kind, record.resource, rendered),
            Outcome::Failure { .. } => log::debug!("{} {} error: {}", record.kind, record.resource, rendered),
        }
    }
}
