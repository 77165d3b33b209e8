//! Admin-UI data provider for HAL hypermedia APIs.
//!
//! Turns CRUD-style data operations (`GET_LIST`, `GET_ONE`, `GET_MANY`,
//! `GET_MANY_REFERENCE`, `CREATE`, `UPDATE`, `DELETE`) into requests that
//! follow link relations discovered from the API root, and turns the HAL
//! responses back into flat objects.

pub mod client;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod provider;

pub use client::{HalClient, HalNavigator, HypermediaClient, Navigator, RequestOptions};
pub use error::{DataProviderError, Result};
pub use logic::{build_filter_params, build_pagination_params, build_query_params, build_sort_params};
pub use model::*;
pub use provider::{DataProvider, HeaderSource, LogTraceObserver, ProviderOptions, TraceObserver};
