use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataProviderError {
    #[error("Unsupported fetch action type {0}")]
    UnsupportedOperation(String),

    /// The API answered with a status >= 400.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("discovery of {url} failed with status {status}")]
    Discovery { url: String, status: u16 },

    #[error("relation '{0}' not found on resource")]
    MissingRelation(String),

    #[error("invalid uri template: {0}")]
    Template(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DataProviderError {
    /// HTTP status carried by the error, if it came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            DataProviderError::Http { status, .. } => Some(*status),
            DataProviderError::Discovery { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DataProviderError>;
