use thiserror::Error;

// NOTE: Error only for [client].request() not to_result()
#[derive(Error, Debug)]
#[error("{client} error, method: {method} error: {source}")]
pub struct RPCRequestError {
    pub client: &'static str,
    pub method: String,
    pub source: anyhow::Error,
}

impl RPCRequestError {
    pub fn new<E: Into<anyhow::Error>>(client: &'static str, method: String, source: E) -> Self {
        RPCRequestError {
            client,
            method,
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// The resource is not indexed yet. Expected during the window between
    /// L1 mining and L2 indexing; callers must not escalate it.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("coordinator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },
}
