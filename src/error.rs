use thiserror::Error;

/// Errors raised while talking to the preparation server
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("Unable to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing {0}")]
    MissingContext(&'static str),

    #[error("Unable to read local dataset: {0}")]
    LocalData(String),
}

pub type Result<T, E = PrepError> = std::result::Result<T, E>;
