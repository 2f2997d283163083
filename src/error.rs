use thiserror::Error;

/// Failure returned by a call against the Data Processing API.
///
/// `Api` carries the remote status code; callers decide whether it is fatal
/// (submission) or transient (status/log polls, which retry on the next tick).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error {status}: {message}")]
    Api {
        status: u16,
        class: String,
        message: String,
        query_id: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// The remote rejected the submission as unprocessable (HTTP 422).
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, ApiError::Api { status: 422, .. })
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid memory size: {0}")]
    InvalidSize(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, SubmitError>;
