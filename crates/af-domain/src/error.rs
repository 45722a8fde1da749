/// Shared error type used across all adaptforge crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no adapter bundle for user {0}")]
    NoBundle(String),

    #[error("bad adapter metadata: {0}")]
    BadMetadata(String),

    #[error("composition failed: {0}")]
    CompositionFailure(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("missing x_user_id header")]
    MissingUserHeader,

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the operation that produced this error might succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
