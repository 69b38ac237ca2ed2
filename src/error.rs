use thiserror::Error;

/// Error raised by a `BookStore` backend.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a single page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page {page} returned status {status}")]
    Status { page: u32, status: u16 },
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn page(&self) -> u32 {
        match self {
            FetchError::Status { page, .. } | FetchError::Transport { page, .. } => *page,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no book data found")]
    NoData,

    #[error("insert of record {index} ({title:?}) failed: {source}")]
    Insert {
        index: usize,
        title: String,
        #[source]
        source: StoreError,
    },

    #[error("database error: {source}")]
    Database {
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("handoff error at {path}: {reason}")]
    Handoff { path: String, reason: String },
}

impl From<postgres::Error> for PipelineError {
    fn from(err: postgres::Error) -> Self {
        PipelineError::Database {
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
