use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexBrainError {
    #[error("Validation error: {0}")]
    Validation(#[from] crate::query::ValidationError),
    #[error("Search error: {0}")]
    Search(#[from] crate::search::SearchError),
    #[error("Data error: {0}")]
    Data(#[from] indexbrain_data::DataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IndexBrainError {
    /// Short machine-readable reason, suitable for an error response body.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.reason(),
            Self::Search(e) => e.reason(),
            _ => "internal_error",
        }
    }

    /// Whether the request itself was at fault (a "bad request") rather than
    /// the service.
    pub fn is_caller_error(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Search(e) => e.is_caller_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexBrainError>;
