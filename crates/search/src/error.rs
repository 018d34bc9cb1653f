use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    /// Collection missing, unreadable, or the query could not be embedded in time.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Generation timed out")]
    Timeout,

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err.to_string())
        }
    }
}
