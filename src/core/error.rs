use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")] Config(String),

    #[error("Invalid image data: {0}")] InvalidImage(String),

    #[error("Analysis error: {0}")] Analysis(String),

    #[error("Security error: {0}")] Security(String),

    #[error("Rate limit exceeded")] RateLimit,

    #[error("key not found")] KeyNotFound,

    #[error("value size exceeds cache max size")] SizeExceeded,

    #[error("cache is full even after eviction")] InsufficientCapacity,

    #[error("worker pool is shutting down")] PoolShutdown,

    #[error("operation cancelled")] Cancelled,

    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")] Io(#[from] std::io::Error),

    #[error("Internal error: {0}")] Internal(String),
}

impl AnalyzerError {
    /// Capacity errors mean the request can be retried once load drops
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            AnalyzerError::SizeExceeded
                | AnalyzerError::InsufficientCapacity
                | AnalyzerError::RateLimit
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyzerError::KeyNotFound)
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
