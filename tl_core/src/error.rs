/// Core error type for tierlab services
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// The pool could not hand out a connection within its acquisition timeout
    #[error("Connection pool timeout: {0}")]
    PoolTimeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique business key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Metric exposition could not be rendered
    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Database(_) => "database",
            Error::PoolTimeout(_) => "pool_timeout",
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Metrics(_) => "metrics",
            Error::Bootstrap(_) => "bootstrap",
            Error::Io(_) => "io",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
