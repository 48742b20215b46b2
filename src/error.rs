use serde::{Deserialize, Serialize};

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(#[from] thirtyfour::error::WebDriverError),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to connect to PostgreSQL after {attempts} attempts: {source}")]
    ConnectionExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error summary written into run reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorSummary {
    pub kind: String,
    pub message: String,
}

impl HarnessError {
    /// Short machine-readable category for this error
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Browser(_) => "browser",
            Self::Navigation(_) => "navigation",
            Self::Timeout(_) => "timeout",
            Self::Database(_) => "database",
            Self::ConnectionExhausted { .. } => "connection_exhausted",
            Self::Assertion(_) => "assertion",
            Self::Config(_) => "config",
            Self::Io(_) | Self::Json(_) => "setup",
        }
    }

    /// Whether this is the intended test-failure signal rather than an environment problem
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }

    pub fn to_summary(&self) -> ErrorSummary {
        ErrorSummary {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

/// Custom result type for the harness
pub type HarnessResult<T> = Result<T, HarnessError>;
