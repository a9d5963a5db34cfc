//! Error types shared across revid crates.

/// Top-level error type for revid operations.
#[derive(Debug, thiserror::Error)]
pub enum RevidError {
    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Engine load timed out after {secs}s")]
    LoadTimeout { secs: u64 },

    #[error("Render timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    #[error("Staging error: {message}")]
    Staging { message: String },

    #[error("Export produced an undersized output ({bytes} bytes)")]
    OutputTooSmall { bytes: usize },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RevidError.
pub type RevidResult<T> = Result<T, RevidError>;

impl RevidError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging {
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error is one of the per-job timeout outcomes.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RevidError::LoadTimeout { .. } | RevidError::RenderTimeout { .. }
        )
    }
}
