//! Error types for the formats proxy

use thiserror::Error;

/// Process-level error type (startup, configuration, serving)
///
/// Per-request failures never surface here; they are rendered into HTTP
/// responses by [`crate::proxy::ProxyError`].
#[derive(Error, Debug)]
pub enum FormatsProxyError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener / HTTP server errors
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for formats proxy operations
pub type Result<T> = std::result::Result<T, FormatsProxyError>;
