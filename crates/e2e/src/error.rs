//! Error types for the verification harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// An expected element is absent from the page.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A settle wait exceeded its bound.
    #[error("Timeout waiting for {what} after {waited_ms} ms")]
    Timeout { what: String, waited_ms: u64 },

    /// Any other unanticipated failure while talking to the surface.
    #[error("Surface error: {0}")]
    Surface(String),

    /// The surface could not be acquired at all.
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn timeout(what: impl Into<String>, waited: std::time::Duration) -> Self {
        E2eError::Timeout {
            what: what.into(),
            waited_ms: waited.as_millis() as u64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, E2eError::ElementNotFound(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
