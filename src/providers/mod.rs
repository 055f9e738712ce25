//! Provider Module
//!
//! Defines the provider capability traits and error types, plus sub-modules
//! for the provider registry, the static model catalog, protocol translation
//! and the concrete Gemini web implementation.

pub mod gemini;
pub mod manager;
pub mod models;
pub mod traits;
pub mod transform;
pub mod types;

use reqwest::StatusCode;

// Re-exports for convenience.
pub use self::manager::{ProviderManager, ProviderStatus};
pub use self::traits::{ChatSession, Provider, ProviderFuture};

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No active provider selected")]
    NoActiveProvider,

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Classify a non-success upstream status. Session rejections become
    /// [`ProviderError::Authentication`] so callers know to re-initialize.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message: String = body.chars().take(200).collect();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::Authentication(format!("upstream rejected the session ({status})"))
            }
            _ => Self::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}
