use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::providers::ProviderError;

/// Unified application error type.
///
/// Messages are user-facing summaries. The underlying error is logged when the
/// conversion happens and is never sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

/// The API whose error envelope a response must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenAi,
    Anthropic,
    Gemini,
}

/// An [`AppError`] bound to the protocol of the route that produced it.
#[derive(Debug)]
pub struct ProtocolError {
    pub protocol: Protocol,
    pub error: AppError,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn openai_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::NotImplemented(_) => "not_implemented_error",
            Self::Unavailable(_) | Self::Upstream(_) | Self::Timeout(_) => "api_error",
            Self::Internal(_) => "server_error",
        }
    }

    fn openai_code(&self) -> Option<&'static str> {
        match self {
            Self::NotImplemented(_) => Some("not_implemented"),
            Self::Unavailable(_) => Some("service_unavailable"),
            Self::Timeout(_) => Some("timeout"),
            _ => None,
        }
    }

    fn anthropic_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::NotImplemented(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::Unavailable(_) => "overloaded_error",
            Self::Upstream(_) | Self::Timeout(_) | Self::Internal(_) => "api_error",
        }
    }

    fn gemini_status(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotImplemented(_) => "UNIMPLEMENTED",
            Self::Unavailable(_) | Self::Upstream(_) => "UNAVAILABLE",
            Self::Timeout(_) => "DEADLINE_EXCEEDED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn with_protocol(self, protocol: Protocol) -> ProtocolError {
        ProtocolError {
            protocol,
            error: self,
        }
    }

    /// Response body in the envelope of `protocol`.
    pub fn body(&self, protocol: Protocol) -> serde_json::Value {
        let message = self.to_string();
        match protocol {
            Protocol::OpenAi => json!({
                "error": {
                    "message": message,
                    "type": self.openai_type(),
                    "code": self.openai_code(),
                },
            }),
            Protocol::Anthropic => json!({
                "type": "error",
                "error": {"type": self.anthropic_type(), "message": message},
            }),
            Protocol::Gemini => json!({
                "error": {
                    "code": self.status_code().as_u16(),
                    "message": message,
                    "status": self.gemini_status(),
                },
            }),
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        (status, axum::Json(self.error.body(self.protocol))).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.with_protocol(Protocol::OpenAi).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let mapped = match &err {
            // Caller input problems are safe to echo back.
            ProviderError::InvalidRequest(message) => {
                tracing::debug!(error = %err, "Rejected request");
                return Self::BadRequest(message.clone());
            }
            ProviderError::UnknownProvider(_) => {
                Self::NotFound("The requested provider is not registered".to_string())
            }
            ProviderError::NoActiveProvider => {
                Self::Unavailable("No provider is currently active".to_string())
            }
            ProviderError::Authentication(_) => Self::Unavailable(
                "The upstream session is not authenticated; check the configured cookies"
                    .to_string(),
            ),
            ProviderError::Configuration(_) => {
                Self::Internal("The provider is misconfigured".to_string())
            }
            ProviderError::Transport(_) => {
                Self::Upstream("The upstream service could not be reached".to_string())
            }
            ProviderError::Status { .. } => {
                Self::Upstream("The upstream service returned an error".to_string())
            }
            ProviderError::MalformedResponse(_) => {
                Self::Upstream("The upstream service returned an unexpected response".to_string())
            }
            ProviderError::Cancelled(_) => {
                Self::Timeout("The upstream request timed out".to_string())
            }
        };
        tracing::error!(error = %err, "Provider error");
        mapped
    }
}
