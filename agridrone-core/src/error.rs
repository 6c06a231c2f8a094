use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure of a single outbound HTTP call.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// Nothing usable came back: connection refused, DNS failure, timeout, broken body.
    #[error("request could not be completed: {message}")]
    Transport { message: String, timed_out: bool },

    /// The server answered with a non-2xx status.
    #[error("server responded with status {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Error payload the backend attaches to failed responses: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl RequestError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Build a `Server` error, pulling the `error` field out of a JSON body when there is one.
    pub fn server(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        Self::Server { status, message }
    }

    /// Message shown to the user: whatever the server said, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}

/// Local, pre-network rejection. Never logged, never sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A request is already in progress")]
    RequestPending,

    #[error("Unknown quick question #{0}")]
    UnknownQuickQuestion(usize),

    #[error("Please enter a farm name")]
    MissingFarmName,

    #[error("Please select a crop")]
    MissingCrop,

    #[error("Please select a location on the map")]
    MissingLocation,

    #[error("Please select an image file")]
    NoImageSelected,

    #[error("Image is {size} bytes, the limit is {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("'{0}' is not a supported image (PNG, JPG, JPEG, WEBP, GIF, BMP)")]
    UnsupportedImage(String),
}
