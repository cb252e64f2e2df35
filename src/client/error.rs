//! Client error types

use derive_more::{Display, From};

/// Error body returned by the attendance service on policy violations.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RejectionBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Display, From)]
pub enum ClientError {
    /// Transport failure: connection refused, TLS, body decoding
    #[display(fmt = "HTTP error: {}", _0)]
    Http(reqwest::Error),

    /// The service refused the request (4xx)
    #[display(fmt = "Rejected ({}): {}", status, message)]
    #[from(ignore)]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[display(fmt = "Authentication required")]
    #[from(ignore)]
    Unauthorized,

    /// The service failed (5xx)
    #[display(fmt = "Server error ({}): {}", status, message)]
    #[from(ignore)]
    Server { status: u16, message: String },

    #[display(fmt = "Invalid response: {}", _0)]
    #[from(ignore)]
    InvalidResponse(String),
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl ClientError {
    /// Machine-readable reason of a 4xx rejection, if the service sent one.
    pub fn rejection_code(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
