//! Error types
//!
//! Every fallible operation in the library returns [`Error`]. Lookups by name
//! report absence as `None` rather than as an error.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the interconnect client
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credentials could be discovered or a token could not be minted
    #[error("credential resolution failed: {0}")]
    CredentialResolution(String),

    /// Transport, authentication or provider-side failure
    #[error("remote service error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RemoteService {
        /// HTTP status, when a response was received at all
        status: Option<u16>,
        message: String,
    },

    /// The addressed resource does not exist (404 on a single-resource get or delete)
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Malformed caller input, e.g. partner metadata with unknown keys
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation did not reach `DONE` within the allowed time
    #[error("operation {operation} not done after {}s", .waited.as_secs())]
    Timeout { operation: String, waited: Duration },

    /// An operation finished with an error payload
    #[error("operation {operation} failed: {message}")]
    OperationFailed { operation: String, message: String },
}

impl Error {
    pub(crate) fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteService {
            status,
            message: message.into(),
        }
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteService { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::remote(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::remote(None, format!("malformed response: {err}"))
    }
}

/// Turn an error into a short hint for people at a terminal
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::CredentialResolution(_) => {
            "Authentication failed. Run 'gcloud auth application-default login'.".to_string()
        },
        Error::NotFound { resource } => format!("Resource not found: {}", resource),
        Error::Validation(msg) => format!("Invalid input: {}", msg),
        Error::RemoteService { status: Some(401), .. } => {
            "Authentication failed. Run 'gcloud auth application-default login'.".to_string()
        },
        Error::RemoteService { status: Some(403), .. } => {
            "Permission denied. Check your GCP IAM permissions.".to_string()
        },
        Error::RemoteService { status: Some(409), .. } => {
            "Resource conflict. The attachment may already exist or be in use.".to_string()
        },
        Error::RemoteService { status: Some(429), .. } => {
            "Rate limit exceeded. Please try again later.".to_string()
        },
        Error::RemoteService { status: Some(400), .. } => {
            "Invalid request. Check your parameters.".to_string()
        },
        Error::RemoteService { status: Some(s), .. } if *s >= 500 => {
            "GCP service temporarily unavailable. Please try again.".to_string()
        },
        other => other.to_string(),
    }
}
