//! Error types for client-core operations.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::FieldError;

/// Result alias for client-core operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Primary error type surfaced by the remote client and synchronization layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Form input failed client-side validation; nothing was sent.
    #[error("invalid input")]
    Validation {
        /// Per-field failures in form order.
        errors: Vec<FieldError>,
    },
    /// Login or registration was refused by the server.
    #[error("authentication failed")]
    Authentication {
        /// HTTP status returned by the auth endpoint.
        status: StatusCode,
        /// Server-provided explanation when available.
        message: Option<String>,
    },
    /// A request was rejected as unauthorized; the session has been cleared.
    #[error("session expired")]
    SessionExpired,
    /// The server answered with a non-success status.
    #[error("server returned {status}")]
    Server {
        /// HTTP status code.
        status: StatusCode,
        /// Server-provided explanation when available.
        message: Option<String>,
    },
    /// The request never produced a response (timeout, connection failure).
    #[error("request to {endpoint} failed")]
    Transport {
        /// Logical endpoint label, e.g. `GET /templates`.
        endpoint: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}")]
    Decode {
        /// Logical endpoint label.
        endpoint: &'static str,
        /// Human-readable detail.
        detail: String,
    },
    /// The server reported success without a usable token or user id.
    #[error("server returned incomplete credentials")]
    IncompleteCredentials,
    /// Client configuration was invalid.
    #[error("invalid client configuration")]
    Config {
        /// Offending field.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Persisted state could not be read or written.
    #[error("storage operation failed")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Whether re-invoking the same action may succeed without user changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Server { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Text suitable for an inline, transient failure message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { errors } => errors
                .iter()
                .map(|error| format!("{}: {}", error.field, error.message))
                .collect::<Vec<_>>()
                .join("; "),
            Self::Authentication { message, .. } => message
                .clone()
                .unwrap_or_else(|| "Login failed. Please check your credentials.".to_string()),
            Self::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            Self::Server { status, message } => message
                .clone()
                .unwrap_or_else(|| format!("request failed with status {status}")),
            Self::Transport { endpoint, source } => {
                format!("could not reach the server ({endpoint}): {source}")
            }
            Self::Decode { endpoint, detail } => {
                format!("unexpected response from {endpoint}: {detail}")
            }
            Self::Config {
                field,
                reason,
                value,
            } => match value {
                Some(value) => format!("invalid {field} '{value}': {reason}"),
                None => format!("invalid {field}: {reason}"),
            },
            Self::IncompleteCredentials | Self::Storage(_) => self.to_string(),
        }
    }
}

/// Errors raised by [`crate::storage::KeyValueStore`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading the backing file failed.
    #[error("failed to read state file")]
    Read {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the backing file failed.
    #[error("failed to write state file")]
    Write {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the state map failed.
    #[error("failed to encode state")]
    Encode {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Contract violations on the session store.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The user identifier was empty.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// The bearer token was empty.
    #[error("token must not be empty")]
    EmptyToken,
    /// A token refresh was attempted without an active session.
    #[error("no active session")]
    NotAuthenticated,
}
