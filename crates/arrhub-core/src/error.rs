//! Error types for backend services and hub commands.

use arrhub_events::BackendKind;
use thiserror::Error;

/// Convenience alias for backend service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors produced by a [`crate::BackendService`] implementation.
///
/// Implementations must mask credentials before building these: no variant
/// may carry an API key inside `message` or `body`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response: connect failure or timeout.
    #[error("backend request failed")]
    Transport {
        /// Backend the request targeted.
        kind: BackendKind,
        /// Operation identifier.
        operation: &'static str,
        /// Sanitized transport failure description.
        message: String,
    },
    /// The backend answered with a non-success status.
    #[error("backend rejected request")]
    Remote {
        /// Backend the request targeted.
        kind: BackendKind,
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code returned by the backend.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// The operation is not valid for this backend kind.
    #[error("operation not supported by backend")]
    Unsupported {
        /// Backend the request targeted.
        kind: BackendKind,
        /// Operation identifier.
        operation: &'static str,
    },
    /// The configured base URL could not be parsed into a request root.
    #[error("invalid base URL '{value}'")]
    InvalidBaseUrl {
        /// The offending URL value.
        value: String,
    },
}

impl ServiceError {
    /// Short operator-facing description used for per-backend fault entries.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Transport { operation, message, .. } => format!("{operation}: {message}"),
            Self::Remote {
                operation,
                status,
                body,
                ..
            } => format!("{operation}: status {status}: {body}"),
            Self::Unsupported { operation, kind } => {
                format!("{operation}: not supported by {kind}")
            }
            Self::InvalidBaseUrl { value } => format!("invalid base URL '{value}'"),
        }
    }

    /// The backend this error originated from, when known.
    #[must_use]
    pub const fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::Transport { kind, .. }
            | Self::Remote { kind, .. }
            | Self::Unsupported { kind, .. } => Some(*kind),
            Self::InvalidBaseUrl { .. } => None,
        }
    }
}

/// Convenience alias for command dispatcher results.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors surfaced by the command dispatcher.
///
/// Unlike the aggregation engine, commands never downgrade failures: the
/// caller asked for a specific effect and gets the real outcome.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command targets a backend with no registered client.
    #[error("backend '{kind}' is not configured")]
    UnconfiguredBackend {
        /// The absent backend kind.
        kind: BackendKind,
    },
    /// A title search returned zero results.
    #[error("no item matching '{title}' found in backend '{kind}'")]
    NotFound {
        /// Backend that was searched.
        kind: BackendKind,
        /// The search term.
        title: String,
    },
    /// The matched item carried no usable identifier.
    #[error("item matching '{title}' in backend '{kind}' has no identifier")]
    MissingItemId {
        /// Backend that was searched.
        kind: BackendKind,
        /// The search term.
        title: String,
    },
    /// The underlying remote operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}
