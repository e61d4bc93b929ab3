// ── Core error types ──
//
// User-facing errors from portal-core. Transport details are folded into a
// few connection variants; backend envelopes stay intact as `Service` so
// callers can still read the result code and payload.

use portal_api::{LoginFailure, ServiceError};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Login failed: {0}")]
    Login(LoginFailure),

    #[error("Not logged in -- connect before issuing portal calls")]
    NotAuthenticated,

    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach portal at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Portal request timed out")]
    Timeout,

    #[error("Unexpected HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // ── Service ──────────────────────────────────────────────────────
    /// The backend rejected a call; code and payload preserved.
    #[error(transparent)]
    Service(ServiceError),

    // ── Data ─────────────────────────────────────────────────────────
    /// A resource could not be resolved, or the backend has no such
    /// download.
    #[error("{kind} '{identifier}' not found")]
    NotFound {
        kind: &'static str,
        identifier: String,
    },

    /// Malformed identifier, out-of-range profile type, non-UDID device
    /// number and similar caller mistakes.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Unexpected portal response: {message}")]
    Deserialization { message: String },

    // ── Output ───────────────────────────────────────────────────────
    #[error("Cannot write {path}: {reason}")]
    Output { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The backend `resultCode`, for service errors.
    pub fn result_code(&self) -> Option<i64> {
        match self {
            Self::Service(e) => Some(e.code),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<portal_api::Error> for CoreError {
    fn from(err: portal_api::Error) -> Self {
        match err {
            portal_api::Error::Login(failure) => CoreError::Login(failure),
            portal_api::Error::NotAuthenticated => CoreError::NotAuthenticated,
            portal_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            portal_api::Error::InvalidUrl(e) => CoreError::InvalidArgument {
                message: format!("invalid URL: {e}"),
            },
            portal_api::Error::HttpStatus { status, url } => CoreError::HttpStatus { status, url },
            portal_api::Error::Service(e) => CoreError::Service(e),
            portal_api::Error::NotFound { id } => CoreError::NotFound {
                kind: "Profile",
                identifier: id,
            },
            portal_api::Error::Deserialization { message, body: _ } => {
                CoreError::Deserialization { message }
            }
            portal_api::Error::Io(e) => CoreError::Io(e),
        }
    }
}
