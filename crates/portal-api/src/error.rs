use serde_json::{Map, Value};
use thiserror::Error;

/// Why a login attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginFailure {
    /// The login page did not contain the expected form, so the real POST
    /// target could not be discovered.
    #[error("unable to locate login URL (HTML scraping failure)")]
    ScrapeFailure,
    /// The team page carried no team id after submitting credentials.
    #[error("please check credentials (using {user})")]
    BadCredentials { user: String },
}

impl LoginFailure {
    /// Stable short code (`scrape-failure` / `bad-credentials`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::ScrapeFailure => "scrape-failure",
            Self::BadCredentials { .. } => "bad-credentials",
        }
    }
}

/// A JSON envelope whose `resultCode` is not a success code.
///
/// Carries the full decoded payload so callers can inspect backend-specific
/// fields beyond the code and messages.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} (Error {})", self.user_string, self.detail())]
pub struct ServiceError {
    pub code: i64,
    pub user_string: String,
    pub result_string: String,
    pub payload: Map<String, Value>,
}

impl ServiceError {
    pub(crate) fn from_payload(code: i64, payload: Map<String, Value>) -> Self {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            code,
            user_string: text("userString"),
            result_string: text("resultString"),
            payload,
        }
    }

    /// The code, followed by `resultString` when it adds to `userString`.
    fn detail(&self) -> String {
        if self.user_string == self.result_string {
            self.code.to_string()
        } else {
            format!("{}: {}", self.code, self.result_string)
        }
    }
}

/// Top-level error type for the `portal-api` crate.
///
/// `portal-core` maps these into its own user-facing variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login flow failed (scraping or credentials).
    #[error("Login failed: {0}")]
    Login(LoginFailure),

    /// A signed call was attempted before a successful login.
    #[error("Not authenticated -- login required before calling the API")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Any HTTP status other than 200.
    #[error("Unexpected HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    // ── Service ─────────────────────────────────────────────────────
    /// The backend answered with a non-success `resultCode`.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Download target does not exist (HTTP 404).
    #[error("Profile '{id}' not found")]
    NotFound { id: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not the expected JSON shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Writing a download to its sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::HttpStatus { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// The backend `resultCode`, if this is a service error.
    pub fn result_code(&self) -> Option<i64> {
        match self {
            Self::Service(e) => Some(e.code),
            _ => None,
        }
    }
}
