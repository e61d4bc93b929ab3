//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use portal_config::ConfigError;
use portal_core::{CoreError, LoginFailure};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const INTERRUPTED: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Credentials & login ──────────────────────────────────────────
    #[error("No credentials found for environment '{environment}'")]
    #[diagnostic(
        code(portal::no_credentials),
        help(
            "Set PORTAL_CREDENTIALS=user:password, or add a [{environment}] section\n\
             with `user` and `password` keys to ~/.portalrc."
        )
    )]
    NoCredentials { environment: String },

    #[error("Login failed: {message}")]
    #[diagnostic(
        code(portal::login_page),
        help("The login page layout may have changed. Rerun with -dd to log the page.")
    )]
    LoginPage { message: String },

    #[error("Login failed for {user}")]
    #[diagnostic(
        code(portal::auth_failed),
        help("Check PORTAL_CREDENTIALS or the .portalrc section in use (--environment).")
    )]
    AuthFailed { user: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the portal at {url}")]
    #[diagnostic(code(portal::connection_failed), help("{reason}"))]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(portal::timeout),
        help("Increase the timeout with --timeout.")
    )]
    Timeout,

    #[error("Unexpected HTTP {status} from {url}")]
    #[diagnostic(code(portal::http_status))]
    HttpStatus { status: u16, url: String },

    // ── Portal ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(portal::service), help("Portal result code {code}"))]
    Service { code: i64, message: String },

    #[error("{kind} '{identifier}' not found")]
    #[diagnostic(
        code(portal::not_found),
        help("Run: portal {list_command} to see what exists")
    )]
    NotFound {
        kind: String,
        identifier: String,
        list_command: String,
    },

    #[error("{count} requested item(s) not found")]
    #[diagnostic(code(portal::incomplete))]
    Incomplete { count: usize },

    #[error("Unexpected portal response: {message}")]
    #[diagnostic(code(portal::response))]
    Response { message: String },

    // ── Validation & configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(portal::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(portal::config))]
    Config { message: String },

    // ── Output ───────────────────────────────────────────────────────
    #[error("Cannot write {path}: {reason}")]
    #[diagnostic(code(portal::output))]
    Output { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interrupted")]
    #[diagnostic(code(portal::interrupted))]
    Interrupted,
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::FAILURE,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Login(LoginFailure::BadCredentials { user }) => {
                CliError::AuthFailed { user }
            }
            CoreError::Login(failure) => CliError::LoginPage {
                message: failure.to_string(),
            },
            CoreError::NotAuthenticated => CliError::Response {
                message: "not logged in".into(),
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::Timeout => CliError::Timeout,
            CoreError::HttpStatus { status, url } => CliError::HttpStatus { status, url },

            CoreError::Service(service) => CliError::Service {
                code: service.code,
                message: service.to_string(),
            },

            CoreError::NotFound { kind, identifier } => CliError::NotFound {
                list_command: list_command(kind).into(),
                kind: kind.into(),
                identifier,
            },

            CoreError::InvalidArgument { message } => CliError::Validation {
                field: "argument".into(),
                reason: message,
            },
            CoreError::Deserialization { message } => CliError::Response { message },

            CoreError::Output { path, reason } => CliError::Output { path, reason },
            CoreError::Io(e) => CliError::Io(e),
        }
    }
}

fn list_command(kind: &str) -> &'static str {
    match kind {
        "Device" => "listDevices",
        "App ID" => "listApps",
        "Certificate" => "listCertificates",
        _ => "listProfiles",
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredentials { environment } => {
                CliError::NoCredentials { environment }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other @ ConfigError::Figment(_) => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
