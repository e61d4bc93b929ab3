// ── Runtime connection configuration ──
//
// Describes how to reach the portal and who to log in as. Built by the CLI
// (or a test) and handed to `Portal::connect`; core never reads config
// files.

use std::time::Duration;

use portal_api::{Endpoints, TransportConfig};
use secrecy::SecretString;

/// Account credentials for the login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Configuration for one portal session.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PortalConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            endpoints: Endpoints::default(),
            credentials,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            ..TransportConfig::default()
        }
        .with_cookie_jar()
    }
}
