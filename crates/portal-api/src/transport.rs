// Session transport: the cookie-bearing HTTP client underneath everything.
//
// Issues GET (no body) or form-encoded POST (with body), follows redirects,
// and hands back the status, the final URL after redirects, and the raw
// body bytes. No decoding and no retries happen here.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;
use url::form_urlencoded;

use crate::error::Error;

const MAX_REDIRECTS: usize = 10;

// ── Form ─────────────────────────────────────────────────────────────

/// Ordered `application/x-www-form-urlencoded` pairs.
///
/// Repeated keys are kept in insertion order; the backend relies on
/// repeated `certificateIds` / `deviceIds` / `devices` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, keeping any earlier pair with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// URL-encode the pairs in order.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ── Raw response ─────────────────────────────────────────────────────

/// What the transport hands back: status, final URL, body bytes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// URL after following redirects.
    pub url: Url,
    pub body: Bytes,
}

impl RawResponse {
    /// The backend only ever answers `200` on success.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Body decoded lossily as UTF-8 (HTML pages, diagnostics).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First 200 characters of the body, for error messages.
    pub(crate) fn preview(&self) -> String {
        self.text().chars().take(200).collect()
    }
}

// ── Transport config ─────────────────────────────────────────────────

/// Settings for building the underlying `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("portal/", env!("CARGO_PKG_VERSION")).into(),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(Error::Transport)
    }

    /// Create a config with a fresh cookie jar (the session lives in it).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// Cookie-bearing GET/POST capability.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
}

impl Transport {
    /// Build a transport from a config, adding a cookie jar if missing.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let config = if config.cookie_jar.is_some() {
            config.clone()
        } else {
            config.clone().with_cookie_jar()
        };
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// GET `url`, or POST `body` form-encoded to it.
    pub async fn open(&self, url: Url, body: Option<&Form>) -> Result<RawResponse, Error> {
        let request = match body {
            Some(form) => {
                debug!("POST {}", url);
                self.http
                    .post(url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(form.encode())
            }
            None => {
                debug!("GET {}", url);
                self.http.get(url)
            }
        };

        let resp = request.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let url = resp.url().clone();
        let body = resp.bytes().await.map_err(Error::Transport)?;

        trace!(%status, %url, len = body.len(), "response received");
        Ok(RawResponse { status, url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_keeps_repeated_keys_in_order() {
        let form = Form::new()
            .with("deviceIds", "a")
            .with("name", "x y")
            .with("deviceIds", "b");

        assert_eq!(form.encode(), "deviceIds=a&name=x+y&deviceIds=b");
        assert_eq!(form.get("deviceIds"), Some("a"));
        assert_eq!(form.get_all("deviceIds"), vec!["a", "b"]);
    }

    #[test]
    fn form_escapes_brackets_and_commas() {
        let form = Form::new().with("certificateIds", "[c1,c2]");
        assert_eq!(form.encode(), "certificateIds=%5Bc1%2Cc2%5D");
    }

    #[test]
    fn form_from_iterator() {
        let form: Form = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(form.pairs().len(), 2);
        assert!(!form.is_empty());
    }
}
