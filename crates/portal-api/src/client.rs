// Signed request layer
//
// Every authenticated call goes through `PortalClient::call`: the caller's
// query fields are followed by the content-type/accept markers, a fresh
// request id, the locale and the session's team id. The response is a JSON
// envelope whose `resultCode` decides success. Endpoint modules
// (certificates, devices, ...) add inherent methods in separate files.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, ServiceError};
use crate::transport::{Form, RawResponse, Transport, TransportConfig};

/// Result codes the backend uses for success. 8500 is a partial success
/// that still carries a usable payload.
const SUCCESS_CODES: [i64; 2] = [0, 8500];

const LOCALE: &str = "en_US";

// ── Endpoints ────────────────────────────────────────────────────────

/// The four URL families the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Published login page (a redirect to the real form).
    pub login_url: Url,
    /// Page scraped for the team id after submitting credentials.
    pub team_url: Url,
    /// Base of the signed JSON commands.
    pub services_url: Url,
    /// Root of the unsigned download URLs.
    pub developer_url: Url,
}

impl Endpoints {
    const LOGIN_PATH: &'static str = "/account/login.action";
    const TEAM_PATH: &'static str = "/account/ios/certificate/certificateList.action";
    const SERVICES_PATH: &'static str = "/services-developerportal/QH65B2/account/ios";
    const DOWNLOAD_PATH: &'static str = "account/ios/profile/profileContentDownload.action";

    /// All four endpoints rooted at the same origin (a mock server, a proxy).
    pub fn rooted_at(base: &Url) -> Result<Self, Error> {
        Ok(Self {
            login_url: base.join(Self::LOGIN_PATH)?,
            team_url: base.join(Self::TEAM_PATH)?,
            services_url: base.join(Self::SERVICES_PATH)?,
            developer_url: base.join("/")?,
        })
    }

    /// `<services_url>/<command>`.
    pub fn command_url(&self, command: &str) -> Result<Url, Error> {
        let base = self.services_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", command.trim_start_matches('/')))?)
    }

    /// Unsigned download URL for a profile id.
    pub fn download_url(&self, profile_id: &str) -> Result<Url, Error> {
        let mut url = self.developer_url.join(Self::DOWNLOAD_PATH)?;
        url.query_pairs_mut().append_pair("displayId", profile_id);
        Ok(url)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let base = Url::parse("https://developer.apple.com").expect("static developer URL");
        Self::rooted_at(&base).expect("static endpoint paths")
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Authenticated session state. Only ever built by a successful login; the
/// session cookie itself lives in the transport's jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    team_id: String,
    account_name: String,
}

impl Session {
    pub(crate) fn new(team_id: String, account_name: String) -> Self {
        Self {
            team_id,
            account_name,
        }
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Raw client for the portal's private API.
///
/// Holds the transport, the endpoint URLs and (after [`login`](Self::login))
/// the session. Signed calls made before a successful login fail with
/// [`Error::NotAuthenticated`].
#[derive(Debug)]
pub struct PortalClient {
    transport: Transport,
    endpoints: Endpoints,
    pub(crate) session: Option<Session>,
}

impl PortalClient {
    /// Create a client from a `TransportConfig`. A cookie jar is added when
    /// the config does not carry one.
    pub fn new(endpoints: Endpoints, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            transport: Transport::new(transport)?,
            endpoints,
            session: None,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The authenticated session, if login succeeded.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn require_session(&self) -> Result<&Session, Error> {
        self.session.as_ref().ok_or(Error::NotAuthenticated)
    }

    /// Issue a signed command and return the decoded envelope.
    ///
    /// The request is always a POST of `form` (possibly empty) to
    /// `<services_url>/<command>`. `query` fields come first in the query
    /// string, followed by the injected signing fields.
    pub async fn call(
        &self,
        command: &str,
        form: &Form,
        query: &[(&str, &str)],
    ) -> Result<Map<String, Value>, Error> {
        let session = self.require_session()?;
        let mut url = self.endpoints.command_url(command)?;
        let request_id = Uuid::new_v4().to_string();
        url.query_pairs_mut()
            .extend_pairs(query)
            .append_pair("content-type", "text/x-url-arguments")
            .append_pair("accept", "application/json")
            .append_pair("requestId", &request_id)
            .append_pair("userLocale", LOCALE)
            .append_pair("teamId", session.team_id());

        trace!(command, form = %form.encode(), "signed call");
        let resp = self.transport.open(url, Some(form)).await?;
        if !resp.is_ok() {
            return Err(http_status(&resp));
        }
        let payload = decode_envelope(&resp.body)?;
        debug!(command, result_code = ?payload.get("resultCode"), "call succeeded");
        Ok(payload)
    }

    /// Issue a list command and deserialize the array under `key`.
    pub(crate) async fn fetch_list<T: DeserializeOwned>(
        &self,
        command: &str,
        query: &[(&str, &str)],
        key: &str,
    ) -> Result<Vec<T>, Error> {
        let mut payload = self.call(command, &Form::new(), query).await?;
        let Some(items) = payload.remove(key) else {
            return Err(Error::Deserialization {
                message: format!("{command}: response has no '{key}' field"),
                body: Value::Object(payload).to_string(),
            });
        };
        Vec::<T>::deserialize(&items).map_err(|e| Error::Deserialization {
            message: format!("{command}: {e}"),
            body: items.to_string(),
        })
    }
}

pub(crate) fn http_status(resp: &RawResponse) -> Error {
    debug!(status = %resp.status, body = %resp.preview(), "unexpected status");
    Error::HttpStatus {
        status: resp.status.as_u16(),
        url: resp.url.to_string(),
    }
}

/// Decode a JSON envelope and check its `resultCode`.
pub(crate) fn decode_envelope(body: &[u8]) -> Result<Map<String, Value>, Error> {
    let preview = || String::from_utf8_lossy(body).chars().take(200).collect::<String>();

    let payload: Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview()),
            body: String::from_utf8_lossy(body).into_owned(),
        })?;

    let Some(code) = payload.get("resultCode").and_then(Value::as_i64) else {
        return Err(Error::Deserialization {
            message: "response envelope has no numeric resultCode".into(),
            body: preview(),
        });
    };

    if SUCCESS_CODES.contains(&code) {
        Ok(payload)
    } else {
        Err(ServiceError::from_payload(code, payload).into())
    }
}
