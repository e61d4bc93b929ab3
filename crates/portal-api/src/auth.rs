// Login flow
//
// The published login URL only serves a page containing the real login
// form. Its action is scraped, credentials are posted to it, and the team
// id is then pulled out of a page that only renders for a logged-in user.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use crate::client::{PortalClient, Session, http_status};
use crate::error::{Error, LoginFailure};
use crate::transport::Form;

/// `name` of the form whose `action` is the real login endpoint.
const LOGIN_FORM_NAME: &str = "appleConnectForm";

static FORM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>").expect("form tag regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute regex")
});

static TEAM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"teamId=([A-Z0-9]+)").expect("team id regex"));

impl PortalClient {
    /// Run the login flow and establish the session.
    ///
    /// Any previous session is dropped first, so a failed attempt always
    /// leaves the client unauthenticated. Nothing is retried.
    pub async fn login(&mut self, user: &str, password: &SecretString) -> Result<&Session, Error> {
        self.session = None;

        let login_url = self.endpoints().login_url.clone();
        debug!("fetching login page {}", login_url);
        let page = self.transport().open(login_url, None).await?;
        if !page.is_ok() {
            return Err(http_status(&page));
        }

        let html = page.text();
        let Some(action) = extract_login_post_url(&html) else {
            debug!(page = %html, "login form not found");
            return Err(Error::Login(LoginFailure::ScrapeFailure));
        };
        let target = resolve_action(&page.url, &action)?;

        let form = Form::new()
            .with("accountName", user)
            .with("accountPW", password.expose_secret())
            .with("auxValue", "");
        debug!("submitting credentials to {}", target);
        let submitted = self.transport().open(target, Some(&form)).await?;
        debug!(status = %submitted.status, "credentials submitted");

        let team_url = self.endpoints().team_url.clone();
        let team_page = self.transport().open(team_url, None).await?;
        if !team_page.is_ok() {
            return Err(http_status(&team_page));
        }

        let body = team_page.text();
        let Some(team_id) = extract_team_id(&body) else {
            debug!(page = %body, "team id not found");
            return Err(Error::Login(LoginFailure::BadCredentials {
                user: user.to_owned(),
            }));
        };

        info!(user, team_id, "logged in");
        Ok(&*self
            .session
            .insert(Session::new(team_id.to_owned(), user.to_owned())))
    }
}

/// Find the `action` of the login form in an HTML page.
///
/// Looks for a `<form>` whose `name` attribute is `appleConnectForm`.
/// Attribute values are entity-decoded. Returns `None` when no such form
/// exists or it has no `action`.
pub fn extract_login_post_url(html: &str) -> Option<String> {
    FORM_TAG
        .captures_iter(html)
        .filter_map(|tag| tag.get(1))
        .map(|attrs| parse_attributes(attrs.as_str()))
        .find(|attrs| attrs.get("name").map(String::as_str) == Some(LOGIN_FORM_NAME))
        .and_then(|mut attrs| attrs.remove("action"))
}

fn extract_team_id(page: &str) -> Option<&str> {
    TEAM_ID
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Attribute names are lowercased; the first occurrence of a name wins.
fn parse_attributes(raw: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for cap in ATTRIBUTE.captures_iter(raw) {
        let Some(name) = cap.get(1) else { continue };
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .or_else(|| cap.get(4))
            .map_or("", |m| m.as_str());
        attrs
            .entry(name.as_str().to_ascii_lowercase())
            .or_insert_with(|| decode_entities(value));
    }
    attrs
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Resolve a scraped action against the scheme and host of the page it
/// came from.
fn resolve_action(page_url: &Url, action: &str) -> Result<Url, Error> {
    let mut origin = page_url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Ok(origin.join(action)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <form name="search" action="/search.do" method="get"></form>
  <FORM method="post" NAME='appleConnectForm'
        action="/IDMSWebAuth/authenticate?appIdKey=abc&amp;path=%2Faccount">
    <input name="accountName"><input name="accountPW" type="password">
  </FORM>
</body></html>"#;

    #[test]
    fn finds_named_form_action() {
        assert_eq!(
            extract_login_post_url(LOGIN_PAGE).as_deref(),
            Some("/IDMSWebAuth/authenticate?appIdKey=abc&path=%2Faccount")
        );
    }

    #[test]
    fn ignores_other_forms() {
        let html = r#"<form name="search" action="/search.do"></form>"#;
        assert_eq!(extract_login_post_url(html), None);
        assert_eq!(extract_login_post_url("<html>maintenance</html>"), None);
    }

    #[test]
    fn form_without_action_is_a_miss() {
        assert_eq!(
            extract_login_post_url(r#"<form name="appleConnectForm" method="post">"#),
            None
        );
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("a&amp;b&#47;c&#x2F;d"), "a&b/c/d");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn action_resolves_against_origin() {
        let page = Url::parse("https://idmsa.example.com/signin/page?x=1").unwrap();
        assert_eq!(
            resolve_action(&page, "/auth/login").unwrap().as_str(),
            "https://idmsa.example.com/auth/login"
        );
        assert_eq!(
            resolve_action(&page, "https://other.example.com/a").unwrap().as_str(),
            "https://other.example.com/a"
        );
    }

    #[test]
    fn team_id_pattern() {
        let page = r#"<a href="/account/?teamId=AB12CD34EF&x=1">team</a>"#;
        assert_eq!(extract_team_id(page), Some("AB12CD34EF"));
        assert_eq!(extract_team_id("teamId=lowercase"), None);
    }
}
