// Portal resource records
//
// The backend returns loosely-shaped JSON records. Fields this client reads
// or writes are modelled explicitly; everything else lands in `extra` so a
// record serializes back to what the backend sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

/// Certificate type display ids understood by `certificate/listCertRequests`.
pub mod cert_types {
    pub const IOS_DEVELOPMENT: &str = "5QPB9NHCEI";
    pub const IOS_DISTRIBUTION: &str = "R58UK2EWSO";
    pub const UNKNOWN_1: &str = "9RQEK7MSXA";
    pub const UNKNOWN_2: &str = "LA30L5BJEU";
    pub const APN_DEVELOPMENT: &str = "BKLRAVXMGM";
    pub const APN_PRODUCTION: &str = "3BQKVH9I2X";
    pub const UNKNOWN_3: &str = "Y3B2F3TYSI";

    /// Every type, in the order the list call sends them.
    pub const ALL: [&str; 7] = [
        IOS_DEVELOPMENT,
        IOS_DISTRIBUTION,
        UNKNOWN_1,
        UNKNOWN_2,
        APN_DEVELOPMENT,
        APN_PRODUCTION,
        UNKNOWN_3,
    ];

    /// Code-signing certificates (development + distribution).
    pub const IOS: [&str; 2] = [IOS_DEVELOPMENT, IOS_DISTRIBUTION];
}

/// `true` if `candidate` has the shape of a device UDID (40 hex digits).
pub fn is_udid(candidate: &str) -> bool {
    candidate.len() == 40 && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

// ── Certificate request ──────────────────────────────────────────────

/// Entry from `certificate/listCertRequests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub certificate_id: String,
    pub certificate_type_display_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_requested: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── App id ───────────────────────────────────────────────────────────

/// Entry from `identifiers/listAppIds`, also embedded in every profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppId {
    pub app_id_id: String,
    /// Bundle identifier, `*` for the wildcard app id.
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Capability flags keyed by feature name.
    #[serde(default)]
    pub features: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppId {
    pub fn is_wildcard(&self) -> bool {
        self.identifier == "*"
    }

    /// Whether a capability is switched on. The backend mixes booleans and
    /// strings here; an empty string means off.
    pub fn feature_enabled(&self, feature: &str) -> bool {
        match self.features.get(feature) {
            Some(Value::Bool(on)) => *on,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_i64() != Some(0),
            _ => false,
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// Entry from `device/listDevices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    /// UDID.
    pub device_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Provisioning profile ─────────────────────────────────────────────

/// Entry from `profile/listProvisioningProfiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningProfile {
    pub provisioning_profile_id: String,
    pub name: String,
    /// `Active`, `Expired`, `Invalid`, ...
    #[serde(default)]
    pub status: String,
    /// Backend type label: `Development` or a distribution label.
    #[serde(rename = "type", default)]
    pub type_label: String,
    #[serde(default)]
    pub device_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_count: Option<u32>,
    #[serde(default)]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub certificate_ids: Vec<String>,
    pub app_id: AppId,
    #[serde(default)]
    pub distribution_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expire: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProvisioningProfile {
    /// Derived development / adhoc / appstore classification.
    pub fn classification(&self) -> ProfileType {
        ProfileType::classify(&self.type_label, self.device_count)
    }

    pub fn is_expired(&self) -> bool {
        self.status == "Expired"
    }
}

// ── Profile type ─────────────────────────────────────────────────────

/// Three-way profile classification. Never stored by the backend; always
/// derived from the `type` label and the device count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Development,
    AdHoc,
    AppStore,
}

impl ProfileType {
    /// Label order; a numeric token indexes into this.
    pub const ALL: [Self; 3] = [Self::Development, Self::AdHoc, Self::AppStore];

    pub fn classify(type_label: &str, device_count: u32) -> Self {
        if type_label == "Development" {
            Self::Development
        } else if device_count > 0 {
            Self::AdHoc
        } else {
            Self::AppStore
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Self::Development => 0,
            Self::AdHoc => 1,
            Self::AppStore => 2,
        }
    }

    /// Parse a numeric index or an exact label. `None` for anything else.
    pub fn from_token(token: &str) -> Option<Self> {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            return token.parse::<usize>().ok().and_then(Self::from_index);
        }
        token.parse().ok()
    }

    pub fn label(self) -> &'static str {
        self.into()
    }

    /// `distributionType` value expected by `profile/createProvisioningProfile`.
    pub fn distribution_type(self) -> &'static str {
        match self {
            Self::Development => "limited",
            Self::AdHoc => "adhoc",
            Self::AppStore => "store",
        }
    }

    /// Certificate type whose requests sign this kind of profile.
    pub fn certificate_type(self) -> &'static str {
        match self {
            Self::Development => cert_types::IOS_DEVELOPMENT,
            Self::AdHoc | Self::AppStore => cert_types::IOS_DISTRIBUTION,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn udid_shape() {
        assert!(is_udid("0123456789abcdef0123456789ABCDEF01234567"));
        assert!(!is_udid("0123456789abcdef0123456789abcdef0123456"));
        assert!(!is_udid("0123456789abcdef0123456789abcdef0123456g"));
        assert!(!is_udid("ABCDE12345"));
    }

    #[test]
    fn classification_is_pure_in_type_and_count() {
        assert_eq!(ProfileType::classify("Development", 0), ProfileType::Development);
        assert_eq!(ProfileType::classify("Development", 4), ProfileType::Development);
        assert_eq!(ProfileType::classify("Distribution", 3), ProfileType::AdHoc);
        assert_eq!(ProfileType::classify("Distribution", 0), ProfileType::AppStore);
    }

    #[test]
    fn profile_type_tokens() {
        for t in ProfileType::ALL {
            assert_eq!(ProfileType::from_token(&t.index().to_string()), Some(t));
            assert_eq!(ProfileType::from_token(t.label()), Some(t));
        }
        assert_eq!(ProfileType::from_token("3"), None);
        assert_eq!(ProfileType::from_token("AdHoc"), None);
        assert_eq!(ProfileType::from_token(""), None);
        assert_eq!(ProfileType::AdHoc.to_string(), "adhoc");
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let raw = json!({
            "provisioningProfileId": "P1",
            "name": "Example Dev",
            "status": "Active",
            "type": "Development",
            "deviceCount": 2,
            "proProPlatform": "ios",
            "appId": { "appIdId": "A1", "identifier": "com.example.app", "name": "Example" }
        });
        let profile: ProvisioningProfile = serde_json::from_value(raw).unwrap();
        assert_eq!(profile.classification(), ProfileType::Development);
        assert!(!profile.is_expired());
        assert_eq!(profile.extra.get("proProPlatform"), Some(&json!("ios")));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["proProPlatform"], json!("ios"));
        assert_eq!(back["type"], json!("Development"));
    }

    #[test]
    fn app_id_feature_flags() {
        let app: AppId = serde_json::from_value(json!({
            "appIdId": "A1",
            "identifier": "*",
            "features": { "push": true, "iCloud": "", "gameCenter": "on" }
        }))
        .unwrap();
        assert!(app.is_wildcard());
        assert!(app.feature_enabled("push"));
        assert!(!app.feature_enabled("iCloud"));
        assert!(app.feature_enabled("gameCenter"));
        assert!(!app.feature_enabled("passbook"));
    }
}
