// ── Polymorphic identifiers and resolution ──
//
// Callers hand in a record they already have, an id string, or a list of
// either. Resolution maps that against a cached collection: records pass
// through untouched, lists resolve element-wise, strings are matched on the
// one field their shape selects.

use portal_api::{AppId, CertificateRequest, Device, ProvisioningProfile, is_udid};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

// ── Identifier ───────────────────────────────────────────────────────

/// User-supplied reference to one or more resources of kind `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier<T> {
    /// The record itself.
    Raw(T),
    /// An id, UDID or bundle id, depending on the kind.
    ById(String),
    Many(Vec<Identifier<T>>),
}

impl<T> Identifier<T> {
    /// A list of ids.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Many(ids.into_iter().map(|id| Self::ById(id.into())).collect())
    }

    /// Flatten nested lists into single references, in order.
    pub fn leaves(&self) -> Vec<&Self> {
        match self {
            Self::Many(items) => items.iter().flat_map(Self::leaves).collect(),
            single => vec![single],
        }
    }

    /// Whether resolving this needs the cached collection (any id string).
    pub fn needs_lookup(&self) -> bool {
        match self {
            Self::Raw(_) => false,
            Self::ById(_) => true,
            Self::Many(items) => items.iter().any(Self::needs_lookup),
        }
    }
}

impl<T: Resource> Identifier<T> {
    /// Short human-readable form for messages.
    pub fn label(&self) -> String {
        match self {
            Self::Raw(record) => record.primary_id().to_owned(),
            Self::ById(id) => id.clone(),
            Self::Many(items) => items
                .iter()
                .map(Self::label)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl<T: DeserializeOwned> Identifier<T> {
    /// Interpret loose JSON input.
    ///
    /// Strings and numbers become ids, objects are decoded as records and
    /// arrays become lists. Anything else is rejected.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::String(id) => Ok(Self::ById(id)),
            Value::Number(n) => Ok(Self::ById(n.to_string())),
            Value::Object(_) => serde_json::from_value(value)
                .map(Self::Raw)
                .map_err(|e| CoreError::invalid(format!("not a valid record: {e}"))),
            Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<_, _>>()
                .map(Self::Many),
            other => Err(CoreError::invalid(format!(
                "expected an id, a record or a list, got {other}"
            ))),
        }
    }
}

impl<T> From<&str> for Identifier<T> {
    fn from(id: &str) -> Self {
        Self::ById(id.to_owned())
    }
}

impl<T> From<String> for Identifier<T> {
    fn from(id: String) -> Self {
        Self::ById(id)
    }
}

impl<T> From<Vec<Identifier<T>>> for Identifier<T> {
    fn from(items: Vec<Identifier<T>>) -> Self {
        Self::Many(items)
    }
}

// ── Resolution ───────────────────────────────────────────────────────

/// What to do with an id that matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnMissing {
    /// Resolve to [`Resolution::Absent`].
    #[default]
    Absent,
    /// Hand the id back as [`Resolution::Missing`] so the caller can pass
    /// it on and let the backend decide.
    ReturnId,
}

/// Outcome of resolving an [`Identifier`]. Mirrors its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    /// Unmatched id, returned under [`OnMissing::ReturnId`].
    Missing(String),
    Absent,
    Many(Vec<Resolution<T>>),
}

impl<T> Resolution<T> {
    /// The record, for a single found resolution.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(record) => Some(record),
            _ => None,
        }
    }

    /// Flatten nested lists, in order.
    pub fn into_leaves(self) -> Vec<Self> {
        match self {
            Self::Many(items) => items.into_iter().flat_map(Self::into_leaves).collect(),
            single => vec![single],
        }
    }
}

// ── Resource kinds ───────────────────────────────────────────────────

/// A cached record kind the resolver can match against.
pub trait Resource: Clone {
    /// Kind name used in messages (`Device`, `Profile`, ...).
    const KIND: &'static str;

    /// The id the backend expects when this record is referenced.
    fn primary_id(&self) -> &str;

    /// Whether `key` refers to this record.
    fn matches_key(&self, key: &str) -> bool;
}

/// Which device field an id string is matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKey<'a> {
    /// 40 hex digits: matched against `deviceNumber`, ignoring case.
    Udid(&'a str),
    DeviceId(&'a str),
}

impl<'a> DeviceKey<'a> {
    pub fn classify(key: &'a str) -> Self {
        if is_udid(key) {
            Self::Udid(key)
        } else {
            Self::DeviceId(key)
        }
    }

    pub fn matches(self, device: &Device) -> bool {
        match self {
            Self::Udid(udid) => device.device_number.eq_ignore_ascii_case(udid),
            Self::DeviceId(id) => device.device_id == id,
        }
    }
}

/// Which app id field an id string is matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppIdKey<'a> {
    /// Contains a dot: a bundle identifier.
    BundleId(&'a str),
    AppIdId(&'a str),
}

impl<'a> AppIdKey<'a> {
    pub fn classify(key: &'a str) -> Self {
        if key.contains('.') {
            Self::BundleId(key)
        } else {
            Self::AppIdId(key)
        }
    }

    pub fn matches(self, app: &AppId) -> bool {
        match self {
            Self::BundleId(bundle) => app.identifier == bundle,
            Self::AppIdId(id) => app.app_id_id == id,
        }
    }
}

impl Resource for Device {
    const KIND: &'static str = "Device";

    fn primary_id(&self) -> &str {
        &self.device_id
    }

    fn matches_key(&self, key: &str) -> bool {
        DeviceKey::classify(key).matches(self)
    }
}

impl Resource for AppId {
    const KIND: &'static str = "App ID";

    fn primary_id(&self) -> &str {
        &self.app_id_id
    }

    fn matches_key(&self, key: &str) -> bool {
        AppIdKey::classify(key).matches(self)
    }
}

impl Resource for ProvisioningProfile {
    const KIND: &'static str = "Profile";

    fn primary_id(&self) -> &str {
        &self.provisioning_profile_id
    }

    fn matches_key(&self, key: &str) -> bool {
        self.provisioning_profile_id == key
    }
}

impl Resource for CertificateRequest {
    const KIND: &'static str = "Certificate";

    fn primary_id(&self) -> &str {
        &self.certificate_id
    }

    fn matches_key(&self, key: &str) -> bool {
        self.certificate_id == key
    }
}

/// Resolve `identifier` against `items`.
pub fn resolve_in<T: Resource>(
    items: &[T],
    identifier: &Identifier<T>,
    on_missing: OnMissing,
) -> Resolution<T> {
    match identifier {
        Identifier::Raw(record) => Resolution::Found(record.clone()),
        Identifier::Many(list) => Resolution::Many(
            list.iter()
                .map(|item| resolve_in(items, item, on_missing))
                .collect(),
        ),
        Identifier::ById(key) => match items.iter().find(|item| item.matches_key(key)) {
            Some(found) => Resolution::Found(found.clone()),
            None => match on_missing {
                OnMissing::Absent => Resolution::Absent,
                OnMissing::ReturnId => Resolution::Missing(key.clone()),
            },
        },
    }
}

/// Bare backend ids for `identifier`: records give their primary id,
/// unmatched ids pass through unchanged.
pub fn unwrap_ids<T: Resource>(items: &[T], identifier: &Identifier<T>) -> Vec<String> {
    resolve_in(items, identifier, OnMissing::ReturnId)
        .into_leaves()
        .into_iter()
        .filter_map(|leaf| match leaf {
            Resolution::Found(record) => Some(record.primary_id().to_owned()),
            Resolution::Missing(id) => Some(id),
            Resolution::Absent | Resolution::Many(_) => None,
        })
        .collect()
}
