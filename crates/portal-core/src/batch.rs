// ── Batch operations ──
//
// Select a set of devices or profiles from explicit ids and filters, then
// apply one mutation to each. Ids that resolve to nothing are reported
// before the first mutation, so a transport or service error that aborts
// the batch never hides them.

use portal_api::{Device, ProfileType, ProvisioningProfile, cert_types};
use regex::{Regex, RegexBuilder};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::identifier::{Identifier, OnMissing, Resolution};
use crate::portal::{Portal, ProfileOverrides};

/// Build a case-insensitive filter pattern.
pub fn filter_pattern(pattern: &str) -> Result<Regex, CoreError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| CoreError::invalid(format!("invalid pattern '{pattern}': {e}")))
}

// ── Filters ──────────────────────────────────────────────────────────

/// Which devices a batch applies to.
///
/// With explicit `ids`, only those are considered. Without ids, every
/// device is a candidate when a pattern is set or `include_all` is on;
/// otherwise the selection is empty.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub ids: Vec<String>,
    /// Matched against the device name.
    pub name: Option<Regex>,
    /// Matched against the UDID.
    pub udid: Option<Regex>,
    pub include_all: bool,
}

impl DeviceFilter {
    fn matches(&self, device: &Device) -> bool {
        self.name.as_ref().is_none_or(|re| re.is_match(&device.name))
            && self
                .udid
                .as_ref()
                .is_none_or(|re| re.is_match(&device.device_number))
    }

    fn selects_all(&self) -> bool {
        self.ids.is_empty() && (self.include_all || self.name.is_some() || self.udid.is_some())
    }
}

/// Which profiles a batch applies to. Same id/all rules as
/// [`DeviceFilter`].
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub ids: Vec<String>,
    /// Matched against the profile name.
    pub name: Option<Regex>,
    /// Exact bundle identifier of the profile's app id.
    pub app_identifier: Option<String>,
    pub profile_type: Option<ProfileType>,
    pub include_all: bool,
}

impl ProfileFilter {
    fn matches(&self, profile: &ProvisioningProfile) -> bool {
        self.name.as_ref().is_none_or(|re| re.is_match(&profile.name))
            && self
                .app_identifier
                .as_ref()
                .is_none_or(|id| profile.app_id.identifier == *id)
            && self
                .profile_type
                .is_none_or(|kind| profile.classification() == kind)
    }

    fn selects_all(&self) -> bool {
        self.ids.is_empty()
            && (self.include_all
                || self.name.is_some()
                || self.app_identifier.is_some()
                || self.profile_type.is_some())
    }
}

// ── Results ──────────────────────────────────────────────────────────

/// Resolved targets of a batch plus the ids that matched nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub selected: Vec<T>,
    pub missing: Vec<String>,
}

impl<T> Selection<T> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    fn from_leaves(leaves: Vec<Resolution<T>>, keep: impl Fn(&T) -> bool) -> Self {
        let mut selection = Self {
            selected: Vec::new(),
            missing: Vec::new(),
        };
        for leaf in leaves {
            match leaf {
                Resolution::Found(record) if keep(&record) => selection.selected.push(record),
                Resolution::Missing(id) => selection.missing.push(id),
                Resolution::Found(_) | Resolution::Absent | Resolution::Many(_) => {}
            }
        }
        selection
    }
}

/// Progress notification for simple batches.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a, T> {
    /// About to apply (or, in a dry run, would apply) to this record.
    Applying(&'a T),
    Missing(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub missing: Vec<String>,
}

impl BatchReport {
    /// `true` when every requested id was found.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Progress notification for [`Portal::regenerate_profiles`].
#[derive(Debug, Clone, Copy)]
pub enum RegenerateEvent<'a> {
    /// Up to date: not expired and already carrying the right devices.
    Skipped(&'a ProvisioningProfile),
    Regenerating {
        index: usize,
        total: usize,
        profile: &'a ProvisioningProfile,
    },
    Missing(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerateReport {
    pub regenerated: usize,
    pub skipped: usize,
    pub missing: Vec<String>,
}

impl RegenerateReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Whether a profile must be regenerated to carry `device_count` devices.
pub fn needs_regeneration(profile: &ProvisioningProfile, device_count: usize) -> bool {
    profile.is_expired() || usize::try_from(profile.device_count).ok() != Some(device_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceAction {
    Delete,
    Enable,
}

// ── Portal batch methods ─────────────────────────────────────────────

impl Portal {
    pub async fn select_devices(
        &mut self,
        filter: &DeviceFilter,
    ) -> Result<Selection<Device>, CoreError> {
        let leaves = if filter.selects_all() {
            self.all_devices()
                .await?
                .iter()
                .cloned()
                .map(Resolution::Found)
                .collect()
        } else {
            self.resolve_device(&Identifier::ids(&filter.ids), OnMissing::ReturnId)
                .await?
                .into_leaves()
        };
        Ok(Selection::from_leaves(leaves, |d| filter.matches(d)))
    }

    pub async fn select_profiles(
        &mut self,
        filter: &ProfileFilter,
    ) -> Result<Selection<ProvisioningProfile>, CoreError> {
        let leaves = if filter.selects_all() {
            self.all_provisioning_profiles()
                .await?
                .iter()
                .cloned()
                .map(Resolution::Found)
                .collect()
        } else {
            self.resolve_profile(&Identifier::ids(&filter.ids), OnMissing::ReturnId)
                .await?
                .into_leaves()
        };
        Ok(Selection::from_leaves(leaves, |p| filter.matches(p)))
    }

    /// Delete every selected device.
    pub async fn delete_devices<F>(
        &mut self,
        filter: &DeviceFilter,
        dry_run: bool,
        observe: F,
    ) -> Result<BatchReport, CoreError>
    where
        F: FnMut(BatchEvent<'_, Device>),
    {
        self.device_batch(filter, DeviceAction::Delete, dry_run, observe)
            .await
    }

    /// Re-enable every selected device.
    pub async fn enable_devices<F>(
        &mut self,
        filter: &DeviceFilter,
        dry_run: bool,
        observe: F,
    ) -> Result<BatchReport, CoreError>
    where
        F: FnMut(BatchEvent<'_, Device>),
    {
        self.device_batch(filter, DeviceAction::Enable, dry_run, observe)
            .await
    }

    async fn device_batch<F>(
        &mut self,
        filter: &DeviceFilter,
        action: DeviceAction,
        dry_run: bool,
        mut observe: F,
    ) -> Result<BatchReport, CoreError>
    where
        F: FnMut(BatchEvent<'_, Device>),
    {
        let selection = self.select_devices(filter).await?;
        for id in &selection.missing {
            warn!(id = %id, "device not found");
            observe(BatchEvent::Missing(id));
        }
        let mut report = BatchReport::default();

        for device in &selection.selected {
            observe(BatchEvent::Applying(device));
            if !dry_run {
                match action {
                    DeviceAction::Delete => {
                        self.client.delete_device(&device.device_id).await?;
                    }
                    DeviceAction::Enable => {
                        self.client
                            .enable_device(&device.device_id, &device.device_number)
                            .await?;
                    }
                }
            }
            report.applied += 1;
        }
        report.missing = selection.missing;
        Ok(report)
    }

    /// Delete every selected profile.
    pub async fn delete_profiles<F>(
        &mut self,
        filter: &ProfileFilter,
        dry_run: bool,
        mut observe: F,
    ) -> Result<BatchReport, CoreError>
    where
        F: FnMut(BatchEvent<'_, ProvisioningProfile>),
    {
        let selection = self.select_profiles(filter).await?;
        for id in &selection.missing {
            warn!(id = %id, "profile not found");
            observe(BatchEvent::Missing(id));
        }
        let mut report = BatchReport::default();

        for profile in &selection.selected {
            observe(BatchEvent::Applying(profile));
            if !dry_run {
                self.client
                    .delete_provisioning_profile(&profile.provisioning_profile_id)
                    .await?;
            }
            report.applied += 1;
        }
        report.missing = selection.missing;
        Ok(report)
    }

    /// Bring selected profiles up to date with every device and the
    /// current certificates of their type.
    ///
    /// A profile that is not expired and already has as many devices as it
    /// would get is skipped. App Store profiles never get devices.
    pub async fn regenerate_profiles<F>(
        &mut self,
        filter: &ProfileFilter,
        dry_run: bool,
        mut observe: F,
    ) -> Result<RegenerateReport, CoreError>
    where
        F: FnMut(RegenerateEvent<'_>),
    {
        let dev_certs = self
            .cert_requests_of_type(&[cert_types::IOS_DEVELOPMENT])
            .await?;
        let dist_certs = self
            .cert_requests_of_type(&[cert_types::IOS_DISTRIBUTION])
            .await?;
        let devices = self.all_devices().await?;
        let selection = self.select_profiles(filter).await?;
        for id in &selection.missing {
            warn!(id = %id, "profile not found");
            observe(RegenerateEvent::Missing(id));
        }

        let total = selection.selected.len();
        let mut report = RegenerateReport::default();

        for (index, profile) in selection.selected.iter().enumerate() {
            let kind = profile.classification();
            let target: &[Device] = if kind == ProfileType::AppStore {
                &[]
            } else {
                &devices
            };

            if !needs_regeneration(profile, target.len()) {
                observe(RegenerateEvent::Skipped(profile));
                report.skipped += 1;
                continue;
            }

            observe(RegenerateEvent::Regenerating {
                index,
                total,
                profile,
            });
            if !dry_run {
                let certs = if kind == ProfileType::Development {
                    &dev_certs
                } else {
                    &dist_certs
                };
                let overrides = ProfileOverrides {
                    certificates: Some(Identifier::Many(
                        certs.iter().cloned().map(Identifier::Raw).collect(),
                    )),
                    devices: Some(Identifier::Many(
                        target.iter().cloned().map(Identifier::Raw).collect(),
                    )),
                    ..ProfileOverrides::default()
                };
                let request = self.regenerate_request(profile, overrides).await?;
                self.client.regenerate_provisioning_profile(&request).await?;
            }
            report.regenerated += 1;
        }

        report.missing = selection.missing;
        info!(
            regenerated = report.regenerated,
            skipped = report.skipped,
            dry_run,
            "regeneration finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn profile(status: &str, kind: &str, device_count: u32) -> ProvisioningProfile {
        serde_json::from_value(json!({
            "provisioningProfileId": "P1",
            "name": "Example",
            "status": status,
            "type": kind,
            "deviceCount": device_count,
            "appId": { "appIdId": "A1", "identifier": "com.example.app" }
        }))
        .unwrap()
    }

    #[test]
    fn regeneration_rule() {
        assert!(!needs_regeneration(&profile("Active", "Development", 3), 3));
        assert!(needs_regeneration(&profile("Active", "Development", 2), 3));
        assert!(needs_regeneration(&profile("Expired", "Development", 3), 3));
        assert!(!needs_regeneration(&profile("Active", "Distribution", 0), 0));
    }

    #[test]
    fn patterns_ignore_case() {
        let re = filter_pattern("^iphone").unwrap();
        assert!(re.is_match("iPhone 15"));
        assert!(matches!(
            filter_pattern("("),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn profile_filter_combines_criteria() {
        let dev = profile("Active", "Development", 1);
        let filter = ProfileFilter {
            app_identifier: Some("com.example.app".into()),
            profile_type: Some(ProfileType::Development),
            ..ProfileFilter::default()
        };
        assert!(filter.selects_all());
        assert!(filter.matches(&dev));

        let adhoc_only = ProfileFilter {
            profile_type: Some(ProfileType::AdHoc),
            ..ProfileFilter::default()
        };
        assert!(!adhoc_only.matches(&dev));
    }

    #[test]
    fn empty_filter_selects_nothing_by_default() {
        assert!(!DeviceFilter::default().selects_all());
        assert!(
            DeviceFilter {
                include_all: true,
                ..DeviceFilter::default()
            }
            .selects_all()
        );
    }

    #[test]
    fn selection_keeps_misses_and_drops_filtered() {
        let leaves = vec![
            Resolution::Found(1),
            Resolution::Missing("x".to_string()),
            Resolution::Found(2),
        ];
        let selection = Selection::from_leaves(leaves, |n| *n > 1);
        assert_eq!(selection.selected, [2]);
        assert_eq!(selection.missing, ["x"]);
        assert!(!selection.is_complete());
    }
}
