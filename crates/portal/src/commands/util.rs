//! Shared helpers for command handlers.

use std::path::{Path, PathBuf};

use portal_core::{
    BatchReport, DeviceFilter, ProfileFilter, ProvisioningProfile, filter_pattern, profile_type,
};

use crate::cli::{DeviceFilterArgs, ProfileFilterArgs};
use crate::error::CliError;

/// Translate device filter flags. `include_all` selects every device when
/// no id or pattern narrows the set.
pub fn device_filter(args: &DeviceFilterArgs, include_all: bool) -> Result<DeviceFilter, CliError> {
    Ok(DeviceFilter {
        ids: args.ids.clone(),
        name: args.name.as_deref().map(filter_pattern).transpose()?,
        udid: args.udid.as_deref().map(filter_pattern).transpose()?,
        include_all,
    })
}

/// Translate profile filter flags plus explicit ids.
pub fn profile_filter(
    args: &ProfileFilterArgs,
    ids: &[String],
    include_all: bool,
) -> Result<ProfileFilter, CliError> {
    Ok(ProfileFilter {
        ids: ids.to_vec(),
        name: args.name.as_deref().map(filter_pattern).transpose()?,
        app_identifier: args.app_id.clone(),
        profile_type: args.profile_type.as_deref().map(profile_type).transpose()?,
        include_all,
    })
}

/// `<out>/<bundle id>/<type>.mobileprovision`, or `<out>/<type>.mobileprovision`
/// for the wildcard app id.
pub fn profile_path(out: &Path, profile: &ProvisioningProfile) -> PathBuf {
    let file = format!("{}.mobileprovision", profile.classification());
    if profile.app_id.is_wildcard() || profile.app_id.identifier.is_empty() {
        out.join(file)
    } else {
        out.join(&profile.app_id.identifier).join(file)
    }
}

/// Fail with exit code 1 when any requested id was not found.
pub fn finish(missing: usize) -> Result<(), CliError> {
    if missing == 0 {
        Ok(())
    } else {
        Err(CliError::Incomplete { count: missing })
    }
}

pub fn finish_batch(report: &BatchReport) -> Result<(), CliError> {
    finish(report.missing.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile(identifier: &str, kind: &str, devices: u32) -> ProvisioningProfile {
        serde_json::from_value(json!({
            "provisioningProfileId": "P1",
            "name": "Example",
            "type": kind,
            "deviceCount": devices,
            "appId": { "appIdId": "A1", "identifier": identifier }
        }))
        .unwrap()
    }

    #[test]
    fn profile_paths_nest_by_bundle_id() {
        let out = Path::new("/tmp/profiles");
        assert_eq!(
            profile_path(out, &profile("com.example.app", "Distribution", 3)),
            Path::new("/tmp/profiles/com.example.app/adhoc.mobileprovision")
        );
        assert_eq!(
            profile_path(out, &profile("*", "Development", 3)),
            Path::new("/tmp/profiles/development.mobileprovision")
        );
        assert_eq!(
            profile_path(out, &profile("com.example.app", "Distribution", 0)),
            Path::new("/tmp/profiles/com.example.app/appstore.mobileprovision")
        );
    }

    #[test]
    fn bad_type_token_is_rejected() {
        let args = ProfileFilterArgs {
            profile_type: Some("7".into()),
            app_id: None,
            name: None,
        };
        assert!(matches!(
            profile_filter(&args, &[], true),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn missing_ids_fail_the_command() {
        assert!(finish(0).is_ok());
        assert!(matches!(finish(2), Err(CliError::Incomplete { count: 2 })));
    }
}
