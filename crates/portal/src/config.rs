//! Bridges global CLI flags to `portal-config` resolution.

use std::time::Duration;

use portal_config::{CredentialSources, portal_config};
use portal_core::PortalConfig;
use url::Url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the client configuration from the environment, `.portalrc` files
/// and global flags.
pub fn build_portal_config(global: &GlobalOpts) -> Result<PortalConfig, CliError> {
    let sources = CredentialSources::from_env().with_environment(global.environment.clone());

    let base_url = global
        .base_url
        .as_deref()
        .map(|raw| {
            Url::parse(raw).map_err(|e| CliError::Validation {
                field: "base-url".into(),
                reason: format!("invalid URL '{raw}': {e}"),
            })
        })
        .transpose()?;

    Ok(portal_config(
        &sources,
        Some(Duration::from_secs(global.timeout)),
        base_url.as_ref(),
    )?)
}
