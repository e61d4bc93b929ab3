// Provisioning profile endpoints
//
// Create and regenerate encode their id lists differently: create sends
// bracketed comma-joined literals (plus one `devices` pair per device),
// regenerate sends one pair per id. The backend accepts nothing else.

use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::{PortalClient, http_status};
use crate::error::Error;
use crate::models::{ProfileType, ProvisioningProfile};
use crate::transport::Form;

/// Fully resolved input for `profile/createProvisioningProfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProfile {
    pub profile_type: ProfileType,
    pub name: String,
    pub app_id_id: String,
    pub certificate_ids: Vec<String>,
    pub device_ids: Vec<String>,
}

impl CreateProfile {
    pub fn to_form(&self) -> Form {
        let mut form = Form::new()
            .with("distributionType", self.profile_type.distribution_type())
            .with("returnFullObjects", "false")
            .with("provisioningProfileName", self.name.as_str())
            .with("appIdId", self.app_id_id.as_str())
            .with("certificateIds", bracketed(&self.certificate_ids))
            .with("deviceIds", bracketed(&self.device_ids));
        for id in &self.device_ids {
            form.push("devices", id.as_str());
        }
        form
    }
}

/// Fully resolved input for `profile/regenProvisioningProfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateProfile {
    pub provisioning_profile_id: String,
    /// Backend distribution label, normally the profile's own
    /// `distributionMethod`.
    pub distribution_type: String,
    pub name: String,
    pub app_id_id: String,
    pub certificate_ids: Vec<String>,
    pub device_ids: Vec<String>,
}

impl RegenerateProfile {
    /// Start from a profile's current values.
    pub fn from_profile(profile: &ProvisioningProfile) -> Self {
        Self {
            provisioning_profile_id: profile.provisioning_profile_id.clone(),
            distribution_type: profile.distribution_method.clone(),
            name: profile.name.clone(),
            app_id_id: profile.app_id.app_id_id.clone(),
            certificate_ids: profile.certificate_ids.clone(),
            device_ids: profile.device_ids.clone(),
        }
    }

    pub fn to_form(&self) -> Form {
        let mut form = Form::new()
            .with("provisioningProfileId", self.provisioning_profile_id.as_str())
            .with("distributionType", self.distribution_type.as_str())
            .with("returnFullObjects", "false")
            .with("provisioningProfileName", self.name.as_str())
            .with("appIdId", self.app_id_id.as_str());
        for id in &self.certificate_ids {
            form.push("certificateIds", id.as_str());
        }
        for id in &self.device_ids {
            form.push("deviceIds", id.as_str());
        }
        form
    }
}

fn bracketed(ids: &[String]) -> String {
    format!("[{}]", ids.join(","))
}

impl PortalClient {
    /// List profiles, inactive ones included.
    pub async fn list_provisioning_profiles(&self) -> Result<Vec<ProvisioningProfile>, Error> {
        self.fetch_list(
            "profile/listProvisioningProfiles",
            &[
                ("includeInactiveProfiles", "true"),
                ("onlyCountLists", "true"),
            ],
            "provisioningProfiles",
        )
        .await
    }

    pub async fn create_provisioning_profile(
        &self,
        request: &CreateProfile,
    ) -> Result<Map<String, Value>, Error> {
        let payload = self
            .call("profile/createProvisioningProfile", &request.to_form(), &[])
            .await?;
        info!(name = %request.name, kind = %request.profile_type, "profile created");
        Ok(payload)
    }

    pub async fn regenerate_provisioning_profile(
        &self,
        request: &RegenerateProfile,
    ) -> Result<Map<String, Value>, Error> {
        let payload = self
            .call("profile/regenProvisioningProfile", &request.to_form(), &[])
            .await?;
        info!(id = %request.provisioning_profile_id, "profile regenerated");
        Ok(payload)
    }

    pub async fn delete_provisioning_profile(
        &self,
        profile_id: &str,
    ) -> Result<Map<String, Value>, Error> {
        let form = Form::new().with("provisioningProfileId", profile_id);
        let payload = self
            .call("profile/deleteProvisioningProfile", &form, &[])
            .await?;
        info!(id = profile_id, "profile deleted");
        Ok(payload)
    }

    /// Fetch a profile's payload. Unsigned; relies on the session cookie.
    ///
    /// A 404 maps to [`Error::NotFound`] carrying the id.
    pub async fn download_profile(&self, profile_id: &str) -> Result<Bytes, Error> {
        let url = self.endpoints().download_url(profile_id)?;
        let resp = self.transport().open(url, None).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                id: profile_id.to_owned(),
            });
        }
        if !resp.is_ok() {
            return Err(http_status(&resp));
        }
        debug!(id = profile_id, len = resp.body.len(), "profile downloaded");
        Ok(resp.body)
    }
}
