// ── Portal facade ──
//
// Owns the authenticated client and the resource cache. Every method that
// may touch the cache takes `&mut self`; a `Portal` is used by one task at
// a time and shared only behind a caller-provided mutex.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use portal_api::{
    AppId, CertificateRequest, CreateProfile, Device, PortalClient, ProfileType,
    ProvisioningProfile, RegenerateProfile, Session, is_udid,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cache::ResourceCache;
use crate::config::PortalConfig;
use crate::error::CoreError;
use crate::identifier::{Identifier, OnMissing, Resolution, Resource, resolve_in, unwrap_ids};
use crate::profile_type::profile_type_at;

// ── Mutator inputs ───────────────────────────────────────────────────

/// Input for [`Portal::create_provisioning_profile`].
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// Index into `[development, adhoc, appstore]`.
    pub profile_type: usize,
    pub app_id: Identifier<AppId>,
    /// Defaults to every certificate request of the matching type.
    pub certificates: Option<Identifier<CertificateRequest>>,
    /// Defaults to every device, or none for an App Store profile.
    pub devices: Option<Identifier<Device>>,
    /// Defaults to `<bundle id> <type>`.
    pub name: Option<String>,
}

impl NewProfile {
    pub fn new(profile_type: usize, app_id: impl Into<Identifier<AppId>>) -> Self {
        Self {
            profile_type,
            app_id: app_id.into(),
            certificates: None,
            devices: None,
            name: None,
        }
    }

    pub fn with_certificates(mut self, certificates: Identifier<CertificateRequest>) -> Self {
        self.certificates = Some(certificates);
        self
    }

    pub fn with_devices(mut self, devices: Identifier<Device>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Optional replacements for [`Portal::update_provisioning_profile`].
///
/// Unset or empty fields keep the profile's value, except `devices`: an
/// explicit empty list clears the profile's devices.
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub name: Option<String>,
    pub app_id: Option<Identifier<AppId>>,
    pub certificates: Option<Identifier<CertificateRequest>>,
    pub devices: Option<Identifier<Device>>,
    /// Backend distribution label; defaults to the profile's
    /// `distributionMethod`.
    pub distribution_type: Option<String>,
}

/// Where a downloaded profile goes.
pub enum ProfileSink<'a> {
    /// A file; missing parent directories are created.
    Path(&'a Path),
    Writer(&'a mut (dyn Write + Send)),
}

// ── Portal ───────────────────────────────────────────────────────────

/// Authenticated session plus cached collections.
#[derive(Debug)]
pub struct Portal {
    pub(crate) client: PortalClient,
    pub(crate) cache: ResourceCache,
}

impl Portal {
    /// Wrap a client. It must be logged in before any call is made.
    pub fn new(client: PortalClient) -> Self {
        Self {
            client,
            cache: ResourceCache::new(),
        }
    }

    /// Build a client from `config` and run the login flow.
    pub async fn connect(config: &PortalConfig) -> Result<Self, CoreError> {
        let mut client = PortalClient::new(config.endpoints.clone(), &config.transport())?;
        client
            .login(&config.credentials.user, &config.credentials.password)
            .await?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &PortalClient {
        &self.client
    }

    pub fn session(&self) -> Result<&Session, CoreError> {
        self.client.session().ok_or(CoreError::NotAuthenticated)
    }

    /// `<account> (<team id>)`.
    pub fn whoami(&self) -> Result<String, CoreError> {
        let session = self.session()?;
        Ok(format!("{} ({})", session.account_name(), session.team_id()))
    }

    // ── Cached collections ───────────────────────────────────────────

    pub async fn all_cert_requests(&mut self) -> Result<Arc<[CertificateRequest]>, CoreError> {
        Ok(self
            .cache
            .cert_requests
            .get_or_fetch(self.client.list_cert_requests())
            .await?)
    }

    pub async fn all_app_ids(&mut self) -> Result<Arc<[AppId]>, CoreError> {
        Ok(self
            .cache
            .app_ids
            .get_or_fetch(self.client.list_app_ids())
            .await?)
    }

    /// Every device, removed ones included.
    pub async fn all_devices(&mut self) -> Result<Arc<[Device]>, CoreError> {
        Ok(self
            .cache
            .devices
            .get_or_fetch(self.client.list_devices(true))
            .await?)
    }

    /// Every profile, inactive ones included.
    pub async fn all_provisioning_profiles(
        &mut self,
    ) -> Result<Arc<[ProvisioningProfile]>, CoreError> {
        Ok(self
            .cache
            .profiles
            .get_or_fetch(self.client.list_provisioning_profiles())
            .await?)
    }

    /// Forget every cached collection.
    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    /// Cached certificate requests whose type id is one of `types`.
    pub async fn cert_requests_of_type(
        &mut self,
        types: &[&str],
    ) -> Result<Vec<CertificateRequest>, CoreError> {
        let all = self.all_cert_requests().await?;
        Ok(all
            .iter()
            .filter(|c| types.contains(&c.certificate_type_display_id.as_str()))
            .cloned()
            .collect())
    }

    // ── Resolution ───────────────────────────────────────────────────

    pub async fn resolve_device(
        &mut self,
        identifier: &Identifier<Device>,
        on_missing: OnMissing,
    ) -> Result<Resolution<Device>, CoreError> {
        let devices = if identifier.needs_lookup() {
            self.all_devices().await?
        } else {
            Arc::from([])
        };
        Ok(resolve_in(&devices, identifier, on_missing))
    }

    pub async fn resolve_app_id(
        &mut self,
        identifier: &Identifier<AppId>,
        on_missing: OnMissing,
    ) -> Result<Resolution<AppId>, CoreError> {
        let apps = if identifier.needs_lookup() {
            self.all_app_ids().await?
        } else {
            Arc::from([])
        };
        Ok(resolve_in(&apps, identifier, on_missing))
    }

    pub async fn resolve_profile(
        &mut self,
        identifier: &Identifier<ProvisioningProfile>,
        on_missing: OnMissing,
    ) -> Result<Resolution<ProvisioningProfile>, CoreError> {
        let profiles = if identifier.needs_lookup() {
            self.all_provisioning_profiles().await?
        } else {
            Arc::from([])
        };
        Ok(resolve_in(&profiles, identifier, on_missing))
    }

    pub async fn resolve_cert_request(
        &mut self,
        identifier: &Identifier<CertificateRequest>,
        on_missing: OnMissing,
    ) -> Result<Resolution<CertificateRequest>, CoreError> {
        let certs = if identifier.needs_lookup() {
            self.all_cert_requests().await?
        } else {
            Arc::from([])
        };
        Ok(resolve_in(&certs, identifier, on_missing))
    }

    // ── Device mutators ──────────────────────────────────────────────

    /// Register a device. The name defaults to the UDID.
    pub async fn add_device(
        &self,
        udid: &str,
        name: Option<&str>,
    ) -> Result<Map<String, Value>, CoreError> {
        if !is_udid(udid) {
            return Err(CoreError::invalid(format!(
                "'{udid}' is not a device UDID (40 hex digits)"
            )));
        }
        Ok(self.client.add_device(udid, name.unwrap_or(udid)).await?)
    }

    /// Remove one device. Returns the device that was removed.
    pub async fn delete_device(&mut self, input: &Identifier<Device>) -> Result<Device, CoreError> {
        let device = self.resolve_single_device(input).await?;
        self.client.delete_device(&device.device_id).await?;
        Ok(device)
    }

    /// Re-enable one removed device. Returns the device.
    pub async fn enable_device(&mut self, input: &Identifier<Device>) -> Result<Device, CoreError> {
        let device = self.resolve_single_device(input).await?;
        self.client
            .enable_device(&device.device_id, &device.device_number)
            .await?;
        Ok(device)
    }

    async fn resolve_single_device(
        &mut self,
        input: &Identifier<Device>,
    ) -> Result<Device, CoreError> {
        let resolution = self.resolve_device(input, OnMissing::Absent).await?;
        single(resolution, input)
    }

    // ── Profile mutators ─────────────────────────────────────────────

    pub async fn create_provisioning_profile(
        &mut self,
        request: NewProfile,
    ) -> Result<Map<String, Value>, CoreError> {
        let kind = profile_type_at(request.profile_type)?;
        let (app_id_id, app_label) = self.unwrap_app_id(&request.app_id).await?;

        let certificate_ids = match &request.certificates {
            Some(certificates) => {
                let certs = self.lookup_certs(certificates).await?;
                unwrap_ids(&certs, certificates)
            }
            None => self
                .cert_requests_of_type(&[kind.certificate_type()])
                .await?
                .iter()
                .map(|c| c.certificate_id.clone())
                .collect(),
        };

        let device_ids = match &request.devices {
            Some(devices) => {
                let all = self.lookup_devices(devices).await?;
                unwrap_ids(&all, devices)
            }
            None if kind == ProfileType::AppStore => Vec::new(),
            None => self
                .all_devices()
                .await?
                .iter()
                .map(|d| d.device_id.clone())
                .collect(),
        };

        let name = request
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{app_label} {kind}"));

        debug!(
            %kind,
            app_id = %app_id_id,
            certificates = certificate_ids.len(),
            devices = device_ids.len(),
            "creating profile"
        );
        let create = CreateProfile {
            profile_type: kind,
            name,
            app_id_id,
            certificate_ids,
            device_ids,
        };
        Ok(self.client.create_provisioning_profile(&create).await?)
    }

    /// Regenerate a profile, keeping every value not overridden.
    pub async fn update_provisioning_profile(
        &mut self,
        profile: &Identifier<ProvisioningProfile>,
        overrides: ProfileOverrides,
    ) -> Result<Map<String, Value>, CoreError> {
        let resolution = self.resolve_profile(profile, OnMissing::Absent).await?;
        let profile = single(resolution, profile)?;
        let request = self.regenerate_request(&profile, overrides).await?;
        Ok(self.client.regenerate_provisioning_profile(&request).await?)
    }

    pub(crate) async fn regenerate_request(
        &mut self,
        profile: &ProvisioningProfile,
        overrides: ProfileOverrides,
    ) -> Result<RegenerateProfile, CoreError> {
        let mut request = RegenerateProfile::from_profile(profile);

        if let Some(name) = overrides.name.filter(|n| !n.is_empty()) {
            request.name = name;
        }
        if let Some(label) = overrides.distribution_type.filter(|d| !d.is_empty()) {
            request.distribution_type = label;
        }
        if let Some(app_id) = overrides.app_id {
            request.app_id_id = self.unwrap_app_id(&app_id).await?.0;
        }
        if let Some(certificates) = overrides.certificates {
            let certs = self.lookup_certs(&certificates).await?;
            let ids = unwrap_ids(&certs, &certificates);
            if !ids.is_empty() {
                request.certificate_ids = ids;
            }
        }
        if let Some(devices) = overrides.devices {
            let all = self.lookup_devices(&devices).await?;
            request.device_ids = unwrap_ids(&all, &devices);
        }
        Ok(request)
    }

    /// Delete a profile by record or id. Returns the id sent.
    pub async fn delete_provisioning_profile(
        &self,
        input: &Identifier<ProvisioningProfile>,
    ) -> Result<String, CoreError> {
        let id = bare_id(input)?;
        self.client.delete_provisioning_profile(&id).await?;
        Ok(id)
    }

    /// Download a profile's payload into `sink`. Returns the byte count.
    ///
    /// Nothing is written unless the download succeeds.
    pub async fn download_profile(
        &self,
        input: &Identifier<ProvisioningProfile>,
        sink: ProfileSink<'_>,
    ) -> Result<usize, CoreError> {
        let id = bare_id(input)?;
        let bytes = self.client.download_profile(&id).await?;
        match sink {
            ProfileSink::Path(path) => write_profile_file(path, &bytes)?,
            ProfileSink::Writer(writer) => {
                writer.write_all(&bytes)?;
                writer.flush()?;
            }
        }
        info!(id = %id, len = bytes.len(), "profile saved");
        Ok(bytes.len())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// `(appIdId, display label)` for a single app id reference. Unknown
    /// ids pass through unchanged.
    async fn unwrap_app_id(
        &mut self,
        input: &Identifier<AppId>,
    ) -> Result<(String, String), CoreError> {
        match self.resolve_app_id(input, OnMissing::ReturnId).await? {
            Resolution::Found(app) => {
                let label = if app.identifier.is_empty() {
                    app.app_id_id.clone()
                } else {
                    app.identifier.clone()
                };
                Ok((app.app_id_id, label))
            }
            Resolution::Missing(id) => Ok((id.clone(), id)),
            Resolution::Absent | Resolution::Many(_) => Err(CoreError::invalid(
                "a profile takes exactly one app id",
            )),
        }
    }

    async fn lookup_certs(
        &mut self,
        input: &Identifier<CertificateRequest>,
    ) -> Result<Arc<[CertificateRequest]>, CoreError> {
        if input.needs_lookup() {
            self.all_cert_requests().await
        } else {
            Ok(Arc::from([]))
        }
    }

    async fn lookup_devices(
        &mut self,
        input: &Identifier<Device>,
    ) -> Result<Arc<[Device]>, CoreError> {
        if input.needs_lookup() {
            self.all_devices().await
        } else {
            Ok(Arc::from([]))
        }
    }
}

/// The single record a resolution produced, or a not-found error naming
/// the input.
fn single<T: Resource>(resolution: Resolution<T>, input: &Identifier<T>) -> Result<T, CoreError> {
    match resolution {
        Resolution::Found(record) => Ok(record),
        Resolution::Missing(_) | Resolution::Absent => {
            Err(CoreError::not_found(T::KIND, input.label()))
        }
        Resolution::Many(_) => Err(CoreError::invalid(format!(
            "expected a single {}, got a list",
            T::KIND
        ))),
    }
}

/// Unwrap a single reference without consulting the cache.
fn bare_id<T: Resource>(input: &Identifier<T>) -> Result<String, CoreError> {
    match input {
        Identifier::Raw(record) => Ok(record.primary_id().to_owned()),
        Identifier::ById(id) => Ok(id.clone()),
        Identifier::Many(_) => Err(CoreError::invalid(format!(
            "expected a single {}, got a list",
            T::KIND
        ))),
    }
}

fn write_profile_file(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let output_error = |target: &Path, reason: String| CoreError::Output {
        path: target.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if parent.exists() && !parent.is_dir() {
            return Err(output_error(parent, "not a directory".into()));
        }
        fs::create_dir_all(parent).map_err(|e| output_error(parent, e.to_string()))?;
    }
    fs::write(path, bytes).map_err(|e| output_error(path, e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_rejects_lists() {
        let id: Identifier<ProvisioningProfile> = Identifier::ids(["P1", "P2"]);
        assert!(matches!(
            bare_id(&id),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert_eq!(bare_id(&Identifier::<ProvisioningProfile>::from("P1")).unwrap(), "P1");
    }

    #[test]
    fn profile_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("com.example.app").join("adhoc.mobileprovision");
        write_profile_file(&target, b"blob").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"blob");
    }

    #[test]
    fn profile_file_rejects_file_parent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, b"x").unwrap();
        let err = write_profile_file(&blocker.join("p.mobileprovision"), b"blob").unwrap_err();
        assert!(matches!(err, CoreError::Output { .. }), "{err:?}");
    }
}
