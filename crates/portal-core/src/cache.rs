// ── Resource cache ──
//
// One explicit slot per resource kind. A slot is filled by a single list
// call on first read and replaced wholesale; readers get a shared,
// immutable snapshot.

use std::future::Future;
use std::sync::Arc;

use portal_api::{AppId, CertificateRequest, Device, ProvisioningProfile};
use tracing::debug;

/// Lazily filled snapshot of one collection.
#[derive(Debug)]
pub struct Slot<T> {
    snapshot: Option<Arc<[T]>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self { snapshot: None }
    }
}

impl<T> Slot<T> {
    pub fn is_filled(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    /// Return the snapshot, running `fetch` only when the slot is empty.
    ///
    /// A failed fetch leaves the slot empty.
    pub async fn get_or_fetch<F, E>(&mut self, fetch: F) -> Result<Arc<[T]>, E>
    where
        F: Future<Output = Result<Vec<T>, E>>,
    {
        if let Some(snapshot) = &self.snapshot {
            return Ok(Arc::clone(snapshot));
        }
        let fresh: Arc<[T]> = fetch.await?.into();
        self.snapshot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }
}

/// The four cached collections.
#[derive(Debug, Default)]
pub struct ResourceCache {
    pub cert_requests: Slot<CertificateRequest>,
    pub app_ids: Slot<AppId>,
    pub devices: Slot<Device>,
    pub profiles: Slot<ProvisioningProfile>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every snapshot; the next read of any kind refetches.
    pub fn invalidate_all(&mut self) {
        debug!("invalidating resource cache");
        self.cert_requests.clear();
        self.app_ids.clear();
        self.devices.clear();
        self.profiles.clear();
    }
}
