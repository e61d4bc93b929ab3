// Device endpoints
//
// Listing plus the three device mutations. The mutations return the raw
// envelope; the backend's echo of the changed device is not modelled.

use serde_json::{Map, Value};
use tracing::info;

use crate::client::PortalClient;
use crate::error::Error;
use crate::models::Device;
use crate::transport::Form;

impl PortalClient {
    /// List registered devices, optionally including removed ones.
    pub async fn list_devices(&self, include_removed: bool) -> Result<Vec<Device>, Error> {
        let include = if include_removed { "true" } else { "false" };
        self.fetch_list(
            "device/listDevices",
            &[("includeRemovedDevices", include)],
            "devices",
        )
        .await
    }

    /// Register a single device.
    pub async fn add_device(&self, udid: &str, name: &str) -> Result<Map<String, Value>, Error> {
        let form = Form::new()
            .with("deviceNames", name)
            .with("deviceNumbers", udid)
            .with("register", "single");
        let payload = self.call("device/addDevices", &form, &[]).await?;
        info!(udid, name, "device added");
        Ok(payload)
    }

    /// Remove a device by its `deviceId`.
    pub async fn delete_device(&self, device_id: &str) -> Result<Map<String, Value>, Error> {
        let form = Form::new().with("deviceId", device_id);
        let payload = self.call("device/deleteDevice", &form, &[]).await?;
        info!(device_id, "device deleted");
        Ok(payload)
    }

    /// Re-enable a previously removed device.
    pub async fn enable_device(
        &self,
        device_id: &str,
        device_number: &str,
    ) -> Result<Map<String, Value>, Error> {
        let form = Form::new()
            .with("displayId", device_id)
            .with("deviceNumber", device_number);
        let payload = self.call("device/enableDevice", &form, &[]).await?;
        info!(device_id, "device enabled");
        Ok(payload)
    }
}
