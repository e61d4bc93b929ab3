// App id endpoints

use crate::client::PortalClient;
use crate::error::Error;
use crate::models::AppId;

impl PortalClient {
    /// List every app id on the team.
    pub async fn list_app_ids(&self) -> Result<Vec<AppId>, Error> {
        self.fetch_list("identifiers/listAppIds", &[], "appIds").await
    }
}
