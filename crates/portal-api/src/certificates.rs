// Certificate request endpoints

use crate::client::PortalClient;
use crate::error::Error;
use crate::models::{CertificateRequest, cert_types};

impl PortalClient {
    /// List certificate requests of every known type.
    ///
    /// `certificate/listCertRequests` with `certificateStatus=0` and the
    /// comma-joined type ids.
    pub async fn list_cert_requests(&self) -> Result<Vec<CertificateRequest>, Error> {
        let types = cert_types::ALL.join(",");
        self.fetch_list(
            "certificate/listCertRequests",
            &[("certificateStatus", "0"), ("types", &types)],
            "certRequests",
        )
        .await
    }
}
