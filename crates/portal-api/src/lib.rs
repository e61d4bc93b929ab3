// portal-api: Async client for the developer portal's private web+JSON API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod app_ids;
mod certificates;
mod devices;
mod profiles;

pub use auth::extract_login_post_url;
pub use client::{Endpoints, PortalClient, Session};
pub use error::{Error, LoginFailure, ServiceError};
pub use models::{
    AppId, CertificateRequest, Device, ProfileType, ProvisioningProfile, cert_types, is_udid,
};
pub use profiles::{CreateProfile, RegenerateProfile};
pub use transport::{Form, RawResponse, Transport, TransportConfig};
