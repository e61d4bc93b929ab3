//! Session, cache and resolution layer on top of `portal-api`.
//!
//! - **[`Portal`]**: Facade owning the logged-in client and the
//!   [`ResourceCache`]. Lists are fetched once and served as shared
//!   snapshots until [`invalidate_all`](Portal::invalidate_all).
//!
//! - **[`Identifier<T>`]**: What callers hand in: a record, an id string or
//!   a list of either. [`resolve_in`] maps it to a [`Resolution<T>`].
//!
//! - **Mutators**: Device add/delete/enable, profile create/update/delete
//!   and download, plus filtered batch variants in [`batch`].

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod identifier;
pub mod portal;
pub mod profile_type;

pub use batch::{
    BatchEvent, BatchReport, DeviceFilter, ProfileFilter, RegenerateEvent, RegenerateReport,
    Selection, filter_pattern, needs_regeneration,
};
pub use cache::ResourceCache;
pub use config::{Credentials, PortalConfig};
pub use error::CoreError;
pub use identifier::{
    AppIdKey, DeviceKey, Identifier, OnMissing, Resolution, Resource, resolve_in, unwrap_ids,
};
pub use portal::{NewProfile, Portal, ProfileOverrides, ProfileSink};
pub use profile_type::{profile_type, profile_type_at, profile_type_name};

// Record types callers work with directly.
pub use portal_api::{
    AppId, CertificateRequest, Device, Endpoints, LoginFailure, ProfileType, ProvisioningProfile,
    ServiceError, Session, cert_types, is_udid,
};
