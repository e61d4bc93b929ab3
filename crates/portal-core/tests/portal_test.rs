#![allow(clippy::unwrap_used)]
// Integration tests for `Portal` (cache, resolver, mutators, batches)
// against a wiremock portal.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portal_core::{
    BatchEvent, CoreError, Credentials, DeviceFilter, Endpoints, Identifier, NewProfile, OnMissing,
    Portal, PortalConfig, ProfileFilter, ProfileOverrides, ProfileSink, RegenerateEvent,
};

const SERVICES: &str = "/services-developerportal/QH65B2/account/ios";
const UDID_1: &str = "0123456789abcdef0123456789abcdef01234567";
const UDID_2: &str = "89abcdef0123456789abcdef0123456789abcdef";

// ── Helpers ─────────────────────────────────────────────────────────

fn service_path(command: &str) -> String {
    format!("{SERVICES}/{command}")
}

async fn connect() -> (MockServer, Portal) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/account/login.action"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form name="appleConnectForm" action="/auth/signin"></form>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/ios/certificate/certificateList.action"))
        .respond_with(ResponseTemplate::new(200).set_body_string("?teamId=TEAM42\""))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let config = PortalConfig::new(Credentials::new("dev@example.com", "hunter2"))
        .with_endpoints(Endpoints::rooted_at(&base).unwrap())
        .with_timeout(Duration::from_secs(5));
    let portal = Portal::connect(&config).await.unwrap();
    (server, portal)
}

async fn mount_list(server: &MockServer, command: &str, key: &str, items: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path(service_path(command)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCode": 0,
            key: items,
        })))
        .expect(calls)
        .mount(server)
        .await;
}

fn devices() -> Value {
    json!([
        { "deviceId": "D1", "deviceNumber": UDID_1, "name": "Dev iPhone", "status": "c" },
        { "deviceId": "D2", "deviceNumber": UDID_2, "name": "QA iPad", "status": "c" }
    ])
}

fn cert_requests() -> Value {
    json!([
        { "certificateId": "c1", "certificateTypeDisplayId": "5QPB9NHCEI", "name": "Dev A" },
        { "certificateId": "c2", "certificateTypeDisplayId": "5QPB9NHCEI", "name": "Dev B" },
        { "certificateId": "DIST1", "certificateTypeDisplayId": "R58UK2EWSO", "name": "Dist" },
        { "certificateId": "APN1", "certificateTypeDisplayId": "BKLRAVXMGM", "name": "Push" }
    ])
}

fn profiles() -> Value {
    json!([
        {
            "provisioningProfileId": "P1", "name": "App Dev", "status": "Active",
            "type": "Development", "deviceCount": 2, "distributionMethod": "limited",
            "deviceIds": ["D1", "D2"], "certificateIds": ["c1"],
            "appId": { "appIdId": "A1", "identifier": "com.example.app", "name": "App" }
        },
        {
            "provisioningProfileId": "P2", "name": "App AdHoc", "status": "Expired",
            "type": "Distribution", "deviceCount": 1, "distributionMethod": "adhoc",
            "deviceIds": ["D1"], "certificateIds": ["OLD"],
            "appId": { "appIdId": "A1", "identifier": "com.example.app", "name": "App" }
        },
        {
            "provisioningProfileId": "P3", "name": "App Store", "status": "Active",
            "type": "Distribution", "deviceCount": 0, "distributionMethod": "store",
            "appId": { "appIdId": "A2", "identifier": "*", "name": "Wildcard" }
        }
    ])
}

async fn request_bodies(server: &MockServer, command: &str) -> Vec<String> {
    let wanted = service_path(command);
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == wanted)
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_whoami() {
    let (_server, portal) = connect().await;
    assert_eq!(portal.whoami().unwrap(), "dev@example.com (TEAM42)");
}

// ── Cache ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_collections_fetch_once() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;

    let first = portal.all_devices().await.unwrap();
    let second = portal.all_devices().await.unwrap();
    let by_udid = portal
        .resolve_device(&UDID_2.to_uppercase().into(), OnMissing::Absent)
        .await
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(by_udid.found().unwrap().device_id, "D2");
}

#[tokio::test]
async fn test_invalidate_triggers_one_refetch() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 2).await;

    portal.all_devices().await.unwrap();
    portal.all_devices().await.unwrap();
    portal.invalidate_all();
    portal.all_devices().await.unwrap();
    portal.all_devices().await.unwrap();
}

#[tokio::test]
async fn test_cert_requests_of_type() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "certificate/listCertRequests", "certRequests", cert_requests(), 1)
        .await;

    let ios = portal
        .cert_requests_of_type(&portal_core::cert_types::IOS)
        .await
        .unwrap();
    let ids: Vec<_> = ios.iter().map(|c| c.certificate_id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2", "DIST1"]);
}

#[tokio::test]
async fn test_raw_identifiers_skip_the_fetch() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 0).await;

    let raw: portal_core::Device =
        serde_json::from_value(json!({ "deviceId": "DX", "deviceNumber": UDID_1 })).unwrap();
    let resolved = portal
        .resolve_device(&Identifier::Raw(raw.clone()), OnMissing::Absent)
        .await
        .unwrap();
    assert_eq!(resolved.found().unwrap(), raw);
}

// ── Device mutators ─────────────────────────────────────────────────

#[tokio::test]
async fn test_add_device_rejects_non_udid() {
    let (server, portal) = connect().await;
    Mock::given(method("POST"))
        .and(path(service_path("device/addDevices")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(0)
        .mount(&server)
        .await;

    let err = portal.add_device("not-a-udid", None).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument { .. }), "{err:?}");
}

#[tokio::test]
async fn test_add_device_defaults_name_to_udid() {
    let (server, portal) = connect().await;
    Mock::given(method("POST"))
        .and(path(service_path("device/addDevices")))
        .and(body_string_contains(format!("deviceNames={UDID_1}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    portal.add_device(UDID_1, None).await.unwrap();
}

#[tokio::test]
async fn test_enable_device_by_udid() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;
    Mock::given(method("POST"))
        .and(path(service_path("device/enableDevice")))
        .and(body_string_contains(format!(
            "displayId=D1&deviceNumber={UDID_1}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let device = portal.enable_device(&UDID_1.into()).await.unwrap();
    assert_eq!(device.name, "Dev iPhone");
}

#[tokio::test]
async fn test_delete_unknown_device_is_not_found() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;

    let err = portal.delete_device(&"D404".into()).await.unwrap_err();
    match err {
        CoreError::NotFound { kind, identifier } => {
            assert_eq!(kind, "Device");
            assert_eq!(identifier, "D404");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// ── Profile mutators ────────────────────────────────────────────────

#[tokio::test]
async fn test_create_profile_defaults_to_development_certs() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "certificate/listCertRequests", "certRequests", cert_requests(), 1)
        .await;
    mount_list(
        &server,
        "identifiers/listAppIds",
        "appIds",
        json!([{ "appIdId": "A1", "identifier": "com.example.app", "name": "App" }]),
        1,
    )
    .await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;

    Mock::given(method("POST"))
        .and(path(service_path("profile/createProvisioningProfile")))
        .and(body_string_contains(
            "distributionType=limited&returnFullObjects=false\
             &provisioningProfileName=com.example.app+development&appIdId=A1",
        ))
        .and(body_string_contains("certificateIds=%5Bc1%2Cc2%5D"))
        .and(body_string_contains(
            "deviceIds=%5BD1%2CD2%5D&devices=D1&devices=D2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    portal
        .create_provisioning_profile(NewProfile::new(0, "com.example.app"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_appstore_profile_has_no_devices() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "certificate/listCertRequests", "certRequests", cert_requests(), 1)
        .await;
    mount_list(&server, "device/listDevices", "devices", devices(), 0).await;

    Mock::given(method("POST"))
        .and(path(service_path("profile/createProvisioningProfile")))
        .and(body_string_contains("distributionType=store"))
        .and(body_string_contains("provisioningProfileName=Shop"))
        .and(body_string_contains("certificateIds=%5BDIST1%5D&deviceIds=%5B%5D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    // A record needs no app id lookup.
    let app = serde_json::from_value(json!({ "appIdId": "A7", "identifier": "com.x" })).unwrap();
    portal
        .create_provisioning_profile(NewProfile::new(2, Identifier::Raw(app)).with_name("Shop"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_profile_rejects_bad_type() {
    let (_server, mut portal) = connect().await;
    let err = portal
        .create_provisioning_profile(NewProfile::new(3, "A1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument { .. }), "{err:?}");
}

#[tokio::test]
async fn test_update_profile_keeps_values_and_honours_empty_devices() {
    let (server, mut portal) = connect().await;
    mount_list(
        &server,
        "profile/listProvisioningProfiles",
        "provisioningProfiles",
        profiles(),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path(service_path("profile/regenProvisioningProfile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = ProfileOverrides {
        name: Some("Renamed".into()),
        certificates: Some(Identifier::Many(Vec::new())),
        devices: Some(Identifier::Many(Vec::new())),
        ..ProfileOverrides::default()
    };
    portal
        .update_provisioning_profile(&"P1".into(), overrides)
        .await
        .unwrap();

    let bodies = request_bodies(&server, "profile/regenProvisioningProfile").await;
    assert_eq!(
        bodies,
        ["provisioningProfileId=P1&distributionType=limited&returnFullObjects=false\
          &provisioningProfileName=Renamed&appIdId=A1&certificateIds=c1"]
    );
}

#[tokio::test]
async fn test_delete_profile_by_id() {
    let (server, portal) = connect().await;
    Mock::given(method("POST"))
        .and(path(service_path("profile/deleteProvisioningProfile")))
        .and(body_string_contains("provisioningProfileId=P9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let id = portal.delete_provisioning_profile(&"P9".into()).await.unwrap();
    assert_eq!(id, "P9");
}

// ── Download ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_not_found_writes_nothing() {
    let (server, portal) = connect().await;
    Mock::given(method("GET"))
        .and(path("/account/ios/profile/profileContentDownload.action"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("com.example.app").join("development.mobileprovision");
    let err = portal
        .download_profile(&"GONE".into(), ProfileSink::Path(&target))
        .await
        .unwrap_err();

    match err {
        CoreError::NotFound { identifier, .. } => assert_eq!(identifier, "GONE"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(!target.exists());
    assert!(!target.parent().unwrap().exists());
}

#[tokio::test]
async fn test_download_to_path_and_writer() {
    let (server, portal) = connect().await;
    Mock::given(method("GET"))
        .and(path("/account/ios/profile/profileContentDownload.action"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"profile-bytes".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("adhoc.mobileprovision");
    let written = portal
        .download_profile(&"P1".into(), ProfileSink::Path(&target))
        .await
        .unwrap();
    assert_eq!(written, 13);
    assert_eq!(std::fs::read(&target).unwrap(), b"profile-bytes");

    let mut buffer: Vec<u8> = Vec::new();
    portal
        .download_profile(&"P1".into(), ProfileSink::Writer(&mut buffer))
        .await
        .unwrap();
    assert_eq!(buffer, b"profile-bytes");
}

// ── Batches ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_delete_reports_missing_without_failing() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;
    Mock::given(method("POST"))
        .and(path(service_path("device/deleteDevice")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = DeviceFilter {
        ids: vec!["not-a-real-id".into(), "D2".into()],
        ..DeviceFilter::default()
    };
    let mut seen = Vec::new();
    let report = portal
        .delete_devices(&filter, false, |event| seen.push(format!("{event:?}")))
        .await
        .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.missing, ["not-a-real-id"]);
    assert!(!report.is_clean());
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_batch_reports_missing_before_a_failing_delete() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;
    Mock::given(method("POST"))
        .and(path(service_path("device/deleteDevice")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCode": 35,
            "userString": "no",
            "resultString": "no"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = DeviceFilter {
        ids: vec!["missing-first".into(), "D2".into()],
        ..DeviceFilter::default()
    };
    let mut missing = Vec::new();
    let mut applying = Vec::new();
    let result = portal
        .delete_devices(&filter, false, |event| match event {
            BatchEvent::Missing(id) => missing.push(id.to_owned()),
            BatchEvent::Applying(device) => applying.push(device.device_id.clone()),
        })
        .await;

    match result {
        Err(CoreError::Service(e)) => assert_eq!(e.code, 35),
        other => panic!("expected a service error, got {other:?}"),
    }
    assert_eq!(missing, ["missing-first"]);
    assert_eq!(applying, ["D2"]);
}

#[tokio::test]
async fn test_batch_dry_run_sends_nothing() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;
    Mock::given(method("POST"))
        .and(path(service_path("device/deleteDevice")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(0)
        .mount(&server)
        .await;

    let filter = DeviceFilter {
        name: Some(portal_core::filter_pattern("ipad").unwrap()),
        ..DeviceFilter::default()
    };
    let report = portal.delete_devices(&filter, true, |_| {}).await.unwrap();
    assert_eq!(report.applied, 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_regenerate_skips_current_profiles() {
    let (server, mut portal) = connect().await;
    mount_list(&server, "certificate/listCertRequests", "certRequests", cert_requests(), 1)
        .await;
    mount_list(&server, "device/listDevices", "devices", devices(), 1).await;
    mount_list(
        &server,
        "profile/listProvisioningProfiles",
        "provisioningProfiles",
        profiles(),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path(service_path("profile/regenProvisioningProfile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultCode": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ProfileFilter {
        include_all: true,
        ..ProfileFilter::default()
    };
    let mut skipped = Vec::new();
    let report = portal
        .regenerate_profiles(&filter, false, |event| {
            if let RegenerateEvent::Skipped(profile) = event {
                skipped.push(profile.provisioning_profile_id.clone());
            }
        })
        .await
        .unwrap();

    assert_eq!(report.regenerated, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(skipped, ["P1", "P3"]);

    let bodies = request_bodies(&server, "profile/regenProvisioningProfile").await;
    assert_eq!(
        bodies,
        ["provisioningProfileId=P2&distributionType=adhoc&returnFullObjects=false\
          &provisioningProfileName=App+AdHoc&appIdId=A1&certificateIds=DIST1\
          &deviceIds=D1&deviceIds=D2"]
    );
}
