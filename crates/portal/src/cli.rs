//! Clap derive structures for the `portal` CLI.
//!
//! Command names keep the camelCase spelling scripts already use
//! (`listDevices`, `getProfile`, ...).

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// portal -- manage certificates, devices, app ids and provisioning profiles
#[derive(Debug, Parser)]
#[command(
    name = "portal",
    version,
    about = "Manage the iOS provisioning portal from the command line",
    long_about = "Scripts the iOS provisioning portal: list certificates and app ids,\n\
        register devices, and create, download, regenerate or delete\n\
        provisioning profiles.\n\n\
        Credentials come from PORTAL_CREDENTIALS=user:password or from the\n\
        .portalrc section named by PORTAL_ENVIRONMENT (default \"Default\").",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Debug output (-d, -dd, -ddd)
    #[arg(long = "debug", short = 'd', action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Request timeout in seconds
    #[arg(long, env = "PORTAL_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// .portalrc section to use
    #[arg(long, short = 'e', env = "PORTAL_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Portal base URL
    #[arg(long, env = "PORTAL_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,
}

// ── Command Enum ─────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List iOS development and distribution certificates
    #[command(name = "listCertificates")]
    ListCertificates(ListArgs),

    /// List devices, removed ones included
    #[command(name = "listDevices")]
    ListDevices(ListDevicesArgs),

    /// Register a device by UDID
    #[command(name = "addDevice")]
    AddDevice(AddDeviceArgs),

    /// Remove devices
    #[command(name = "deleteDevice")]
    DeleteDevice(DeviceBatchArgs),

    /// Re-enable removed devices
    #[command(name = "enableDevice")]
    EnableDevice(DeviceBatchArgs),

    /// List app ids
    #[command(name = "listApps")]
    ListApps(ListArgs),

    /// List provisioning profiles
    #[command(name = "listProfiles")]
    ListProfiles(ListProfilesArgs),

    /// Download one or every provisioning profile
    #[command(name = "getProfile")]
    GetProfile(GetProfileArgs),

    /// Regenerate profiles with every device and current certificates
    #[command(name = "regenerateProfile")]
    RegenerateProfile(RegenerateProfileArgs),

    /// Delete provisioning profiles
    #[command(name = "deleteProfile")]
    DeleteProfile(ProfileBatchArgs),

    /// Show the logged-in account and team
    Whoami,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Show more columns
    #[arg(short = 'v', long, conflicts_with = "raw")]
    pub verbose: bool,

    /// Print each record as JSON
    #[arg(short = 'r', long)]
    pub raw: bool,
}

/// Device selection: explicit ids (device id or UDID) and/or patterns.
#[derive(Debug, Args)]
pub struct DeviceFilterArgs {
    /// Case-insensitive regex matched against the device name
    #[arg(short = 'm', long = "name", value_name = "REGEX")]
    pub name: Option<String>,

    /// Case-insensitive regex matched against the UDID
    #[arg(short = 'u', long = "udid", value_name = "REGEX")]
    pub udid: Option<String>,

    /// Device ids or UDIDs
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,
}

/// Profile selection: explicit profile ids and/or criteria.
#[derive(Debug, Args)]
pub struct ProfileFilterArgs {
    /// Profile type: development, adhoc, appstore or 0-2
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub profile_type: Option<String>,

    /// Exact bundle identifier of the profile's app id
    #[arg(short = 'i', long = "app-id", value_name = "BUNDLE_ID")]
    pub app_id: Option<String>,

    /// Case-insensitive regex matched against the profile name
    #[arg(short = 'm', long = "name", value_name = "REGEX")]
    pub name: Option<String>,
}

// ── Device Commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListDevicesArgs {
    #[command(flatten)]
    pub list: ListArgs,

    #[command(flatten)]
    pub filter: DeviceFilterArgs,
}

#[derive(Debug, Args)]
pub struct AddDeviceArgs {
    /// Device name (defaults to the UDID)
    #[arg(short = 'm', long = "name")]
    pub name: Option<String>,

    /// 40-digit hex UDID
    pub udid: String,
}

#[derive(Debug, Args)]
pub struct DeviceBatchArgs {
    /// Show what would change without changing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Suppress progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(flatten)]
    pub filter: DeviceFilterArgs,
}

// ── Profile Commands ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListProfilesArgs {
    #[command(flatten)]
    pub list: ListArgs,

    #[command(flatten)]
    pub filter: ProfileFilterArgs,

    /// Profile ids
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["all", "id"])))]
pub struct GetProfileArgs {
    /// Download every profile into <OUTPUT>/<bundle id>/<type>.mobileprovision
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Download one profile by id
    #[arg(short = 'i', long, value_name = "ID")]
    pub id: Option<String>,

    /// Output file (with -i, default stdout) or directory (with -a,
    /// default the current directory)
    #[arg(short = 'o', long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Suppress progress
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct RegenerateProfileArgs {
    /// Report every profile, skipped ones included
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress progress
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Show what would change without changing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Consider every profile
    #[arg(short = 'a', long)]
    pub all: bool,

    #[command(flatten)]
    pub filter: ProfileFilterArgs,

    /// Profile ids
    #[arg(value_name = "ID", required_unless_present = "all")]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ProfileBatchArgs {
    /// Show what would change without changing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Suppress progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(flatten)]
    pub filter: ProfileFilterArgs,

    /// Profile ids
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
