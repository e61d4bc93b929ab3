//! Provisioning profile command handlers.

use std::io;
use std::path::PathBuf;

use indicatif::ProgressBar;
use portal_core::{BatchEvent, Identifier, Portal, ProfileSink, RegenerateEvent};
use tracing::info;

use crate::cli::{GetProfileArgs, ListProfilesArgs, ProfileBatchArgs, RegenerateProfileArgs};
use crate::error::CliError;
use crate::output::{self, column, notice, print_raw, print_row};

use super::util;

pub async fn list(portal: &mut Portal, args: &ListProfilesArgs) -> Result<(), CliError> {
    let filter = util::profile_filter(&args.filter, &args.ids, true)?;
    let selection = portal.select_profiles(&filter).await?;

    for profile in &selection.selected {
        let kind = profile.classification().label();
        if args.list.raw {
            print_raw(profile);
        } else if args.list.verbose {
            let certificates = profile
                .certificate_count
                .map(|n| n.to_string())
                .unwrap_or_default();
            let devices = profile.device_count.to_string();
            print_row([
                profile.provisioning_profile_id.as_str(),
                profile.status.as_str(),
                certificates.as_str(),
                devices.as_str(),
                column(profile.date_expire.as_deref()),
                kind,
                profile.app_id.identifier.as_str(),
                profile.name.as_str(),
            ]);
        } else {
            print_row([
                profile.provisioning_profile_id.as_str(),
                kind,
                profile.app_id.identifier.as_str(),
                profile.name.as_str(),
            ]);
        }
    }
    for id in &selection.missing {
        eprintln!("Profile '{id}' not found");
    }
    util::finish(selection.missing.len())
}

pub async fn get(portal: &mut Portal, args: &GetProfileArgs) -> Result<(), CliError> {
    if let Some(id) = &args.id {
        let input = Identifier::from(id.as_str());
        match &args.output {
            Some(path) => portal.download_profile(&input, ProfileSink::Path(path)).await?,
            None => {
                let mut stdout = io::stdout();
                portal
                    .download_profile(&input, ProfileSink::Writer(&mut stdout))
                    .await?
            }
        };
        return Ok(());
    }

    let out = match &args.output {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let profiles = portal.all_provisioning_profiles().await?;
    let bar = output::progress(profiles.len(), "Downloading", args.quiet);

    for profile in profiles.iter() {
        let path = util::profile_path(&out, profile);
        let input = Identifier::from(profile.provisioning_profile_id.as_str());
        portal
            .download_profile(&input, ProfileSink::Path(&path))
            .await?;
        bar.inc(1);
    }
    bar.finish();
    info!(count = profiles.len(), dir = %out.display(), "profiles downloaded");
    Ok(())
}

pub async fn regenerate(portal: &mut Portal, args: &RegenerateProfileArgs) -> Result<(), CliError> {
    let filter = util::profile_filter(&args.filter, &args.ids, args.all)?;
    let mut bar: Option<ProgressBar> = None;

    let report = portal
        .regenerate_profiles(&filter, args.dry_run, |event| match event {
            RegenerateEvent::Skipped(profile) => {
                if args.verbose {
                    eprintln!(
                        "Skipping {} ({})",
                        profile.provisioning_profile_id, profile.name
                    );
                }
            }
            RegenerateEvent::Regenerating {
                index,
                total,
                profile,
            } => {
                if args.verbose {
                    eprintln!(
                        "Regenerating {} ({})",
                        profile.provisioning_profile_id, profile.name
                    );
                } else {
                    bar.get_or_insert_with(|| {
                        output::progress(total, "Regenerating", args.quiet)
                    })
                    .set_position(u64::try_from(index + 1).unwrap_or(u64::MAX));
                }
            }
            RegenerateEvent::Missing(id) => eprintln!("Profile '{id}' not found"),
        })
        .await?;

    if let Some(bar) = bar {
        bar.finish();
    }
    util::finish(report.missing.len())
}

pub async fn delete(portal: &mut Portal, args: &ProfileBatchArgs) -> Result<(), CliError> {
    let filter = util::profile_filter(&args.filter, &args.ids, false)?;
    let report = portal
        .delete_profiles(&filter, args.dry_run, |event| match event {
            BatchEvent::Applying(profile) => notice(
                &format!("Deleting profile '{}'", profile.provisioning_profile_id),
                args.quiet,
            ),
            BatchEvent::Missing(id) => eprintln!("Profile '{id}' not found"),
        })
        .await?;
    util::finish_batch(&report)
}
