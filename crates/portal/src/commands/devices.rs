//! Device command handlers.

use portal_core::{BatchEvent, Device, Portal};
use tracing::info;

use crate::cli::{AddDeviceArgs, DeviceBatchArgs, ListDevicesArgs};
use crate::error::CliError;
use crate::output::{column, notice, print_raw, print_row};

use super::util;

pub async fn list(portal: &mut Portal, args: &ListDevicesArgs) -> Result<(), CliError> {
    let filter = util::device_filter(&args.filter, true)?;
    let selection = portal.select_devices(&filter).await?;

    for device in &selection.selected {
        if args.list.raw {
            print_raw(device);
        } else if args.list.verbose {
            print_row([
                device.device_id.as_str(),
                column(device.status.as_deref()),
                device.device_number.as_str(),
                device.name.as_str(),
            ]);
        } else {
            print_row([device.device_number.as_str(), device.name.as_str()]);
        }
    }
    for id in &selection.missing {
        eprintln!("Device '{id}' not found");
    }
    util::finish(selection.missing.len())
}

pub async fn add(portal: &Portal, args: &AddDeviceArgs) -> Result<(), CliError> {
    portal.add_device(&args.udid, args.name.as_deref()).await?;
    info!(udid = %args.udid, "device registered");
    Ok(())
}

pub async fn delete(portal: &mut Portal, args: &DeviceBatchArgs) -> Result<(), CliError> {
    let filter = util::device_filter(&args.filter, false)?;
    let report = portal
        .delete_devices(&filter, args.dry_run, |event| {
            report_event(event, "Deleting", args.quiet);
        })
        .await?;
    util::finish_batch(&report)
}

pub async fn enable(portal: &mut Portal, args: &DeviceBatchArgs) -> Result<(), CliError> {
    let filter = util::device_filter(&args.filter, false)?;
    let report = portal
        .enable_devices(&filter, args.dry_run, |event| {
            report_event(event, "Enabling", args.quiet);
        })
        .await?;
    util::finish_batch(&report)
}

fn report_event(event: BatchEvent<'_, Device>, verb: &str, quiet: bool) {
    match event {
        BatchEvent::Applying(device) => {
            notice(&format!("{verb} device '{}'", device.device_number), quiet);
        }
        BatchEvent::Missing(id) => eprintln!("Device '{id}' not found"),
    }
}
