//! `listApps`.

use portal_core::Portal;

use crate::cli::ListArgs;
use crate::error::CliError;
use crate::output::{print_raw, print_row};

/// Capabilities shown as `X` columns by `listApps -v`, in column order.
const FEATURE_COLUMNS: [&str; 6] = [
    "inAppPurchase",
    "iCloud",
    "gameCenter",
    "push",
    "passbook",
    "dataProtection",
];

pub async fn list(portal: &mut Portal, args: &ListArgs) -> Result<(), CliError> {
    let apps = portal.all_app_ids().await?;

    for app in apps.iter() {
        if args.raw {
            print_raw(app);
        } else if args.verbose {
            let mut row = vec![app.app_id_id.as_str()];
            row.extend(
                FEATURE_COLUMNS
                    .iter()
                    .map(|feature| if app.feature_enabled(feature) { "X" } else { "" }),
            );
            row.push(&app.identifier);
            row.push(&app.name);
            print_row(row);
        } else {
            print_row([
                app.app_id_id.as_str(),
                app.identifier.as_str(),
                app.name.as_str(),
            ]);
        }
    }
    Ok(())
}
