//! Command dispatch: bridges CLI args -> `Portal` calls -> output.

pub mod apps;
pub mod certificates;
pub mod devices;
pub mod profiles;
pub mod util;

use portal_core::Portal;

use crate::cli::Command;
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, portal: &mut Portal) -> Result<(), CliError> {
    match cmd {
        Command::ListCertificates(args) => certificates::list(portal, &args).await,
        Command::ListDevices(args) => devices::list(portal, &args).await,
        Command::AddDevice(args) => devices::add(portal, &args).await,
        Command::DeleteDevice(args) => devices::delete(portal, &args).await,
        Command::EnableDevice(args) => devices::enable(portal, &args).await,
        Command::ListApps(args) => apps::list(portal, &args).await,
        Command::ListProfiles(args) => profiles::list(portal, &args).await,
        Command::GetProfile(args) => profiles::get(portal, &args).await,
        Command::RegenerateProfile(args) => profiles::regenerate(portal, &args).await,
        Command::DeleteProfile(args) => profiles::delete(portal, &args).await,
        Command::Whoami => {
            println!("{}", portal.whoami()?);
            Ok(())
        }
        // Completions are handled before login
        Command::Completions(_) => unreachable!(),
    }
}
