//! `listCertificates`.

use portal_core::{Portal, cert_types};

use crate::cli::ListArgs;
use crate::error::CliError;
use crate::output::{column, print_raw, print_row};

pub async fn list(portal: &mut Portal, args: &ListArgs) -> Result<(), CliError> {
    let certs = portal.cert_requests_of_type(&cert_types::IOS).await?;

    for cert in &certs {
        if args.raw {
            print_raw(cert);
        } else if args.verbose {
            print_row([
                cert.certificate_id.as_str(),
                column(cert.expiration_date.as_deref()),
                column(cert.date_requested.as_deref()),
                column(cert.date_created.as_deref()),
                column(cert.status_string.as_deref()),
                column(cert.type_string.as_deref()),
                column(cert.name.as_deref()),
            ]);
        } else {
            print_row([
                cert.certificate_id.as_str(),
                column(cert.expiration_date.as_deref()),
                column(cert.type_string.as_deref()),
                column(cert.name.as_deref()),
            ]);
        }
    }
    Ok(())
}
