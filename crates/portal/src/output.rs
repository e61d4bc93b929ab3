//! Output formatting: tab-separated rows, raw JSON records, progress.
//!
//! Listings print one record per line with tab-separated columns so they
//! pipe cleanly into `cut`/`awk`. `-r` prints each record as compact JSON.
//! Progress and per-item notices go to stderr.

use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Print one tab-separated row to stdout.
pub fn print_row<I, S>(columns: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let line = columns
        .into_iter()
        .map(|c| c.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join("\t");
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{line}");
}

/// Print a record as a single line of JSON.
pub fn print_raw<T: serde::Serialize + ?Sized>(record: &T) {
    let text = serde_json::to_string(record).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{text}");
}

/// A stderr line, unless `quiet`.
pub fn notice(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

/// `n/total (pct%)` progress on stderr; hidden when `quiet`.
pub fn progress(total: usize, verb: &str, quiet: bool) -> ProgressBar {
    if quiet || total == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(
        Some(u64::try_from(total).unwrap_or(u64::MAX)),
        ProgressDrawTarget::stderr(),
    );
    let style = ProgressStyle::with_template(&format!(
        "{verb} {{pos}}/{{len}} profiles ({{percent}}%)"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Empty string for a missing optional column.
pub fn column(value: Option<&str>) -> &str {
    value.unwrap_or("")
}
