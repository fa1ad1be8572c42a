//! replisim CLI -- drive the simulator from a textual operation stream.

use std::path::PathBuf;

use clap::Parser;
use derive_more::From;
use replisim_core::types::VariableId;
use replisim_core::{DumpReport, Error as SimError, Outcome};

#[derive(Debug, Parser)]
#[command(
    name = "replisim",
    about = "Replicated transactional store simulator with snapshot isolation"
)]
pub struct App {
    /// Operation stream to run, one operation per line (stdin when omitted)
    pub input: Option<PathBuf>,
    /// Print dump reports as JSON instead of a grid
    #[arg(long)]
    pub json: bool,
}

/// Errors that abort the driving loop (the simulation itself never fails).
#[derive(Debug, From)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

/// Human-readable notice lines for one operation's outcome.
///
/// `SiteRecovered` expands to one line per replayed queue item, indented
/// under the recovery notice.
#[must_use]
pub fn describe_outcome(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Begun { tx } => vec![format!("{tx} begun")],
        Outcome::Read {
            variable, value, ..
        } => vec![format!("{variable}: {value}")],
        Outcome::Staged {
            tx,
            variable,
            value,
            sites,
        } => {
            let sites = sites
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            vec![format!("{tx} will write {variable}={value} at sites [{sites}]")]
        }
        Outcome::Committed { tx, .. } => vec![format!("{tx} committed")],
        Outcome::SiteFailed { site } => vec![format!("site {site} failed")],
        Outcome::SiteRecovered { site, replayed } => {
            let mut lines = vec![format!("site {site} recovered")];
            for result in replayed {
                let nested = match result {
                    Ok(outcome) => describe_outcome(outcome),
                    Err(err) => vec![describe_error(err)],
                };
                lines.extend(nested.into_iter().map(|line| format!("  {line}")));
            }
            lines
        }
        Outcome::Dump(report) => render_dump(report).lines().map(String::from).collect(),
    }
}

/// Human-readable notice for an ignored, deferred, or aborting operation.
#[must_use]
pub fn describe_error(err: &SimError) -> String {
    match err {
        SimError::UnknownOperation => "unrecognized operation, ignored".into(),
        SimError::UnknownTransaction(tx) => format!("{tx} is not active, ignored"),
        SimError::Deferred(tx) => format!("{tx} waiting: no available site"),
        SimError::AbortedUnavailable(tx) => format!("{tx} aborted: no available copy"),
        SimError::CommitConflict(tx) => {
            format!("{tx} aborted: a conflicting write committed first")
        }
        SimError::SsiAnomaly(tx) => format!("{tx} aborted: dangerous structure"),
        SimError::AvailableCopiesViolation(tx) => {
            format!("{tx} aborted: a written site went down before commit")
        }
    }
}

/// Renders a dump as an aligned grid, one row per site, `*` where a
/// variable is not hosted.
#[must_use]
pub fn render_dump(report: &DumpReport) -> String {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(report.0.len() + 1);

    let mut header = vec![String::new()];
    header.extend(VariableId::all().map(|variable| variable.to_string()));
    rows.push(header);

    for site_row in &report.0 {
        let mut cells = vec![format!("S{}", site_row.site)];
        cells.extend(
            site_row
                .values
                .iter()
                .map(|value| value.map_or_else(|| "*".to_string(), |v| v.to_string())),
        );
        rows.push(cells);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|col| rows.iter().map(|row| row[col].len()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:>width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use replisim_core::{Operation, TransactionId, TransactionManager};

    use super::*;

    #[test]
    fn dump_grid_lists_every_site_and_variable() {
        let tm = TransactionManager::new();
        let rendered = render_dump(&tm.dump());
        let lines: Vec<_> = rendered.lines().collect();

        // Header plus ten site rows.
        assert_eq!(lines.len(), 11);
        assert!(lines[0].contains("x1"));
        assert!(lines[0].contains("x20"));
        assert!(lines[1].starts_with(" ") || lines[1].starts_with("S1"));
        // Site 1 does not host x1 (its home is site 2).
        assert!(lines[1].contains('*'));
        // Replicated x2 is everywhere with its initial value.
        assert!(lines.iter().skip(1).all(|line| line.contains("20")));
    }

    #[test]
    fn dump_grid_is_idempotent() {
        let tm = TransactionManager::new();
        assert_eq!(render_dump(&tm.dump()), render_dump(&tm.dump()));
    }

    #[test]
    fn outcome_notices() {
        let mut tm = TransactionManager::new();
        let outcome = tm
            .process_operation(
                Operation::Begin {
                    tx: TransactionId::new("T1"),
                },
                false,
            )
            .unwrap();
        assert_eq!(describe_outcome(&outcome), vec!["t1 begun".to_string()]);
    }

    #[test]
    fn error_notices_name_the_transaction() {
        let notice = describe_error(&SimError::Deferred(TransactionId::new("t7")));
        assert!(notice.contains("t7"));
        assert!(notice.contains("waiting"));
    }
}
