//! Plain-text rendering of run results

use std::fmt::Write;

use crate::version::planner::DisplayRow;

const HEADERS: [&str; 4] = ["Type", "Installed", "Latest", "Update Available"];
const MIN_VERSION_WIDTH: usize = 9;

/// Render the comparison table, one row per driver in the given order
pub fn render_table(rows: &[DisplayRow]) -> String {
    let id_width = column_width(HEADERS[0].len(), rows.iter().map(|r| r.id.len()));
    let installed_width = column_width(MIN_VERSION_WIDTH, rows.iter().map(|r| r.installed.len()));
    let latest_width = column_width(MIN_VERSION_WIDTH, rows.iter().map(|r| r.latest.len()));

    let mut table = String::new();
    let _ = writeln!(
        table,
        "{:<id_width$} | {:<installed_width$} | {:<latest_width$} | {}",
        HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3]
    );
    let _ = writeln!(
        table,
        "{} | {} | {} | {}",
        "-".repeat(id_width),
        "-".repeat(installed_width),
        "-".repeat(latest_width),
        "-".repeat(HEADERS[3].len())
    );
    for row in rows {
        let _ = writeln!(
            table,
            "{:<id_width$} | {:<installed_width$} | {:<latest_width$} | {}",
            row.id, row.installed, row.latest, row.flag
        );
    }
    table
}

fn column_width(min: usize, lengths: impl Iterator<Item = usize>) -> usize {
    lengths.fold(min, usize::max)
}
