use std::io::Write;

use crate::cli::{AppContext, CliError};
use crate::version::diff::diff;
use crate::version::types::PackageReport;

const HEADERS: [&str; 5] = ["PACKAGE", "INSTALLED", "LATEST", "PUBLISHED", "STATUS"];

fn row(report: &PackageReport) -> [String; 5] {
    [
        report.record.identifier.to_string(),
        report
            .installed_version
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        report.record.version.clone(),
        report.record.published_at.format("%Y-%m-%d").to_string(),
        report.status.to_string(),
    ]
}

/// Render reports as an aligned text table
pub fn render_table(reports: &[PackageReport], out: &mut dyn Write) -> std::io::Result<()> {
    let rows: Vec<[String; 5]> = reports.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header = HEADERS.map(str::to_string);
    for cells in std::iter::once(&header).chain(&rows) {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{}", line.trim_end())?;
    }

    Ok(())
}

/// Print every catalog package with its installed version and status
pub async fn run(app: &AppContext, refresh: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let installed = app.installed_resolver().resolve_installed();
    let catalog = app.catalog_fetcher()?.fetch_catalog(!refresh).await;

    let reports = diff(&installed, &catalog);
    if reports.is_empty() {
        writeln!(out, "No packages found for vendor {}", app.config.vendor)?;
        return Ok(());
    }

    render_table(&reports, out)?;
    Ok(())
}
