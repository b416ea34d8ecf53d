//! Compare installed versions against the remote catalog

use std::cmp::Ordering;

use crate::version::semver::{compare_versions, is_dev_version};
use crate::version::types::{Catalog, InstalledVersions, PackageReport, PackageStatus};

/// Status of one package given its installed and latest versions
pub fn package_status(installed: Option<&str>, latest: &str) -> PackageStatus {
    match installed {
        None => PackageStatus::Missing,
        Some(v) if is_dev_version(v) => PackageStatus::Ok,
        Some(v) if compare_versions(v, latest).is_lt() => PackageStatus::Outdated,
        Some(_) => PackageStatus::Ok,
    }
}

fn status_rank(status: PackageStatus) -> u8 {
    match status {
        PackageStatus::Outdated => 0,
        PackageStatus::Ok => 1,
        PackageStatus::Missing => 2,
    }
}

/// Display order: outdated, then ok, then missing; newest release first within a status
fn display_order(a: &PackageReport, b: &PackageReport) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| b.record.published_at.cmp(&a.record.published_at))
        .then_with(|| a.record.identifier.cmp(&b.record.identifier))
}

/// Annotate every catalog package with its installed version and status,
/// sorted for display.
pub fn diff(installed: &InstalledVersions, catalog: &Catalog) -> Vec<PackageReport> {
    let mut reports: Vec<PackageReport> = catalog
        .records()
        .map(|record| {
            let installed_version = installed.get(&record.identifier).cloned().flatten();
            let status = package_status(installed_version.as_deref(), &record.version);
            PackageReport {
                record: record.clone(),
                installed_version,
                status,
            }
        })
        .collect();

    reports.sort_by(display_order);
    reports
}
