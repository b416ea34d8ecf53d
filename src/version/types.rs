//! Common types shared by the fetcher, the diff engine and the notification gate

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized `vendor/name` key joining installed modules with registry packages
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Latest published release of one package, as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub identifier: PackageId,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub published_at: DateTime<Utc>,
}

/// All known remote packages keyed by identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    records: BTreeMap<PackageId, PackageRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any previous record with the same identifier
    pub fn insert(&mut self, record: PackageRecord) {
        self.records.insert(record.identifier.clone(), record);
    }

    pub fn get(&self, id: &PackageId) -> Option<&PackageRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent publish time across the catalog
    pub fn latest_published_at(&self) -> Option<DateTime<Utc>> {
        self.records.values().map(|r| r.published_at).max()
    }
}

impl FromIterator<PackageRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

/// Installed module versions keyed by identifier.
/// `None` means the module is present but its version could not be determined.
pub type InstalledVersions = BTreeMap<PackageId, Option<String>>;

/// Status of a catalog package relative to the local installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Installed version is at least the latest release (or a dev checkout)
    Ok,
    /// Installed version is older than the latest release
    Outdated,
    /// No installed version is known
    Missing,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Ok => "ok",
            PackageStatus::Outdated => "outdated",
            PackageStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog record annotated with the locally installed version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub record: PackageRecord,
    pub installed_version: Option<String>,
    pub status: PackageStatus,
}

/// A release that has not been reported yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub identifier: PackageId,
    pub previous_version: Option<String>,
    pub new_version: String,
    pub published_at: DateTime<Utc>,
    pub description: String,
}

/// One release announcement from the vendor feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub name: String,
    pub version: String,
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published_at: DateTime<Utc>,
}
