//! Persisted watermark deciding which releases were already reported

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::version::semver::compare_versions;
use crate::version::types::{Catalog, PackageId, PackageRecord, UpdateEvent};
use crate::watch::error::StoreError;
use crate::watch::store::{FlagStore, LAST_CHECK_FLAG, PACKAGE_VERSIONS_FLAG, load_json};

/// Last reported release of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub version: String,
    pub published_at: DateTime<Utc>,
}

impl From<&PackageRecord> for SnapshotEntry {
    fn from(record: &PackageRecord) -> Self {
        Self {
            version: record.version.clone(),
            published_at: record.published_at,
        }
    }
}

/// What has already been reported, carried from one cycle to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Watermark of the previous cycle; `None` before the first save
    pub last_check: Option<DateTime<Utc>>,
    pub snapshot: BTreeMap<PackageId, SnapshotEntry>,
}

impl Cursor {
    /// Read the cursor from the store. Absent keys give an empty cursor.
    pub fn load<S: FlagStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        let last_check = load_json::<S, DateTime<Utc>>(store, LAST_CHECK_FLAG)?;
        let snapshot = load_json::<S, BTreeMap<PackageId, SnapshotEntry>>(store, PACKAGE_VERSIONS_FLAG)?
            .unwrap_or_default();

        debug!(
            "Loaded cursor: last_check={:?}, {} snapshot entries",
            last_check,
            snapshot.len()
        );
        Ok(Self {
            last_check,
            snapshot,
        })
    }

    /// Write both cursor keys in a single transaction
    pub fn save<S: FlagStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        let mut flags = vec![(
            PACKAGE_VERSIONS_FLAG.to_string(),
            serde_json::to_string(&self.snapshot)?,
        )];
        if let Some(last_check) = self.last_check {
            flags.push((LAST_CHECK_FLAG.to_string(), serde_json::to_string(&last_check)?));
        }

        store.save_flags(&flags)
    }
}

fn is_newer(record: &PackageRecord, seen: &SnapshotEntry) -> bool {
    match compare_versions(&record.version, &seen.version) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => record.published_at > seen.published_at,
        std::cmp::Ordering::Less => false,
    }
}

/// Decide which catalog records are unreported releases and compute the
/// cursor to persist afterwards.
///
/// Events come back in ascending publish order. The input cursor is not
/// modified; the caller persists the returned one once the events have
/// been handed off.
pub fn reconcile(cursor: &Cursor, catalog: &Catalog, now: DateTime<Utc>) -> (Vec<UpdateEvent>, Cursor) {
    let watermark = cursor.last_check.unwrap_or(now);

    let mut events: Vec<UpdateEvent> = catalog
        .records()
        .filter_map(|record| {
            let seen = cursor.snapshot.get(&record.identifier);
            let fresh = match seen {
                Some(seen) => is_newer(record, seen),
                None => record.published_at > watermark,
            };

            fresh.then(|| UpdateEvent {
                identifier: record.identifier.clone(),
                previous_version: seen.map(|s| s.version.clone()),
                new_version: record.version.clone(),
                published_at: record.published_at,
                description: record.description.clone(),
            })
        })
        .collect();

    events.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });

    let last_check = catalog
        .latest_published_at()
        .map_or(watermark, |latest| latest.max(watermark));

    let mut snapshot = cursor.snapshot.clone();
    if !events.is_empty() {
        for record in catalog.records() {
            snapshot.insert(record.identifier.clone(), SnapshotEntry::from(record));
        }
    }
    // unknown packages get a baseline even on quiet cycles
    for record in catalog.records() {
        snapshot
            .entry(record.identifier.clone())
            .or_insert_with(|| SnapshotEntry::from(record));
    }

    (
        events,
        Cursor {
            last_check: Some(last_check),
            snapshot,
        },
    )
}
