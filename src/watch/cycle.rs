//! One reconciliation cycle: load cursor, fetch, reconcile, notify, persist

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::version::catalog::CatalogFetcher;
use crate::version::registry::ReleaseFeed;
use crate::version::types::UpdateEvent;
use crate::watch::cursor::{Cursor, reconcile};
use crate::watch::error::CycleError;
use crate::watch::notifier::{Notice, Notifier};
use crate::watch::store::FlagStore;

/// Outcome of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Releases reported this cycle, oldest first
    pub events: Vec<UpdateEvent>,
    pub notified: usize,
    pub failed_notices: usize,
    pub catalog_size: usize,
    /// Watermark persisted for the next cycle
    pub last_check: DateTime<Utc>,
}

/// How notices are worded
#[derive(Debug, Clone)]
pub struct NoticeStyle {
    pub vendor_label: String,
    pub link_base: Option<String>,
}

/// Drives check cycles against one vendor catalog.
///
/// Holds no state between cycles; everything carried over lives in the
/// store under the cursor keys. Callers must not run two cycles on the same
/// store at once.
pub struct UpdateWatcher<S: FlagStore> {
    store: Arc<S>,
    fetcher: CatalogFetcher<S>,
    feed: Option<Arc<dyn ReleaseFeed>>,
    notifier: Arc<dyn Notifier>,
    style: NoticeStyle,
}

impl<S: FlagStore> UpdateWatcher<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: CatalogFetcher<S>,
        notifier: Arc<dyn Notifier>,
        style: NoticeStyle,
    ) -> Self {
        Self {
            store,
            fetcher,
            feed: None,
            notifier,
            style,
        }
    }

    /// Probe the release feed before deciding whether the cached catalog is usable
    pub fn with_feed(mut self, feed: Arc<dyn ReleaseFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Run one cycle now. `refresh` bypasses the catalog cache.
    pub async fn run_cycle(&self, refresh: bool) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(refresh, Utc::now()).await
    }

    /// Run one cycle as of `now`.
    ///
    /// Remote failures degrade to fewer or no events. Only store failures on
    /// the cursor abort the cycle; the cursor is written last so an aborted
    /// cycle leaves it untouched.
    pub async fn run_cycle_at(
        &self,
        refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let cursor = Cursor::load(&*self.store).map_err(CycleError::LoadCursor)?;
        let since = cursor.last_check.unwrap_or(now);

        let use_cache = !refresh && !self.feed_reports_changes(since).await;
        let catalog = self.fetcher.fetch_catalog(use_cache).await;

        let (events, next) = reconcile(&cursor, &catalog, now);
        info!(
            "Found {} new releases in {} catalog packages",
            events.len(),
            catalog.len()
        );

        let (notified, failed_notices) = self.notify(&events);

        next.save(&*self.store).map_err(CycleError::PersistCursor)?;

        let last_check = next.last_check.unwrap_or(now);
        debug!("Cursor advanced to {}", last_check);

        Ok(CycleReport {
            events,
            notified,
            failed_notices,
            catalog_size: catalog.len(),
            last_check,
        })
    }

    /// Whether the feed announces anything after `since`.
    /// Without a feed every cycle is treated as having changes.
    async fn feed_reports_changes(&self, since: DateTime<Utc>) -> bool {
        let Some(feed) = &self.feed else {
            return true;
        };

        match feed.announcements_since(self.fetcher.vendor(), since).await {
            Ok(announcements) if announcements.is_empty() => {
                debug!("Feed reports no releases since {}", since);
                false
            }
            Ok(announcements) => {
                for announcement in &announcements {
                    debug!(
                        "Feed announces {} {} at {}",
                        announcement.name, announcement.version, announcement.published_at
                    );
                }
                info!(
                    "Feed reports {} releases since {}, refreshing catalog",
                    announcements.len(),
                    since
                );
                true
            }
            Err(e) => {
                warn!("Release feed unavailable, using cached catalog: {}", e);
                false
            }
        }
    }

    fn notify(&self, events: &[UpdateEvent]) -> (usize, usize) {
        let mut notified = 0;
        let mut failed = 0;

        for event in events {
            let notice = Notice::for_event(
                event,
                &self.style.vendor_label,
                self.style.link_base.as_deref(),
            );
            match self.notifier.add_notice(&notice) {
                Ok(()) => notified += 1,
                Err(e) => {
                    error!(
                        "Failed to raise notice for {} {}: {}",
                        event.identifier, event.new_version, e
                    );
                    failed += 1;
                }
            }
        }

        (notified, failed)
    }
}
