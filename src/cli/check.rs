use std::io::Write;
use std::sync::Arc;

use tracing::{error, info};

use crate::cli::{AppContext, CliError};
use crate::config::CHECK_LOCK_STALE_MS;
use crate::version::registries::PackagistFeed;
use crate::watch::cycle::{NoticeStyle, UpdateWatcher};
use crate::watch::notifier::InboxNotifier;
use crate::watch::store::SqliteStore;

/// Name of the single-flight lock guarding check cycles
pub const CHECK_LOCK: &str = "check";

fn watcher(app: &AppContext) -> Result<UpdateWatcher<SqliteStore>, CliError> {
    let config = &app.config;

    let style = NoticeStyle {
        vendor_label: config.vendor_label(),
        link_base: Some(config.registry.base_url.clone()),
    };
    let watcher = UpdateWatcher::new(
        app.store.clone(),
        app.catalog_fetcher()?,
        Arc::new(InboxNotifier::new(app.store.clone())),
        style,
    );

    if !config.feed.enabled {
        return Ok(watcher);
    }
    let feed = PackagistFeed::new(&config.feed.base_url, config.registry.timeout())?;
    Ok(watcher.with_feed(Arc::new(feed)))
}

/// Run one check cycle unless another one holds the lock
pub async fn run(app: &AppContext, refresh: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let watcher = watcher(app)?;

    if !app.store.try_acquire_lock(CHECK_LOCK, CHECK_LOCK_STALE_MS)? {
        info!("Skipping check: another cycle is running");
        writeln!(out, "Another check is already running, skipped")?;
        return Ok(());
    }

    let result = watcher.run_cycle(refresh).await;

    let _ = app
        .store
        .release_lock(CHECK_LOCK)
        .inspect_err(|e| error!("Failed to release check lock: {}", e));

    let report = result?;

    for event in &report.events {
        writeln!(
            out,
            "{} {} -> {} ({})",
            event.identifier,
            event.previous_version.as_deref().unwrap_or("-"),
            event.new_version,
            event.published_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    writeln!(
        out,
        "{} new releases, {} notices raised, {} failed",
        report.events.len(),
        report.notified,
        report.failed_notices
    )?;

    Ok(())
}
