//! Admin-facing notices raised for new releases

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::version::types::UpdateEvent;
use crate::watch::error::NotifyError;
use crate::watch::store::SqliteStore;

/// A message shown to administrators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub url: Option<String>,
}

impl Notice {
    /// Build the notice for a newly detected release
    pub fn for_event(event: &UpdateEvent, vendor_label: &str, link_base: Option<&str>) -> Self {
        Self {
            title: format!(
                "New {} release: {} ({})",
                vendor_label, event.identifier, event.new_version
            ),
            body: event.description.clone(),
            url: link_base.map(|base| {
                format!("{}/packages/{}", base.trim_end_matches('/'), event.identifier)
            }),
        }
    }
}

/// Receiver of approved update notices
#[cfg_attr(test, automock)]
pub trait Notifier: Send + Sync {
    fn add_notice(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Keeps notices in the store's inbox table
pub struct InboxNotifier {
    store: Arc<SqliteStore>,
}

impl InboxNotifier {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

impl Notifier for InboxNotifier {
    fn add_notice(&self, notice: &Notice) -> Result<(), NotifyError> {
        let id = self.store.add_notice(notice)?;
        info!("Stored notice #{}: {}", id, notice.title);
        Ok(())
    }
}

/// Emits notices into the log only
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn add_notice(&self, notice: &Notice) -> Result<(), NotifyError> {
        info!(
            title = %notice.title,
            url = notice.url.as_deref().unwrap_or(""),
            "{}",
            notice.body
        );
        Ok(())
    }
}
