//! Traits for reaching the remote package registry

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::{Announcement, PackageRecord};

/// Trait for listing a vendor's packages and resolving their latest release
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Lists the names of every package published by a vendor
    async fn list_packages(&self, vendor: &str) -> Result<Vec<String>, RegistryError>;

    /// Fetches the latest release of a single package
    ///
    /// # Arguments
    /// * `package_name` - Full package name (e.g., "infrangible/m2-core")
    ///
    /// # Returns
    /// * `Ok(PackageRecord)` - The highest published version with its metadata
    /// * `Err(RegistryError)` - If the fetch fails or no version is published
    async fn fetch_package(&self, package_name: &str) -> Result<PackageRecord, RegistryError>;
}

/// Trait for the chronological release feed of a vendor
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Returns announcements published strictly after `since`, oldest first
    async fn announcements_since(
        &self,
        vendor: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, RegistryError>;
}
