//! Packagist registry API implementation

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::PackageRegistry;
use crate::version::semver::latest_by_version;
use crate::version::types::{PackageId, PackageRecord};

/// Default base URL for Packagist
pub const DEFAULT_BASE_URL: &str = "https://packagist.org";

/// Response from the vendor listing endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageListResponse {
    #[serde(default)]
    package_names: Vec<String>,
}

/// Response from the package detail endpoint
#[derive(Debug, Deserialize)]
struct PackageDetailResponse {
    package: PackageDetail,
}

#[derive(Debug, Deserialize)]
struct PackageDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    versions: PackageVersions,
}

/// Packagist serves versions keyed by version string; mirrors may serve a plain list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackageVersions {
    List(Vec<VersionEntry>),
    Map(IndexMap<String, VersionEntry>),
}

impl PackageVersions {
    fn into_entries(self) -> Vec<VersionEntry> {
        match self {
            PackageVersions::List(entries) => entries,
            PackageVersions::Map(entries) => entries.into_values().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

/// Registry implementation for the Packagist API
#[derive(Clone)]
pub struct PackagistRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl PackagistRegistry {
    /// Creates a new PackagistRegistry; every request is abandoned after `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent("update-watch")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package_name: &str,
    ) -> Result<T, RegistryError> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !status.is_success() {
            warn!("Packagist returned status {}: {}", status, url);
            return Err(RegistryError::Parse(format!("Unexpected status: {}", status)));
        }

        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse Packagist response from {}: {}", url, e);
            RegistryError::Parse(e.to_string())
        })
    }
}

fn parse_time(time: Option<&str>) -> DateTime<Utc> {
    time.and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait::async_trait]
impl PackageRegistry for PackagistRegistry {
    async fn list_packages(&self, vendor: &str) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/packages/list.json?vendor={}", self.base_url, vendor);

        let list: PackageListResponse = self.get_json(&url, vendor).await?;

        debug!("Vendor {} publishes {} packages", vendor, list.package_names.len());

        Ok(list.package_names)
    }

    async fn fetch_package(&self, package_name: &str) -> Result<PackageRecord, RegistryError> {
        let url = format!("{}/packages/{}.json", self.base_url, package_name);

        let detail: PackageDetailResponse = self.get_json(&url, package_name).await?;
        let PackageDetail {
            name,
            description,
            versions,
        } = detail.package;

        let latest = latest_by_version(versions.into_entries(), |entry| entry.version.as_str())
            .ok_or_else(|| {
                RegistryError::Parse(format!("No published versions for {}", package_name))
            })?;

        let published_at = parse_time(latest.time.as_deref());

        Ok(PackageRecord {
            identifier: PackageId::new(package_name),
            display_name: latest
                .name
                .or(name)
                .unwrap_or_else(|| package_name.to_string()),
            description: latest.description.or(description).unwrap_or_default(),
            version: latest.version,
            published_at,
        })
    }
}
