//! Packagist stub and store utilities

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use tempfile::TempDir;

use update_watch::version::catalog::CatalogFetcher;
use update_watch::version::registries::{PackagistFeed, PackagistRegistry};
use update_watch::watch::cycle::{NoticeStyle, UpdateWatcher};
use update_watch::watch::notifier::InboxNotifier;
use update_watch::watch::store::SqliteStore;

pub const VENDOR: &str = "infrangible";

/// One published release served by the stub
#[derive(Clone, Copy)]
pub struct Release {
    pub name: &'static str,
    pub version: &'static str,
    /// RFC 3339
    pub time: &'static str,
}

/// Create a file-backed store in a fresh temp directory
pub fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&temp_dir.path().join("watch.db")).unwrap();
    (temp_dir, Arc::new(store))
}

/// Serve the vendor listing, one detail document per release and the
/// vendor feed. Returns the mocks so callers can replace them.
pub async fn serve_releases(server: &mut ServerGuard, releases: &[Release]) -> Vec<Mock> {
    serve_with_failures(server, releases, &[]).await
}

/// Like `serve_releases`, but `failing` packages are listed and answer
/// their detail request with a server error.
pub async fn serve_with_failures(
    server: &mut ServerGuard,
    releases: &[Release],
    failing: &[&str],
) -> Vec<Mock> {
    let names: Vec<&str> = releases
        .iter()
        .map(|r| r.name)
        .chain(failing.iter().copied())
        .collect();
    let mut mocks = vec![
        server
            .mock("GET", "/packages/list.json")
            .match_query(Matcher::UrlEncoded("vendor".into(), VENDOR.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "packageNames": names }).to_string())
            .create_async()
            .await,
        server
            .mock("GET", format!("/feeds/vendor.{}.rss", VENDOR).as_str())
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(feed_body(releases))
            .create_async()
            .await,
    ];

    for name in failing {
        mocks.push(
            server
                .mock("GET", format!("/packages/{}.json", name).as_str())
                .with_status(500)
                .create_async()
                .await,
        );
    }

    for release in releases {
        mocks.push(
            server
                .mock("GET", format!("/packages/{}.json", release.name).as_str())
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(detail_body(release))
                .create_async()
                .await,
        );
    }

    mocks
}

pub async fn remove_all(mocks: Vec<Mock>) {
    for mock in mocks {
        mock.remove_async().await;
    }
}

fn detail_body(release: &Release) -> String {
    serde_json::json!({
        "package": {
            "name": release.name,
            "description": format!("{} module", release.name),
            "versions": {
                "dev-master": {
                    "version": "dev-master",
                    "time": release.time
                },
                (release.version): {
                    "version": release.version,
                    "time": release.time
                }
            }
        }
    })
    .to_string()
}

fn feed_body(releases: &[Release]) -> String {
    let items: String = releases
        .iter()
        .map(|r| {
            let published = chrono::DateTime::parse_from_rfc3339(r.time).unwrap();
            format!(
                "<item><title>{} ({})</title><pubDate>{}</pubDate><guid>{} {}</guid></item>",
                r.name,
                r.version,
                published.to_rfc2822(),
                r.name,
                r.version
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>{}</title>{}</channel></rss>"#,
        VENDOR, items
    )
}

/// Watcher wired like the `check` command, against `base_url`
pub fn create_watcher(base_url: &str, store: Arc<SqliteStore>) -> UpdateWatcher<SqliteStore> {
    let timeout = Duration::from_secs(5);
    let registry = PackagistRegistry::new(base_url, timeout).unwrap();
    let feed = PackagistFeed::new(base_url, timeout).unwrap();

    let fetcher = CatalogFetcher::new(Arc::new(registry), store.clone(), VENDOR, 4);
    let style = NoticeStyle {
        vendor_label: "Infrangible".to_string(),
        link_base: Some(base_url.to_string()),
    };

    UpdateWatcher::new(store.clone(), fetcher, Arc::new(InboxNotifier::new(store)), style)
        .with_feed(Arc::new(feed))
}
