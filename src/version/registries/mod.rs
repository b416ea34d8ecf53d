//! Registry implementations for fetching vendor packages

pub mod feed;
pub mod packagist;

pub use feed::PackagistFeed;
pub use packagist::PackagistRegistry;
