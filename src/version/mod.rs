//! Remote package catalog and version comparison
//!
//! This module fetches the vendor's published packages from the registry,
//! keeps the assembled catalog in the durable store and compares it against
//! the locally installed versions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Catalog   │────▶│    Diff     │
//! │  (fetch)    │     │  (cached)   │     │ (status)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ Registries  │                         │   Semver    │
//! │(packagist,  │                         │(version cmp)│
//! │ feed)       │                         └─────────────┘
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: Catalog assembly with bounded concurrency and cache write-back
//! - [`diff`]: Installed vs. latest status and display ordering
//! - [`registry`]: Registry and release feed traits
//! - [`registries`]: Packagist implementations of those traits
//! - [`error`]: Error types for registry operations
//! - [`semver`]: Version ordering shared by the diff and the cursor
//! - [`types`]: Common types like `PackageRecord` and `Catalog`

pub mod catalog;
pub mod diff;
pub mod error;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
