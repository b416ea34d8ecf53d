//! Command line surface of the `update-watch` binary

pub mod cache;
pub mod check;
pub mod decrypt;
pub mod list;
pub mod notices;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::{ConfigError, WatchConfig};
use crate::crypt::DecryptError;
use crate::installed::identifier::IdentifierScheme;
use crate::installed::modules::FsModuleRegistry;
use crate::installed::resolver::InstalledResolver;
use crate::version::catalog::CatalogFetcher;
use crate::version::error::RegistryError;
use crate::version::registries::PackagistRegistry;
use crate::watch::error::{CycleError, StoreError};
use crate::watch::store::SqliteStore;

#[derive(Debug, Parser)]
#[command(name = "update-watch")]
#[command(version, about = "Watches a vendor's packages and raises one notice per new release")]
pub struct Cli {
    /// Config file (defaults to <data dir>/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one check cycle and raise notices for new releases
    Check {
        /// Ignore the cached catalog
        #[arg(long)]
        refresh: bool,
    },
    /// List the vendor's packages with installed and latest versions
    List {
        /// Ignore the cached catalog
        #[arg(long)]
        refresh: bool,
    },
    /// Show raised notices and mark them read
    Notices {
        /// Include notices already read
        #[arg(long)]
        all: bool,
    },
    /// Manage the catalog cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Decrypt a value stored by the shop's encryptor
    #[command(name = "encryption:decrypt", alias = "decrypt")]
    Decrypt {
        /// Value to decrypt
        #[arg(long)]
        value: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Drop the cached catalog
    Clear,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not enough arguments (missing: \"{0}\").")]
    Usage(String),

    #[error("No decryption key configured; set crypt.key or {}", crate::config::CRYPT_KEY_ENV)]
    MissingKey,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Configuration and store shared by every command
pub struct AppContext {
    pub config: WatchConfig,
    pub store: Arc<SqliteStore>,
}

impl AppContext {
    pub fn open(config: WatchConfig, db_path: &std::path::Path) -> Result<Self, CliError> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let store = SqliteStore::new(db_path)?;

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub(crate) fn catalog_fetcher(&self) -> Result<CatalogFetcher<SqliteStore>, CliError> {
        let registry = &self.config.registry;
        let client = PackagistRegistry::new(&registry.base_url, registry.timeout())?;

        Ok(CatalogFetcher::new(
            Arc::new(client),
            self.store.clone(),
            &self.config.vendor,
            registry.effective_concurrency(),
        ))
    }

    pub(crate) fn installed_resolver(&self) -> InstalledResolver {
        let modules = &self.config.modules;
        let scheme = IdentifierScheme::new(
            &self.config.vendor,
            &self.config.module_prefix,
            &self.config.package_prefix,
            &modules.excluded,
        );

        InstalledResolver::new(
            Box::new(FsModuleRegistry::discover(&modules.roots)),
            scheme,
            &modules.dev_path_markers,
        )
    }
}

/// Execute `command`, writing user-facing output to `out`
pub async fn run(command: Command, app: &AppContext, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Check { refresh } => check::run(app, refresh, out).await,
        Command::List { refresh } => list::run(app, refresh, out).await,
        Command::Notices { all } => notices::run(app, all, out),
        Command::Cache {
            action: CacheAction::Clear,
        } => cache::clear(app, out),
        Command::Decrypt { value } => decrypt::run(&app.config, value.as_deref(), out),
    }
}
