//! Installed version resolution for the vendor's modules

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::installed::error::ModuleError;
use crate::installed::identifier::IdentifierScheme;
use crate::installed::modules::ModuleRegistry;
use crate::version::semver::DEV_VERSION;
use crate::version::types::InstalledVersions;

const DESCRIPTOR: &str = "composer.json";

#[derive(Debug, Deserialize)]
struct PackageDescriptor {
    #[serde(default)]
    version: Option<serde_json::Value>,
}

/// Builds the installed version map from the local module registry
pub struct InstalledResolver {
    registry: Box<dyn ModuleRegistry>,
    scheme: IdentifierScheme,
    dev_path_markers: Vec<String>,
}

impl InstalledResolver {
    pub fn new(
        registry: Box<dyn ModuleRegistry>,
        scheme: IdentifierScheme,
        dev_path_markers: &[String],
    ) -> Self {
        Self {
            registry,
            scheme,
            dev_path_markers: dev_path_markers.to_vec(),
        }
    }

    /// Installed version of every vendor module, keyed by package identifier.
    ///
    /// A module whose version cannot be determined maps to `None`. Modules
    /// inside a source checkout without a descriptor map to `"dev"`.
    pub fn resolve_installed(&self) -> InstalledVersions {
        let mut installed = InstalledVersions::new();

        for module_name in self.registry.module_names() {
            let Some(identifier) = self.scheme.identifier_for(&module_name) else {
                continue;
            };

            let version = self
                .registry
                .module_dir(&module_name)
                .and_then(|etc_dir| self.module_version(&etc_dir));

            debug!("{} -> {} ({:?})", module_name, identifier, version);
            installed.insert(identifier, version);
        }

        installed
    }

    fn module_version(&self, etc_dir: &Path) -> Option<String> {
        let version = read_descriptor_version(etc_dir)
            .inspect_err(|e| warn!("Ignoring package descriptor: {}", e))
            .ok()
            .flatten();

        version.or_else(|| self.is_dev_checkout(etc_dir).then(|| DEV_VERSION.to_string()))
    }

    fn is_dev_checkout(&self, etc_dir: &Path) -> bool {
        let path = etc_dir.to_string_lossy().replace('\\', "/");
        self.dev_path_markers
            .iter()
            .any(|marker| !marker.is_empty() && path.contains(marker.as_str()))
    }
}

/// Descriptor locations probed for a module, nearest first
fn descriptor_candidates(etc_dir: &Path) -> Vec<PathBuf> {
    etc_dir
        .ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(DESCRIPTOR))
        .collect()
}

/// Version declared by the first existing descriptor
fn read_descriptor_version(etc_dir: &Path) -> Result<Option<String>, ModuleError> {
    let Some(path) = descriptor_candidates(etc_dir)
        .into_iter()
        .find(|path| path.is_file())
    else {
        return Ok(None);
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ModuleError::Io {
        path: path.clone(),
        source,
    })?;
    let descriptor: PackageDescriptor =
        serde_json::from_str(&raw).map_err(|source| ModuleError::Json {
            path: path.clone(),
            source,
        })?;

    Ok(match descriptor.version {
        Some(serde_json::Value::String(v)) if !v.trim().is_empty() => Some(v.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
