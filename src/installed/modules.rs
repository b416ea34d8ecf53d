//! Discovery of locally installed modules

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::installed::error::ModuleError;

/// Deepest directory level searched below each root
const MAX_SEARCH_DEPTH: usize = 8;

const MODULE_DECLARATION: &str = "module.xml";

/// Local registry of installed modules
#[cfg_attr(test, automock)]
pub trait ModuleRegistry: Send + Sync {
    /// Names of every installed module, sorted
    fn module_names(&self) -> Vec<String>;

    /// The module's `etc` directory, if known
    fn module_dir(&self, module_name: &str) -> Option<PathBuf>;
}

/// `<config><module name="Vendor_Name"/></config>`
#[derive(Debug, Deserialize)]
struct ModuleDeclaration {
    module: ModuleElement,
}

#[derive(Debug, Deserialize)]
struct ModuleElement {
    #[serde(rename = "@name")]
    name: String,
}

/// Modules found by scanning directory trees for `etc/module.xml`
#[derive(Debug, Default)]
pub struct FsModuleRegistry {
    modules: BTreeMap<String, PathBuf>,
}

impl FsModuleRegistry {
    /// Scan `roots`. Unreadable declarations are logged and skipped; the
    /// first declaration of a name wins.
    pub fn discover(roots: &[PathBuf]) -> Self {
        let mut modules = BTreeMap::new();

        for root in roots {
            for etc_dir in find_etc_dirs(root) {
                let declaration = etc_dir.join(MODULE_DECLARATION);
                match read_module_name(&declaration) {
                    Ok(name) => {
                        debug!("Found module {} at {:?}", name, etc_dir);
                        modules.entry(name).or_insert(etc_dir);
                    }
                    Err(e) => warn!("Skipping module declaration: {}", e),
                }
            }
        }

        Self { modules }
    }
}

impl ModuleRegistry for FsModuleRegistry {
    fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    fn module_dir(&self, module_name: &str) -> Option<PathBuf> {
        self.modules.get(module_name).cloned()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// `etc` directories holding a module declaration below `root`
fn find_etc_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .max_depth(MAX_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| {
            entry
                .inspect_err(|e| debug!("Skipping unreadable path: {}", e))
                .ok()
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MODULE_DECLARATION)
        .filter_map(|entry| {
            let etc_dir = entry.path().parent()?;
            (etc_dir.file_name()? == "etc").then(|| etc_dir.to_path_buf())
        })
        .collect()
}

fn read_module_name(path: &Path) -> Result<String, ModuleError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ModuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let declaration: ModuleDeclaration =
        quick_xml::de::from_str(&raw).map_err(|e| ModuleError::Xml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(declaration.module.name)
}
