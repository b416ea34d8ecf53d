use std::path::PathBuf;

use thiserror::Error;

/// Failures reading a module's local files. Callers log these and carry on.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid module declaration {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("Invalid package descriptor {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
