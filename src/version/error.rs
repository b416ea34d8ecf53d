use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    Parse(String),
}

impl RegistryError {
    /// True when the request was abandoned because it ran past the client timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistryError::Network(e) if e.is_timeout())
    }
}
