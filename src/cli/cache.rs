use std::io::Write;

use crate::cli::{AppContext, CliError};

/// Drop the cached catalog
pub fn clear(app: &AppContext, out: &mut dyn Write) -> Result<(), CliError> {
    app.catalog_fetcher()?.invalidate()?;
    writeln!(out, "Catalog cache cleared")?;
    Ok(())
}
