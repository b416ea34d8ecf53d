use std::io::Write;

use chrono::{DateTime, Utc};

use crate::cli::{AppContext, CliError};

/// Print inbox notices, then mark them read
pub fn run(app: &AppContext, all: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let notices = app.store.notices(all)?;

    if notices.is_empty() {
        writeln!(out, "No new notices")?;
        return Ok(());
    }

    for stored in &notices {
        let created = DateTime::<Utc>::from_timestamp_millis(stored.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let marker = if stored.is_read { " " } else { "*" };

        writeln!(out, "{}#{} [{}] {}", marker, stored.id, created, stored.notice.title)?;
        if !stored.notice.body.is_empty() {
            writeln!(out, "    {}", stored.notice.body)?;
        }
        if let Some(url) = &stored.notice.url {
            writeln!(out, "    {}", url)?;
        }
    }

    app.store.mark_notices_read()?;
    Ok(())
}
