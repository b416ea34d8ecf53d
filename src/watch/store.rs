use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::watch::error::StoreError;
use crate::watch::notifier::Notice;

/// Cached catalog built from the registry
pub const CATALOG_FLAG: &str = "update_watch_catalog";
/// Watermark of the last check cycle
pub const LAST_CHECK_FLAG: &str = "update_watch_last_check";
/// Per-package snapshot of the last reported releases
pub const PACKAGE_VERSIONS_FLAG: &str = "update_watch_package_versions";

/// Durable key/value storage for watcher state
#[cfg_attr(test, automock)]
pub trait FlagStore: Send + Sync + 'static {
    /// Get the raw value stored under `key`
    fn get_flag(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn save_flag(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Store several flags in one transaction; either all are written or none
    fn save_flags(&self, flags: &[(String, String)]) -> Result<(), StoreError>;

    /// Remove `key` if present
    fn delete_flag(&self, key: &str) -> Result<(), StoreError>;
}

/// Read a JSON-encoded flag
pub fn load_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: FlagStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get_flag(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Write a JSON-encoded flag
pub fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: FlagStore + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.save_flag(key, &raw)
}

/// A notice as kept in the admin inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotice {
    pub id: i64,
    pub notice: Notice,
    pub created_at: i64,
    pub is_read: bool,
}

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: single-flight locks for check cycles
    &[r#"
        CREATE TABLE IF NOT EXISTS locks (
            name TEXT PRIMARY KEY,
            held_since INTEGER NOT NULL
        )
    "#],
];

/// SQLite-backed flag store, notice inbox and cycle lock
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing store database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        debug!("Store initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS flags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS notices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                url TEXT,
                created_at INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Try to take the named single-flight lock.
    ///
    /// Returns false while another holder owns it. A lock held for longer
    /// than `stale_after_ms` is treated as abandoned and taken over.
    pub fn try_acquire_lock(&self, name: &str, stale_after_ms: i64) -> Result<bool, StoreError> {
        let now = Self::current_timestamp_ms();
        let stale_threshold = now - stale_after_ms;

        let conn = self.lock_conn()?;

        let rows_affected = conn.execute(
            "UPDATE locks SET held_since = ?1 WHERE name = ?2 AND held_since < ?3",
            (now, name, stale_threshold),
        )?;

        if rows_affected > 0 {
            info!("Took over stale lock {}", name);
            return Ok(true);
        }

        // Only the first inserter succeeds thanks to the primary key
        let rows_inserted = conn.execute(
            "INSERT OR IGNORE INTO locks (name, held_since) VALUES (?1, ?2)",
            (name, now),
        )?;

        Ok(rows_inserted > 0)
    }

    /// Release the named lock
    pub fn release_lock(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM locks WHERE name = ?1", [name])?;
        Ok(())
    }

    /// Append a notice to the inbox
    pub fn add_notice(&self, notice: &Notice) -> Result<i64, StoreError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;

        conn.execute(
            "INSERT INTO notices (title, body, url, created_at) VALUES (?1, ?2, ?3, ?4)",
            (&notice.title, &notice.body, &notice.url, now),
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Notices in insertion order; read ones only when `include_read` is set
    pub fn notices(&self, include_read: bool) -> Result<Vec<StoredNotice>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, body, url, created_at, is_read FROM notices
            WHERE ?1 OR is_read = 0
            ORDER BY id
            "#,
        )?;

        let notices = stmt
            .query_map([include_read], |row| {
                Ok(StoredNotice {
                    id: row.get(0)?,
                    notice: Notice {
                        title: row.get(1)?,
                        body: row.get(2)?,
                        url: row.get(3)?,
                    },
                    created_at: row.get(4)?,
                    is_read: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notices)
    }

    /// Mark every notice as read, returning how many changed
    pub fn mark_notices_read(&self) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        Ok(conn.execute("UPDATE notices SET is_read = 1 WHERE is_read = 0", [])?)
    }
}

impl FlagStore for SqliteStore {
    fn get_flag(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row("SELECT value FROM flags WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    fn save_flag(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.save_flags(&[(key.to_string(), value.to_string())])
    }

    fn save_flags(&self, flags: &[(String, String)]) -> Result<(), StoreError> {
        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO flags (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )?;
            for (key, value) in flags {
                stmt.execute((key, value, now))?;
            }
        }

        tx.commit()?;

        debug!("Saved {} flags", flags.len());
        Ok(())
    }

    fn delete_flag(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM flags WHERE key = ?1", [key])?;
        Ok(())
    }
}
