//! Database Connection Management
//!
//! Core connection handling and schema initialization for the page store,
//! built on libsql in local mode.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any file path, parent directories are created
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS`, no migrations
//! - **WAL mode**: readers never block the single writer
//! - **Foreign keys**: `parent_id` references `pages(id)`
//! - **Store-generated ids**: the `id` column defaults to a random UUID v4,
//!   so a page's identifier is only known once its row exists
//!
//! # Connection Patterns
//!
//! Use `connect_with_timeout()` in async code. Every structural write goes
//! through [`DatabaseService::begin_write`], which opens a dedicated
//! connection and takes the write lock up front with `BEGIN IMMEDIATE`.
//! Concurrent writers queue on the busy timeout instead of interleaving, so a
//! transaction that re-reads its inputs after `begin_write` sees a state no
//! other writer can change before it commits.

use crate::db::error::DatabaseError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database};
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

/// SQL expression producing a random lowercase hyphenated UUID v4
const UUID_V4_DEFAULT: &str = "(lower(hex(randomblob(4))) || '-' || \
     lower(hex(randomblob(2))) || '-4' || \
     substr(lower(hex(randomblob(2))), 2) || '-' || \
     substr('89ab', 1 + (abs(random()) % 4), 1) || \
     substr(lower(hex(randomblob(2))), 2) || '-' || \
     lower(hex(randomblob(6))))";

/// Database service for managing the libsql handle and schema
///
/// # Examples
///
/// ```no_run
/// use cotion_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("./data/cotion.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable WAL mode and foreign keys
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created, the
    /// connection fails or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::debug!(path = %service.db_path.display(), is_new_database, "Database ready");
        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of
    /// execute().
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `pages` table: one row per page, `path` holds the materialized label
    /// - Indexes: parent, path, category, updated_at, created_by, deleted_at
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS pages (
                    id TEXT PRIMARY KEY NOT NULL DEFAULT {UUID_V4_DEFAULT},
                    title TEXT NOT NULL,
                    content TEXT,
                    icon TEXT,
                    cover_image TEXT,
                    category TEXT,
                    -- root.<segment>...<own segment>, provisional only inside a create
                    path TEXT NOT NULL,
                    parent_id TEXT,
                    position INTEGER NOT NULL DEFAULT 0,
                    created_by TEXT,
                    updated_by TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    is_deleted INTEGER NOT NULL DEFAULT 0,
                    deleted_at TEXT,
                    FOREIGN KEY (parent_id) REFERENCES pages(id) ON DELETE CASCADE
                )"
            ),
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create pages table: {}", e))
        })?;

        self.create_core_indexes(&conn).await?;

        // Flush the freshly created schema out of the WAL
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes for the pages table
    async fn create_core_indexes(&self, conn: &Connection) -> Result<(), DatabaseError> {
        const INDEXES: &[(&str, &str)] = &[
            // Children listing and next-position lookups
            ("idx_pages_parent", "pages(parent_id, position)"),
            // Subtree range scans
            ("idx_pages_path", "pages(path)"),
            ("idx_pages_category", "pages(category)"),
            ("idx_pages_updated", "pages(updated_at)"),
            ("idx_pages_created_by", "pages(created_by)"),
            // Trash listing
            ("idx_pages_deleted", "pages(is_deleted, deleted_at)"),
        ];

        for (name, target) in INDEXES {
            conn.execute(&format!("CREATE INDEX IF NOT EXISTS {name} ON {target}"), ())
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to create index '{}': {}",
                        name, e
                    ))
                })?;
        }

        Ok(())
    }

    /// Get a raw connection to the database
    ///
    /// Prefer `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    ///
    /// The 5-second busy timeout lets a connection wait for the write lock
    /// instead of failing immediately with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Open a write transaction holding the database write lock
    ///
    /// The caller must end it with [`WriteTransaction::commit`],
    /// [`WriteTransaction::rollback`] or [`WriteTransaction::finish`].
    /// Dropping it unfinished closes the connection, which rolls back.
    pub async fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(WriteTransaction { conn })
    }

    /// Checkpoint the WAL so every committed write is in the main file
    ///
    /// Call before shutdown.
    pub async fn db_close(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await?;
        Ok(())
    }
}

/// An open `BEGIN IMMEDIATE` transaction on its own connection
///
/// Derefs to [`Connection`], so store functions taking `&Connection` run
/// inside the transaction.
pub struct WriteTransaction {
    conn: Connection,
}

impl fmt::Debug for WriteTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteTransaction").finish_non_exhaustive()
    }
}

impl Deref for WriteTransaction {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl WriteTransaction {
    pub async fn commit(self) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            let _rollback = self.conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`, and hand the result through
    ///
    /// A failed commit replaces an `Ok` result with the commit error. A
    /// failed rollback is logged and the original error is kept.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Render a timestamp the way it is stored
///
/// Fixed-width RFC 3339 with microseconds and a `Z` suffix, so stored values
/// sort chronologically as plain text.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp - RFC 3339 or SQLite `CURRENT_TIMESTAMP` format
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(format!(
        "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
        s
    ))
}
