//! Page Store
//!
//! SQL for the `pages` table. A [`PageStore`] borrows a connection, which is
//! either a plain read connection or an open [`WriteTransaction`], so the
//! same queries serve standalone reads and every step of a cascade.
//!
//! Subtree queries never use `LIKE`: `_` is both the hyphen substitute in
//! path segments and a `LIKE` wildcard. They use the half-open label range
//! from [`MaterializedPath::descendant_range`] instead, which the path index
//! answers directly.
//!
//! [`WriteTransaction`]: crate::db::WriteTransaction

use crate::db::database::{format_timestamp, parse_timestamp};
use crate::db::error::DatabaseError;
use crate::models::{Page, PageUpdate};
use crate::tree::MaterializedPath;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row};
use std::fmt;
use uuid::Uuid;

const PAGE_COLUMNS: &str = "id, title, content, icon, cover_image, category, path, parent_id, \
     position, created_by, updated_by, created_at, updated_at, is_deleted, deleted_at";

/// Sibling order shared by every listing
const SIBLING_ORDER: &str = "position ASC, created_at ASC, rowid ASC";

/// Fields written by the first phase of a create
#[derive(Debug, Clone)]
pub struct NewPageRow<'a> {
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub category: Option<&'a str>,
    pub parent_id: Option<Uuid>,
    pub provisional_path: String,
    pub position: i64,
    pub actor: &'a str,
    pub now: DateTime<Utc>,
}

/// Structural fields written to the moved page itself
#[derive(Debug, Clone)]
pub struct Relocation<'a> {
    pub parent_id: Option<Uuid>,
    pub path: &'a MaterializedPath,
    pub position: i64,
    pub actor: &'a str,
    pub now: DateTime<Utc>,
}

/// Query access to the `pages` table over a borrowed connection
#[derive(Clone, Copy)]
pub struct PageStore<'c> {
    conn: &'c Connection,
}

impl fmt::Debug for PageStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStore").finish_non_exhaustive()
    }
}

impl<'c> PageStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Convert a `SELECT {PAGE_COLUMNS}` row into a page
    fn row_to_page(row: &Row) -> Result<Page, DatabaseError> {
        let id_str: String = row.get(0)?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| DatabaseError::corrupt_row(&id_str, format!("bad id: {}", e)))?;

        let path_str: String = row.get(6)?;
        let path = MaterializedPath::parse(&path_str)?;

        let parent_id = row
            .get::<Option<String>>(7)?
            .map(|p| Uuid::parse_str(&p))
            .transpose()
            .map_err(|e| DatabaseError::corrupt_row(&id_str, format!("bad parent_id: {}", e)))?;

        let timestamp = |idx: i32, field: &str| -> Result<DateTime<Utc>, DatabaseError> {
            let raw: String = row.get(idx)?;
            parse_timestamp(&raw)
                .map_err(|e| DatabaseError::corrupt_row(&id_str, format!("{}: {}", field, e)))
        };
        let created_at = timestamp(11, "created_at")?;
        let updated_at = timestamp(12, "updated_at")?;
        let deleted_at = match row.get::<Option<String>>(14)? {
            Some(raw) => Some(
                parse_timestamp(&raw)
                    .map_err(|e| DatabaseError::corrupt_row(&id_str, format!("deleted_at: {}", e)))?,
            ),
            None => None,
        };

        Ok(Page {
            id,
            title: row.get(1)?,
            content: row.get(2)?,
            icon: row.get(3)?,
            cover_image: row.get(4)?,
            category: row.get(5)?,
            path,
            parent_id,
            position: row.get(8)?,
            created_by: row.get(9)?,
            updated_by: row.get(10)?,
            created_at,
            updated_at,
            is_deleted: row.get::<i64>(13)? != 0,
            deleted_at,
        })
    }

    async fn query_pages(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        context: &str,
    ) -> Result<Vec<Page>, DatabaseError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to {}: {}", context, e)))?;

        let mut pages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to {}: {}", context, e)))?
        {
            pages.push(Self::row_to_page(&row)?);
        }
        Ok(pages)
    }

    async fn execute(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        context: &str,
    ) -> Result<u64, DatabaseError> {
        self.conn
            .execute(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to {}: {}", context, e)))
    }

    /// Fetch a page regardless of its deleted state
    pub async fn fetch_page(&self, id: &Uuid) -> Result<Option<Page>, DatabaseError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1");
        let mut pages = self
            .query_pages(&sql, params![id.to_string()], "fetch page")
            .await?;
        Ok(pages.pop())
    }

    /// Every visible page ordered by path, so parents precede descendants
    pub async fn get_all_visible(&self) -> Result<Vec<Page>, DatabaseError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE is_deleted = 0 ORDER BY path");
        self.query_pages(&sql, (), "list pages").await
    }

    /// Visible direct children in sibling order
    pub async fn get_visible_children(&self, parent_id: &Uuid) -> Result<Vec<Page>, DatabaseError> {
        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM pages
             WHERE parent_id = ?1 AND is_deleted = 0
             ORDER BY {SIBLING_ORDER}"
        );
        self.query_pages(&sql, params![parent_id.to_string()], "list children")
            .await
    }

    /// Visible pages among `ids`, ordered by path (top-level ancestor first)
    pub async fn get_visible_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Page>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = serde_json::to_string(&ids.iter().map(Uuid::to_string).collect::<Vec<_>>())
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to encode ids: {}", e)))?;
        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM pages
             WHERE id IN (SELECT value FROM json_each(?1)) AND is_deleted = 0
             ORDER BY path"
        );
        self.query_pages(&sql, params![id_list], "fetch pages by id")
            .await
    }

    /// Every soft-deleted page, most recently deleted first
    pub async fn list_trash(&self) -> Result<Vec<Page>, DatabaseError> {
        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM pages
             WHERE is_deleted = 1
             ORDER BY deleted_at DESC, path ASC"
        );
        self.query_pages(&sql, (), "list trash").await
    }

    /// Number of rows in the subtree rooted at `root`, deleted or not
    pub async fn count_subtree(&self, root: &MaterializedPath) -> Result<u64, DatabaseError> {
        let (lower, upper) = root.descendant_range();
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM pages WHERE path = ?1 OR (path > ?2 AND path < ?3)",
                params![root.to_string(), lower, upper],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count subtree: {}", e)))?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// One past the highest visible sibling position, or 0 without siblings
    pub async fn next_sibling_position(&self, parent_id: Option<&Uuid>) -> Result<i64, DatabaseError> {
        let parent = parent_id.map(Uuid::to_string);
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(position) FROM pages WHERE parent_id IS ?1 AND is_deleted = 0",
                params![parent],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to read sibling positions: {}", e))
            })?;

        let max: Option<i64> = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => None,
        };
        match max {
            Some(m) => m.checked_add(1).ok_or_else(|| {
                DatabaseError::sql_execution(format!("Sibling position {} has no successor", m))
            }),
            None => Ok(0),
        }
    }

    /// First phase of a create: insert with a provisional path
    ///
    /// Returns the identifier allocated by the store.
    pub async fn insert_provisional(&self, row: &NewPageRow<'_>) -> Result<Uuid, DatabaseError> {
        let now = format_timestamp(&row.now);
        let mut rows = self
            .conn
            .query(
                "INSERT INTO pages (
                    title, content, icon, category, path, parent_id, position,
                    created_by, updated_by, created_at, updated_at, is_deleted
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9, ?9, 0)
                 RETURNING id",
                params![
                    row.title,
                    row.content,
                    row.icon,
                    row.category,
                    row.provisional_path.as_str(),
                    row.parent_id.map(|p| p.to_string()),
                    row.position,
                    row.actor,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert page: {}", e)))?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::sql_execution("INSERT returned no id"))?;
        let id: String = row.get(0)?;
        Uuid::parse_str(&id).map_err(|e| DatabaseError::corrupt_row(&id, e.to_string()))
    }

    /// Second phase of a create: write the final path
    pub async fn set_path(&self, id: &Uuid, path: &MaterializedPath) -> Result<u64, DatabaseError> {
        self.execute(
            "UPDATE pages SET path = ?1 WHERE id = ?2",
            params![path.to_string(), id.to_string()],
            "patch page path",
        )
        .await
    }

    /// Apply a partial update of non-structural fields
    ///
    /// A `None` field keeps the stored value; `category: Some(None)` clears it.
    pub async fn update_fields(
        &self,
        id: &Uuid,
        update: &PageUpdate,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let (set_category, category) = match &update.category {
            Some(value) => (1i64, value.clone()),
            None => (0i64, None),
        };

        self.execute(
            "UPDATE pages SET
                title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                icon = COALESCE(?3, icon),
                cover_image = COALESCE(?4, cover_image),
                category = CASE WHEN ?5 = 1 THEN ?6 ELSE category END,
                updated_by = ?7,
                updated_at = ?8
             WHERE id = ?9",
            params![
                update.title.clone(),
                update.content.clone(),
                update.icon.clone(),
                update.cover_image.clone(),
                set_category,
                category,
                actor,
                format_timestamp(&now),
                id.to_string(),
            ],
            "update page",
        )
        .await
    }

    /// Point the moved page at its new parent and path
    pub async fn relocate(&self, id: &Uuid, to: &Relocation<'_>) -> Result<u64, DatabaseError> {
        self.execute(
            "UPDATE pages SET parent_id = ?1, path = ?2, position = ?3, updated_by = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                to.parent_id.map(|p| p.to_string()),
                to.path.to_string(),
                to.position,
                to.actor,
                format_timestamp(&to.now),
                id.to_string(),
            ],
            "relocate page",
        )
        .await
    }

    /// Replace the `old` prefix of every strict descendant's path with `new`
    ///
    /// The suffix after the prefix is kept byte for byte. Deleted descendants
    /// are rewritten too, so a later restore finds them under the new path.
    pub async fn rebase_descendants(
        &self,
        old: &MaterializedPath,
        new: &MaterializedPath,
    ) -> Result<u64, DatabaseError> {
        let old_label = old.to_string();
        let (lower, upper) = old.descendant_range();
        self.execute(
            "UPDATE pages SET path = ?1 || substr(path, length(?2) + 1)
             WHERE path > ?3 AND path < ?4",
            params![new.to_string(), old_label, lower, upper],
            "rewrite descendant paths",
        )
        .await
    }

    /// Set or clear the deleted flag on a page and its whole subtree
    pub async fn mark_subtree_deleted(
        &self,
        root: &MaterializedPath,
        deleted: bool,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let (lower, upper) = root.descendant_range();
        let stamp = format_timestamp(&now);
        let deleted_at = deleted.then(|| stamp.clone());

        self.execute(
            "UPDATE pages SET is_deleted = ?1, deleted_at = ?2, updated_by = ?3, updated_at = ?4
             WHERE path = ?5 OR (path > ?6 AND path < ?7)",
            params![
                i64::from(deleted),
                deleted_at,
                actor,
                stamp,
                root.to_string(),
                lower,
                upper,
            ],
            if deleted { "soft delete subtree" } else { "restore subtree" },
        )
        .await
    }

    /// Remove a page and its whole subtree, returning the rows removed
    ///
    /// Rows removed through the `parent_id` cascade are not reported by the
    /// statement's change count, so the subtree is counted first. Callers run
    /// this inside a write transaction.
    pub async fn delete_subtree(&self, root: &MaterializedPath) -> Result<u64, DatabaseError> {
        let count = self.count_subtree(root).await?;
        let (lower, upper) = root.descendant_range();
        self.execute(
            "DELETE FROM pages WHERE path = ?1 OR (path > ?2 AND path < ?3)",
            params![root.to_string(), lower, upper],
            "delete subtree",
        )
        .await?;
        Ok(count)
    }
}
