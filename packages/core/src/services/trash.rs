//! Trash Lifecycle
//!
//! Soft delete, restore and permanent delete. Each cascades over the
//! subtree selected by path containment and runs as one write transaction,
//! with the target's state checked after the write lock is taken.
//!
//! Restore only looks at the subtree below the restored page. A page whose
//! former parent is still in the trash comes back with its path intact and
//! is shown as a top-level page by the tree builder until the parent is
//! restored too.

use crate::db::{DatabaseService, PageStore};
use crate::models::Page;
use crate::services::PageServiceError;
use chrono::Utc;
use libsql::Connection;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Visible,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct TrashManager {
    db: Arc<DatabaseService>,
}

impl TrashManager {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    async fn load(conn: &Connection, id: Uuid, expect: Expect) -> Result<Page, PageServiceError> {
        let page = PageStore::new(conn).fetch_page(&id).await?;
        match (page, expect) {
            (Some(page), Expect::Visible) if !page.is_deleted => Ok(page),
            (Some(page), Expect::Deleted) if page.is_deleted => Ok(page),
            (_, Expect::Visible) => Err(PageServiceError::page_not_found(id)),
            (_, Expect::Deleted) => Err(PageServiceError::deleted_page_not_found(id)),
        }
    }

    /// Move a page and its subtree to the trash, returning the rows marked
    #[instrument(skip(self))]
    pub async fn delete_page(&self, id: Uuid, actor: &str) -> Result<u64, PageServiceError> {
        let tx = self.db.begin_write().await?;
        let result = async {
            let page = Self::load(&tx, id, Expect::Visible).await?;
            PageStore::new(&tx)
                .mark_subtree_deleted(&page.path, true, actor, Utc::now())
                .await
                .map_err(PageServiceError::from)
        }
        .await;
        let affected = tx.finish(result).await?;

        info!(affected, "Moved subtree to trash");
        Ok(affected)
    }

    /// Bring a trashed page and its subtree back, returning the rows cleared
    #[instrument(skip(self))]
    pub async fn restore_page(&self, id: Uuid, actor: &str) -> Result<u64, PageServiceError> {
        let tx = self.db.begin_write().await?;
        let result = async {
            let page = Self::load(&tx, id, Expect::Deleted).await?;
            PageStore::new(&tx)
                .mark_subtree_deleted(&page.path, false, actor, Utc::now())
                .await
                .map_err(PageServiceError::from)
        }
        .await;
        let affected = tx.finish(result).await?;

        info!(affected, "Restored subtree from trash");
        Ok(affected)
    }

    /// Remove a trashed page and its subtree for good, returning the rows removed
    #[instrument(skip(self))]
    pub async fn permanent_delete_page(&self, id: Uuid) -> Result<u64, PageServiceError> {
        let tx = self.db.begin_write().await?;
        let result = async {
            let page = Self::load(&tx, id, Expect::Deleted).await?;
            PageStore::new(&tx)
                .delete_subtree(&page.path)
                .await
                .map_err(PageServiceError::from)
        }
        .await;
        let affected = tx.finish(result).await?;

        info!(affected, "Permanently deleted subtree");
        Ok(affected)
    }

    /// Every trashed page, most recently deleted first
    pub async fn list_trash(&self) -> Result<Vec<Page>, PageServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(PageStore::new(&conn).list_trash().await?)
    }
}
