//! Subtree Relocation
//!
//! Moving a page rewrites its own row and the path of every descendant in
//! one write transaction. The target and destination are loaded after the
//! write lock is taken, so the cycle check always runs against the state the
//! rewrite is applied to. A move that commits after another overlapping move
//! sees that move's result and is validated against it.

use crate::db::{DatabaseService, PageStore, Relocation};
use crate::models::{MovePageInput, Page};
use crate::services::PageServiceError;
use crate::tree::MaterializedPath;
use chrono::Utc;
use libsql::Connection;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MoveEngine {
    db: Arc<DatabaseService>,
}

impl MoveEngine {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Reparent `id` under `input.new_parent_id`, or to the top level
    ///
    /// # Errors
    ///
    /// - `NotFound` if the page or the destination is absent or deleted
    /// - `Validation` if the destination is the page itself or one of its
    ///   descendants, or the position is negative
    #[instrument(skip(self, input), fields(new_parent = ?input.new_parent_id, position = ?input.position))]
    pub async fn move_page(
        &self,
        id: Uuid,
        input: &MovePageInput,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        input.validate()?;

        let tx = self.db.begin_write().await?;
        let result = Self::relocate_subtree(&tx, id, input, actor).await;
        let moved = tx.finish(result).await?;

        info!(path = %moved.path, "Moved page");
        Ok(moved)
    }

    async fn relocate_subtree(
        conn: &Connection,
        id: Uuid,
        input: &MovePageInput,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        let store = PageStore::new(conn);

        let target = store
            .fetch_page(&id)
            .await?
            .filter(|page| !page.is_deleted)
            .ok_or_else(|| PageServiceError::page_not_found(id))?;

        let new_path = match input.new_parent_id {
            Some(parent_id) => {
                let parent = store
                    .fetch_page(&parent_id)
                    .await?
                    .filter(|page| !page.is_deleted)
                    .ok_or_else(|| PageServiceError::parent_not_found(parent_id))?;

                // Destination equal to or below the target
                if target.path.is_prefix_of(&parent.path) {
                    return Err(PageServiceError::cycle(id, parent_id));
                }
                parent.path.child(id)
            }
            None => MaterializedPath::root(id),
        };

        store
            .relocate(
                &id,
                &Relocation {
                    parent_id: input.new_parent_id,
                    path: &new_path,
                    position: input.position.unwrap_or(target.position),
                    actor,
                    now: Utc::now(),
                },
            )
            .await?;

        if new_path != target.path {
            let rewritten = store.rebase_descendants(&target.path, &new_path).await?;
            debug!(rewritten, from = %target.path, to = %new_path, "Rewrote descendant paths");
        }

        store
            .fetch_page(&id)
            .await?
            .ok_or_else(|| PageServiceError::internal(format!("Page {id} vanished during move")))
    }
}
