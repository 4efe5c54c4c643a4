//! Page Service
//!
//! Entry point for every tree operation. Reads and creation are implemented
//! here; relocation and the trash lifecycle are delegated to [`MoveEngine`]
//! and [`TrashManager`], which share the same database handle.
//!
//! Reads run on a plain connection and are not isolated from concurrent
//! writers across calls. Each write runs inside one [`WriteTransaction`].
//!
//! [`WriteTransaction`]: crate::db::WriteTransaction

use crate::db::{DatabaseService, NewPageRow, PageStore};
use crate::models::{CreatePageInput, MovePageInput, Page, PageTreeNode, PageUpdate};
use crate::services::{MoveEngine, PageServiceError, TrashManager};
use crate::tree::{MaterializedPath, PageForest};
use chrono::Utc;
use libsql::Connection;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Core service for page reads, creation and updates
///
/// # Examples
///
/// ```no_run
/// use cotion_core::db::DatabaseService;
/// use cotion_core::models::CreatePageInput;
/// use cotion_core::services::PageService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/cotion.db")).await?);
///     let service = PageService::new(db);
///
///     let page = service
///         .create_page(CreatePageInput::new("Getting started"), "user-1")
///         .await?;
///     println!("Created page {} at {}", page.id, page.path);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PageService {
    db: Arc<DatabaseService>,
    mover: MoveEngine,
    trash: TrashManager,
}

impl PageService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self {
            mover: MoveEngine::new(db.clone()),
            trash: TrashManager::new(db.clone()),
            db,
        }
    }

    /// Get access to the underlying database service
    pub fn db(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    async fn read_conn(&self) -> Result<Connection, PageServiceError> {
        Ok(self.db.connect_with_timeout().await?)
    }

    async fn load_visible(store: &PageStore<'_>, id: &Uuid) -> Result<Page, PageServiceError> {
        store
            .fetch_page(id)
            .await?
            .filter(|page| !page.is_deleted)
            .ok_or_else(|| PageServiceError::page_not_found(id))
    }

    //
    // READS
    //

    /// Every visible page, ordered by path so parents precede descendants
    pub async fn get_all(&self) -> Result<Vec<Page>, PageServiceError> {
        let conn = self.read_conn().await?;
        Ok(PageStore::new(&conn).get_all_visible().await?)
    }

    /// Every visible page assembled into a forest
    #[instrument(skip(self))]
    pub async fn get_tree(&self) -> Result<Vec<PageTreeNode>, PageServiceError> {
        let pages = self.get_all().await?;
        let forest = PageForest::build(pages);
        debug!(pages = forest.len(), roots = forest.roots().len(), "Built page tree");
        Ok(forest.into_nested())
    }

    /// A visible page by id
    pub async fn get_by_id(&self, id: Uuid) -> Result<Page, PageServiceError> {
        let conn = self.read_conn().await?;
        Self::load_visible(&PageStore::new(&conn), &id).await
    }

    /// Visible direct children of a visible page, in sibling order
    pub async fn get_children(&self, parent_id: Uuid) -> Result<Vec<Page>, PageServiceError> {
        let conn = self.read_conn().await?;
        let store = PageStore::new(&conn);
        Self::load_visible(&store, &parent_id).await?;
        Ok(store.get_visible_children(&parent_id).await?)
    }

    /// Visible ancestors from the top-level page down to the direct parent
    ///
    /// A top-level page yields itself. Ancestors that are in the trash are
    /// skipped.
    pub async fn get_ancestors(&self, id: Uuid) -> Result<Vec<Page>, PageServiceError> {
        let conn = self.read_conn().await?;
        let store = PageStore::new(&conn);
        let page = Self::load_visible(&store, &id).await?;

        if page.path.is_root() {
            return Ok(vec![page]);
        }
        Ok(store.get_visible_by_ids(page.path.ancestor_ids()).await?)
    }

    /// Visible chain from the top-level page down to and including `id`
    pub async fn get_breadcrumb(&self, id: Uuid) -> Result<Vec<Page>, PageServiceError> {
        let conn = self.read_conn().await?;
        let store = PageStore::new(&conn);
        let page = Self::load_visible(&store, &id).await?;

        let mut chain = store.get_visible_by_ids(page.path.ancestor_ids()).await?;
        chain.push(page);
        Ok(chain)
    }

    //
    // WRITES
    //

    /// Create a page at the end of its sibling list
    ///
    /// The identifier is allocated by the store, so the row is inserted with
    /// a provisional path and patched once the id is known. Both steps share
    /// one transaction and no reader ever sees the provisional path.
    #[instrument(skip(self, input), fields(title = %input.title, parent = ?input.parent_id))]
    pub async fn create_page(
        &self,
        input: CreatePageInput,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        input.validate()?;

        let tx = self.db.begin_write().await?;
        let result = Self::insert_page(&tx, &input, actor).await;
        let page = tx.finish(result).await?;

        info!(id = %page.id, path = %page.path, "Created page");
        Ok(page)
    }

    async fn insert_page(
        conn: &Connection,
        input: &CreatePageInput,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        let store = PageStore::new(conn);

        let parent = match input.parent_id {
            Some(parent_id) => Some(
                store
                    .fetch_page(&parent_id)
                    .await?
                    .filter(|page| !page.is_deleted)
                    .ok_or_else(|| PageServiceError::parent_not_found(parent_id))?,
            ),
            None => None,
        };
        let parent_path = parent.as_ref().map(|p| &p.path);

        let position = store.next_sibling_position(input.parent_id.as_ref()).await?;

        let id = store
            .insert_provisional(&NewPageRow {
                title: &input.title,
                content: input.content.as_deref(),
                icon: input.icon.as_deref(),
                category: input.category.as_deref(),
                parent_id: input.parent_id,
                provisional_path: MaterializedPath::provisional_label(parent_path),
                position,
                actor,
                now: Utc::now(),
            })
            .await?;

        let path = match parent_path {
            Some(parent_path) => parent_path.child(id),
            None => MaterializedPath::root(id),
        };
        store.set_path(&id, &path).await?;

        store
            .fetch_page(&id)
            .await?
            .ok_or_else(|| PageServiceError::internal(format!("Page {id} vanished during create")))
    }

    /// Apply a partial update to a visible page's non-structural fields
    #[instrument(skip(self, update))]
    pub async fn update_page(
        &self,
        id: Uuid,
        update: PageUpdate,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        update.validate()?;

        let tx = self.db.begin_write().await?;
        let result = async {
            let store = PageStore::new(&tx);
            Self::load_visible(&store, &id).await?;
            store.update_fields(&id, &update, actor, Utc::now()).await?;
            store
                .fetch_page(&id)
                .await?
                .ok_or_else(|| PageServiceError::page_not_found(id))
        }
        .await;
        tx.finish(result).await
    }

    //
    // STRUCTURE AND LIFECYCLE
    //

    /// See [`MoveEngine::move_page`]
    pub async fn move_page(
        &self,
        id: Uuid,
        input: MovePageInput,
        actor: &str,
    ) -> Result<Page, PageServiceError> {
        self.mover.move_page(id, &input, actor).await
    }

    pub async fn delete_page(&self, id: Uuid, actor: &str) -> Result<u64, PageServiceError> {
        self.trash.delete_page(id, actor).await
    }

    pub async fn restore_page(&self, id: Uuid, actor: &str) -> Result<u64, PageServiceError> {
        self.trash.restore_page(id, actor).await
    }

    pub async fn permanent_delete_page(&self, id: Uuid) -> Result<u64, PageServiceError> {
        self.trash.permanent_delete_page(id).await
    }

    pub async fn list_trash(&self) -> Result<Vec<Page>, PageServiceError> {
        self.trash.list_trash().await
    }
}
