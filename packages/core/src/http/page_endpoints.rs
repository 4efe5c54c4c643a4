//! Page endpoints
//!
//! - `GET /health` - Health check (no user required)
//! - `GET /pages` - Nested tree of visible pages
//! - `POST /pages` - Create a page
//! - `GET /pages/trash/all` - Trashed pages, most recent first
//! - `GET /pages/:id` - A visible page
//! - `PUT /pages/:id` - Partial update of non-structural fields
//! - `DELETE /pages/:id` - Move a subtree to the trash
//! - `PUT /pages/:id/restore` - Restore a trashed subtree
//! - `DELETE /pages/:id/permanent` - Permanently delete a trashed subtree
//! - `GET /pages/:id/children` - Visible direct children
//! - `GET /pages/:id/breadcrumb` - Visible chain from the top down to the page
//! - `PUT /pages/:id/move` - Reparent a subtree

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    middleware,
    response::Json,
    routing::{delete, get, put},
    Extension, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::{require_actor, Actor, ApiResponse, AppState, HttpError};
use crate::models::{CreatePageInput, MovePageInput, Page, PageTreeNode, PageUpdate};

type PageId = Result<Path<Uuid>, PathRejection>;
type Body<T> = Result<Json<T>, JsonRejection>;
type ApiResult<T> = Result<ApiResponse<T>, HttpError>;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Outcome of a trash operation
#[derive(Debug, Serialize)]
pub struct TrashOutcome {
    pub message: &'static str,
    pub affected: u64,
}

async fn health_check() -> ApiResponse<HealthStatus> {
    ApiResponse::ok(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_tree(State(state): State<AppState>) -> ApiResult<Vec<PageTreeNode>> {
    Ok(ApiResponse::ok(state.pages.get_tree().await?))
}

async fn create_page(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    body: Body<CreatePageInput>,
) -> ApiResult<Page> {
    let Json(input) = body?;
    let page = state.pages.create_page(input, &actor).await?;
    Ok(ApiResponse::created(page))
}

async fn list_trash(State(state): State<AppState>) -> ApiResult<Vec<Page>> {
    Ok(ApiResponse::ok(state.pages.list_trash().await?))
}

async fn get_page(State(state): State<AppState>, id: PageId) -> ApiResult<Page> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.pages.get_by_id(id).await?))
}

async fn update_page(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    id: PageId,
    body: Body<PageUpdate>,
) -> ApiResult<Page> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(ApiResponse::ok(
        state.pages.update_page(id, update, &actor).await?,
    ))
}

async fn delete_page(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    id: PageId,
) -> ApiResult<TrashOutcome> {
    let Path(id) = id?;
    let affected = state.pages.delete_page(id, &actor).await?;
    Ok(ApiResponse::ok(TrashOutcome {
        message: "Page moved to trash",
        affected,
    }))
}

async fn restore_page(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    id: PageId,
) -> ApiResult<TrashOutcome> {
    let Path(id) = id?;
    let affected = state.pages.restore_page(id, &actor).await?;
    Ok(ApiResponse::ok(TrashOutcome {
        message: "Page restored",
        affected,
    }))
}

async fn permanent_delete_page(State(state): State<AppState>, id: PageId) -> ApiResult<TrashOutcome> {
    let Path(id) = id?;
    let affected = state.pages.permanent_delete_page(id).await?;
    Ok(ApiResponse::ok(TrashOutcome {
        message: "Page permanently deleted",
        affected,
    }))
}

async fn get_children(State(state): State<AppState>, id: PageId) -> ApiResult<Vec<Page>> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.pages.get_children(id).await?))
}

async fn get_breadcrumb(State(state): State<AppState>, id: PageId) -> ApiResult<Vec<Page>> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.pages.get_breadcrumb(id).await?))
}

async fn move_page(
    State(state): State<AppState>,
    Extension(Actor(actor)): Extension<Actor>,
    id: PageId,
    body: Body<MovePageInput>,
) -> ApiResult<Page> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(ApiResponse::ok(state.pages.move_page(id, input, &actor).await?))
}

/// Page routes, all of which require an acting user
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/pages", get(get_tree).post(create_page))
        .route("/pages/trash/all", get(list_trash))
        .route(
            "/pages/:id",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/pages/:id/restore", put(restore_page))
        .route("/pages/:id/permanent", delete(permanent_delete_page))
        .route("/pages/:id/children", get(get_children))
        .route("/pages/:id/breadcrumb", get(get_breadcrumb))
        .route("/pages/:id/move", put(move_page))
        .route_layer(middleware::from_fn(require_actor))
        .with_state(state)
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}
