//! HTTP boundary for the page tree
//!
//! A thin axum layer over [`PageService`]. Handlers parse ids and bodies,
//! take the acting user from the `x-user-id` header set by the upstream
//! auth collaborator, and wrap results in the response envelope:
//!
//! ```text
//! { "success": true,  "data": ... }
//! { "success": false, "error": { "code", "message", "details"? } }
//! ```
//!
//! # Usage
//!
//! ```no_run
//! # use cotion_core::{config::AppConfig, db::DatabaseService, services::PageService};
//! # use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let db = Arc::new(DatabaseService::new(config.database_path.clone()).await?);
//! cotion_core::http::serve(&config, PageService::new(db)).await?;
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::services::PageService;

mod error;
mod page_endpoints;

pub use error::HttpError;

/// Header carrying the authenticated user's id
pub const ACTOR_HEADER: &str = "x-user-id";

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<PageService>,
}

impl AppState {
    pub fn new(pages: PageService) -> Self {
        Self {
            pages: Arc::new(pages),
        }
    }
}

/// Acting user, inserted by [`require_actor`] for every page route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Reject requests without an acting user
async fn require_actor(mut req: Request, next: Next) -> Result<Response, HttpError> {
    let actor = req
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HttpError::unauthorized(format!("Missing {ACTOR_HEADER} header")))?;

    req.extensions_mut().insert(Actor(actor));
    Ok(next.run(req).await)
}

/// Create the application router
///
/// CORS is added by [`serve`]; tests drive this router directly.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(page_endpoints::routes(state))
        .merge(page_endpoints::health_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// CORS layer allowing the configured browser origin
pub fn cors_layer(origin: &str) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let origin = origin.parse::<HeaderValue>()?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(ACTOR_HEADER),
        ])
        .allow_credentials(true))
}

/// Bind to the configured port and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the CORS origin is not a valid header value or the
/// server fails to bind or start.
pub async fn serve(config: &AppConfig, pages: PageService) -> anyhow::Result<()> {
    let app = create_router(AppState::new(pages)).layer(cors_layer(&config.cors_origin)?);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);
    tracing::info!("CORS enabled for {}", config.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
