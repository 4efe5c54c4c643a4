//! Cotion Core - Page Tree Store
//!
//! This crate stores an arbitrarily deep tree of pages and keeps it
//! consistent under structural edits: creation, moves that relocate whole
//! subtrees, and the trash lifecycle (soft delete, restore, permanent delete).
//!
//! # Architecture
//!
//! - **Materialized paths**: each page stores `root.<seg>...<own seg>`, so
//!   ancestry and subtree membership are answered from one indexed column
//! - **libsql**: embedded SQLite-compatible database in WAL mode
//! - **One transaction per cascade**: a move or trash operation lands on the
//!   whole subtree or not at all
//!
//! # Modules
//!
//! - [`models`] - Page data structures and request payloads
//! - [`tree`] - Path codec and the forest builder
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - PageService, MoveEngine and TrashManager
//! - [`http`] - axum routes and the response envelope
//! - [`config`] - Runtime configuration from the environment

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod services;
pub mod tree;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DatabaseError, DatabaseService};
pub use models::*;
pub use services::*;
pub use tree::{MaterializedPath, PageForest, PathCodec, PathError};
