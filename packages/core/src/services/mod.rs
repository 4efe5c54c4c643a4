//! Business Services
//!
//! - `PageService` - reads, creation and updates; the entry point callers use
//! - `MoveEngine` - subtree relocation with cycle rejection
//! - `TrashManager` - soft delete, restore and permanent delete cascades
//!
//! Every structural write runs as a single write transaction, so a cascade
//! either lands on the whole subtree or not at all.

pub mod error;
pub mod move_engine;
pub mod page_service;
pub mod trash;

pub use error::PageServiceError;
pub use move_engine::MoveEngine;
pub use page_service::PageService;
pub use trash::TrashManager;
