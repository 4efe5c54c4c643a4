//! Database Layer
//!
//! All persistence goes through an embedded libsql database:
//!
//! - `DatabaseService` - connection management and schema initialization
//! - `WriteTransaction` - a `BEGIN IMMEDIATE` unit of work on its own connection
//! - `PageStore` - the SQL for reading and mutating the `pages` table
//!
//! Services own the transactions; the store only issues statements against
//! whatever connection it is handed.

mod database;
mod error;
mod page_store;

pub use database::{format_timestamp, parse_timestamp, DatabaseService, WriteTransaction};
pub use error::DatabaseError;
pub use page_store::{NewPageRow, PageStore, Relocation};
