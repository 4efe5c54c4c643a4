//! Tree Structure Utilities
//!
//! Pure, storage-independent pieces of the page hierarchy:
//!
//! - [`path`] - identifier ↔ segment codec and the decoded `MaterializedPath`
//! - [`builder`] - assembles flat, path-ordered rows into a forest

pub mod builder;
pub mod path;

pub use builder::PageForest;
pub use path::{MaterializedPath, PathCodec, PathError, ROOT_LABEL, SEPARATOR};
