//! Data Models
//!
//! - `Page` - tree node as persisted and returned to callers
//! - `PageTreeNode` - nested presentation form
//! - Request payloads (`CreatePageInput`, `PageUpdate`, `MovePageInput`)

mod page;

pub use page::{
    CreatePageInput, MovePageInput, Page, PageTreeNode, PageUpdate, ValidationError,
    MAX_CATEGORY_LEN, MAX_ICON_LEN, MAX_POSITION, MAX_TITLE_LEN,
};
