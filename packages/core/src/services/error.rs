//! Service Layer Error Types
//!
//! The four outcomes a tree operation can fail with. The HTTP layer maps
//! each variant to one status code.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use crate::tree::PathError;
use thiserror::Error;

/// Page service operation errors
#[derive(Error, Debug)]
pub enum PageServiceError {
    /// A referenced page is absent or not in the state the operation expects
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Structurally invalid request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A stored or supplied path could not be decoded
    #[error("Malformed path: {0}")]
    MalformedPath(#[from] PathError),

    /// Transaction or storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageServiceError {
    /// Create a page not found error
    pub fn page_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            what: "Page",
            id: id.to_string(),
        }
    }

    /// Create a not found error for a parent or move destination
    pub fn parent_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            what: "Parent page",
            id: id.to_string(),
        }
    }

    /// Create a not found error for a restore or purge target
    pub fn deleted_page_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            what: "Deleted page",
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a cycle error for a move below the page itself
    pub fn cycle(id: impl ToString, destination: impl ToString) -> Self {
        Self::Validation(format!(
            "Cannot move page {} under itself or its descendant {}",
            id.to_string(),
            destination.to_string()
        ))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ValidationError> for PageServiceError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DatabaseError> for PageServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::MalformedPath(path_err) => Self::MalformedPath(path_err),
            other => Self::Internal(other.to_string()),
        }
    }
}
