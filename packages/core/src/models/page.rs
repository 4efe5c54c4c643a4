//! Page Data Structures
//!
//! A page is a node of the document tree. Structural fields (`path`,
//! `parent_id`, `position`) are owned by the store and only change through
//! creation, moves and trash operations. Everything else is presentation
//! metadata or the opaque `content` blob handed over by the editing layer.

use crate::tree::MaterializedPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_ICON_LEN: usize = 50;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_POSITION: i64 = i32::MAX as i64;

/// Request payload validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Position must be zero or greater, got {0}")]
    NegativePosition(i64),

    #[error("Position must not exceed {max}, got {position}")]
    PositionTooLarge { position: i64, max: i64 },

    #[error("Field '{0}' must be an http(s) URL")]
    InvalidUrl(&'static str),
}

/// A node of the page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,

    pub title: String,

    /// Serialized editor document, stored and returned verbatim
    pub content: Option<String>,

    pub icon: Option<String>,

    pub cover_image: Option<String>,

    pub category: Option<String>,

    /// Ancestry label, top-level ancestor first, ending with this page
    pub path: MaterializedPath,

    /// Direct parent (`None` for top-level pages)
    pub parent_id: Option<Uuid>,

    /// Sibling ordering hint, not unique and not contiguous
    pub position: i64,

    pub created_by: Option<String>,

    pub updated_by: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub is_deleted: bool,

    pub deleted_at: Option<DateTime<Utc>>,
}

impl Page {
    /// Whether the final path segment decodes to this page's own id
    pub fn path_matches_id(&self) -> bool {
        self.path.last() == self.id
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Nested presentation form produced by the tree builder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTreeNode {
    #[serde(flatten)]
    pub page: Page,

    pub children: Vec<PageTreeNode>,
}

/// Input for creating a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageInput {
    pub title: String,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub category: Option<String>,
}

impl CreatePageInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        check_len("icon", self.icon.as_deref(), MAX_ICON_LEN)?;
        check_len("category", self.category.as_deref(), MAX_CATEGORY_LEN)
    }
}

/// Accept either a value or `null`, distinguishing both from a missing field
///
/// - Missing field → None (don't update)
/// - null → Some(None) (clear)
/// - "value" → Some(Some("value"))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial update of non-structural page fields
///
/// Path, parent and position are deliberately absent: they can only change
/// through a move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    /// Double-Option: `Some(None)` clears the category
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub category: Option<Option<String>>,
}

impl PageUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        check_len("icon", self.icon.as_deref(), MAX_ICON_LEN)?;
        if let Some(url) = &self.cover_image {
            validate_url("coverImage", url)?;
        }
        check_len(
            "category",
            self.category.as_ref().and_then(|c| c.as_deref()),
            MAX_CATEGORY_LEN,
        )
    }
}

/// Input for relocating a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePageInput {
    /// New parent, `None` moves the page to the top level
    #[serde(default)]
    pub new_parent_id: Option<Uuid>,

    /// New sibling position, `None` keeps the current one
    #[serde(default)]
    pub position: Option<i64>,
}

impl MovePageInput {
    pub fn to_root() -> Self {
        Self::default()
    }

    pub fn to_parent(parent_id: Uuid) -> Self {
        Self {
            new_parent_id: Some(parent_id),
            position: None,
        }
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.position {
            Some(position) if position < 0 => Err(ValidationError::NegativePosition(position)),
            Some(position) if position > MAX_POSITION => Err(ValidationError::PositionTooLarge {
                position,
                max: MAX_POSITION,
            }),
            _ => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    check_len("title", Some(title), MAX_TITLE_LEN)
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or(ValidationError::InvalidUrl(field))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUrl(field));
    }
    Ok(())
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_input_requires_title() {
        assert_eq!(
            CreatePageInput::new("   ").validate(),
            Err(ValidationError::MissingField("title"))
        );
        assert!(CreatePageInput::new("Meeting notes").validate().is_ok());
    }

    #[test]
    fn test_create_input_length_limits() {
        let long_title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            CreatePageInput::new(long_title).validate(),
            Err(ValidationError::TooLong { field: "title", .. })
        ));

        let input = CreatePageInput::new("ok").with_category("c".repeat(MAX_CATEGORY_LEN + 1));
        assert!(matches!(
            input.validate(),
            Err(ValidationError::TooLong { field: "category", .. })
        ));

        // Multi-byte characters count once
        let emoji_icon = CreatePageInput {
            icon: Some("📄".repeat(MAX_ICON_LEN)),
            ..CreatePageInput::new("ok")
        };
        assert!(emoji_icon.validate().is_ok());
    }

    #[test]
    fn test_create_input_deserializes_camel_case() {
        let parent = Uuid::new_v4();
        let input: CreatePageInput = serde_json::from_value(json!({
            "title": "Child",
            "parentId": parent.to_string(),
        }))
        .unwrap();

        assert_eq!(input.parent_id, Some(parent));
        assert!(input.content.is_none());
    }

    #[test]
    fn test_update_category_double_option() {
        let missing: PageUpdate = serde_json::from_value(json!({ "title": "New" })).unwrap();
        assert_eq!(missing.category, None);

        let cleared: PageUpdate = serde_json::from_value(json!({ "category": null })).unwrap();
        assert_eq!(cleared.category, Some(None));

        let set: PageUpdate = serde_json::from_value(json!({ "category": "work" })).unwrap();
        assert_eq!(set.category, Some(Some("work".to_string())));
    }

    #[test]
    fn test_update_cover_image_must_be_url() {
        let cover = |url: &str| PageUpdate {
            cover_image: Some(url.to_string()),
            ..Default::default()
        };

        assert!(cover("https://images.example.com/cover.png").validate().is_ok());
        assert!(cover("http://localhost:5173/a.jpg").validate().is_ok());
        for bad in ["cover.png", "ftp://host/file", "https://", "https:///x", "https://a b"] {
            assert_eq!(
                cover(bad).validate(),
                Err(ValidationError::InvalidUrl("coverImage")),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_move_input_rejects_negative_position() {
        let input = MovePageInput::to_root().at_position(-1);
        assert_eq!(input.validate(), Err(ValidationError::NegativePosition(-1)));
        assert!(MovePageInput::to_parent(Uuid::new_v4())
            .at_position(0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_move_input_position_upper_bound() {
        assert!(MovePageInput::to_root()
            .at_position(MAX_POSITION)
            .validate()
            .is_ok());
        assert_eq!(
            MovePageInput::to_root().at_position(i64::MAX).validate(),
            Err(ValidationError::PositionTooLarge {
                position: i64::MAX,
                max: MAX_POSITION,
            })
        );
    }

    #[test]
    fn test_page_serializes_camel_case_with_label_path() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let page = Page {
            id,
            title: "Root".to_string(),
            content: None,
            icon: None,
            cover_image: None,
            category: None,
            path: MaterializedPath::root(id),
            parent_id: None,
            position: 0,
            created_by: Some("user-1".to_string()),
            updated_by: Some("user-1".to_string()),
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        };

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["path"], json!(page.path.to_string()));
        assert_eq!(value["isDeleted"], json!(false));
        assert!(value.get("parentId").is_some());
        assert!(page.path_matches_id());
        assert!(page.is_root());
    }
}
