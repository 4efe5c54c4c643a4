//! Materialized Path Encoding
//!
//! Every page stores its ancestry as a dotted label string in the style of a
//! PostgreSQL `ltree`:
//!
//! ```text
//! root.<segment>.<segment>...<own segment>
//! ```
//!
//! `root` is the implicit sentinel shared by every top-level page. Each
//! segment is the page's UUID with `-` substituted by `_`, because `-` is not
//! a valid label character and `.` is the structural separator. UUIDs never
//! contain `_`, so the substitution is lossless.
//!
//! # Examples
//!
//! ```rust
//! use cotion_core::tree::{MaterializedPath, PathCodec};
//! use uuid::Uuid;
//!
//! let parent = Uuid::new_v4();
//! let child = Uuid::new_v4();
//!
//! let path = MaterializedPath::root(parent).child(child);
//! assert_eq!(path.last(), child);
//! assert_eq!(PathCodec::decode(&PathCodec::encode(&child)).unwrap(), child);
//! ```

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// Label every stored path starts with
pub const ROOT_LABEL: &str = "root";

/// Structural separator between labels
pub const SEPARATOR: char = '.';

/// Stands in for `-` inside a segment
const HYPHEN_SUBSTITUTE: &str = "_";

/// Errors raised while decoding stored or supplied paths
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path '{path}' does not start with the 'root' label")]
    MissingRootLabel { path: String },

    #[error("Path '{path}' has no page segment")]
    Empty { path: String },

    #[error("Malformed path segment '{segment}': {reason}")]
    MalformedSegment { segment: String, reason: String },
}

impl PathError {
    fn malformed(segment: &str, reason: impl Into<String>) -> Self {
        Self::MalformedSegment {
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}_[0-9a-f]{4}_[0-9a-f]{4}_[0-9a-f]{4}_[0-9a-f]{12}$")
            .expect("segment pattern is a valid regex")
    })
}

/// Reversible mapping between a page identifier and its path segment
pub struct PathCodec;

impl PathCodec {
    /// Encode an identifier as a path segment
    pub fn encode(id: &Uuid) -> String {
        id.hyphenated().to_string().replace('-', HYPHEN_SUBSTITUTE)
    }

    /// Decode a path segment back into the identifier it was produced from
    ///
    /// Only the exact shape produced by [`PathCodec::encode`] is accepted:
    /// lowercase hex in 8-4-4-4-12 groups joined by `_`.
    pub fn decode(segment: &str) -> Result<Uuid, PathError> {
        if segment.len() != 36 {
            return Err(PathError::malformed(
                segment,
                format!("expected 36 characters, found {}", segment.len()),
            ));
        }
        if !segment_pattern().is_match(segment) {
            return Err(PathError::malformed(
                segment,
                "segment contains characters outside [0-9a-f_] or misplaced separators",
            ));
        }

        let hyphenated = segment.replace(HYPHEN_SUBSTITUTE, "-");
        Uuid::parse_str(&hyphenated).map_err(|e| PathError::malformed(segment, e.to_string()))
    }
}

/// Decoded ancestry of a page, from the top-level ancestor down to the page
///
/// Never empty: the last element is always the page's own identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterializedPath {
    segments: Vec<Uuid>,
}

impl MaterializedPath {
    /// Path of a top-level page
    pub fn root(id: Uuid) -> Self {
        Self { segments: vec![id] }
    }

    /// Path of a direct child of the page at `self`
    pub fn child(&self, id: Uuid) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(id);
        Self { segments }
    }

    /// Label written to a freshly inserted row before its identifier is known
    ///
    /// This is the parent's full label, or the bare sentinel for a top-level
    /// page. It never decodes as a valid path on its own.
    pub fn provisional_label(parent: Option<&MaterializedPath>) -> String {
        match parent {
            Some(path) => path.to_string(),
            None => ROOT_LABEL.to_string(),
        }
    }

    /// Parse a stored label string
    pub fn parse(label: &str) -> Result<Self, PathError> {
        let mut parts = label.split(SEPARATOR);
        if parts.next() != Some(ROOT_LABEL) {
            return Err(PathError::MissingRootLabel {
                path: label.to_string(),
            });
        }

        let segments = parts
            .map(PathCodec::decode)
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err(PathError::Empty {
                path: label.to_string(),
            });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Uuid] {
        &self.segments
    }

    /// Number of segments (1 for a top-level page)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Identifier encoded in the final segment
    pub fn last(&self) -> Uuid {
        // Non-empty by construction
        self.segments[self.segments.len() - 1]
    }

    /// Identifiers of every ancestor, top-level first
    pub fn ancestor_ids(&self) -> &[Uuid] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Identifier of the direct parent, `None` for a top-level page
    pub fn parent_id(&self) -> Option<Uuid> {
        self.ancestor_ids().last().copied()
    }

    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Whether `self` equals `other` or is one of its ancestors
    pub fn is_prefix_of(&self, other: &MaterializedPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Whether `other` is a strict descendant of `self`
    pub fn is_proper_prefix_of(&self, other: &MaterializedPath) -> bool {
        other.segments.len() > self.segments.len() && self.is_prefix_of(other)
    }

    /// Half-open label range `(lower, upper)` covering every strict descendant
    ///
    /// A descendant label is `<self>.<...>`. Since `.` is immediately followed
    /// by `/` in byte order, `lower < label < upper` selects exactly those
    /// labels and can be answered from a B-tree index on the path column.
    pub fn descendant_range(&self) -> (String, String) {
        let label = self.to_string();
        (format!("{label}{SEPARATOR}"), format!("{label}/"))
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_LABEL)?;
        for id in &self.segments {
            write!(f, "{SEPARATOR}{}", PathCodec::encode(id))?;
        }
        Ok(())
    }
}

impl FromStr for MaterializedPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MaterializedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MaterializedPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label).map_err(serde::de::Error::custom)
    }
}
