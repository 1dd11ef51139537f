//! Comment records and their validated fields
//!
//! Content and author only exist as validated newtypes, so a store never
//! sees a string that breaks the length rules.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ValidationError;

/// Maximum length for comment content in bytes
pub const MAX_CONTENT_LEN: usize = 100;

/// Maximum length for author names in bytes
pub const MAX_AUTHOR_LEN: usize = 25;

/// A stored comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author: String,
    /// Kept for ordering; not part of the JSON representation
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

fn check_bounded(field: &'static str, s: &str, max: usize) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if s.len() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Validated comment content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContent(String);

impl CommentContent {
    /// Create new comment content.
    ///
    /// # Rules
    /// - Must not be empty
    /// - Max 100 bytes
    ///
    /// # Example
    /// ```
    /// use quill_core::CommentContent;
    ///
    /// assert!(CommentContent::new("hello").is_ok());
    /// assert!(CommentContent::new("").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        check_bounded("content", s, MAX_CONTENT_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Validated author name (non-empty, max 25 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        check_bounded("author", s, MAX_AUTHOR_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: CommentContent,
    pub author: AuthorName,
}

impl NewComment {
    /// Validate raw input into a new comment.
    pub fn new(content: &str, author: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            content: CommentContent::new(content)?,
            author: AuthorName::new(author)?,
        })
    }
}

/// A conditional write: applies only while the stored version equals
/// `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentUpdate {
    pub id: i64,
    pub expected_version: i32,
    pub content: CommentContent,
    pub author: AuthorName,
}

/// Partial update with optional fields.
///
/// Present fields replace the stored values; the merged record is validated
/// as a whole before it is turned into a `CommentUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPatch {
    pub content: Option<String>,
    pub author: Option<String>,
}

impl CommentPatch {
    /// Merge onto `current` and validate the result.
    ///
    /// The expected version is the version of `current`.
    pub fn apply(&self, current: &Comment) -> Result<CommentUpdate, ValidationError> {
        let content = self.content.as_deref().unwrap_or(&current.content);
        let author = self.author.as_deref().unwrap_or(&current.author);

        Ok(CommentUpdate {
            id: current.id,
            expected_version: current.version,
            content: CommentContent::new(content)?,
            author: AuthorName::new(author)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Comment {
        Comment {
            id: 4,
            content: "first draft".into(),
            author: "alice".into(),
            created_at: Utc::now(),
            version: 3,
        }
    }

    #[test]
    fn content_bounds() {
        assert!(CommentContent::new(&"a".repeat(100)).is_ok());
        let err = CommentContent::new(&"a".repeat(101)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "content",
                max: 100
            }
        );
        assert_eq!(
            CommentContent::new("").unwrap_err(),
            ValidationError::Empty { field: "content" }
        );
    }

    #[test]
    fn author_bounds_count_bytes() {
        assert!(AuthorName::new(&"b".repeat(25)).is_ok());
        // 13 two-byte chars = 26 bytes
        let err = AuthorName::new(&"é".repeat(13)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "author", max: 25 }));
    }

    #[test]
    fn new_comment_reports_first_bad_field() {
        let err = NewComment::new("hello", "").unwrap_err();
        assert_eq!(err.field(), "author");
    }

    #[test]
    fn patch_merges_present_fields() {
        let patch = CommentPatch {
            content: Some("second draft".into()),
            author: None,
        };
        let update = patch.apply(&stored()).unwrap();
        assert_eq!(update.id, 4);
        assert_eq!(update.expected_version, 3);
        assert_eq!(update.content.as_str(), "second draft");
        assert_eq!(update.author.as_str(), "alice");
    }

    #[test]
    fn empty_patch_keeps_values() {
        let patch = CommentPatch::default();
        let update = patch.apply(&stored()).unwrap();
        assert_eq!(update.content.as_str(), "first draft");
    }

    #[test]
    fn json_omits_created_at() {
        let json = serde_json::to_value(stored()).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["version"], 3);
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn patch_validates_after_merge() {
        let patch = CommentPatch {
            content: None,
            author: Some(String::new()),
        };
        assert_eq!(
            patch.apply(&stored()).unwrap_err(),
            ValidationError::Empty { field: "author" }
        );
    }
}
