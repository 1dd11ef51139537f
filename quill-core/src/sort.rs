//! Allow-listed sort keys for listing comments
//!
//! The ORDER BY clause is only ever built from the fixed expressions below;
//! caller text is parsed into an enum or rejected.

use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Column a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Content,
    Author,
    CreatedAt,
}

impl SortKey {
    /// Column name as it appears in the query string and the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Content => "content",
            Self::Author => "author",
            Self::CreatedAt => "created_at",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "content" => Some(Self::Content),
            "author" => Some(Self::Author),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Parsed `sort` parameter: `id`, `-id`, `author`, `-created_at`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Sort {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Fixed ORDER BY expression, with `id` as tiebreaker for stable pages.
    pub fn order_by(&self) -> &'static str {
        use SortDirection::*;
        use SortKey::*;

        match (self.key, self.direction) {
            (Id, Asc) => "id ASC",
            (Id, Desc) => "id DESC",
            (Content, Asc) => "content ASC, id ASC",
            (Content, Desc) => "content DESC, id ASC",
            (Author, Asc) => "author ASC, id ASC",
            (Author, Desc) => "author DESC, id ASC",
            (CreatedAt, Asc) => "created_at ASC, id ASC",
            (CreatedAt, Desc) => "created_at DESC, id ASC",
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new(SortKey::Id, SortDirection::Asc)
    }
}

impl FromStr for Sort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (direction, column) = match s.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, s),
        };

        SortKey::parse(column)
            .map(|key| Self::new(key, direction))
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "sort",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Desc {
            f.write_str("-")?;
        }
        f.write_str(self.key.as_str())
    }
}
