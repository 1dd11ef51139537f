//! quill-core: comment records and the storage contract
//!
//! Everything the HTTP layer needs to talk about comments without knowing
//! which database sits underneath:
//! - Validated record types (`Comment`, `NewComment`, `CommentPatch`)
//! - Allow-listed sort keys for listing
//! - Page metadata derived from a window count
//! - The `CommentStore` trait plus an in-memory implementation

pub mod error;
pub mod pagination;
pub mod record;
pub mod sort;
pub mod store;
pub mod validation;

pub use error::{StoreError, StoreResult};
pub use pagination::{Page, PageMetadata, PageRequest};
pub use record::{AuthorName, Comment, CommentContent, CommentPatch, CommentUpdate, NewComment};
pub use sort::{Sort, SortDirection, SortKey};
pub use store::{with_deadline, CommentStore, ListQuery, MemoryCommentStore, DEFAULT_DEADLINE};
pub use validation::ValidationError;
