//! Comment storage contract
//!
//! # Design Principles
//!
//! - Optimistic concurrency: updates are a compare-and-swap on `version`
//! - Zero rows touched by a conditional update is always `EditConflict`
//! - Listing returns rows and the total count from one query
//! - Every backend call is bounded by a deadline (`with_deadline`)
//!
//! Stores hold no per-request state and are shared as `Arc<dyn CommentStore>`.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Comment, CommentUpdate, NewComment, Page, PageRequest, Sort, StoreError, StoreResult};

pub use memory::MemoryCommentStore;

/// Deadline applied to each store call unless configured otherwise
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3);

/// Parameters for listing comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub sort: Sort,
}

/// CRUD over comments with optimistic concurrency control
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a comment. The store assigns id, `created_at` and version 1.
    async fn insert(&self, new: NewComment) -> StoreResult<Comment>;

    /// Fetch a comment. Ids below 1 are `NotFound` without a backend call.
    async fn get(&self, id: i64) -> StoreResult<Comment>;

    /// Conditionally replace content and author.
    ///
    /// Succeeds only while the stored version equals `expected_version`, and
    /// returns the record with its incremented version. A missing id and a
    /// stale version are both reported as `EditConflict`; callers that need
    /// to tell them apart fetch the record first.
    async fn update(&self, update: CommentUpdate) -> StoreResult<Comment>;

    /// Hard delete. `NotFound` when nothing was removed.
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// One page of comments plus metadata for the whole table.
    async fn list(&self, query: &ListQuery) -> StoreResult<Page<Comment>>;
}

/// Run a store call, failing with `Timeout` once `deadline` has passed.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "store call timed out");
            Err(StoreError::Timeout { after: deadline })
        }
    }
}
