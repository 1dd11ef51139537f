//! In-memory comment store
//!
//! Same contract as the Postgres store: version compare-and-swap happens
//! inside one critical section, so racing updates resolve exactly like a
//! conditional `UPDATE`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{CommentStore, ListQuery};
use crate::{
    Comment, CommentUpdate, NewComment, Page, PageMetadata, SortDirection, SortKey, StoreError,
    StoreResult,
};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    rows: BTreeMap<i64, Comment>,
}

/// Comment store backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryCommentStore {
    inner: Mutex<Inner>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

}

fn compare(key: SortKey, a: &Comment, b: &Comment) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Content => a.content.cmp(&b.content),
        SortKey::Author => a.author.cmp(&b.author),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, new: NewComment) -> StoreResult<Comment> {
        let mut inner = self.inner.lock().await;
        inner.last_id += 1;

        let comment = Comment {
            id: inner.last_id,
            content: new.content.into_string(),
            author: new.author.into_string(),
            created_at: Utc::now(),
            version: 1,
        };
        inner.rows.insert(comment.id, comment.clone());

        Ok(comment)
    }

    async fn get(&self, id: i64) -> StoreResult<Comment> {
        if id < 1 {
            return Err(StoreError::NotFound { id });
        }

        self.inner
            .lock()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn update(&self, update: CommentUpdate) -> StoreResult<Comment> {
        let mut inner = self.inner.lock().await;

        match inner.rows.get_mut(&update.id) {
            Some(row) if row.version == update.expected_version => {
                row.content = update.content.into_string();
                row.author = update.author.into_string();
                row.version += 1;
                Ok(row.clone())
            }
            _ => Err(StoreError::EditConflict { id: update.id }),
        }
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound { id });
        }

        match self.inner.lock().await.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { id }),
        }
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Page<Comment>> {
        let inner = self.inner.lock().await;

        let mut rows: Vec<&Comment> = inner.rows.values().collect();
        rows.sort_by(|a, b| {
            let primary = compare(query.sort.key, a, b);
            let primary = match query.sort.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = rows.len() as u64;
        let items = rows
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            metadata: PageMetadata::compute(total, query.page.page(), query.page.page_size()),
        })
    }
}
