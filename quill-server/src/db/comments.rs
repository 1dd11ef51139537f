//! Comment repository backed by Postgres
//!
//! - insert: INSERT ... RETURNING (id, timestamp and version from the DB)
//! - update: conditional UPDATE on (id, version), the compare-and-swap
//! - list: window count alongside each row, one round trip

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::{
    with_deadline, Comment, CommentStore, CommentUpdate, ListQuery, NewComment, Page,
    PageMetadata, StoreError, StoreResult, DEFAULT_DEADLINE,
};
use sqlx::{FromRow, PgPool, Row};

use super::pool::DEFAULT_CONNECT_TIMEOUT;

/// Comment row as selected from the database
#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    author: String,
    created_at: DateTime<Utc>,
    version: i32,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author: row.author,
            created_at: row.created_at,
            version: row.version,
        }
    }
}

/// Postgres implementation of `CommentStore`
#[derive(Debug, Clone)]
pub struct PgCommentStore {
    pool: PgPool,
    deadline: Duration,
    /// Must match the pool's `acquire_timeout`
    acquire_timeout: Duration,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            deadline: DEFAULT_DEADLINE,
            acquire_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the per-call deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Record the acquire timeout the pool was built with.
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    fn backend_error(&self, err: sqlx::Error) -> StoreError {
        match err {
            sqlx::Error::PoolTimedOut => {
                tracing::warn!(
                    waited_ms = self.acquire_timeout.as_millis() as u64,
                    "timed out waiting for a pooled connection"
                );
                StoreError::Timeout {
                    after: self.acquire_timeout,
                }
            }
            other => {
                tracing::error!(error = %other, "comment query failed");
                StoreError::backend(other.to_string())
            }
        }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, new: NewComment) -> StoreResult<Comment> {
        let row = with_deadline(self.deadline, async {
            sqlx::query_as::<_, CommentRow>(
                r#"
                INSERT INTO comments (content, author)
                VALUES ($1, $2)
                RETURNING id, content, author, created_at, version
                "#,
            )
            .bind(new.content.as_str())
            .bind(new.author.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.backend_error(e))
        })
        .await?;

        tracing::debug!(id = row.id, "comment inserted");
        Ok(row.into())
    }

    async fn get(&self, id: i64) -> StoreResult<Comment> {
        if id < 1 {
            return Err(StoreError::NotFound { id });
        }

        with_deadline(self.deadline, async {
            sqlx::query_as::<_, CommentRow>(
                r#"
                SELECT id, content, author, created_at, version
                FROM comments
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.backend_error(e))?
            .map(Comment::from)
            .ok_or(StoreError::NotFound { id })
        })
        .await
    }

    async fn update(&self, update: CommentUpdate) -> StoreResult<Comment> {
        let id = update.id;

        // Zero rows means either the id vanished or the version moved on;
        // one statement cannot tell which, so both are an edit conflict.
        let row = with_deadline(self.deadline, async {
            sqlx::query_as::<_, CommentRow>(
                r#"
                UPDATE comments
                SET content = $1, author = $2, version = version + 1
                WHERE id = $3 AND version = $4
                RETURNING id, content, author, created_at, version
                "#,
            )
            .bind(update.content.as_str())
            .bind(update.author.as_str())
            .bind(update.id)
            .bind(update.expected_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.backend_error(e))?
            .ok_or(StoreError::EditConflict { id })
        })
        .await?;

        tracing::debug!(id, version = row.version, "comment updated");
        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound { id });
        }

        let result = with_deadline(self.deadline, async {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| self.backend_error(e))
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }

        tracing::debug!(id, "comment deleted");
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Page<Comment>> {
        // order_by() only returns fixed expressions from the sort allow-list
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total, id, content, author, created_at, version
            FROM comments
            ORDER BY {}
            LIMIT $1 OFFSET $2
            "#,
            query.sort.order_by()
        );

        with_deadline(self.deadline, async {
            let rows = sqlx::query(&sql)
                .bind(query.page.limit())
                .bind(query.page.offset())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| self.backend_error(e))?;

            let total = match rows.first() {
                Some(row) => row.get::<i64, _>("total"),
                // Past the last page no row carries the window count
                None if query.page.offset() > 0 => {
                    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM comments")
                        .fetch_one(&self.pool)
                        .await
                        .map_err(|e| self.backend_error(e))?
                }
                None => 0,
            };

            let items = rows
                .iter()
                .map(CommentRow::from_row)
                .map(|row| row.map(Comment::from))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| self.backend_error(e))?;

            Ok(Page {
                items,
                metadata: PageMetadata::compute(
                    total.max(0) as u64,
                    query.page.page(),
                    query.page.page_size(),
                ),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, ensure_schema, DatabaseConfig};
    use quill_core::{CommentPatch, PageRequest, Sort};

    // Integration tests - run with DATABASE_URL set
    // cargo test -p quill-server -- --ignored

    fn lazy_store() -> PgCommentStore {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/quill")
            .unwrap();
        PgCommentStore::new(pool)
    }

    #[tokio::test]
    async fn pool_timeout_reports_acquire_wait() {
        let store = lazy_store()
            .with_deadline(Duration::from_secs(10))
            .with_acquire_timeout(Duration::from_secs(5));

        assert_eq!(
            store.backend_error(sqlx::Error::PoolTimedOut),
            StoreError::Timeout {
                after: Duration::from_secs(5)
            }
        );
    }

    #[tokio::test]
    async fn other_sqlx_errors_are_backend_failures() {
        let err = lazy_store().backend_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    async fn store() -> PgCommentStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&DatabaseConfig::new(url))
            .await
            .expect("pool creation failed");
        ensure_schema(&pool).await.expect("schema bootstrap failed");
        PgCommentStore::new(pool)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn insert_then_get() {
        let store = store().await;
        let created = store
            .insert(NewComment::new("hello", "alice").unwrap())
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.version, 1);

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn stale_update_is_edit_conflict() {
        let store = store().await;
        let created = store
            .insert(NewComment::new("hello", "alice").unwrap())
            .await
            .unwrap();

        let patch = CommentPatch {
            content: Some("hi".into()),
            author: None,
        };
        let updated = store.update(patch.apply(&created).unwrap()).await.unwrap();
        assert_eq!(updated.version, 2);

        let stale = CommentPatch {
            content: Some("stale".into()),
            author: None,
        };
        let err = store.update(stale.apply(&created).unwrap()).await.unwrap_err();
        assert_eq!(err, StoreError::EditConflict { id: created.id });
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_updates_one_winner() {
        let store = store().await;
        let created = store
            .insert(NewComment::new("race", "alice").unwrap())
            .await
            .unwrap();

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let store = store.clone();
                let created = created.clone();
                tokio::spawn(async move {
                    let patch = CommentPatch {
                        content: Some(format!("writer {i}")),
                        author: None,
                    };
                    store.update(patch.apply(&created).unwrap()).await
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.expect("task panicked").is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn delete_removes_row() {
        let store = store().await;
        let created = store
            .insert(NewComment::new("bye", "bob").unwrap())
            .await
            .unwrap();

        store.delete(created.id).await.unwrap();
        assert_eq!(
            store.get(created.id).await,
            Err(StoreError::NotFound { id: created.id })
        );
        assert_eq!(
            store.delete(created.id).await,
            Err(StoreError::NotFound { id: created.id })
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn list_reports_totals_past_last_page() {
        let store = store().await;
        store
            .insert(NewComment::new("paged", "carol").unwrap())
            .await
            .unwrap();

        let first = store
            .list(&ListQuery {
                page: PageRequest::new(1, 1).unwrap(),
                sort: "-id".parse::<Sort>().unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(first.items.len(), 1);
        assert!(first.metadata.total_records >= 1);

        let beyond = store
            .list(&ListQuery {
                page: PageRequest::new(10_000_000, 100).unwrap(),
                sort: Sort::default(),
            })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.metadata.current_page, 10_000_000);
        assert!(beyond.metadata.total_records >= 1);
    }
}
