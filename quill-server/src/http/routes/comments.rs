//! Comment endpoints
//!
//! Each handler decodes input, validates it, makes one store call and
//! wraps the result in a JSON envelope.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use quill_core::pagination::DEFAULT_PAGE_SIZE;
use quill_core::{Comment, CommentPatch, ListQuery, NewComment, PageMetadata, PageRequest, Sort};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{CommentId, JsonBody, QueryParams};
use crate::http::server::AppState;

/// Create comment request
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

/// Partial update request. `version`, when present, must match the stored
/// version.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
    pub author: Option<String>,
    pub version: Option<i32>,
}

/// Query parameters for listing
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

impl TryFrom<ListParams> for ListQuery {
    type Error = ApiError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let page = PageRequest::new(
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?;
        let sort = match params.sort.as_deref() {
            Some(raw) => raw.parse::<Sort>()?,
            None => Sort::default(),
        };

        Ok(ListQuery { page, sort })
    }
}

#[derive(Serialize)]
pub struct CommentEnvelope {
    pub comment: Comment,
}

#[derive(Serialize)]
pub struct CommentsEnvelope {
    pub comments: Vec<Comment>,
    pub metadata: PageMetadata,
}

#[derive(Serialize)]
pub struct MessageEnvelope {
    pub message: &'static str,
}

/// POST /v1/comments - create a comment
async fn create_comment(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewComment::new(&req.content, &req.author)?;
    let comment = state.store.insert(new).await?;

    tracing::info!(id = comment.id, "comment created");
    let location = format!("/v1/comments/{}", comment.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CommentEnvelope { comment }),
    ))
}

/// GET /v1/comments/{id} - get a single comment
async fn get_comment(
    State(state): State<Arc<AppState>>,
    CommentId(id): CommentId,
) -> Result<Json<CommentEnvelope>, ApiError> {
    let comment = state.store.get(id).await?;
    Ok(Json(CommentEnvelope { comment }))
}

/// PATCH /v1/comments/{id} - partially update a comment
///
/// Reads first so a missing id is a 404; the conditional write that follows
/// turns any concurrent change into a 409.
async fn update_comment(
    State(state): State<Arc<AppState>>,
    CommentId(id): CommentId,
    JsonBody(req): JsonBody<UpdateCommentRequest>,
) -> Result<Json<CommentEnvelope>, ApiError> {
    let current = state.store.get(id).await?;

    if req.version.is_some_and(|expected| expected != current.version) {
        return Err(ApiError::EditConflict { id });
    }

    let patch = CommentPatch {
        content: req.content,
        author: req.author,
    };
    let comment = state.store.update(patch.apply(&current)?).await?;

    Ok(Json(CommentEnvelope { comment }))
}

/// DELETE /v1/comments/{id} - delete a comment
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    CommentId(id): CommentId,
) -> Result<Json<MessageEnvelope>, ApiError> {
    state.store.delete(id).await?;

    tracing::info!(id, "comment deleted");
    Ok(Json(MessageEnvelope {
        message: "comment successfully deleted",
    }))
}

/// GET /v1/comments - list comments with pagination and sorting
async fn list_comments(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<CommentsEnvelope>, ApiError> {
    let query = ListQuery::try_from(params)?;
    let page = state.store.list(&query).await?;

    Ok(Json(CommentsEnvelope {
        comments: page.items,
        metadata: page.metadata,
    }))
}

/// Comment routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/comments", get(list_comments).post(create_comment))
        .route(
            "/v1/comments/{id}",
            get(get_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
}
