use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::blog::{self, Comment, Reply};
use service::blog_service::{self, BlogFilter, BlogInput, CommentInput, LikeState, UpdateBlogInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Deserialize)]
pub struct PublishInput {
    pub published: bool,
}

/// Drafts are listed only to their author unless the caller is an admin.
pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(mut filter): Query<BlogFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<blog::Model>> {
    if !ctx.actor.is_admin() && filter.status.as_deref() != Some(blog::STATUS_PUBLISHED) {
        filter.author_id = Some(ctx.actor.user_id);
    }
    Ok(Json(blog_service::list_blogs(&state.db, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<BlogInput>) -> ApiResult<blog::Model> {
    Ok(Json(blog_service::create_blog(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<blog::Model> {
    Ok(Json(blog_service::view_blog(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateBlogInput>,
) -> ApiResult<blog::Model> {
    Ok(Json(blog_service::update_blog(&state.db, &ctx.actor, id, input).await?))
}

pub async fn publish(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<PublishInput>,
) -> ApiResult<blog::Model> {
    Ok(Json(blog_service::publish(&state.db, &ctx.actor, id, input.published).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    blog_service::delete_blog(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentInput>,
) -> ApiResult<Comment> {
    Ok(Json(blog_service::add_comment(&state.db, &ctx.actor, id, input).await?))
}

pub async fn add_reply(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CommentInput>,
) -> ApiResult<Reply> {
    Ok(Json(blog_service::add_reply(&state.db, &ctx.actor, id, comment_id, input).await?))
}

pub async fn delete_comment(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, JsonApiError> {
    blog_service::delete_comment(&state.db, &ctx.actor, id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<LikeState> {
    Ok(Json(blog_service::toggle_like(&state.db, &ctx.actor, id).await?))
}
