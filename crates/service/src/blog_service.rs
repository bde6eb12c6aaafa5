use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::blog::{self, Comment, Reply};
use models::types::StringList;
use models::user::{self, Role};

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any, unique_slug};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct BlogInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlogInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: usize,
}

/// Admins, clinic owners and doctors write posts; other members need `blogs.create`.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_blog(db: &DatabaseConnection, actor: &Actor, input: BlogInput) -> Result<blog::Model, ServiceError> {
    match actor.role {
        Role::Admin | Role::Clinic | Role::Doctor => {}
        Role::User => return Err(ServiceError::forbidden("patients cannot author posts")),
        Role::Staff | Role::Agent => authorize(db, actor, actor.clinic_id, modules::BLOGS, None, Action::Create).await?,
    }
    let status = input.status.unwrap_or_else(|| blog::STATUS_DRAFT.to_string());
    blog::validate_status(&status)?;
    let slug = unique_slug::<blog::Entity>(db, blog::Column::Slug, &input.title).await?;
    let created = blog::create(
        db,
        blog::NewBlog {
            author_id: actor.user_id,
            clinic_id: actor.clinic_id,
            title: input.title,
            slug,
            content: input.content,
            tags: input.tags,
            cover_image: input.cover_image,
            status,
        },
    )
    .await?;
    info!(blog_id = %created.id, slug = %created.slug, "blog_created");
    Ok(created)
}

pub async fn get_blog(db: &DatabaseConnection, id: Uuid) -> Result<blog::Model, ServiceError> {
    blog::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("blog"))
}

pub async fn get_blog_by_slug(db: &DatabaseConnection, slug: &str) -> Result<blog::Model, ServiceError> {
    blog::Entity::find()
        .filter(blog::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("blog"))
}

/// Single post as seen by `actor`; drafts stay hidden from everyone but the author and admins.
pub async fn view_blog(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<blog::Model, ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_open(actor, &found)?;
    Ok(found)
}

pub async fn list_blogs(db: &DatabaseConnection, filter: BlogFilter, page: Pagination) -> Result<Paged<blog::Model>, ServiceError> {
    let mut q = blog::Entity::find();
    if let Some(s) = filter.status {
        blog::validate_status(&s)?;
        q = q.filter(blog::Column::Status.eq(s));
    }
    if let Some(a) = filter.author_id {
        q = q.filter(blog::Column::AuthorId.eq(a));
    }
    if let Some(c) = filter.clinic_id {
        q = q.filter(blog::Column::ClinicId.eq(c));
    }
    if let Some(t) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        q = q.filter(Expr::cust_with_values("tags @> $1::jsonb", [serde_json::json!([t]).to_string()]));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [blog::Column::Title, blog::Column::Content]) {
        q = q.filter(cond);
    }
    let ordered = q.order_by_desc(blog::Column::PublishedAt).order_by_desc(blog::Column::CreatedAt);
    fetch_page(db, ordered, page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, blog_id = %id))]
pub async fn update_blog(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateBlogInput) -> Result<blog::Model, ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_author(actor, &found)?;
    let retitled = input.title.as_deref().is_some_and(|t| t.trim() != found.title);
    let mut am: blog::ActiveModel = found.into();
    if let Some(title) = input.title {
        models::validate::validate_required("title", &title, 200)?;
        if retitled {
            am.slug = Set(unique_slug::<blog::Entity>(db, blog::Column::Slug, &title).await?);
        }
        am.title = Set(title.trim().to_string());
    }
    if let Some(v) = input.content {
        models::validate::validate_required("content", &v, 200_000)?;
        am.content = Set(v);
    }
    if let Some(v) = input.tags { am.tags = Set(StringList::cleaned(v)); }
    if let Some(v) = input.cover_image { am.cover_image = Set(Some(v).filter(|c| !c.trim().is_empty())); }
    if let Some(v) = input.status { am.status = Set(v); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("blog_updated");
    Ok(updated)
}

/// Publish or return to draft; the save hook maintains `published_at`.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, blog_id = %id))]
pub async fn publish(db: &DatabaseConnection, actor: &Actor, id: Uuid, published: bool) -> Result<blog::Model, ServiceError> {
    let status = if published { blog::STATUS_PUBLISHED } else { blog::STATUS_DRAFT };
    update_blog(db, actor, id, UpdateBlogInput { status: Some(status.into()), ..Default::default() }).await
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, blog_id = %id))]
pub async fn delete_blog(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_author(actor, &found)?;
    blog::Entity::delete_by_id(id).exec(db).await?;
    info!("blog_deleted");
    Ok(())
}

pub async fn add_comment(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: CommentInput) -> Result<Comment, ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_open(actor, &found)?;
    let name = display_name(db, actor).await?;
    let mut comments = found.comments.clone();
    let comment = comments.add(actor.user_id, &name, &input.text)?.clone();
    save_comments(db, found, comments).await?;
    info!(blog_id = %id, comment_id = %comment.id, "blog_comment_added");
    Ok(comment)
}

pub async fn add_reply(db: &DatabaseConnection, actor: &Actor, id: Uuid, comment_id: Uuid, input: CommentInput) -> Result<Reply, ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_open(actor, &found)?;
    if found.comments.find(comment_id).is_none() {
        return Err(ServiceError::not_found("comment"));
    }
    let name = display_name(db, actor).await?;
    let mut comments = found.comments.clone();
    let reply = comments.reply(comment_id, actor.user_id, &name, &input.text)?.clone();
    save_comments(db, found, comments).await?;
    info!(blog_id = %id, comment_id = %comment_id, "blog_reply_added");
    Ok(reply)
}

/// The comment's author, the post's author or an admin may remove a comment.
pub async fn delete_comment(db: &DatabaseConnection, actor: &Actor, id: Uuid, comment_id: Uuid) -> Result<(), ServiceError> {
    let found = get_blog(db, id).await?;
    let comment = found.comments.find(comment_id).ok_or_else(|| ServiceError::not_found("comment"))?;
    if !(actor.is_admin() || comment.user_id == actor.user_id || found.author_id == actor.user_id) {
        return Err(ServiceError::forbidden("cannot delete another user's comment"));
    }
    let mut comments = found.comments.clone();
    comments.remove(comment_id);
    save_comments(db, found, comments).await?;
    info!(blog_id = %id, comment_id = %comment_id, "blog_comment_deleted");
    Ok(())
}

pub async fn toggle_like(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<LikeState, ServiceError> {
    let found = get_blog(db, id).await?;
    ensure_open(actor, &found)?;
    let mut likes = found.likes.clone();
    let liked = likes.toggle(actor.user_id);
    let count = likes.0.len();
    let mut am: blog::ActiveModel = found.into();
    am.likes = Set(likes);
    am.update(db).await?;
    Ok(LikeState { liked, likes: count })
}

fn ensure_author(actor: &Actor, post: &blog::Model) -> Result<(), ServiceError> {
    if actor.is_admin() || post.author_id == actor.user_id {
        Ok(())
    } else {
        Err(ServiceError::forbidden("only the author or an admin may change this post"))
    }
}

/// Drafts accept interactions from their author only.
fn ensure_open(actor: &Actor, post: &blog::Model) -> Result<(), ServiceError> {
    if post.status == blog::STATUS_PUBLISHED || post.author_id == actor.user_id || actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::not_found("blog"))
    }
}

async fn display_name(db: &DatabaseConnection, actor: &Actor) -> Result<String, ServiceError> {
    Ok(user::Entity::find_by_id(actor.user_id)
        .one(db)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| actor.email.clone()))
}

async fn save_comments(db: &DatabaseConnection, found: blog::Model, comments: blog::Comments) -> Result<(), ServiceError> {
    let mut am: blog::ActiveModel = found.into();
    am.comments = Set(comments);
    am.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, cleanup, get_db, seed_clinic, seed_member};

    fn post(title: &str) -> BlogInput {
        BlogInput { title: title.into(), content: "Brush twice a day.".into(), tags: vec!["Dental".into()], cover_image: None, status: None }
    }

    #[tokio::test]
    async fn slugs_publish_and_interactions() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let doctor = seed_member(&db, c.id, Role::Doctor).await?;
        let reader = seed_member(&db, c.id, Role::Staff).await?;
        let title = format!("Healthy Gums {}", Uuid::new_v4().simple());

        let first = create_blog(&db, &doctor, post(&title)).await?;
        let second = create_blog(&db, &doctor, post(&title)).await?;
        assert_eq!(second.slug, format!("{}-2", first.slug));
        assert_eq!(first.status, blog::STATUS_DRAFT);

        // drafts are invisible to others
        assert!(matches!(toggle_like(&db, &reader, first.id).await, Err(ServiceError::NotFound(_))));
        let published = publish(&db, &doctor, first.id, true).await?;
        assert!(published.published_at.is_some());

        let comment = add_comment(&db, &reader, first.id, CommentInput { text: "Great tips".into() }).await?;
        let reply = add_reply(&db, &doctor, first.id, comment.id, CommentInput { text: "Thanks!".into() }).await?;
        assert_eq!(reply.user_id, doctor.user_id);
        assert_eq!(get_blog(&db, first.id).await?.comments.count(), 2);

        assert!(toggle_like(&db, &reader, first.id).await?.liked);
        let state = toggle_like(&db, &reader, first.id).await?;
        assert!(!state.liked);
        assert_eq!(state.likes, 0);

        assert!(matches!(delete_comment(&db, &owner, first.id, comment.id).await, Err(ServiceError::Forbidden(_))));
        delete_comment(&db, &doctor, first.id, comment.id).await?;
        assert_eq!(get_blog(&db, first.id).await?.comments.count(), 0);

        let listed = list_blogs(&db, BlogFilter { status: Some("published".into()), author_id: Some(doctor.user_id), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(listed.total, 1);

        assert!(delete_blog(&db, &reader, second.id).await.is_err());
        delete_blog(&db, &admin(), second.id).await?;
        delete_blog(&db, &doctor, first.id).await?;
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
