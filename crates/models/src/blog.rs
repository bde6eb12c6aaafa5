use sea_orm::{entity::prelude::*, FromJsonQueryResult, Set};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{user, validate};

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Comments(pub Vec<Comment>);

impl Comments {
    pub fn add(&mut self, user_id: Uuid, user_name: &str, text: &str) -> Result<&Comment, ModelError> {
        validate_text(text)?;
        self.0.push(Comment {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.to_string(),
            text: text.trim().to_string(),
            created_at: Utc::now(),
            replies: Vec::new(),
        });
        Ok(&self.0[self.0.len() - 1])
    }

    pub fn reply(&mut self, comment_id: Uuid, user_id: Uuid, user_name: &str, text: &str) -> Result<&Reply, ModelError> {
        validate_text(text)?;
        let comment = self
            .0
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ModelError::validation("comment not found"))?;
        comment.replies.push(Reply {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.to_string(),
            text: text.trim().to_string(),
            created_at: Utc::now(),
        });
        Ok(&comment.replies[comment.replies.len() - 1])
    }

    pub fn find(&self, comment_id: Uuid) -> Option<&Comment> {
        self.0.iter().find(|c| c.id == comment_id)
    }

    pub fn remove(&mut self, comment_id: Uuid) -> Option<Comment> {
        let idx = self.0.iter().position(|c| c.id == comment_id)?;
        Some(self.0.remove(idx))
    }

    pub fn count(&self) -> usize {
        self.0.iter().map(|c| 1 + c.replies.len()).sum()
    }
}

fn validate_text(text: &str) -> Result<(), ModelError> {
    validate::validate_required("comment", text, 2000)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Likes(pub Vec<Uuid>);

impl Likes {
    /// Returns whether the user likes the post after toggling.
    pub fn toggle(&mut self, user_id: Uuid) -> bool {
        if let Some(idx) = self.0.iter().position(|u| *u == user_id) {
            self.0.remove(idx);
            false
        } else {
            self.0.push(user_id);
            true
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blog")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub author_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: StringList,
    pub cover_image: Option<String>,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub likes: Likes,
    #[sea_orm(column_type = "JsonBinary")]
    pub comments: Comments,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Author }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Author => Entity::belongs_to(user::Entity)
                .from(Column::AuthorId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(status) = validate::current(&self.status) {
            validate_status(&status)?;
            // First publish stamps the date; unpublishing clears it.
            let published_at = validate::current(&self.published_at).flatten();
            match (status.as_str(), published_at) {
                (STATUS_PUBLISHED, None) => self.published_at = Set(Some(Utc::now().into())),
                (STATUS_DRAFT, Some(_)) => self.published_at = Set(None),
                _ => {}
            }
        }
        Ok(self)
    }
}

pub fn validate_status(status: &str) -> Result<(), ModelError> {
    match status {
        STATUS_DRAFT | STATUS_PUBLISHED => Ok(()),
        other => Err(ModelError::Validation(format!("invalid blog status '{other}'"))),
    }
}

pub struct NewBlog {
    pub author_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub status: String,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewBlog) -> Result<Model, ModelError> {
    validate::validate_required("title", &input.title, 200)?;
    validate::validate_required("content", &input.content, 200_000)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        author_id: Set(input.author_id),
        clinic_id: Set(input.clinic_id),
        title: Set(input.title.trim().to_string()),
        slug: Set(input.slug),
        content: Set(input.content),
        tags: Set(StringList::cleaned(input.tags)),
        cover_image: Set(input.cover_image),
        status: Set(input.status),
        likes: Set(Likes::default()),
        comments: Set(Comments::default()),
        published_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_replies() {
        let mut c = Comments::default();
        let author = Uuid::new_v4();
        let cid = c.add(author, "Ann", " Great post ").unwrap().id;
        assert_eq!(c.find(cid).unwrap().text, "Great post");
        c.reply(cid, Uuid::new_v4(), "Bob", "Thanks").unwrap();
        assert_eq!(c.count(), 2);
        assert!(c.reply(Uuid::new_v4(), author, "Ann", "x").is_err());
        assert!(c.add(author, "Ann", "   ").is_err());
        assert!(c.remove(cid).is_some());
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn likes_toggle() {
        let mut l = Likes::default();
        let u = Uuid::new_v4();
        assert!(l.toggle(u));
        assert_eq!(l.0.len(), 1);
        assert!(!l.toggle(u));
        assert!(l.0.is_empty());
    }

    #[test]
    fn status_values() {
        assert!(validate_status("draft").is_ok());
        assert!(validate_status("published").is_ok());
        assert!(validate_status("archived").is_err());
    }
}
