use uuid::Uuid;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::get_in_touch as contact;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any};

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Public contact form.
#[instrument(skip(db, input))]
pub async fn submit(db: &DatabaseConnection, input: ContactInput) -> Result<contact::Model, ServiceError> {
    let created = contact::create(
        db,
        contact::NewContact {
            name: input.name,
            email: input.email,
            phone: input.phone.filter(|p| !p.trim().is_empty()),
            subject: input.subject,
            message: input.message,
        },
    )
    .await?;
    info!(contact_id = %created.id, "contact_submitted");
    Ok(created)
}

pub async fn list_contacts(db: &DatabaseConnection, actor: &Actor, filter: ContactFilter, page: Pagination) -> Result<Paged<contact::Model>, ServiceError> {
    actor.require_admin()?;
    let mut q = contact::Entity::find();
    if let Some(s) = filter.status {
        q = q.filter(contact::Column::Status.eq(s));
    }
    let cols = [contact::Column::Name, contact::Column::Email, contact::Column::Subject];
    if let Some(cond) = search_any(filter.search.as_deref(), cols) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(contact::Column::CreatedAt), page).await
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, contact_id = %id))]
pub async fn mark_responded(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<contact::Model, ServiceError> {
    actor.require_admin()?;
    let found = load(db, id).await?;
    let mut am: contact::ActiveModel = found.into();
    am.status = Set(contact::STATUS_RESPONDED.into());
    let updated = am.update(db).await?;
    info!("contact_responded");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, contact_id = %id))]
pub async fn delete_contact(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    actor.require_admin()?;
    let res = contact::Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("contact request"));
    }
    info!("contact_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<contact::Model, ServiceError> {
    contact::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("contact request"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, get_db};

    #[tokio::test]
    async fn contact_requests_flow_to_admins() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let tag = Uuid::new_v4().simple().to_string();
        let input = ContactInput {
            name: "Lina".into(),
            email: format!("Lina_{tag}@Example.com"),
            phone: Some(" ".into()),
            subject: Some("Pricing".into()),
            message: "Do you offer whitening?".into(),
        };
        let c = submit(&db, input).await?;
        assert_eq!(c.status, contact::STATUS_NEW);
        assert!(c.phone.is_none());
        assert_eq!(c.email, format!("lina_{tag}@example.com"));

        let stranger = Actor { role: models::user::Role::User, ..admin() };
        assert!(matches!(list_contacts(&db, &stranger, ContactFilter::default(), Pagination::default()).await, Err(ServiceError::Forbidden(_))));

        let found = list_contacts(&db, &admin(), ContactFilter { search: Some(tag.clone()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(found.total, 1);
        assert_eq!(mark_responded(&db, &admin(), c.id).await?.status, contact::STATUS_RESPONDED);
        delete_contact(&db, &admin(), c.id).await?;
        assert!(matches!(delete_contact(&db, &admin(), c.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
