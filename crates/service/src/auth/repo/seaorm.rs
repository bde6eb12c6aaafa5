use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

use models::errors::ModelError;
use models::user;

use crate::auth::domain::{AuthUser, Credentials, NewAccount};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_auth_user(u: user::Model) -> Result<AuthUser, AuthError> {
    let role = u.role().map_err(|e| AuthError::Repository(e.to_string()))?;
    let active = u.is_active();
    Ok(AuthUser { id: u.id, email: u.email, name: u.name, role, clinic_id: u.clinic_id, phone: u.phone, active })
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = user::find_by_email(&self.db, email)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        res.map(to_auth_user).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        res.map(to_auth_user).transpose()
    }

    async fn create_account(&self, account: NewAccount, password_hash: String, password_algorithm: String) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        let input = user::NewUser {
            email: &account.email,
            name: &account.name,
            phone: account.phone.as_deref(),
            role: account.role,
            clinic_id: account.clinic_id,
        };
        let created = user::create(&txn, input).await.map_err(|e| match e {
            ModelError::Validation(m) => AuthError::Validation(m),
            ModelError::Conflict(_) => AuthError::Conflict,
            ModelError::Db(m) => AuthError::Repository(m),
        })?;
        models::user_credentials::upsert_password(&txn, created.id, password_hash, &password_algorithm)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        txn.commit().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        to_auth_user(created)
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_for_user(&self.db, user_id)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }
}
