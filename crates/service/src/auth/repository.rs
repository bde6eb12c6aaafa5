use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials, NewAccount};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    /// Stores the user and its credentials together; neither row exists if either write fails.
    async fn create_account(&self, account: NewAccount, password_hash: String, password_algorithm: String) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>, // key: lowercase email
        creds: Mutex<HashMap<Uuid, Credentials>>, // key: user_id
    }

    impl MockAuthRepository {
        /// Stores a user directly, bypassing registration rules.
        pub fn insert(&self, user: AuthUser) {
            self.users.lock().unwrap().insert(user.email.to_ascii_lowercase(), user);
        }

        /// Moves a stored user to another clinic, or out of any.
        pub fn set_clinic(&self, email: &str, clinic_id: Option<Uuid>) {
            if let Some(u) = self.users.lock().unwrap().get_mut(&email.to_ascii_lowercase()) {
                u.clinic_id = clinic_id;
            }
        }

        /// Marks a stored user inactive.
        pub fn deactivate(&self, email: &str) {
            if let Some(u) = self.users.lock().unwrap().get_mut(&email.to_ascii_lowercase()) {
                u.active = false;
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&email.to_ascii_lowercase()).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create_account(&self, account: NewAccount, password_hash: String, password_algorithm: String) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            let key = account.email.to_ascii_lowercase();
            if users.contains_key(&key) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                email: key.clone(),
                name: account.name,
                role: account.role,
                clinic_id: account.clinic_id,
                phone: account.phone,
                active: true,
            };
            self.creds.lock().unwrap().insert(user.id, Credentials { user_id: user.id, password_hash, password_algorithm });
            users.insert(key, user.clone());
            Ok(user)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }
    }
}
