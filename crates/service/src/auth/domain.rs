use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::user::Role;

use crate::context::Actor;

use super::errors::AuthError;

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_role() -> Role { Role::User }

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Domain user (business view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub clinic_id: Option<Uuid>,
    pub phone: Option<String>,
    pub active: bool,
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub clinic_id: Option<Uuid>,
    pub phone: Option<String>,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// email
    pub sub: String,
    pub uid: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let user_id = Uuid::parse_str(&self.uid).map_err(|_| AuthError::TokenError("bad uid claim".into()))?;
        let role: Role = self.role.parse().map_err(|_| AuthError::TokenError("bad role claim".into()))?;
        let clinic_id = match &self.cid {
            Some(c) => Some(Uuid::parse_str(c).map_err(|_| AuthError::TokenError("bad cid claim".into()))?),
            None => None,
        };
        Ok(Actor { user_id, email: self.sub.clone(), role, clinic_id })
    }
}
