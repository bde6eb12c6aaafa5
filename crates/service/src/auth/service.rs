use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{info, debug, warn, instrument};
use uuid::Uuid;

use models::user::Role;

use crate::context::Actor;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, NewAccount, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn from_app(cfg: &configs::AuthConfig) -> Self {
        Self { jwt_secret: cfg.jwt_secret.clone(), token_ttl_hours: cfg.token_ttl_hours, password_algorithm: "argon2".into() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new account with a hashed password.
    ///
    /// `registrar` is the authenticated caller creating the account, if any.
    /// Clinic owners may only create doctor, staff and agent accounts, which
    /// join the owner's clinic. Nobody registers an admin except an admin.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use models::user::Role;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 12, password_algorithm: "argon2".into() });
    /// let input = RegisterInput { email: "owner@example.com".into(), name: "Owner".into(), password: "Secret123".into(), role: Role::Clinic, clinic_id: None, phone: None };
    /// let user = tokio_test::block_on(svc.register(input, None)).unwrap();
    /// assert_eq!(user.email, "owner@example.com");
    /// assert_eq!(user.clinic_id, None);
    /// ```
    #[instrument(skip(self, input, registrar), fields(email = %input.email, role = %input.role))]
    pub async fn register(&self, input: RegisterInput, registrar: Option<&Actor>) -> Result<AuthUser, AuthError> {
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!("password too short (>={MIN_PASSWORD_LEN})")));
        }
        models::validate::validate_email(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;
        models::user::validate_name(&input.name).map_err(|e| AuthError::Validation(e.to_string()))?;

        let clinic_id = resolve_clinic(input.role, input.clinic_id, registrar)?;

        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let hash = hash_password(&input.password)?;
        let account = NewAccount { email: input.email, name: input.name, role: input.role, clinic_id, phone: input.phone };
        let user = self.repo.create_account(account, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, role = %user.role, clinic_id = ?user.clinic_id, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use models::user::Role;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 12, password_algorithm: "argon2".into() });
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into(), role: Role::User, clinic_id: None, phone: None }, None));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// let claims = svc.verify_token(&session.token).unwrap();
    /// assert_eq!(claims.uid, session.user.id.to_string());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            warn!(user_id = %user.id, "login_failed");
            return Err(AuthError::Unauthorized);
        }
        if !user.active {
            return Err(AuthError::Inactive);
        }

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    /// Signed HS256 token carrying the user's id, role and clinic.
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims {
            sub: user.email.clone(),
            uid: user.id.to_string(),
            role: user.role.as_str().to_string(),
            cid: user.clinic_id.map(|c| c.to_string()),
            exp,
        };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Decode and validate signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()), &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Resolves a token to the caller as the account stands now.
    ///
    /// Role and clinic come from the stored account rather than the claims, so
    /// a member detached from a clinic loses access to it at once. Deleted or
    /// deactivated accounts are refused.
    pub async fn authenticate(&self, token: &str) -> Result<Actor, AuthError> {
        let claimed = self.verify_token(token)?.actor()?;
        let user = self
            .repo
            .find_user_by_id(claimed.user_id)
            .await?
            .ok_or_else(|| AuthError::TokenError("account no longer exists".into()))?;
        if !user.active {
            warn!(user_id = %user.id, "token_for_inactive_account");
            return Err(AuthError::Inactive);
        }
        if user.role != claimed.role || user.clinic_id != claimed.clinic_id {
            debug!(user_id = %user.id, "token claims outdated; using stored role and clinic");
        }
        Ok(Actor { user_id: user.id, email: user.email, role: user.role, clinic_id: user.clinic_id })
    }

    /// Profile of the authenticated user.
    pub async fn me(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)
    }

    /// Fresh token for a user whose role or clinic changed.
    pub async fn refresh_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let user = self.me(user_id).await?;
        self.issue_token(&user)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

/// Clinic the new account joins, given who is registering it.
fn resolve_clinic(role: Role, requested: Option<Uuid>, registrar: Option<&Actor>) -> Result<Option<Uuid>, AuthError> {
    match registrar {
        Some(a) if a.role == Role::Admin => Ok(requested),
        _ if role == Role::Admin => Err(AuthError::Forbidden("admin accounts cannot self-register".into())),
        None => Ok(None),
        Some(a) if a.role == Role::Clinic => {
            if !role.is_clinic_member() {
                return Err(AuthError::Forbidden(format!("clinic owners cannot create '{role}' accounts")));
            }
            let own = a.clinic_id.ok_or_else(|| AuthError::Forbidden("no clinic linked to this account".into()))?;
            Ok(Some(own))
        }
        Some(_) => Err(AuthError::Forbidden("only clinic owners and admins create accounts for others".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;
    use crate::auth::repository::AuthRepository;

    fn svc() -> AuthService<MockAuthRepository> {
        AuthService::new(
            Arc::new(MockAuthRepository::default()),
            AuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() },
        )
    }

    fn input(email: &str, role: Role) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Name".into(), password: "Passw0rd!".into(), role, clinic_id: None, phone: None }
    }

    fn owner(clinic_id: Option<Uuid>) -> Actor {
        Actor { user_id: Uuid::new_v4(), email: "o@c.com".into(), role: Role::Clinic, clinic_id }
    }

    #[tokio::test]
    async fn short_password_and_bad_email_rejected() {
        let s = svc();
        let mut i = input("a@b.com", Role::User);
        i.password = "short".into();
        assert!(matches!(s.register(i, None).await, Err(AuthError::Validation(_))));
        assert!(matches!(s.register(input("nope", Role::User), None).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let s = svc();
        s.register(input("dup@b.com", Role::User), None).await.unwrap();
        assert!(matches!(s.register(input("DUP@b.com", Role::User), None).await, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        assert!(matches!(svc().register(input("x@b.com", Role::Admin), None).await, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn owner_registered_members_inherit_clinic() {
        let s = svc();
        let clinic = Uuid::new_v4();
        let mut i = input("staff@b.com", Role::Staff);
        i.clinic_id = Some(Uuid::new_v4());
        let u = s.register(i, Some(&owner(Some(clinic)))).await.unwrap();
        assert_eq!(u.clinic_id, Some(clinic));
        assert!(s.register(input("c2@b.com", Role::Clinic), Some(&owner(Some(clinic)))).await.is_err());
        assert!(s.register(input("s2@b.com", Role::Staff), Some(&owner(None))).await.is_err());
    }

    #[tokio::test]
    async fn self_registration_is_unlinked() {
        let mut i = input("doc@b.com", Role::Doctor);
        i.clinic_id = Some(Uuid::new_v4());
        assert_eq!(svc().register(i, None).await.unwrap().clinic_id, None);
    }

    #[tokio::test]
    async fn login_and_token_round_trip() {
        let s = svc();
        let u = s.register(input("log@b.com", Role::User), None).await.unwrap();
        let bad = s.login(LoginInput { email: "log@b.com".into(), password: "wrong-pass".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));
        let session = s.login(LoginInput { email: "log@b.com".into(), password: "Passw0rd!".into() }).await.unwrap();
        let actor = s.verify_token(&session.token).unwrap().actor().unwrap();
        assert_eq!(actor.user_id, u.id);
        assert_eq!(actor.role, Role::User);
        assert!(s.verify_token("not-a-token").is_err());
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "k".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
        s.register(input("gone@b.com", Role::User), None).await.unwrap();
        repo.deactivate("gone@b.com");
        let res = s.login(LoginInput { email: "gone@b.com".into(), password: "Passw0rd!".into() }).await;
        assert!(matches!(res, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn deactivated_account_token_is_refused() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "k".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
        s.register(input("left@b.com", Role::User), None).await.unwrap();
        let session = s.login(LoginInput { email: "left@b.com".into(), password: "Passw0rd!".into() }).await.unwrap();
        assert_eq!(s.authenticate(&session.token).await.unwrap().user_id, session.user.id);
        repo.deactivate("left@b.com");
        assert!(matches!(s.authenticate(&session.token).await, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn detached_member_loses_clinic_scope() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "k".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
        let clinic = Uuid::new_v4();
        s.register(input("nurse@b.com", Role::Staff), Some(&owner(Some(clinic)))).await.unwrap();
        let session = s.login(LoginInput { email: "nurse@b.com".into(), password: "Passw0rd!".into() }).await.unwrap();
        assert_eq!(s.authenticate(&session.token).await.unwrap().clinic_id, Some(clinic));
        repo.set_clinic("nurse@b.com", None);
        assert_eq!(s.authenticate(&session.token).await.unwrap().clinic_id, None);
    }

    #[tokio::test]
    async fn token_of_unknown_account_is_refused() {
        let s = svc();
        let ghost = AuthUser { id: Uuid::new_v4(), email: "ghost@b.com".into(), name: "G".into(), role: Role::User, clinic_id: None, phone: None, active: true };
        let token = s.issue_token(&ghost).unwrap();
        assert!(matches!(s.authenticate(&token).await, Err(AuthError::TokenError(_))));
    }

    #[tokio::test]
    async fn registration_stores_credentials_with_the_account() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "k".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
        let u = s.register(input("cred@b.com", Role::User), None).await.unwrap();
        let cred = repo.get_credentials(u.id).await.unwrap().unwrap();
        assert!(cred.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let a = svc();
        let b = AuthService::new(
            Arc::new(MockAuthRepository::default()),
            AuthConfig { jwt_secret: "other".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() },
        );
        let user = AuthUser { id: Uuid::new_v4(), email: "t@b.com".into(), name: "T".into(), role: Role::Staff, clinic_id: Some(Uuid::new_v4()), phone: None, active: true };
        let token = a.issue_token(&user).unwrap();
        assert_eq!(a.verify_token(&token).unwrap().cid, user.clinic_id.map(|c| c.to_string()));
        assert!(b.verify_token(&token).is_err());
    }
}
