use std::sync::Arc;

use validator::Validate;

use crate::dto::user_dto::{
    LoginRequest, RegisterRequest, TokenResponse, UpdateProfileRequest, UserProfile,
};
use crate::error::{Error, Result};
use crate::models::user::User;
use crate::store::{NewUser, ProfileUpdate, UserStore};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::{decode_access_token, issue_access_token, Claims, ROLE_ADMIN, ROLE_PLAYER};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    token_ttl_minutes: i64,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: String, token_ttl_minutes: i64) -> Self {
        Self {
            users,
            jwt_secret,
            token_ttl_minutes,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile> {
        req.validate()?;
        let password_hash = hash_password(&req.password)?;
        let user = self
            .users
            .create_user(NewUser {
                username: req.username.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                password_hash,
            })
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user.into())
    }

    pub async fn authenticate(&self, req: &LoginRequest) -> Result<User> {
        req.validate()?;
        let user = self
            .users
            .find_user_by_username(req.username.trim())
            .await?
            .ok_or_else(bad_credentials)?;
        if !verify_password(&req.password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "password mismatch");
            return Err(bad_credentials());
        }
        ensure_active(&user)?;
        Ok(user)
    }

    pub fn issue_token(&self, user: &User) -> Result<TokenResponse> {
        let role = if user.is_admin { ROLE_ADMIN } else { ROLE_PLAYER };
        let access_token =
            issue_access_token(user.id, role, &self.jwt_secret, self.token_ttl_minutes)?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl_minutes * 60,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse> {
        let user = self.authenticate(&req).await?;
        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode_access_token(token, &self.jwt_secret)
    }

    /// Loads the caller behind a verified token; deactivated accounts are refused.
    pub async fn active_user(&self, user_id: i64) -> Result<User> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized("User no longer exists".to_string()))?;
        ensure_active(&user)?;
        Ok(user)
    }

    pub async fn me(&self, user_id: i64) -> Result<UserProfile> {
        Ok(self.active_user(user_id).await?.into())
    }

    pub async fn update_me(&self, user_id: i64, req: UpdateProfileRequest) -> Result<UserProfile> {
        req.validate()?;
        self.active_user(user_id).await?;

        let password_hash = match req.password.as_deref() {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        };
        let update = ProfileUpdate {
            username: req.username.map(|u| u.trim().to_string()),
            email: req.email.map(|e| e.trim().to_lowercase()),
            password_hash,
        };
        let user = self.users.update_profile(user_id, update).await?;
        tracing::info!(user_id, "profile updated");
        Ok(user.into())
    }

    /// Makes sure an admin account named `username` exists. An existing
    /// account keeps its password and is promoted.
    pub async fn ensure_admin(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let mut user = match self.users.find_user_by_username(username).await? {
            Some(user) => user,
            None => {
                let profile = self
                    .register(RegisterRequest {
                        username: username.to_string(),
                        email: email.to_string(),
                        password: password.to_string(),
                    })
                    .await?;
                self.active_user(profile.id).await?
            }
        };
        if !user.is_admin {
            self.users.set_admin(user.id, true).await?;
            user.is_admin = true;
            tracing::info!(user_id = user.id, username, "admin account promoted");
        }
        Ok(user)
    }
}

fn bad_credentials() -> Error {
    Error::Unauthorized("Incorrect username or password".to_string())
}

fn ensure_active(user: &User) -> Result<()> {
    if user.is_active {
        Ok(())
    } else {
        Err(Error::BadRequest("Inactive user".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockUserStore, UserStore};
    use tokio_test::{assert_err, assert_ok};

    fn service(store: Arc<MemoryStore>) -> UserService {
        UserService::new(store, "test-secret".to_string(), 30)
    }

    fn register_req(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "hunter2hunter2".to_string(),
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service(Arc::new(MemoryStore::new()));
        let profile = svc.register(register_req("alice")).await.unwrap();
        assert_eq!(profile.total_score, 0);
        assert_eq!(profile.games_played, 0);

        let token = svc.login(login_req("alice", "hunter2hunter2")).await.unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);
        let claims = svc.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), profile.id);
        assert!(!claims.is_admin());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let svc = service(Arc::new(MemoryStore::new()));
        assert_ok!(svc.register(register_req("bob")).await);
        let mut again = register_req("bob");
        again.email = "other@example.com".to_string();
        assert!(matches!(svc.register(again).await, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected() {
        let svc = service(Arc::new(MemoryStore::new()));
        let mut req = register_req("carol");
        req.password = "short".to_string();
        assert!(matches!(svc.register(req).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let svc = service(Arc::new(MemoryStore::new()));
        svc.register(register_req("dave")).await.unwrap();

        let wrong = svc.login(login_req("dave", "not-the-password")).await;
        let unknown = svc.login(login_req("nobody", "hunter2hunter2")).await;
        match (wrong, unknown) {
            (Err(Error::Unauthorized(a)), Err(Error::Unauthorized(b))) => assert_eq!(a, b),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let profile = svc.register(register_req("erin")).await.unwrap();
        store.set_active(profile.id, false).await.unwrap();

        assert!(matches!(
            svc.login(login_req("erin", "hunter2hunter2")).await,
            Err(Error::BadRequest(_))
        ));
        assert_err!(svc.me(profile.id).await);
    }

    #[tokio::test]
    async fn admin_token_carries_admin_role() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let profile = svc.register(register_req("frank")).await.unwrap();
        store.set_admin(profile.id, true).await.unwrap();

        let token = svc.login(login_req("frank", "hunter2hunter2")).await.unwrap();
        assert!(svc.verify_token(&token.access_token).unwrap().is_admin());
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());

        let first = svc
            .ensure_admin("admin", "admin@quiz.example", "admin-password")
            .await
            .unwrap();
        let second = svc
            .ensure_admin("admin", "admin@quiz.example", "ignored-password")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.is_admin);

        let token = svc.login(login_req("admin", "admin-password")).await.unwrap();
        assert!(svc.verify_token(&token.access_token).unwrap().is_admin());
    }

    #[tokio::test]
    async fn profile_update_rehashes_password() {
        let svc = service(Arc::new(MemoryStore::new()));
        let profile = svc.register(register_req("gina")).await.unwrap();

        let updated = svc
            .update_me(
                profile.id,
                UpdateProfileRequest {
                    email: Some("Gina@Example.com".to_string()),
                    password: Some("a-brand-new-secret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "gina@example.com");
        assert_eq!(updated.username, "gina");

        assert_err!(svc.login(login_req("gina", "hunter2hunter2")).await);
        assert_ok!(svc.login(login_req("gina", "a-brand-new-secret")).await);
    }

    #[tokio::test]
    async fn store_failure_propagates_from_login() {
        let mut users = MockUserStore::new();
        users
            .expect_find_user_by_username()
            .returning(|_| Err(Error::Database(sqlx::Error::PoolTimedOut)));
        let svc = UserService::new(Arc::new(users), "s".to_string(), 30);

        let err = svc.login(login_req("x", "y")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
