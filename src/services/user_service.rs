use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{Result, TodoError};
use crate::models::{NewUser, User};
use crate::services::RequestContext;
use crate::store::UserStore;

#[derive(Clone, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Account registration and password sign-in.
///
/// Passwords are stored as Argon2id PHC strings. Hashing and verification run on the
/// blocking pool so they do not stall the request executor.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User> {
        if request.username.trim().is_empty() {
            return Err(TodoError::validation("username cannot be empty"));
        }
        if request.password.is_empty() {
            return Err(TodoError::validation("password cannot be empty"));
        }

        let password_hash = hash_password(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username: request.username,
                password_hash,
                email: request.email,
            })
            .await?;

        info!(user_id = user.id, "User signed up");
        Ok(user)
    }

    /// Unknown usernames and wrong passwords both yield [`TodoError::InvalidCredentials`].
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn sign_in(&self, credentials: Credentials) -> Result<User> {
        let user = match self.store.get_user_by_username(&credentials.username).await {
            Ok(user) => user,
            Err(TodoError::NotFound(_)) => {
                warn!("Sign-in for unknown user");
                return Err(TodoError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !verify_password(credentials.password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "Sign-in with wrong password");
            return Err(TodoError::InvalidCredentials);
        }

        info!(user_id = user.id, "User signed in");
        Ok(user)
    }

    pub async fn get_user(&self, ctx: &RequestContext) -> Result<User> {
        self.store.get_user_by_id(ctx.user_id).await
    }
}

async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TodoError::storage("users.hash_password", e))
    })
    .await
    .map_err(|e| TodoError::storage("users.hash_password", e))?
}

async fn verify_password(password: String, password_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| TodoError::storage("users.verify_password", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| TodoError::storage("users.verify_password", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::InMemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryStore::default()))
    }

    fn sign_up_request(username: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: format!("{username}@example.com"),
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let service = service();
        let user = service
            .sign_up(sign_up_request("alice", "hunter2"))
            .await
            .unwrap();

        assert!(user.password_hash.starts_with("$argon2"));
        assert_ne!(user.password_hash, "hunter2");

        let signed_in = service
            .sign_in(credentials("alice", "hunter2"))
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);

        let ctx = RequestContext::for_user(user.id);
        assert_eq!(service.get_user(&ctx).await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let service = service();
        service
            .sign_up(sign_up_request("alice", "hunter2"))
            .await
            .unwrap();

        let wrong_password = service.sign_in(credentials("alice", "nope")).await;
        let unknown_user = service.sign_in(credentials("mallory", "hunter2")).await;

        assert_eq!(wrong_password.unwrap_err(), TodoError::InvalidCredentials);
        assert_eq!(unknown_user.unwrap_err(), TodoError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let service = service();
        assert!(matches!(
            service.sign_up(sign_up_request("  ", "pw")).await,
            Err(TodoError::ValidationError(_))
        ));
        assert!(matches!(
            service.sign_up(sign_up_request("alice", "")).await,
            Err(TodoError::ValidationError(_))
        ));

        service.sign_up(sign_up_request("alice", "pw")).await.unwrap();
        let duplicate = service.sign_up(sign_up_request("alice", "other")).await;
        assert_eq!(
            duplicate.unwrap_err(),
            TodoError::validation("user with name [alice] already exists")
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", credentials("alice", "hunter2"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
