//! # Session Authentication
//!
//! Sessions are HS256 JWTs signed with `session.secret_key`. The token travels in an
//! HttpOnly cookie set at sign-up and sign-in; API clients may send the same token as a
//! Bearer `Authorization` header instead.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::models::User;
use crate::services::RequestContext;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("JWT processing error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid authorization header format")]
    InvalidAuthFormat,
}

/// JWT claims for a signed-in user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Username
    pub sub: String,
    /// User id
    pub uid: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Verified caller, inserted into request extensions by the session middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub request_id: Uuid,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: SessionClaims, request_id: Uuid) -> Self {
        Self {
            user_id: claims.uid,
            username: claims.sub,
            request_id,
        }
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.user_id, self.request_id)
    }
}

#[derive(Clone)]
pub struct SessionAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    secure: bool,
    max_age_seconds: i64,
}

impl SessionAuthenticator {
    pub fn from_config(config: &SessionConfig) -> Result<Self, AuthError> {
        if config.secret_key.is_empty() {
            return Err(AuthError::ConfigurationError(
                "session secret key not configured".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            secure: config.secure,
            max_age_seconds: config.max_age_seconds,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Sign a session token for `user`
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.username.clone(),
            uid: user.id,
            iat: now,
            exp: now + self.max_age_seconds,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        debug!(user_id = user.id, "Session token issued");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                warn!(error = %e, "Session token validation failed");
                AuthError::JwtError(e)
            })?;

        Ok(token_data.claims)
    }

    /// Find the session token on a request: Bearer header first, then the session cookie.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
            let value = value.to_str().map_err(|_| AuthError::InvalidAuthFormat)?;
            return extract_bearer_token(value).map(str::to_string);
        }

        CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingSession)
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.max_age_seconds))
            .build()
    }

    /// Cookie matching [`Self::session_cookie`] for removal from the jar
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}

fn extract_bearer_token(auth_header: &str) -> Result<&str, AuthError> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::InvalidAuthFormat),
    }
}
