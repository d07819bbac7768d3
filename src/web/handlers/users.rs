//! # Account Handlers
//!
//! `/sign_up` and `/sign_in` set the session cookie; `/logout` clears it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::User;
use crate::services::{Credentials, SignUpRequest};
use crate::web::auth::AuthenticatedUser;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn start_session(state: &AppState, jar: CookieJar, user: &User) -> ApiResult<CookieJar> {
    let token = state.authenticator.issue(user)?;
    Ok(jar.add(state.authenticator.session_cookie(token)))
}

/// Register and sign in: POST /sign_up
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<SignUpRequest>, ApiError>,
) -> ApiResult<(StatusCode, CookieJar, Json<UserEnvelope>)> {
    let user = state.user_service.sign_up(request).await?;
    let jar = start_session(&state, jar, &user)?;

    Ok((StatusCode::CREATED, jar, Json(UserEnvelope { user })))
}

/// Password sign-in: POST /sign_in
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(credentials), _): WithRejection<Json<Credentials>, ApiError>,
) -> ApiResult<(CookieJar, Json<UserEnvelope>)> {
    let user = state.user_service.sign_in(credentials).await?;
    let jar = start_session(&state, jar, &user)?;

    Ok((jar, Json(UserEnvelope { user })))
}

/// End the session: POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let user = state.user_service.get_user(&session.context()).await?;
    info!(user_id = user.id, "User logged out");

    Ok((
        jar.remove(state.authenticator.removal_cookie()),
        Json(MessageResponse {
            message: format!("user {} logged out", user.username),
        }),
    ))
}
