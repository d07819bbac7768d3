//! # Session Middleware
//!
//! Guards every task endpoint. A valid session becomes an [`AuthenticatedUser`] in the
//! request extensions; handlers take it with `Extension<AuthenticatedUser>` and never look
//! at raw tokens.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::web::auth::AuthenticatedUser;
use crate::web::errors::ApiError;
use crate::web::middleware::request_id::RequestId;
use crate::web::state::AppState;

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = state.authenticator.token_from_headers(request.headers())?;

    let claims = state.authenticator.validate(&token).map_err(|e| {
        warn!(error = %e, "Rejected session");
        ApiError::from(e)
    })?;

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0)
        .unwrap_or_else(Uuid::new_v4);

    debug!(user_id = claims.uid, "Authenticated request");

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from_claims(claims, request_id));

    Ok(next.run(request).await)
}
