//! Administrative endpoints. Every route requires a session whose role passes
//! the admin gate.

use axum::{
    Json,
    extract::{Path, State},
    middleware,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::AppState;
use crate::error::{AuthError, ErrorBody};
use crate::guard::{SessionContext, require_admin, require_session};
use crate::service::UserSummary;
use crate::validation::normalize_email;

/// Tag for OpenAPI documentation.
pub const ADMIN_TAG: &str = "Administration";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub status: bool,
    pub data: UserSummary,
}

/// Creates the admin router. Layers run bottom-up, so the session check
/// happens before the role gate.
#[tracing::instrument(skip_all)]
pub fn router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_user))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_session,
        ))
        .with_state(state)
}

#[tracing::instrument(skip(state, session), fields(admin_id = session.claims.id))]
#[utoipa::path(
    get,
    path = "/users/{email}",
    tag = ADMIN_TAG,
    operation_id = "Get User",
    summary = "Look up a user by email",
    security(("SessionToken" = [])),
    params(("email" = String, Path, description = "Email address of the user")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No user with this email", body = ErrorBody)
    )
)]
async fn get_user(
    State(state): State<AppState>,
    session: SessionContext,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, AdminError> {
    let user = state
        .directory
        .get_by_email(&normalize_email(&email))
        .await
        .map_err(AuthError::from)?;
    Ok(Json(UserResponse {
        status: true,
        data: UserSummary::from(&user),
    }))
}

/// [`AuthError`] with `user_not_found` answered as `404`: here it describes
/// the looked-up user, not the caller.
pub struct AdminError(AuthError);

impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl axum::response::IntoResponse for AdminError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AuthError::UserNotFound => (
                axum::http::StatusCode::NOT_FOUND,
                Json(ErrorBody::from(&AuthError::UserNotFound)),
            )
                .into_response(),
            other => other.into_response(),
        }
    }
}
