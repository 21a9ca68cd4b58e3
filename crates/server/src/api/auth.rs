//! Authentication endpoints.
//!
//! - `POST /login` - password login
//! - `POST /register` - local account registration
//! - `GET /{provider}` - redirect to the provider consent screen
//! - `GET /{provider}/callback` - complete a federated login
//! - `GET /me` - claims of the current session

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::AppState;
use crate::error::{AuthError, ErrorBody};
use crate::guard::{SessionContext, require_session};
use crate::oauth::Provider;
use crate::service::UserSummary;
use crate::token::SessionClaims;
use crate::validation::{LoginInput, RegisterInput};

/// Tag for OpenAPI documentation.
pub const AUTH_TAG: &str = "Authentication";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub status: bool,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackData {
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackResponse {
    pub status: bool,
    pub message: String,
    pub token: String,
    /// The `state` value sent to the provider, usually the page to return to.
    pub from: String,
    pub data: CallbackData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub status: bool,
    pub session: SessionClaims,
}

#[derive(Deserialize, IntoParams)]
struct RedirectParams {
    /// Where the client wants to land after login. Defaults to `/`.
    from: Option<String>,
}

#[derive(Deserialize, IntoParams)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

fn parse_provider(raw: &str) -> Result<Provider, AuthError> {
    raw.parse().map_err(AuthError::UnknownProvider)
}

fn json_rejection(rejection: JsonRejection) -> AuthError {
    AuthError::Validation(rejection.body_text())
}

/// Creates the authentication router.
#[tracing::instrument(skip_all)]
pub fn router(state: AppState) -> OpenApiRouter {
    let session = OpenApiRouter::new()
        .routes(routes!(me))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_session,
        ));

    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(register))
        .routes(routes!(provider_redirect))
        .routes(routes!(provider_callback))
        .merge(session)
        .with_state(state)
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    operation_id = "Login",
    summary = "Log in with email and password",
    description = "Checks the credentials of a locally registered account and returns a session token.\n\n\
                   An unknown email and a wrong password produce the same `401` response.",
    request_body(content = LoginInput, description = "Login credentials"),
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 403, description = "Account not verified", body = ErrorBody)
    )
)]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(input) = payload.map_err(json_rejection)?;
    let token = state.auth.login(input).await?;
    Ok(Json(LoginResponse {
        status: true,
        token,
    }))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/register",
    tag = AUTH_TAG,
    operation_id = "Register",
    summary = "Register a local account",
    request_body(content = RegisterInput, description = "New account details"),
    responses(
        (status = 200, description = "Account created", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Email already in use", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Json(input) = payload.map_err(json_rejection)?;
    let message = state.auth.register(input).await?;
    Ok(Json(MessageResponse {
        status: true,
        message,
    }))
}

#[tracing::instrument(skip(state, params))]
#[utoipa::path(
    get,
    path = "/{provider}",
    tag = AUTH_TAG,
    operation_id = "Provider Login Redirect",
    summary = "Start a federated login",
    description = "Redirects to the provider's consent screen. The `from` parameter is carried through \
                   as the OAuth `state` and echoed back by the callback.",
    params(
        ("provider" = Provider, Path, description = "Identity provider"),
        RedirectParams
    ),
    responses(
        (status = 302, description = "Redirect to the consent screen"),
        (status = 404, description = "Provider not configured", body = ErrorBody)
    )
)]
async fn provider_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<RedirectParams>,
) -> Result<Response, AuthError> {
    let provider = parse_provider(&provider)?;
    let location = state
        .federation
        .authorization_url(provider, params.from.as_deref())?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

#[tracing::instrument(skip(state, params))]
#[utoipa::path(
    get,
    path = "/{provider}/callback",
    tag = AUTH_TAG,
    operation_id = "Provider Login Callback",
    summary = "Complete a federated login",
    description = "Exchanges the authorization code, reads the provider profile and signs the user in. \
                   An unknown email creates a new account bound to the provider.",
    params(
        ("provider" = Provider, Path, description = "Identity provider"),
        CallbackParams
    ),
    responses(
        (status = 200, description = "Session token issued", body = CallbackResponse),
        (status = 400, description = "Missing code or no usable email", body = ErrorBody),
        (status = 401, description = "Code exchange failed", body = ErrorBody),
        (status = 404, description = "Provider not configured", body = ErrorBody),
        (status = 409, description = "Email bound to another provider", body = ErrorBody),
        (status = 500, description = "Provider profile or storage failure", body = ErrorBody)
    )
)]
async fn provider_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, AuthError> {
    let provider = parse_provider(&provider)?;
    let login = state
        .federation
        .complete(provider, params.code.as_deref())
        .await?;

    let message = if login.created {
        format!("Registered with {} successfully", provider.label())
    } else {
        format!("Logged in with {} successfully", provider.label())
    };
    Ok(Json(CallbackResponse {
        status: true,
        message,
        token: login.token,
        from: params
            .state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/".to_string()),
        data: CallbackData { user: login.user },
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = AUTH_TAG,
    operation_id = "Current Session",
    summary = "Claims of the current session",
    security(("SessionToken" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody)
    )
)]
async fn me(session: SessionContext) -> Json<SessionResponse> {
    Json(SessionResponse {
        status: true,
        session: session.claims,
    })
}
