//! Request authentication and role gating.
//!
//! [`require_session`] resolves the session token header into a
//! [`SessionContext`] stored in the request extensions. Handlers read it back
//! with the [`SessionContext`] extractor; [`require_admin`] layers the role
//! gate on top.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::directory::{DirectoryError, UserDirectory};
use crate::entity::Role;
use crate::error::AuthError;
use crate::token::{SessionClaims, TokenCodec};

/// Verified identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub claims: SessionClaims,
    pub role: Role,
}

impl SessionContext {
    /// Role gate: admin-only access denies `member`, every other role passes.
    pub fn require_role(&self, required: Role) -> Result<(), AuthError> {
        if self.role.satisfies(required) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    directory: Arc<dyn UserDirectory>,
    codec: TokenCodec,
    header: HeaderName,
}

impl AccessGuard {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        codec: TokenCodec,
        header: &str,
    ) -> Result<Self, AuthError> {
        let header = HeaderName::try_from(header).map_err(|e| {
            AuthError::Infrastructure(format!("invalid session header name '{header}': {e}"))
        })?;
        Ok(Self {
            directory,
            codec,
            header,
        })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Resolve the session carried by `headers`.
    ///
    /// The user named by the token must still exist; a token for a deleted
    /// account is rejected with [`AuthError::UserNotFound`].
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<SessionContext, AuthError> {
        let token = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.codec.verify(token)?;

        match self.directory.get_by_id(claims.id).await {
            Ok(_) => {}
            Err(DirectoryError::NotFound) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        }

        Ok(SessionContext {
            role: claims.role,
            claims,
        })
    }
}

/// Middleware rejecting requests without a valid session.
pub async fn require_session(
    State(guard): State<AccessGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = guard
        .authenticate(request.headers())
        .await
        .inspect_err(|e| {
            tracing::debug!(
                name = "guard.session.rejected",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                kind = ?e.kind(),
                path = %request.uri().path(),
                message = "Request rejected by session guard"
            );
        })?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Middleware admitting only non-member roles. Must run after
/// [`require_session`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let context = request
        .extensions()
        .get::<SessionContext>()
        .ok_or(AuthError::MissingToken)?;
    context.require_role(Role::Admin).inspect_err(|_| {
        tracing::info!(
            name = "guard.role.denied",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            user_id = context.claims.id,
            role = context.role.as_str(),
            message = "Role gate denied access"
        );
    })?;
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
