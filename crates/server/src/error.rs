//! Error taxonomy for authentication, federation and access control.
//!
//! Every failure is a variant of [`AuthError`]. Callers discriminate on
//! [`AuthError::kind`], never on the rendered message. Variants that wrap
//! internal detail (storage, hashing, upstream I/O) keep that detail for the
//! logs only; the HTTP body carries a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Unknown email, wrong password and password-less accounts all end here.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account not verified")]
    Unverified,
    #[error("Missing session token")]
    MissingToken,
    #[error("Session token is malformed")]
    TokenMalformed,
    #[error("Session token signature is invalid")]
    InvalidSignature,
    #[error("Session token has expired")]
    TokenExpired,
    #[error("User not found")]
    UserNotFound,
    #[error("Forbidden access")]
    Forbidden,
    #[error("Email already in use")]
    EmailExists,
    #[error("Your account is already registered with provider '{bound}'")]
    ProviderMismatch { bound: String },
    #[error("Account was registered with a password and cannot be linked to '{provider}'")]
    LocalAccountLinkDenied { provider: String },
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("Authorization code is missing")]
    MissingCode,
    #[error("Provider did not return a usable email address")]
    EmailUnavailable,
    #[error("Failed to exchange authorization code: {0}")]
    UpstreamExchangeFailed(String),
    #[error("Failed to fetch provider profile: {0}")]
    UpstreamProfileFailed(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

/// Stable, machine-checkable error identifier carried in every error body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    InvalidCredentials,
    Unverified,
    MissingToken,
    TokenMalformed,
    InvalidSignature,
    TokenExpired,
    UserNotFound,
    Forbidden,
    EmailExists,
    ProviderMismatch,
    LocalAccountLinkDenied,
    UnknownProvider,
    MissingCode,
    EmailUnavailable,
    UpstreamExchangeFailed,
    UpstreamProfileFailed,
    InternalError,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::ValidationError,
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::Unverified => ErrorKind::Unverified,
            AuthError::MissingToken => ErrorKind::MissingToken,
            AuthError::TokenMalformed => ErrorKind::TokenMalformed,
            AuthError::InvalidSignature => ErrorKind::InvalidSignature,
            AuthError::TokenExpired => ErrorKind::TokenExpired,
            AuthError::UserNotFound => ErrorKind::UserNotFound,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::EmailExists => ErrorKind::EmailExists,
            AuthError::ProviderMismatch { .. } => ErrorKind::ProviderMismatch,
            AuthError::LocalAccountLinkDenied { .. } => ErrorKind::LocalAccountLinkDenied,
            AuthError::UnknownProvider(_) => ErrorKind::UnknownProvider,
            AuthError::MissingCode => ErrorKind::MissingCode,
            AuthError::EmailUnavailable => ErrorKind::EmailUnavailable,
            AuthError::UpstreamExchangeFailed(_) => ErrorKind::UpstreamExchangeFailed,
            AuthError::UpstreamProfileFailed(_) => ErrorKind::UpstreamProfileFailed,
            AuthError::Hashing(_) | AuthError::Infrastructure(_) => ErrorKind::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::MissingCode
            | AuthError::EmailUnavailable => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::TokenMalformed
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::UserNotFound
            | AuthError::UpstreamExchangeFailed(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unverified | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            AuthError::EmailExists
            | AuthError::ProviderMismatch { .. }
            | AuthError::LocalAccountLinkDenied { .. } => StatusCode::CONFLICT,
            AuthError::UpstreamProfileFailed(_)
            | AuthError::Hashing(_)
            | AuthError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::UpstreamExchangeFailed(_) => {
                "Failed to exchange authorization code for token".to_string()
            }
            AuthError::UpstreamProfileFailed(_) => {
                "Failed to fetch user info from provider".to_string()
            }
            AuthError::Hashing(_) | AuthError::Infrastructure(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::UpstreamExchangeFailed(_)
                | AuthError::UpstreamProfileFailed(_)
                | AuthError::Hashing(_)
                | AuthError::Infrastructure(_)
        )
    }
}

/// JSON error body returned for every rejected request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub status: bool,
    pub error: ErrorKind,
    pub message: String,
    /// Provider the account is already bound to, on federation conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl From<&AuthError> for ErrorBody {
    fn from(err: &AuthError) -> Self {
        let provider = match err {
            AuthError::ProviderMismatch { bound } => Some(bound.clone()),
            _ => None,
        };
        Self {
            status: false,
            error: err.kind(),
            message: err.public_message(),
            provider,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!(
                name = "auth.error.internal",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                kind = ?self.kind(),
                error = %self,
                message = "Request failed with internal error"
            );
        }
        (self.status(), Json(ErrorBody::from(&self))).into_response()
    }
}
