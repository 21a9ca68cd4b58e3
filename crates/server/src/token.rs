//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs. Claims are decoded into a fixed struct, so a token
//! with a missing field, a wrong type or an unknown role is rejected as
//! malformed instead of being coerced.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use utoipa::ToSchema;

use crate::entity::{Role, user};
use crate::error::AuthError;

/// Fixed session lifetime.
pub const SESSION_LIFETIME: Duration = Duration::days(7);

/// Identity facts embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Expiry as Unix seconds.
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.exp).ok()
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `user`, expiring seven days from now.
    pub fn issue(&self, user: &user::Model) -> Result<String, AuthError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(
        &self,
        user: &user::Model,
        issued_at: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: (issued_at + SESSION_LIFETIME).unix_timestamp(),
        };
        self.encode(&claims)
    }

    pub(crate) fn encode(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Infrastructure(format!("failed to sign token: {e}")))
    }

    /// Validate signature and expiry and return the embedded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidSignature => AuthError::InvalidSignature,
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })
    }
}
