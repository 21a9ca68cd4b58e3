//! Identity services: local credentials and federated login.

pub mod auth;
pub mod federation;

pub use auth::AuthenticationService;
pub use federation::{FederatedLogin, FederationReconciler};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{Role, user};

/// Public view of a user record. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            verified: user.verified,
            provider: user.provider.clone(),
        }
    }
}
