//! User entity - the durable identity record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub verified: bool,
    /// OAuth provider that created or last reconciled this account.
    pub provider: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Authorization role. Only `member` is ever assigned by this service.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "member")]
    Member,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Whether this role may access a route gated on `required`.
    ///
    /// The only policy in force is binary: admin-only routes reject `member`,
    /// every other role passes.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Member => true,
            Role::Admin => self != Role::Member,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

/// Fields supplied by the caller when creating a user. Storage assigns `id`
/// and the timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub provider: Option<String>,
}

impl NewUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Materialise the record as storage would, for a given id and clock.
    pub fn into_model(self, id: i32, now: OffsetDateTime) -> Model {
        Model {
            id,
            name: self.display_name(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            verified: self.verified,
            provider: self.provider,
            created_at: now,
            updated_at: now,
        }
    }
}
