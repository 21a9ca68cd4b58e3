use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    DbErr, EntityTrait, IntoActiveModel, QueryFilter, SqlErr,
};
use std::sync::Arc;
use time::OffsetDateTime;

use super::{DirectoryError, UserDirectory};
use crate::entity::user::{self, Model as User, NewUser};

/// Relational directory backed by sea-orm. Relies on the unique index on
/// `users.email` created by the migration.
#[derive(Clone)]
pub struct SeaOrmDirectory {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn classify(err: DbErr) -> DirectoryError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DirectoryError::EmailExists,
        _ => match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => DirectoryError::NotFound,
            other => DirectoryError::Backend(other.to_string()),
        },
    }
}

#[async_trait]
impl UserDirectory for SeaOrmDirectory {
    #[tracing::instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(classify)?
            .ok_or(DirectoryError::NotFound)
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: i32) -> Result<User, DirectoryError> {
        user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(classify)?
            .ok_or(DirectoryError::NotFound)
    }

    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        let now = OffsetDateTime::now_utc();
        let active = user::ActiveModel {
            id: NotSet,
            name: Set(user.display_name()),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            role: Set(user.role),
            verified: Set(user.verified),
            provider: Set(user.provider),
            created_at: Set(now),
            updated_at: Set(now),
        };
        active.insert(self.db.as_ref()).await.map_err(classify)
    }

    #[tracing::instrument(skip(self, user), fields(id = user.id))]
    async fn update(&self, user: User) -> Result<User, DirectoryError> {
        let id = user.id;
        let mut active = user.into_active_model().reset_all();
        active.id = sea_orm::ActiveValue::Unchanged(id);
        active.created_at = NotSet;
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(self.db.as_ref()).await.map_err(classify)
    }
}
