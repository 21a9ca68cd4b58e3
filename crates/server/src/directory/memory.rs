use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI32, Ordering};
use time::OffsetDateTime;

use super::{DirectoryError, UserDirectory};
use crate::entity::user::{Model as User, NewUser};

/// In-process directory. Uniqueness is enforced through the email index entry
/// lock, so concurrent creates for one email cannot both succeed.
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<i32, User>,
    by_email: DashMap<String, i32>,
    next_id: AtomicI32,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let id = *self.by_email.get(email).ok_or(DirectoryError::NotFound)?;
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: i32) -> Result<User, DirectoryError> {
        self.users
            .get(&id)
            .map(|u| u.clone())
            .ok_or(DirectoryError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(DirectoryError::EmailExists),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let model = user.into_model(id, OffsetDateTime::now_utc());
                self.users.insert(id, model.clone());
                slot.insert(id);
                Ok(model)
            }
        }
    }

    async fn update(&self, mut user: User) -> Result<User, DirectoryError> {
        let previous_email = self
            .users
            .get(&user.id)
            .map(|u| u.email.clone())
            .ok_or(DirectoryError::NotFound)?;

        if previous_email != user.email {
            match self.by_email.entry(user.email.clone()) {
                Entry::Occupied(_) => return Err(DirectoryError::EmailExists),
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
            self.by_email.remove(&previous_email);
        }

        user.updated_at = OffsetDateTime::now_utc();
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}
