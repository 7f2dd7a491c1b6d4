/// In-memory user store
///
/// Every conditional update runs under a single write lock, which gives the
/// same compare-and-set semantics as the PostgreSQL store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{hash_refresh_token, NewUser, TokenPrecondition, UserIdentity, UserStore};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserIdentity>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, UserIdentity>>, AppError> {
        self.users
            .read()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, UserIdentity>>, AppError> {
        self.users
            .write()
            .map_err(|_| AppError::Internal("user store lock poisoned".to_string()))
    }

    fn modify<F>(&self, id: Uuid, apply: F) -> Result<Option<UserIdentity>, AppError>
    where
        F: FnOnce(&mut UserIdentity),
    {
        let mut users = self.write()?;
        Ok(users.get_mut(&id).map(|user| {
            apply(user);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

fn duplicate() -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(
        "Username or email already registered".to_string(),
    ))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<UserIdentity, AppError> {
        let mut users = self.write()?;
        let taken = users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email);
        if taken {
            return Err(duplicate());
        }

        let now = Utc::now();
        let user = UserIdentity {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            fullname: new_user.fullname,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            password_hash: new_user.password_hash,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, AppError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let needle = username_or_email.trim().to_lowercase();
        Ok(self
            .read()?
            .values()
            .find(|u| u.username == needle || u.email == needle)
            .cloned())
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        new_token: Option<&str>,
        precondition: TokenPrecondition<'_>,
    ) -> Result<bool, AppError> {
        let mut users = self.write()?;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };

        if let TokenPrecondition::Equals(expected) = precondition {
            if !user.holds_refresh_token(expected) {
                return Ok(false);
            }
        }

        user.refresh_token_hash = new_token.map(hash_refresh_token);
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        Ok(self
            .modify(id, |user| user.password_hash = password_hash.to_string())?
            .is_some())
    }

    async fn update_account_details(
        &self,
        id: Uuid,
        fullname: &str,
        email: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let mut users = self.write()?;
        if users.values().any(|u| u.id != id && u.email == email) {
            return Err(duplicate());
        }
        Ok(users.get_mut(&id).map(|user| {
            user.fullname = fullname.to_string();
            user.email = email.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_avatar(&self, id: Uuid, url: &str) -> Result<Option<UserIdentity>, AppError> {
        self.modify(id, |user| user.avatar = url.to_string())
    }

    async fn update_cover_image(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        self.modify(id, |user| user.cover_image = Some(url.to_string()))
    }
}
