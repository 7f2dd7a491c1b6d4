/// User Store
///
/// The user record and the storage interface the core talks to. The refresh
/// token slot on the record is the session store: it holds the SHA-256 digest
/// of the one refresh token currently valid for the user.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// Stored user record
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    /// SHA-256 hex digest of the current refresh token
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Sanitized view without credentials
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }

    /// Whether `token` is the refresh token currently stored for this user
    pub fn holds_refresh_token(&self, token: &str) -> bool {
        self.refresh_token_hash.as_deref() == Some(hash_refresh_token(token).as_str())
    }
}

/// User information returned to clients
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated input for a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
}

/// Condition the stored refresh token must meet for an update to apply
#[derive(Debug, Clone, Copy)]
pub enum TokenPrecondition<'a> {
    /// Overwrite whatever is stored
    Any,
    /// Only replace this exact token
    Equals(&'a str),
}

/// Hash a refresh token using SHA-256
///
/// Only the digest is ever handed to a store.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage backend for user records
///
/// Lookups by username or email are case-insensitive; implementations store
/// both lower-cased. Update methods return `None`/`false` when no user with
/// the given id exists.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; duplicate username or email is a conflict
    async fn create(&self, new_user: NewUser) -> Result<UserIdentity, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, AppError>;

    async fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<UserIdentity>, AppError>;

    /// Atomically replace the stored refresh token if `precondition` holds
    ///
    /// `new_token` is the plaintext token (or `None` to clear the slot). The
    /// check and the write happen as one step. Returns whether the update
    /// was applied.
    async fn update_refresh_token(
        &self,
        id: Uuid,
        new_token: Option<&str>,
        precondition: TokenPrecondition<'_>,
    ) -> Result<bool, AppError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    async fn update_account_details(
        &self,
        id: Uuid,
        fullname: &str,
        email: &str,
    ) -> Result<Option<UserIdentity>, AppError>;

    async fn update_avatar(&self, id: Uuid, url: &str) -> Result<Option<UserIdentity>, AppError>;

    async fn update_cover_image(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<UserIdentity>, AppError>;
}
