/// Account Service
///
/// Profile operations for an already authenticated user: reading the
/// current profile, password change, account details and media updates.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::{AppError, AuthError, ValidationError};
use crate::media::MediaUploader;
use crate::store::{PublicUser, UserIdentity, UserStore};
use crate::validators::{is_valid_email, is_valid_fullname, require};

/// Which profile image an upload replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::CoverImage => "coverImage",
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaUploader>,
    password_hash_cost: u32,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        media: Arc<dyn MediaUploader>,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            store,
            media,
            password_hash_cost,
        }
    }

    async fn load(&self, user_id: Uuid) -> Result<UserIdentity, AppError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        Ok(self.load(user_id).await?.to_public())
    }

    /// Replace the password after checking the old one
    ///
    /// The current session is kept.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.load(user_id).await?;

        if !user.is_password_correct(old_password) {
            tracing::warn!(user_id = %user_id, "Password change with invalid old password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let password_hash = hash_password(new_password, self.password_hash_cost)?;
        if !self.store.update_password(user_id, &password_hash).await? {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn update_account_details(
        &self,
        user_id: Uuid,
        fullname: Option<&str>,
        email: Option<&str>,
    ) -> Result<PublicUser, AppError> {
        let fullname = is_valid_fullname(&require("fullname", fullname)?)?;
        let email = is_valid_email(&require("email", email)?)?;

        let user = self
            .store
            .update_account_details(user_id, &fullname, &email)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user_id, "Account details updated");
        Ok(user.to_public())
    }

    /// Upload a new avatar or cover image and store its URL
    pub async fn update_image(
        &self,
        user_id: Uuid,
        image: ProfileImage,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<PublicUser, AppError> {
        if data.is_empty() {
            return Err(ValidationError::EmptyField(image.field().to_string()).into());
        }

        let uploaded = self.media.upload(data, content_type).await?;
        let url = uploaded.url.filter(|url| !url.is_empty()).ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Media host returned no URL");
            AppError::Validation(ValidationError::InvalidFormat(format!(
                "{} upload",
                image.field()
            )))
        })?;

        let updated = match image {
            ProfileImage::Avatar => self.store.update_avatar(user_id, &url).await?,
            ProfileImage::CoverImage => self.store.update_cover_image(user_id, &url).await?,
        };
        let user = updated.ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user_id, field = image.field(), "Profile image updated");
        Ok(user.to_public())
    }
}
