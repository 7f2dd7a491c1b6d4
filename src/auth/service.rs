/// Authentication Service
///
/// Registration, login, token refresh and logout composed from the
/// credential check, the token issuer and the refresh token session slot.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::password::{hash_password, verify_credentials};
use crate::auth::refresh_token::{RotationCoordinator, SessionTerminator};
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{NewUser, PublicUser, TokenPrecondition, UserStore};
use crate::validators::{
    is_valid_email, is_valid_fullname, is_valid_media_url, is_valid_username,
};

/// Raw registration input
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: Arc<TokenIssuer>,
    rotation: RotationCoordinator,
    terminator: SessionTerminator,
    password_hash_cost: u32,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        issuer: Arc<TokenIssuer>,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            rotation: RotationCoordinator::new(store.clone(), issuer.clone()),
            terminator: SessionTerminator::new(store.clone()),
            store,
            issuer,
            password_hash_cost,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create a user; does not start a session
    ///
    /// # Errors
    /// - 400: blank or malformed field
    /// - 409: username or email already registered
    pub async fn register(&self, registration: Registration) -> Result<PublicUser, AppError> {
        let username = is_valid_username(&registration.username)?;
        let email = is_valid_email(&registration.email)?;
        let fullname = is_valid_fullname(&registration.fullname)?;
        let avatar = is_valid_media_url("avatar", &registration.avatar)?;
        let cover_image = match registration.cover_image.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(is_valid_media_url("coverImage", url)?),
            _ => None,
        };
        let password_hash = hash_password(&registration.password, self.password_hash_cost)?;

        let user = self
            .store
            .create(NewUser {
                username,
                email,
                fullname,
                avatar,
                cover_image,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.to_public())
    }

    /// Authenticate by username or email and start a new session
    ///
    /// Any refresh token issued earlier for the user stops being valid.
    ///
    /// # Errors
    /// - 400: blank identifier or password
    /// - 404: no such user
    /// - 401: wrong password
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<(TokenPair, PublicUser), AppError> {
        let identifier = username_or_email.trim();
        if identifier.is_empty() {
            return Err(ValidationError::EmptyField("username or email".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let user = self
            .store
            .find_by_username_or_email(identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if !verify_credentials(Some(&user), password) {
            tracing::warn!(user_id = %user.id, "Login with invalid password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.issuer.issue(&user)?;
        let stored = self
            .store
            .update_refresh_token(user.id, Some(&pair.refresh_token), TokenPrecondition::Any)
            .await?;
        if !stored {
            // Deleted between lookup and write
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((pair, user.to_public()))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        if refresh_token.trim().is_empty() {
            return Err(ValidationError::EmptyField("refresh token".to_string()).into());
        }
        self.rotation.rotate(refresh_token).await
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.terminator.terminate(user_id).await
    }
}
