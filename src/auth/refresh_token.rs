/// Refresh Token Rotation and Revocation
///
/// Each user has at most one valid refresh token. Rotation exchanges it for a
/// fresh pair and swaps the stored token with a conditional update, so a
/// superseded or replayed token is rejected even when two rotations race.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::error::{AppError, AuthError};
use crate::store::{TokenPrecondition, UserStore};

#[derive(Clone)]
pub struct RotationCoordinator {
    store: Arc<dyn UserStore>,
    issuer: Arc<TokenIssuer>,
}

impl RotationCoordinator {
    pub fn new(store: Arc<dyn UserStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Exchange a refresh token for a new pair
    ///
    /// # Errors
    /// - `AuthError::TokenExpired` / `TokenInvalid`: signature, issuer or
    ///   expiry check failed, or the subject no longer exists
    /// - `AuthError::TokenSuperseded`: the token is not the stored one, or a
    ///   concurrent rotation replaced it first
    /// - store or signing failures as internal errors
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = self.issuer.validate_refresh_token(presented)?;
        let user_id = claims.user_id()?;

        let user = self.store.find_by_id(user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Refresh token subject does not exist");
            AppError::Auth(AuthError::TokenInvalid)
        })?;

        if !user.holds_refresh_token(presented) {
            tracing::warn!(user_id = %user_id, "Attempt to use superseded refresh token");
            return Err(AuthError::TokenSuperseded.into());
        }

        let pair = self.issuer.issue(&user)?;

        let swapped = self
            .store
            .update_refresh_token(
                user_id,
                Some(&pair.refresh_token),
                TokenPrecondition::Equals(presented),
            )
            .await?;

        if !swapped {
            tracing::warn!(user_id = %user_id, "Lost refresh token rotation race");
            return Err(AuthError::TokenSuperseded.into());
        }

        tracing::info!(user_id = %user_id, "Refresh token rotated");
        Ok(pair)
    }
}

#[derive(Clone)]
pub struct SessionTerminator {
    store: Arc<dyn UserStore>,
}

impl SessionTerminator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Clear the stored refresh token; calling it again is a no-op
    pub async fn terminate(&self, user_id: Uuid) -> Result<(), AppError> {
        let cleared = self
            .store
            .update_refresh_token(user_id, None, TokenPrecondition::Any)
            .await?;

        if cleared {
            tracing::info!(user_id = %user_id, "Session terminated");
        } else {
            tracing::debug!(user_id = %user_id, "No user to terminate session for");
        }
        Ok(())
    }
}
