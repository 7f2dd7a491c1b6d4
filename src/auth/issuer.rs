/// Token Issuer
///
/// Mints access/refresh token pairs and validates them. Minting is pure:
/// persisting the refresh token is the caller's job.

use serde::Serialize;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::auth::jwt::{self, TokenError};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::UserIdentity;

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    settings: JwtSettings,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.settings.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.settings.refresh_token_expiry
    }

    pub fn issue(&self, identity: &UserIdentity) -> Result<TokenPair, AppError> {
        let access = AccessClaims::new(
            identity,
            self.settings.access_token_expiry,
            self.settings.issuer.clone(),
        );
        let refresh = RefreshClaims::new(
            identity.id,
            self.settings.refresh_token_expiry,
            self.settings.issuer.clone(),
        );

        let access_token = jwt::sign(&access, &self.settings.access_token_secret)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
        let refresh_token = jwt::sign(&refresh, &self.settings.refresh_token_secret)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        jwt::verify(
            token,
            &self.settings.access_token_secret,
            &self.settings.issuer,
            self.settings.leeway,
        )
        .map_err(|e| rejected("access", e))
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        jwt::verify(
            token,
            &self.settings.refresh_token_secret,
            &self.settings.issuer,
            self.settings.leeway,
        )
        .map_err(|e| rejected("refresh", e))
    }
}

fn rejected(kind: &str, err: TokenError) -> AppError {
    tracing::warn!(token_kind = kind, error = %err, "JWT validation error");
    match err {
        TokenError::Expired => AppError::Auth(AuthError::TokenExpired),
        _ => AppError::Auth(AuthError::TokenInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
            leeway: 0,
        }
    }

    fn identity() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            fullname: "Alice".to_string(),
            avatar: "http://media/a.png".to_string(),
            cover_image: None,
            password_hash: String::new(),
            refresh_token_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = TokenIssuer::new(get_test_config());
        let user = identity();

        let pair = issuer.issue(&user).expect("Failed to issue tokens");

        let access = issuer.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(access.user_id().unwrap(), user.id);
        assert_eq!(access.email, "alice@x.com");
        assert_eq!(access.username, "alice");

        let refresh = issuer.validate_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.user_id().unwrap(), user.id);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let issuer = TokenIssuer::new(get_test_config());
        let pair = issuer.issue(&identity()).unwrap();

        assert!(matches!(
            issuer.validate_refresh_token(&pair.access_token),
            Err(AppError::Auth(AuthError::TokenInvalid))
        ));
        assert!(matches!(
            issuer.validate_access_token(&pair.refresh_token),
            Err(AppError::Auth(AuthError::TokenInvalid))
        ));
    }

    #[test]
    fn test_consecutive_pairs_differ() {
        let issuer = TokenIssuer::new(get_test_config());
        let user = identity();

        let first = issuer.issue(&user).unwrap();
        let second = issuer.issue(&user).unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn test_expired_access_token() {
        let mut config = get_test_config();
        config.access_token_expiry = -120;
        let issuer = TokenIssuer::new(config);
        let pair = issuer.issue(&identity()).unwrap();

        assert!(matches!(
            issuer.validate_access_token(&pair.access_token),
            Err(AppError::Auth(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let issuer = TokenIssuer::new(get_test_config());
        let pair = issuer.issue(&identity()).unwrap();

        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let other = TokenIssuer::new(config);

        assert!(other.validate_access_token(&pair.access_token).is_err());
    }
}
