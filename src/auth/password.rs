/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and the credential check used by
/// login and password change.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};
use crate::store::UserIdentity;

/// bcrypt ignores input past 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password is empty or longer than 72 bytes
/// - Bcrypt hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    validate_password(password)?;

    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a presented password against a bcrypt hash
///
/// Fails closed: a hash bcrypt cannot parse counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// Credential check for a possibly missing identity
pub fn verify_credentials(identity: Option<&UserIdentity>, password: &str) -> bool {
    identity.map_or(false, |user| user.is_password_correct(password))
}

impl UserIdentity {
    pub fn is_password_correct(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH).into());
    }

    Ok(())
}
