/// JWT Signing and Verification
///
/// Claims-agnostic HS256 sign/verify. Expiry travels inside the claims, so
/// `sign` only needs the secret.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Why a token could not be produced or accepted
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    Expired,
    BadSignature,
    /// Not a JWT, wrong issuer, or claims of the wrong shape
    Malformed(String),
    Encoding(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::BadSignature => write!(f, "token signature is invalid"),
            TokenError::Malformed(msg) => write!(f, "token is malformed: {}", msg),
            TokenError::Encoding(msg) => write!(f, "token encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Sign `claims` with `secret`
pub fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Verify signature, issuer and expiry, and decode the claims
///
/// `leeway` is the tolerated clock skew in seconds.
pub fn verify<C: DeserializeOwned>(
    token: &str,
    secret: &str,
    issuer: &str,
    leeway: u64,
) -> Result<C, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = leeway;

    decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed(e.to_string()),
        })
}
