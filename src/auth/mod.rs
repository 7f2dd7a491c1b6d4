/// Authentication module
///
/// Handles JWT signing and validation, password hashing, token issuance,
/// refresh token rotation and session termination.

mod claims;
mod issuer;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::{AccessClaims, RefreshClaims};
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::{sign, verify, TokenError};
pub use password::{hash_password, verify_credentials, verify_password};
pub use refresh_token::{RotationCoordinator, SessionTerminator};
pub use service::{AuthService, Registration};
