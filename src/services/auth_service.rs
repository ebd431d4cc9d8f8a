use bcrypt::{hash, verify};
use uuid::Uuid;

use crate::errors::AuthResult;

/// Password hashing and session token primitives
pub struct AuthService;

impl AuthService {
    /// Hash a password using bcrypt at the given work factor
    pub fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
        Ok(hash(password, cost)?)
    }

    /// Verify a password against a stored hash
    pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
        Ok(verify(password, hash)?)
    }

    /// Generate an unguessable session token
    pub fn generate_session_id() -> String {
        Uuid::new_v4().to_string()
    }
}
