//! Authentication and account error types
//!
//! # Examples
//!
//! ```rust
//! use tradenet::errors::AuthError;
//!
//! let err = AuthError::InvalidCredentials;
//! assert!(err.is_authentication_error());
//!
//! let err = AuthError::PasswordMismatch;
//! assert!(err.is_validation_error());
//! ```

use thiserror::Error;

use super::CoreError;

/// Authentication and account errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login failed. Deliberately does not say whether the username exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing or unknown session
    #[error("Authentication credentials were not provided")]
    AuthenticationRequired,

    #[error("Session expired")]
    SessionExpired,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    /// `password` and `password_repeat` differ
    #[error("The entered passwords must match")]
    PasswordMismatch,

    /// Password rejected by the complexity policy
    #[error("Password does not meet requirements: {}", .0.join(" "))]
    WeakPassword(Vec<String>),

    #[error("incorrect password")]
    IncorrectOldPassword,

    #[error("A user with that username already exists")]
    UsernameTaken,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// First or last name rejected
    #[error("{message}")]
    InvalidName { field: String, message: String },

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AuthError {
    /// Check if this is an authentication error (401)
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AuthenticationRequired
                | AuthError::SessionExpired
        )
    }

    /// Check if this is a validation error (400)
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            AuthError::PasswordMismatch
                | AuthError::WeakPassword(_)
                | AuthError::IncorrectOldPassword
                | AuthError::UsernameTaken
                | AuthError::InvalidUsername(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidName { .. }
        )
    }

    /// Input field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            AuthError::PasswordMismatch => Some("password_repeat"),
            AuthError::WeakPassword(_) => Some("password"),
            AuthError::IncorrectOldPassword => Some("old_password"),
            AuthError::UsernameTaken | AuthError::InvalidUsername(_) => Some("username"),
            AuthError::InvalidEmail(_) => Some("email"),
            AuthError::InvalidName { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        if let Some(field) = err.field() {
            return CoreError::invalid_field(field.to_string(), err.to_string());
        }

        match err {
            AuthError::InvalidCredentials
            | AuthError::AuthenticationRequired
            | AuthError::SessionExpired => CoreError::unauthorized(err.to_string()),
            AuthError::Forbidden => CoreError::forbidden(err.to_string()),
            AuthError::UserNotFound => CoreError::new(
                crate::errors::CoreErrorKind::NotFound,
                err.to_string(),
            ),
            AuthError::Hashing(source) => {
                CoreError::internal("Password hashing failed").with_source(source)
            }
            AuthError::Database(db) => CoreError::from(db),
            other => CoreError::validation(other.to_string()),
        }
    }
}
