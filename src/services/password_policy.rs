//! Pluggable password complexity checks.
//!
//! A [`PasswordPolicy`] runs every configured [`PasswordValidator`] and
//! reports all failures at once, so a client can fix everything in one go.

use crate::config::PasswordPolicyConfig;
use crate::errors::{AuthError, AuthResult};

/// Account details a password must not resemble
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

pub trait PasswordValidator: Send + Sync {
    /// `Err` carries the message shown to the user
    fn validate(&self, password: &str, user: &UserAttributes<'_>) -> Result<(), String>;
}

pub struct MinimumLength(pub usize);

impl PasswordValidator for MinimumLength {
    fn validate(&self, password: &str, _user: &UserAttributes<'_>) -> Result<(), String> {
        if password.chars().count() < self.0 {
            return Err(format!(
                "This password is too short. It must contain at least {} characters.",
                self.0
            ));
        }
        Ok(())
    }
}

pub struct NumericPassword;

impl PasswordValidator for NumericPassword {
    fn validate(&self, password: &str, _user: &UserAttributes<'_>) -> Result<(), String> {
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            return Err("This password is entirely numeric.".to_string());
        }
        Ok(())
    }
}

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "1234", "12345", "password", "qwerty",
    "qwerty123", "1234567890", "1234567", "111111", "123123", "abc123", "password1",
    "password123", "iloveyou", "1q2w3e4r", "000000", "qwertyuiop", "monkey", "dragon",
    "letmein", "football", "baseball", "welcome", "admin", "admin123", "login",
    "princess", "sunshine", "master", "shadow", "superman", "starwars", "trustno1",
    "passw0rd", "zaq12wsx", "1qaz2wsx", "asdfghjkl", "changeme", "whatever", "secret",
];

pub struct CommonPassword;

impl PasswordValidator for CommonPassword {
    fn validate(&self, password: &str, _user: &UserAttributes<'_>) -> Result<(), String> {
        let lowered = password.trim().to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            return Err("This password is too common.".to_string());
        }
        Ok(())
    }
}

/// Rejects passwords that contain, or are contained in, the username,
/// names or the local part of the email address
pub struct UserAttributeSimilarity;

impl PasswordValidator for UserAttributeSimilarity {
    fn validate(&self, password: &str, user: &UserAttributes<'_>) -> Result<(), String> {
        let password = password.to_lowercase();
        let email_local = user.email.split('@').next().unwrap_or_default();

        let attributes = [
            ("username", user.username),
            ("first name", user.first_name),
            ("last name", user.last_name),
            ("email address", email_local),
        ];

        for (label, value) in attributes {
            let value = value.trim().to_lowercase();
            if value.chars().count() < 3 {
                continue;
            }
            if password.contains(&value) || value.contains(&password) {
                return Err(format!("The password is too similar to the {}.", label));
            }
        }
        Ok(())
    }
}

pub struct PasswordPolicy {
    validators: Vec<Box<dyn PasswordValidator>>,
}

impl PasswordPolicy {
    pub fn new(validators: Vec<Box<dyn PasswordValidator>>) -> Self {
        Self { validators }
    }

    pub fn from_config(config: &PasswordPolicyConfig) -> Self {
        let mut validators: Vec<Box<dyn PasswordValidator>> = Vec::new();

        if config.reject_similar_to_user {
            validators.push(Box::new(UserAttributeSimilarity));
        }
        if config.min_length > 0 {
            validators.push(Box::new(MinimumLength(config.min_length)));
        }
        if config.reject_common {
            validators.push(Box::new(CommonPassword));
        }
        if config.reject_numeric {
            validators.push(Box::new(NumericPassword));
        }

        Self::new(validators)
    }

    pub fn validate(&self, password: &str, user: &UserAttributes<'_>) -> AuthResult<()> {
        let failures: Vec<String> = self
            .validators
            .iter()
            .filter_map(|validator| validator.validate(password, user).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(failures))
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from_config(&PasswordPolicyConfig::default())
    }
}
