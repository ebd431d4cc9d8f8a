//! Field-level input checks shared by the node and account services.
//!
//! Each check returns the cleaned value, or the message to report against
//! the offending field.

use regex::Regex;

/// Message returned when a check rejects a value
pub type FieldResult<T> = Result<T, String>;

pub const NODE_NAME_MAX: usize = 300;
pub const CONTACT_TEXT_MAX: usize = 50;
pub const HOUSE_NUMBER_MAX: usize = 10;
pub const EMAIL_MAX: usize = 254;
pub const PRODUCT_NAME_MAX: usize = 150;
pub const PRODUCT_MODEL_MAX: usize = 100;
pub const USERNAME_MAX: usize = 150;
pub const PERSON_NAME_MAX: usize = 150;

pub struct ValidationService;

impl ValidationService {
    /// Non-blank, trimmed, bounded text
    pub fn required_text(value: &str, max: usize) -> FieldResult<String> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err("This field may not be blank.".to_string());
        }

        Self::bounded(trimmed, max)
    }

    /// Optional text that must still respect a length limit
    pub fn bounded(value: &str, max: usize) -> FieldResult<String> {
        if value.chars().count() > max {
            return Err(format!(
                "Ensure this field has no more than {} characters.",
                max
            ));
        }

        if value.chars().any(|c| c.is_control()) {
            return Err("This field cannot contain control characters.".to_string());
        }

        Ok(value.to_string())
    }

    pub fn email(email: &str) -> FieldResult<String> {
        let email = email.trim();

        if email.len() > EMAIL_MAX {
            return Err("Email is too long".to_string());
        }

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return Err("Enter a valid email address.".to_string());
        };

        if local_part.is_empty()
            || domain_part.is_empty()
            || domain_part.contains('@')
            || !domain_part.contains('.')
            || domain_part.starts_with('.')
            || domain_part.ends_with('.')
            || email.chars().any(char::is_whitespace)
        {
            return Err("Enter a valid email address.".to_string());
        }

        Ok(email.to_string())
    }

    /// Letters, digits and `@.+-_`, like conventional account usernames
    pub fn username(username: &str) -> FieldResult<String> {
        let username = username.trim();

        if username.is_empty() {
            return Err("This field may not be blank.".to_string());
        }

        if username.chars().count() > USERNAME_MAX {
            return Err(format!(
                "Ensure this field has no more than {} characters.",
                USERNAME_MAX
            ));
        }

        let regex = Regex::new(r"^[\w.@+-]+$")
            .map_err(|e| format!("Failed to compile username regex: {}", e))?;
        if !regex.is_match(username) {
            return Err(
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                    .to_string(),
            );
        }

        Ok(username.to_string())
    }
}
