use std::collections::BTreeSet;

use crate::database::entities::users;
use crate::errors::CoreError;

pub const STAFF_ROLE: &str = "staff";

/// Prefix of actions reserved for the administrative interface
pub const ADMIN_ACTION_PREFIX: &str = "admin:";

/// The authenticated caller of a request
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Actor {
    pub user_id: i32,
    pub username: String,
    /// Token of the session the request came in on
    pub session_id: String,
    roles: BTreeSet<String>,
}

impl Actor {
    pub fn new(user_id: i32, username: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            session_id: session_id.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn from_user(user: &users::Model, session_id: impl Into<String>) -> Self {
        let actor = Self::new(user.id, user.username.clone(), session_id);
        if user.is_staff {
            actor.with_role(STAFF_ROLE)
        } else {
            actor
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(STAFF_ROLE)
    }
}

pub trait Authorizer {
    fn authorize(&self, actor: &Actor, action: &str) -> Result<(), CoreError>;
}

/// Any authenticated caller may use the API; `admin:` actions need staff
pub struct StaffAuthorizer;

impl Authorizer for StaffAuthorizer {
    fn authorize(&self, actor: &Actor, action: &str) -> Result<(), CoreError> {
        if action.starts_with(ADMIN_ACTION_PREFIX) && !actor.is_staff() {
            return Err(CoreError::forbidden(
                "You do not have permission to perform this action",
            )
            .with_field("action", action));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;

    #[test]
    fn staff_may_use_admin_actions() {
        let actor = Actor::new(1, "root", "token").with_role(STAFF_ROLE);
        assert!(StaffAuthorizer.authorize(&actor, "admin:clear_debt").is_ok());
    }

    #[test]
    fn regular_users_are_kept_out_of_admin() {
        let actor = Actor::new(2, "bob", "token");
        let err = StaffAuthorizer
            .authorize(&actor, "admin:clear_debt")
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);
        assert!(StaffAuthorizer.authorize(&actor, "node:create").is_ok());
    }
}
