//! User accounts: signup, login sessions, profile and password management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::database::entities::{user_sessions, users};
use crate::errors::{AuthError, AuthResult};
use crate::services::auth_service::AuthService;
use crate::services::password_policy::{PasswordPolicy, UserAttributes};
use crate::services::validation::{ValidationService, PERSON_NAME_MAX};

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub password_repeat: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of an account; never carries password material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<users::Model> for UserView {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: UserView,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A request's resolved identity
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: users::Model,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileChanges {
    /// Full replacement must carry a username
    pub fn ensure_complete(&self) -> AuthResult<()> {
        if self.username.is_none() {
            return Err(AuthError::InvalidUsername(
                "This field is required.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Clone)]
pub struct AccountService {
    db: DatabaseConnection,
    policy: Arc<PasswordPolicy>,
    bcrypt_cost: u32,
    session_hours: i64,
    /// Hash checked when the username is unknown, so every login attempt
    /// costs one bcrypt verification
    dummy_hash: Arc<OnceCell<String>>,
}

impl AccountService {
    pub fn new(db: DatabaseConnection, config: &AuthConfig) -> Self {
        Self {
            db,
            policy: Arc::new(PasswordPolicy::from_config(&config.password)),
            bcrypt_cost: config.bcrypt_cost,
            session_hours: config.session_hours,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Swap the complexity policy, e.g. for custom validators
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub async fn signup(&self, request: SignupRequest) -> AuthResult<UserView> {
        let user = self.register(request, false).await?;
        info!(user_id = user.id, "Signed up user {}", user.username);
        Ok(user)
    }

    /// Create a staff account allowed into the administrative interface
    pub async fn create_superuser(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<UserView> {
        let request = SignupRequest {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: email.to_string(),
            password: password.to_string(),
            password_repeat: password.to_string(),
        };
        let user = self.register(request, true).await?;
        info!(user_id = user.id, "Created staff user {}", user.username);
        Ok(user)
    }

    async fn register(&self, request: SignupRequest, is_staff: bool) -> AuthResult<UserView> {
        let username =
            ValidationService::username(&request.username).map_err(AuthError::InvalidUsername)?;
        let email = clean_email(&request.email)?;
        let first_name = clean_name(&request.first_name, "first_name")?;
        let last_name = clean_name(&request.last_name, "last_name")?;

        self.policy.validate(
            &request.password,
            &UserAttributes {
                username: &username,
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
            },
        )?;
        if request.password != request.password_repeat {
            return Err(AuthError::PasswordMismatch);
        }

        self.ensure_username_free(&username, None).await?;

        let password_hash = AuthService::hash_password(&request.password, self.bcrypt_cost)?;

        let mut user = users::ActiveModel::new();
        user.username = Set(username);
        user.first_name = Set(first_name);
        user.last_name = Set(last_name);
        user.email = Set(email);
        user.password_hash = Set(password_hash);
        user.is_staff = Set(is_staff);

        Ok(user.insert(&self.db).await?.into())
    }

    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(request.username.trim()))
            .one(&self.db)
            .await?;

        let Some(user) = user.filter(|u| u.is_active) else {
            self.verify_against_dummy(&request.password).await?;
            warn!("Rejected login for unknown or inactive user");
            return Err(AuthError::InvalidCredentials);
        };

        if !AuthService::verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = user.id, "Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = user_sessions::ActiveModel::new(
            user.id,
            AuthService::generate_session_id(),
            self.session_hours,
        )
        .insert(&self.db)
        .await?;

        let user = user
            .into_active_model()
            .set_last_login()
            .update(&self.db)
            .await?;

        info!(user_id = user.id, "User {} logged in", user.username);
        Ok(LoginOutcome {
            user: user.into(),
            session_id: session.session_id,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a session token to its active user
    pub async fn authenticate_session(&self, session_id: &str) -> AuthResult<SessionUser> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or(AuthError::AuthenticationRequired)?;

        if session.is_expired() {
            return Err(AuthError::SessionExpired);
        }

        let user = users::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::AuthenticationRequired)?;

        Ok(SessionUser {
            user,
            session_id: session.session_id,
        })
    }

    /// End one session. The account itself is untouched.
    pub async fn logout(&self, session_id: &str) -> AuthResult<()> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await?;

        if let Some(session) = session.filter(|s| s.is_active) {
            let user_id = session.user_id;
            session.into_active_model().deactivate().update(&self.db).await?;
            info!(user_id, "User logged out");
        }
        Ok(())
    }

    pub async fn profile(&self, user_id: i32) -> AuthResult<UserView> {
        Ok(self.find_user(user_id).await?.into())
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        changes: ProfileChanges,
    ) -> AuthResult<UserView> {
        let user = self.find_user(user_id).await?;
        let mut active = user.into_active_model();

        if let Some(username) = changes.username {
            let username =
                ValidationService::username(&username).map_err(AuthError::InvalidUsername)?;
            self.ensure_username_free(&username, Some(user_id)).await?;
            active.username = Set(username);
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(clean_name(&first_name, "first_name")?);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(clean_name(&last_name, "last_name")?);
        }
        if let Some(email) = changes.email {
            active.email = Set(clean_email(&email)?);
        }

        let user = active.update(&self.db).await?;
        info!(user_id, "Updated profile of {}", user.username);
        Ok(user.into())
    }

    /// Replace the password after checking the old one. Other sessions of
    /// the user are ended; `keep_session` stays valid.
    pub async fn change_password(
        &self,
        user_id: i32,
        change: PasswordChange,
        keep_session: Option<&str>,
    ) -> AuthResult<()> {
        let user = self.find_user(user_id).await?;

        if !AuthService::verify_password(&change.old_password, &user.password_hash)? {
            return Err(AuthError::IncorrectOldPassword);
        }

        self.policy.validate(
            &change.new_password,
            &UserAttributes {
                username: &user.username,
                first_name: &user.first_name,
                last_name: &user.last_name,
                email: &user.email,
            },
        )?;

        let password_hash = AuthService::hash_password(&change.new_password, self.bcrypt_cost)?;

        let txn = self.db.begin().await?;
        let mut active = user.into_active_model();
        active.password_hash = Set(password_hash);
        active.update(&txn).await?;

        let mut others = user_sessions::Entity::update_many()
            .col_expr(user_sessions::Column::IsActive, Expr::value(false))
            .filter(user_sessions::Column::UserId.eq(user_id));
        if let Some(keep) = keep_session {
            others = others.filter(user_sessions::Column::SessionId.ne(keep));
        }
        others.exec(&txn).await?;
        txn.commit().await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    async fn verify_against_dummy(&self, password: &str) -> AuthResult<()> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async {
                AuthService::hash_password(&AuthService::generate_session_id(), self.bcrypt_cost)
            })
            .await?;
        AuthService::verify_password(password, hash)?;
        Ok(())
    }

    async fn find_user(&self, user_id: i32) -> AuthResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn ensure_username_free(&self, username: &str, except: Option<i32>) -> AuthResult<()> {
        let mut query = users::Entity::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id));
        }

        if query.one(&self.db).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        Ok(())
    }
}

/// Email is optional on accounts; when given it must be valid
fn clean_email(email: &str) -> AuthResult<String> {
    if email.trim().is_empty() {
        return Ok(String::new());
    }
    ValidationService::email(email).map_err(AuthError::InvalidEmail)
}

fn clean_name(value: &str, field: &str) -> AuthResult<String> {
    ValidationService::bounded(value.trim(), PERSON_NAME_MAX)
        .map_err(|message| AuthError::InvalidName {
            field: field.to_string(),
            message,
        })
}
