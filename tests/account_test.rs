//! Account service tests
//!
//! Signup validation, login sessions, profile edits and password changes.

use anyhow::Result;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use tempfile::NamedTempFile;
use tradenet::config::AuthConfig;
use tradenet::database::entities::{user_sessions, users};
use tradenet::database::{establish_connection, setup_database};
use tradenet::errors::AuthError;
use tradenet::services::{
    AccountService, LoginRequest, PasswordChange, ProfileChanges, SignupRequest,
};

const PASSWORD: &str = "tundra-Vector-42";

async fn setup_accounts() -> Result<(AccountService, DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = establish_connection(&db_url).await?;
    setup_database(&db).await?;

    let config = AuthConfig {
        bcrypt_cost: 4,
        ..Default::default()
    };
    Ok((AccountService::new(db.clone(), &config), db, temp_file))
}

fn signup_request(username: &str, password: &str, repeat: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Byron".to_string(),
        email: format!("{}@example.com", username),
        password: password.to_string(),
        password_repeat: repeat.to_string(),
    }
}

fn login_request(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_signup_stores_hashed_password() -> Result<()> {
    let (accounts, db, _temp_file) = setup_accounts().await?;

    let user = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;
    assert_eq!(user.username, "ada");
    assert_eq!(user.email, "ada@example.com");

    let stored = users::Entity::find_by_id(user.id).one(&db).await?.expect("user");
    assert_ne!(stored.password_hash, PASSWORD);
    assert!(stored.password_hash.starts_with("$2"));
    assert!(!stored.is_staff);
    assert!(stored.is_active);

    Ok(())
}

#[tokio::test]
async fn test_signup_rejects_bad_input() -> Result<()> {
    let (accounts, _db, _temp_file) = setup_accounts().await?;

    let err = accounts
        .signup(signup_request("ada", PASSWORD, "something-else-42"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::PasswordMismatch));
    assert_eq!(err.field(), Some("password_repeat"));

    let err = accounts
        .signup(signup_request("ada", "123", "123"))
        .await
        .unwrap_err();
    match err {
        AuthError::WeakPassword(reasons) => assert!(reasons.len() >= 2),
        other => panic!("expected weak password, got {:?}", other),
    }

    let err = accounts
        .signup(signup_request("bad name", PASSWORD, PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidUsername(_)));

    let mut request = signup_request("ada", PASSWORD, PASSWORD);
    request.email = "ada-at-example".to_string();
    let err = accounts.signup(request).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail(_)));

    accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;
    let err = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UsernameTaken));

    Ok(())
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() -> Result<()> {
    let (accounts, _db, _temp_file) = setup_accounts().await?;
    accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;

    let wrong_password = accounts
        .login(login_request("ada", "not-the-password"))
        .await
        .unwrap_err();
    let unknown_user = accounts
        .login(login_request("nobody", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());

    Ok(())
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() -> Result<()> {
    let (accounts, db, _temp_file) = setup_accounts().await?;
    let user = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;

    let stored = users::Entity::find_by_id(user.id).one(&db).await?.expect("user");
    let mut active = stored.into_active_model();
    active.is_active = Set(false);
    active.update(&db).await?;

    let err = accounts.login(login_request("ada", PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn test_login_session_and_logout() -> Result<()> {
    let (accounts, db, _temp_file) = setup_accounts().await?;
    let user = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;

    let outcome = accounts.login(login_request("ada", PASSWORD)).await?;
    assert_eq!(outcome.user.id, user.id);
    assert!(outcome.expires_at > chrono::Utc::now());

    let session = accounts.authenticate_session(&outcome.session_id).await?;
    assert_eq!(session.user.id, user.id);

    let stored = users::Entity::find_by_id(user.id).one(&db).await?.expect("user");
    assert!(stored.last_login_at.is_some());

    accounts.logout(&outcome.session_id).await?;
    let err = accounts
        .authenticate_session(&outcome.session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AuthenticationRequired));

    // logging out keeps the account
    assert!(users::Entity::find_by_id(user.id).one(&db).await?.is_some());
    accounts.logout(&outcome.session_id).await?;

    let err = accounts.authenticate_session("no-such-token").await.unwrap_err();
    assert!(matches!(err, AuthError::AuthenticationRequired));

    Ok(())
}

#[tokio::test]
async fn test_expired_session_is_rejected() -> Result<()> {
    let (accounts, db, _temp_file) = setup_accounts().await?;
    accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;
    let outcome = accounts.login(login_request("ada", PASSWORD)).await?;

    let sessions = user_sessions::Entity::find().all(&db).await?;
    let mut session = sessions
        .into_iter()
        .next()
        .expect("session")
        .into_active_model();
    session.expires_at = Set(chrono::Utc::now() - chrono::Duration::hours(1));
    session.update(&db).await?;

    let err = accounts
        .authenticate_session(&outcome.session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));

    Ok(())
}

#[tokio::test]
async fn test_profile_updates() -> Result<()> {
    let (accounts, _db, _temp_file) = setup_accounts().await?;
    let ada = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;
    accounts
        .signup(signup_request("grace", PASSWORD, PASSWORD))
        .await?;

    let updated = accounts
        .update_profile(
            ada.id,
            ProfileChanges {
                first_name: Some("Augusta".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.last_name, "Byron");
    assert_eq!(updated.username, "ada");

    let err = accounts
        .update_profile(
            ada.id,
            ProfileChanges {
                username: Some("grace".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UsernameTaken));

    let profile = accounts.profile(ada.id).await?;
    assert_eq!(profile.username, "ada");

    Ok(())
}

#[tokio::test]
async fn test_password_change() -> Result<()> {
    let (accounts, _db, _temp_file) = setup_accounts().await?;
    let user = accounts
        .signup(signup_request("ada", PASSWORD, PASSWORD))
        .await?;
    let current = accounts.login(login_request("ada", PASSWORD)).await?;
    let other = accounts.login(login_request("ada", PASSWORD)).await?;

    let err = accounts
        .change_password(
            user.id,
            PasswordChange {
                old_password: "wrong-old-password".to_string(),
                new_password: "glacier-Harbor-77".to_string(),
            },
            Some(&current.session_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IncorrectOldPassword));
    assert_eq!(err.field(), Some("old_password"));

    let err = accounts
        .change_password(
            user.id,
            PasswordChange {
                old_password: PASSWORD.to_string(),
                new_password: "12345678".to_string(),
            },
            Some(&current.session_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    accounts
        .change_password(
            user.id,
            PasswordChange {
                old_password: PASSWORD.to_string(),
                new_password: "glacier-Harbor-77".to_string(),
            },
            Some(&current.session_id),
        )
        .await?;

    assert!(accounts.authenticate_session(&current.session_id).await.is_ok());
    assert!(accounts.authenticate_session(&other.session_id).await.is_err());

    assert!(accounts.login(login_request("ada", PASSWORD)).await.is_err());
    accounts
        .login(login_request("ada", "glacier-Harbor-77"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_create_superuser_is_staff() -> Result<()> {
    let (accounts, db, _temp_file) = setup_accounts().await?;

    let admin = accounts
        .create_superuser("root", "root@example.com", PASSWORD)
        .await?;
    let stored = users::Entity::find_by_id(admin.id).one(&db).await?.expect("user");
    assert!(stored.is_staff);

    let err = accounts
        .create_superuser("weak", "", "password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    Ok(())
}
