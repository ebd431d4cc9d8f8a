use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;

use crate::auth::Actor;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::{ApiJson, SESSION_COOKIE};
use crate::services::{LoginRequest, PasswordChange, ProfileChanges, SignupRequest, UserView};

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = state.accounts.signup(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Returns the session token in the body and as an `HttpOnly` cookie
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.accounts.login(request).await?;

    let max_age = (outcome.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(&outcome.session_id, max_age)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);
    Ok((headers, Json(outcome)))
}

pub async fn get_profile(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<UserView>> {
    Ok(Json(state.accounts.profile(actor.user_id).await?))
}

pub async fn replace_profile(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Json<UserView>> {
    changes.ensure_complete()?;
    Ok(Json(state.accounts.update_profile(actor.user_id, changes).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.accounts.update_profile(actor.user_id, changes).await?))
}

/// Ends the caller's session and expires the cookie
pub async fn logout(State(state): State<AppState>, actor: Actor) -> ApiResult<impl IntoResponse> {
    state.accounts.logout(&actor.session_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0)?);
    Ok((StatusCode::NO_CONTENT, headers))
}

pub async fn update_password(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(change): ApiJson<PasswordChange>,
) -> ApiResult<StatusCode> {
    state
        .accounts
        .change_password(actor.user_id, change, Some(&actor.session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn session_cookie(token: &str, max_age: i64) -> Result<HeaderValue, CoreError> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    ))
    .map_err(|e| CoreError::internal("Failed to build session cookie").with_source(e))
}
