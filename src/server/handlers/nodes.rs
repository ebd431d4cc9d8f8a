use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::Actor;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::ApiJson;
use crate::services::{NewNode, NodeChanges, NodeFilter, NodeView};

pub async fn create_node(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<NewNode>,
) -> ApiResult<(StatusCode, Json<NodeView>)> {
    state.authorize(&actor, "node:create")?;
    let node = state.nodes.create(input).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// `?contact__country=<country>` narrows to nodes whose contact matches exactly
pub async fn list_nodes(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<NodeFilter>,
) -> ApiResult<Json<Vec<NodeView>>> {
    state.authorize(&actor, "node:list")?;
    Ok(Json(state.nodes.list(&filter).await?))
}

pub async fn get_node(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Json<NodeView>> {
    state.authorize(&actor, "node:view")?;
    Ok(Json(state.nodes.get(id).await?))
}

pub async fn replace_node(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    ApiJson(changes): ApiJson<NodeChanges>,
) -> ApiResult<Json<NodeView>> {
    state.authorize(&actor, "node:update")?;
    changes.ensure_complete()?;
    Ok(Json(state.nodes.update(id, changes).await?))
}

pub async fn update_node(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    ApiJson(changes): ApiJson<NodeChanges>,
) -> ApiResult<Json<NodeView>> {
    state.authorize(&actor, "node:update")?;
    Ok(Json(state.nodes.update(id, changes).await?))
}

pub async fn delete_node(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.authorize(&actor, "node:delete")?;
    state.nodes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
