//! Staff-only back office: HTML pages for browsing members and products,
//! plus JSON actions for the bulk debt clear and product management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::Actor;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::ApiJson;
use crate::server::templates::{NODE_DETAIL_PAGE, NODE_LIST_PAGE, PRODUCT_LIST_PAGE};
use crate::services::{NewProduct, NodeFilter, NodeView, ProductView};

#[derive(Debug, Deserialize)]
pub struct ClearDebtRequest {
    pub ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct ClearDebtResponse {
    pub updated: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn node_list(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<NodeFilter>,
) -> ApiResult<Html<String>> {
    state.authorize(&actor, "admin:view_nodes")?;
    let nodes = state.nodes.list(&filter).await?;

    render(
        &state,
        NODE_LIST_PAGE,
        &json!({
            "title": "Trading network members",
            "q": filter.search,
            "city": filter.city,
            "nodes": nodes.iter().map(node_row).collect::<Vec<_>>(),
        }),
    )
}

pub async fn node_detail(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Html<String>> {
    state.authorize(&actor, "admin:view_nodes")?;
    let node = state.nodes.get(id).await?;
    let products = state.products.list_for_node(id).await?;

    render(
        &state,
        NODE_DETAIL_PAGE,
        &json!({
            "title": node.name,
            "node": node_row(&node),
            "contact": node.contact,
            "products": products,
        }),
    )
}

/// Bulk action: zero `debt_to_the_supplier` on the selected members
pub async fn clear_debt(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<ClearDebtRequest>,
) -> ApiResult<Json<ClearDebtResponse>> {
    state.authorize(&actor, "admin:clear_debt")?;
    let updated = state.nodes.clear_debt(&request.ids).await?;
    Ok(Json(ClearDebtResponse { updated }))
}

pub async fn product_list(
    State(state): State<AppState>,
    actor: Actor,
    Query(search): Query<ProductSearch>,
) -> ApiResult<Html<String>> {
    state.authorize(&actor, "admin:view_products")?;
    let products = state.products.search(search.q.as_deref()).await?;

    render(
        &state,
        PRODUCT_LIST_PAGE,
        &json!({
            "title": "Products",
            "q": search.q,
            "products": products,
        }),
    )
}

pub async fn create_product(
    State(state): State<AppState>,
    actor: Actor,
    Path(owner_id): Path<i32>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductView>)> {
    state.authorize(&actor, "admin:edit_products")?;
    let product = state.products.create(owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.authorize(&actor, "admin:edit_products")?;
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn node_row(node: &NodeView) -> Value {
    json!({
        "id": node.id,
        "name": node.name,
        "level": node.level,
        "supplier": node.supplier,
        "supplier_id": node.supplier_id,
        "debt": node.debt_to_the_supplier.to_string(),
        "date_of_creation": node.date_of_creation.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

fn render(state: &AppState, page: &str, data: &Value) -> ApiResult<Html<String>> {
    let html = state
        .templates
        .render(page, data)
        .map_err(|e| CoreError::internal("Failed to render page").with_source(e))?;
    Ok(Html(html))
}
