use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use handlebars::Handlebars;
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{accounts, admin, health, nodes};
use super::templates::get_handlebars;
use crate::auth::{Actor, Authorizer, StaffAuthorizer};
use crate::config::AppConfig;
use crate::errors::CoreError;
use crate::services::{AccountService, NodeService, ProductService};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub nodes: NodeService,
    pub products: ProductService,
    pub accounts: AccountService,
    pub templates: Arc<Handlebars<'static>>,
    pub authorizer: Arc<dyn Authorizer + Send + Sync>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            nodes: NodeService::new(db.clone()),
            products: ProductService::new(db.clone()),
            accounts: AccountService::new(db.clone(), &config.auth),
            templates: Arc::new(get_handlebars()?),
            authorizer: Arc::new(StaffAuthorizer),
            db,
        })
    }

    pub fn authorize(&self, actor: &Actor, action: &str) -> Result<(), CoreError> {
        self.authorizer.authorize(actor, action)
    }
}

pub async fn create_app(db: DatabaseConnection, config: &AppConfig) -> Result<Router> {
    let state = AppState::new(db, config)?;

    let cors = match config.server.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin: {}", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/trade_network", trade_network_routes())
        .nest("/core", account_routes())
        .nest("/admin", admin_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn trade_network_routes() -> Router<AppState> {
    Router::new()
        .route("/node", post(nodes::create_node))
        .route("/node/list", get(nodes::list_nodes))
        .route(
            "/node/:id",
            get(nodes::get_node)
                .put(nodes::replace_node)
                .patch(nodes::update_node)
                .delete(nodes::delete_node),
        )
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route(
            "/profile",
            get(accounts::get_profile)
                .put(accounts::replace_profile)
                .patch(accounts::update_profile)
                .delete(accounts::logout),
        )
        .route(
            "/update_password",
            put(accounts::update_password).patch(accounts::update_password),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/nodes", get(admin::node_list))
        .route("/nodes/clear-debt", post(admin::clear_debt))
        .route("/nodes/:id", get(admin::node_detail))
        .route("/nodes/:id/products", post(admin::create_product))
        .route("/products", get(admin::product_list))
        .route("/products/:id", delete(admin::delete_product))
}
