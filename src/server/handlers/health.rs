use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::server::app::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, health) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(err) => {
            warn!("Database ping failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(json!({
            "status": health,
            "service": "tradenet",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
