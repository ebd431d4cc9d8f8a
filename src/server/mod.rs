pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod templates;

use anyhow::Result;
use tracing::info;

use crate::config::AppConfig;
use crate::database::{establish_connection, get_database_url, setup_database};

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database.path));
    let db = establish_connection(&database_url).await?;
    setup_database(&db).await?;

    let app = app::create_app(db, config).await?;

    log_routes();

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /trade_network/node         - Create nodes (POST)");
    info!("  /trade_network/node/list    - List nodes, ?contact__country=");
    info!("  /trade_network/node/:id     - Retrieve, update, delete a node");
    info!("  /core/*                     - Signup, login, profile, password change");
    info!("  /admin/*                    - Staff back office");
}
