use sea_orm::{ActiveModelTrait, DatabaseConnection};

use super::connection::{establish_connection, setup_database};
use super::entities::nodes;

/// Migrated in-memory database, one per test
pub async fn setup_test_db() -> DatabaseConnection {
    let db = establish_connection("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    setup_database(&db).await.expect("Failed to run migrations");

    db
}

/// Insert a node directly, bypassing the chain resolver
pub async fn seed_node(
    db: &DatabaseConnection,
    name: &str,
    supplier_id: Option<i32>,
    level: i32,
) -> nodes::Model {
    nodes::ActiveModel::new(name.to_string(), supplier_id, level)
        .insert(db)
        .await
        .expect("Failed to seed node")
}
