//! Node service tests
//!
//! Supplier-chain placement, node/contact writes and the bulk debt action
//! against a real SQLite database.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use serde_json::json;
use tempfile::NamedTempFile;
use tradenet::database::entities::{contacts, nodes, products};
use tradenet::database::{establish_connection, setup_database};
use tradenet::errors::{CoreError, CoreErrorKind, HierarchyError, NodeError};
use tradenet::services::{
    NewNode, NewProduct, NodeChanges, NodeFilter, NodeService, NodeView, ProductService,
};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = establish_connection(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

fn new_node(name: &str, supplier: Option<&str>) -> NewNode {
    NewNode {
        name: name.to_string(),
        supplier: supplier.map(str::to_string),
        contact: None,
    }
}

fn changes(value: serde_json::Value) -> NodeChanges {
    serde_json::from_value(value).expect("valid node changes")
}

/// A <- B <- C
async fn three_tiers(service: &NodeService) -> Result<(NodeView, NodeView, NodeView)> {
    let a = service.create(new_node("A", None)).await?;
    let b = service.create(new_node("B", Some("A"))).await?;
    let c = service.create(new_node("C", Some("B"))).await?;
    Ok((a, b, c))
}

#[tokio::test]
async fn test_tiers_follow_supplier_chain() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let (a, b, c) = three_tiers(&service).await?;
    assert_eq!((a.level, b.level, c.level), (0, 1, 2));
    assert_eq!(b.supplier.as_deref(), Some("A"));
    assert_eq!(c.supplier.as_deref(), Some("B"));

    let err = service.create(new_node("D", Some("C"))).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Hierarchy(HierarchyError::TooDeep { max_tier: 2 })
    ));
    let core: CoreError = err.into();
    assert_eq!(core.kind(), CoreErrorKind::Validation);
    assert!(core.fields().is_some_and(|f| f.contains_key("supplier")));

    // the rejected node was never written
    let all = service.list(&NodeFilter::default()).await?;
    assert_eq!(all.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_unknown_supplier_is_not_found() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let err = service
        .create(new_node("Orphan", Some("Nobody")))
        .await
        .unwrap_err();
    let core: CoreError = err.into();
    assert_eq!(core.kind(), CoreErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    service.create(new_node("Acme", None)).await?;
    let err = service.create(new_node("Acme", None)).await.unwrap_err();
    assert!(matches!(err, NodeError::DuplicateName(ref name) if name == "Acme"));

    let other = service.create(new_node("Other", None)).await?;
    let err = service
        .update(other.id, changes(json!({"name": "Acme"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::DuplicateName(_)));

    Ok(())
}

#[tokio::test]
async fn test_create_persists_one_contact_with_submitted_fields() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db.clone());

    let input: NewNode = serde_json::from_value(json!({
        "name": "Factory",
        "contact": {"email": "sales@factory.example", "country": "France"}
    }))?;
    let node = service.create(input).await?;

    let contact = node.contact.expect("contact is returned");
    assert_eq!(contact.email.as_deref(), Some("sales@factory.example"));
    assert_eq!(contact.country.as_deref(), Some("France"));
    assert_eq!(contact.city, None);
    assert_eq!(contact.street, None);
    assert_eq!(contact.house_number, None);

    let rows = contacts::Entity::find().all(&db).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].node_id, node.id);

    // a node without contact payload still gets an empty contact row
    service.create(new_node("Bare", None)).await?;
    assert_eq!(contacts::Entity::find().all(&db).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_read_only_fields_start_at_defaults() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let input: NewNode = serde_json::from_value(json!({
        "name": "Sneaky",
        "level": 2,
        "debt_to_the_supplier": "999.99"
    }))?;
    let node = service.create(input).await?;

    assert_eq!(node.level, 0);
    assert_eq!(node.debt_to_the_supplier, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_invalid_contact_rejects_the_whole_node() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db.clone());

    let input: NewNode = serde_json::from_value(json!({
        "name": "Broken",
        "contact": {"email": "not-an-email"}
    }))?;
    let err = service.create(input).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidField { ref field, .. } if field == "contact.email"));
    assert!(nodes::Entity::find().all(&db).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_supplier_change_recomputes_level() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let (a, _b, c) = three_tiers(&service).await?;
    let moved = service
        .update(c.id, changes(json!({"supplier": "A"})))
        .await?;
    assert_eq!(moved.level, 1);
    assert_eq!(moved.supplier.as_deref(), Some("A"));

    let detached = service
        .update(c.id, changes(json!({"supplier": null})))
        .await?;
    assert_eq!(detached.level, 0);
    assert_eq!(detached.supplier, None);

    // other fields leave the level alone
    let renamed = service
        .update(a.id, changes(json!({"name": "A-prime", "level": 2})))
        .await?;
    assert_eq!(renamed.level, 0);
    assert_eq!(renamed.name, "A-prime");

    Ok(())
}

#[tokio::test]
async fn test_contact_update_merges_submitted_fields() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let input: NewNode = serde_json::from_value(json!({
        "name": "Shop",
        "contact": {"country": "Spain", "city": "Madrid", "street": "Gran Via"}
    }))?;
    let node = service.create(input).await?;

    let updated = service
        .update(
            node.id,
            changes(json!({"contact": {"city": "Barcelona", "street": null}})),
        )
        .await?;

    let contact = updated.contact.expect("contact");
    assert_eq!(contact.country.as_deref(), Some("Spain"));
    assert_eq!(contact.city.as_deref(), Some("Barcelona"));
    assert_eq!(contact.street, None);

    Ok(())
}

#[tokio::test]
async fn test_cycles_are_rejected() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let (a, b, _c) = three_tiers(&service).await?;

    let err = service
        .update(a.id, changes(json!({"supplier": "A"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Hierarchy(HierarchyError::Cycle(_))));

    let err = service
        .update(a.id, changes(json!({"supplier": "C"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Hierarchy(HierarchyError::Cycle(_))));

    let err = service
        .update(b.id, changes(json!({"supplier": "C"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Hierarchy(HierarchyError::Cycle(_))));

    Ok(())
}

#[tokio::test]
async fn test_moving_a_subtree_retiers_descendants() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let root = service.create(new_node("Root", None)).await?;
    let d = service.create(new_node("D", None)).await?;
    let e = service.create(new_node("E", Some("D"))).await?;

    service
        .update(d.id, changes(json!({"supplier": "Root"})))
        .await?;
    assert_eq!(service.get(d.id).await?.level, 1);
    assert_eq!(service.get(e.id).await?.level, 2);

    // E would land at tier 3
    let mid = service.create(new_node("Mid", Some("Root"))).await?;
    let err = service
        .update(d.id, changes(json!({"supplier": "Mid"})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NodeError::Hierarchy(HierarchyError::TooDeep { .. })
    ));
    assert_eq!(service.get(d.id).await?.supplier.as_deref(), Some("Root"));
    assert_eq!(service.get(root.id).await?.level, 0);
    assert_eq!(mid.level, 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_promotes_customers_and_drops_owned_rows() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db.clone());
    let products = ProductService::new(db.clone());

    let (a, b, c) = three_tiers(&service).await?;
    products
        .create(
            a.id,
            NewProduct {
                name: "Widget".to_string(),
                model: "W-1".to_string(),
                release_date: NaiveDate::from_ymd_opt(2023, 1, 15).expect("date"),
                selling_price: Decimal::new(1999, 2),
            },
        )
        .await?;

    service.delete(a.id).await?;

    let b = service.get(b.id).await?;
    let c = service.get(c.id).await?;
    assert_eq!((b.level, b.supplier.as_deref()), (0, None));
    assert_eq!((c.level, c.supplier.as_deref()), (1, Some("B")));

    assert!(products::Entity::find().all(&db).await?.is_empty());
    assert_eq!(contacts::Entity::find().all(&db).await?.len(), 2);

    let err = service.get(a.id).await.unwrap_err();
    assert!(matches!(err, NodeError::NotFound(id) if id == a.id));
    assert!(matches!(service.delete(a.id).await, Err(NodeError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_list_orders_by_level_and_filters_by_country() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);

    let retailer: NewNode = serde_json::from_value(json!({
        "name": "Retailer",
        "contact": {"country": "Italy", "city": "Rome"}
    }))?;
    let retailer = service.create(retailer).await?;
    service.create(new_node("Maker", None)).await?;
    let dealer: NewNode = serde_json::from_value(json!({
        "name": "Dealer",
        "supplier": "Maker",
        "contact": {"country": "Italy", "city": "Milan"}
    }))?;
    service.create(dealer).await?;

    let all = service.list(&NodeFilter::default()).await?;
    let levels: Vec<i32> = all.iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![0, 0, 1]);
    assert_eq!(all[0].id, retailer.id);

    let italy = service
        .list(&NodeFilter {
            country: Some("Italy".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(italy.len(), 2);

    let rome = service
        .list(&NodeFilter {
            city: Some("Rome".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(rome.len(), 1);
    assert_eq!(rome[0].name, "Retailer");

    let search = service
        .list(&NodeFilter {
            search: Some("make".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].name, "Maker");

    let none = service
        .list(&NodeFilter {
            country: Some("Peru".to_string()),
            ..Default::default()
        })
        .await?;
    assert!(none.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_clear_debt_only_touches_selected_nodes() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db.clone());

    let (a, b, c) = three_tiers(&service).await?;
    for id in [a.id, b.id, c.id] {
        let node = nodes::Entity::find_by_id(id).one(&db).await?.expect("node");
        let mut active = node.into_active_model();
        active.debt_to_the_supplier = Set(Decimal::new(12550, 2));
        active.update(&db).await?;
    }

    let updated = service.clear_debt(&[b.id, c.id, 9999]).await?;
    assert_eq!(updated, 2);
    assert_eq!(service.clear_debt(&[]).await?, 0);

    assert_eq!(service.get(a.id).await?.debt_to_the_supplier, Decimal::new(12550, 2));
    assert_eq!(service.get(b.id).await?.debt_to_the_supplier, Decimal::ZERO);
    assert_eq!(service.get(c.id).await?.debt_to_the_supplier, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_creates_under_one_supplier() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NodeService::new(db);
    service.create(new_node("Hub", None)).await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create(new_node(&format!("Spoke {}", i), Some("Hub")))
                .await
        }));
    }

    for handle in handles {
        let node = handle.await??;
        assert_eq!(node.level, 1);
    }
    assert_eq!(service.list(&NodeFilter::default()).await?.len(), 9);

    Ok(())
}
