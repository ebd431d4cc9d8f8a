use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::database::entities::{contacts, nodes, products};
use crate::errors::{HierarchyError, NodeError, NodeResult};
use crate::hierarchy::{downstream_levels, resolve_placement, StoreChain, SupplierChain};
use crate::services::double_option;
use crate::services::validation::{
    ValidationService, CONTACT_TEXT_MAX, HOUSE_NUMBER_MAX, NODE_NAME_MAX,
};

/// Contact fields submitted alongside a node.
///
/// Absent fields are left untouched, `null` clears them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub street: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub house_number: Option<Option<String>>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.country.is_none()
            && self.city.is_none()
            && self.street.is_none()
            && self.house_number.is_none()
    }

    /// Check every submitted field; blank strings become `null`
    pub fn validate(self) -> NodeResult<Self> {
        Ok(Self {
            email: clean(self.email, "contact.email", ValidationService::email)?,
            country: clean(self.country, "contact.country", |v| {
                ValidationService::bounded(v, CONTACT_TEXT_MAX)
            })?,
            city: clean(self.city, "contact.city", |v| {
                ValidationService::bounded(v, CONTACT_TEXT_MAX)
            })?,
            street: clean(self.street, "contact.street", |v| {
                ValidationService::bounded(v, CONTACT_TEXT_MAX)
            })?,
            house_number: clean(self.house_number, "contact.house_number", |v| {
                ValidationService::bounded(v, HOUSE_NUMBER_MAX)
            })?,
        })
    }

    /// Copy the submitted fields onto a contact row, leaving the rest alone
    pub fn apply(self, contact: &mut contacts::ActiveModel) {
        if let Some(email) = self.email {
            contact.email = Set(email);
        }
        if let Some(country) = self.country {
            contact.country = Set(country);
        }
        if let Some(city) = self.city {
            contact.city = Set(city);
        }
        if let Some(street) = self.street {
            contact.street = Set(street);
        }
        if let Some(house_number) = self.house_number {
            contact.house_number = Set(house_number);
        }
    }
}

fn clean<F>(
    value: Option<Option<String>>,
    field: &str,
    check: F,
) -> NodeResult<Option<Option<String>>>
where
    F: Fn(&str) -> Result<String, String>,
{
    match value {
        Some(Some(text)) if text.trim().is_empty() => Ok(Some(None)),
        Some(Some(text)) => check(text.trim())
            .map(|cleaned| Some(Some(cleaned)))
            .map_err(|message| NodeError::invalid(field, message)),
        other => Ok(other),
    }
}

/// Payload for creating a node. Read-only fields (`id`, `level`,
/// `debt_to_the_supplier`, `date_of_creation`) are ignored if sent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNode {
    pub name: String,
    /// Name of the supplying node
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub contact: Option<ContactPatch>,
}

/// Partial update of a node
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeChanges {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` detaches the node from its supplier
    #[serde(default, deserialize_with = "double_option")]
    pub supplier: Option<Option<String>>,
    #[serde(default)]
    pub contact: Option<ContactPatch>,
}

impl NodeChanges {
    /// Full replacement must carry a name
    pub fn ensure_complete(&self) -> NodeResult<()> {
        if self.name.is_none() {
            return Err(NodeError::invalid("name", "This field is required."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactView {
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
}

impl From<contacts::Model> for ContactView {
    fn from(model: contacts::Model) -> Self {
        Self {
            email: model.email,
            country: model.country,
            city: model.city,
            street: model.street,
            house_number: model.house_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: i32,
    pub name: String,
    /// Supplier's name
    pub supplier: Option<String>,
    #[serde(skip_serializing)]
    pub supplier_id: Option<i32>,
    pub level: i32,
    pub debt_to_the_supplier: Decimal,
    pub date_of_creation: DateTime<Utc>,
    pub contact: Option<ContactView>,
}

impl NodeView {
    fn build(node: nodes::Model, contact: Option<contacts::Model>, supplier: Option<String>) -> Self {
        Self {
            id: node.id,
            name: node.name,
            supplier,
            supplier_id: node.supplier_id,
            level: node.level,
            debt_to_the_supplier: node.debt_to_the_supplier,
            date_of_creation: node.date_of_creation,
            contact: contact.map(ContactView::from),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeFilter {
    /// Exact match on the contact's country
    #[serde(default, rename = "contact__country")]
    pub country: Option<String>,
    /// Exact match on the contact's city
    #[serde(default)]
    pub city: Option<String>,
    /// Case-insensitive substring of the node name
    #[serde(default, rename = "q")]
    pub search: Option<String>,
}

/// Node and contact persistence with supplier-chain bookkeeping.
///
/// Every chain mutation holds `chain_lock` from resolution until commit, so
/// concurrent writers never validate against a stale chain.
#[derive(Clone)]
pub struct NodeService {
    db: DatabaseConnection,
    chain_lock: Arc<Mutex<()>>,
}

impl NodeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            chain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, input: NewNode) -> NodeResult<NodeView> {
        let name = ValidationService::required_text(&input.name, NODE_NAME_MAX)
            .map_err(|message| NodeError::invalid("name", message))?;
        let contact = input.contact.unwrap_or_default().validate()?;

        let _guard = self.chain_lock.lock().await;
        let txn = self.db.begin().await?;

        ensure_unique_name(&txn, &name, None).await?;
        let placement = resolve_placement(&StoreChain(&txn), input.supplier.as_deref(), None)
            .await
            .inspect_err(log_rejection)?;

        let node = nodes::ActiveModel::new(name, placement.supplier_id, placement.level)
            .insert(&txn)
            .await?;

        let mut contact_row = contacts::ActiveModel {
            node_id: Set(node.id),
            email: Set(None),
            country: Set(None),
            city: Set(None),
            street: Set(None),
            house_number: Set(None),
            ..Default::default()
        };
        contact.apply(&mut contact_row);
        let contact_row = contact_row.insert(&txn).await?;

        let supplier = supplier_name(&txn, node.supplier_id).await?;
        txn.commit().await?;

        info!(node_id = node.id, level = node.level, "Created node {}", node.name);
        Ok(NodeView::build(node, Some(contact_row), supplier))
    }

    pub async fn update(&self, id: i32, changes: NodeChanges) -> NodeResult<NodeView> {
        let name = changes
            .name
            .as_deref()
            .map(|name| ValidationService::required_text(name, NODE_NAME_MAX))
            .transpose()
            .map_err(|message| NodeError::invalid("name", message))?;
        let contact = changes.contact.map(ContactPatch::validate).transpose()?;

        let _guard = self.chain_lock.lock().await;
        let txn = self.db.begin().await?;

        let node = nodes::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(NodeError::NotFound(id))?;
        let previous_level = node.level;
        let mut active = node.clone().into_active_model();

        if let Some(name) = name {
            ensure_unique_name(&txn, &name, Some(id)).await?;
            active.name = Set(name);
        }

        if let Some(supplier) = changes.supplier {
            let chain = StoreChain(&txn);
            let placement = resolve_placement(&chain, supplier.as_deref(), Some(id))
                .await
                .inspect_err(log_rejection)?;

            if placement.level != previous_level {
                let moved = downstream_levels(&chain, id, placement.level)
                    .await
                    .inspect_err(log_rejection)?;
                apply_levels(&txn, &moved).await?;
            }

            active.supplier_id = Set(placement.supplier_id);
            active.level = Set(placement.level);
        }

        let node = if active.is_changed() {
            active.update(&txn).await?
        } else {
            node
        };

        let existing_contact = contacts::Entity::find()
            .filter(contacts::Column::NodeId.eq(id))
            .one(&txn)
            .await?;
        let contact_row = match (contact.filter(|c| !c.is_empty()), existing_contact) {
            (Some(patch), Some(row)) => {
                let mut row = row.into_active_model();
                patch.apply(&mut row);
                Some(row.update(&txn).await?)
            }
            (Some(patch), None) => {
                let mut row = contacts::ActiveModel {
                    node_id: Set(id),
                    ..Default::default()
                };
                patch.apply(&mut row);
                Some(row.insert(&txn).await?)
            }
            (None, existing) => existing,
        };

        let supplier = supplier_name(&txn, node.supplier_id).await?;
        txn.commit().await?;

        info!(node_id = id, level = node.level, "Updated node {}", node.name);
        Ok(NodeView::build(node, contact_row, supplier))
    }

    pub async fn get(&self, id: i32) -> NodeResult<NodeView> {
        let (node, contact) = nodes::Entity::find_by_id(id)
            .find_also_related(contacts::Entity)
            .one(&self.db)
            .await?
            .ok_or(NodeError::NotFound(id))?;
        let supplier = supplier_name(&self.db, node.supplier_id).await?;

        Ok(NodeView::build(node, contact, supplier))
    }

    /// Nodes ordered by level, then id
    pub async fn list(&self, filter: &NodeFilter) -> NodeResult<Vec<NodeView>> {
        let mut query = nodes::Entity::find().find_also_related(contacts::Entity);

        if let Some(country) = &filter.country {
            query = query.filter(contacts::Column::Country.eq(country.as_str()));
        }
        if let Some(city) = &filter.city {
            query = query.filter(contacts::Column::City.eq(city.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                query = query.filter(nodes::Column::Name.contains(search));
            }
        }

        let rows = query
            .order_by_asc(nodes::Column::Level)
            .order_by_asc(nodes::Column::Id)
            .all(&self.db)
            .await?;

        let supplier_ids: Vec<i32> = rows.iter().filter_map(|(n, _)| n.supplier_id).collect();
        let names: HashMap<i32, String> = if supplier_ids.is_empty() {
            HashMap::new()
        } else {
            nodes::Entity::find()
                .filter(nodes::Column::Id.is_in(supplier_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|n| (n.id, n.name))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(node, contact)| {
                let supplier = node.supplier_id.and_then(|id| names.get(&id).cloned());
                NodeView::build(node, contact, supplier)
            })
            .collect())
    }

    /// Delete a node with its contact and products. Direct customers lose
    /// their supplier and their subtrees move up accordingly.
    pub async fn delete(&self, id: i32) -> NodeResult<()> {
        let _guard = self.chain_lock.lock().await;
        let txn = self.db.begin().await?;

        let node = nodes::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(NodeError::NotFound(id))?;

        let customers = StoreChain(&txn).customers(id).await?;
        if !customers.is_empty() {
            nodes::Entity::update_many()
                .col_expr(nodes::Column::SupplierId, Expr::value(Option::<i32>::None))
                .col_expr(nodes::Column::Level, Expr::value(0))
                .filter(nodes::Column::Id.is_in(customers.clone()))
                .exec(&txn)
                .await?;

            let chain = StoreChain(&txn);
            for customer in customers {
                let moved = downstream_levels(&chain, customer, 0).await?;
                apply_levels(&txn, &moved).await?;
            }
        }

        contacts::Entity::delete_many()
            .filter(contacts::Column::NodeId.eq(id))
            .exec(&txn)
            .await?;
        products::Entity::delete_many()
            .filter(products::Column::OwnerId.eq(id))
            .exec(&txn)
            .await?;
        nodes::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(node_id = id, "Deleted node {}", node.name);
        Ok(())
    }

    /// Zero `debt_to_the_supplier` on the given nodes, returning how many
    /// rows changed. Unknown ids are skipped.
    pub async fn clear_debt(&self, ids: &[i32]) -> NodeResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = nodes::Entity::update_many()
            .col_expr(nodes::Column::DebtToTheSupplier, Expr::value(Decimal::ZERO))
            .filter(nodes::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;

        info!(
            requested = ids.len(),
            updated = result.rows_affected,
            "Cleared debt to the supplier"
        );
        Ok(result.rows_affected)
    }
}

async fn ensure_unique_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except: Option<i32>,
) -> NodeResult<()> {
    let mut query = nodes::Entity::find().filter(nodes::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(nodes::Column::Id.ne(id));
    }

    if query.one(db).await?.is_some() {
        return Err(NodeError::DuplicateName(name.to_string()));
    }
    Ok(())
}

async fn supplier_name<C: ConnectionTrait>(
    db: &C,
    supplier_id: Option<i32>,
) -> NodeResult<Option<String>> {
    let Some(supplier_id) = supplier_id else {
        return Ok(None);
    };

    Ok(nodes::Entity::find_by_id(supplier_id)
        .one(db)
        .await?
        .map(|supplier| supplier.name))
}

async fn apply_levels<C: ConnectionTrait>(db: &C, moved: &[(i32, i32)]) -> NodeResult<()> {
    let mut by_level: HashMap<i32, Vec<i32>> = HashMap::new();
    for (id, level) in moved {
        by_level.entry(*level).or_default().push(*id);
    }

    for (level, ids) in by_level {
        nodes::Entity::update_many()
            .col_expr(nodes::Column::Level, Expr::value(level))
            .filter(nodes::Column::Id.is_in(ids))
            .exec(db)
            .await?;
    }
    Ok(())
}

fn log_rejection(err: &HierarchyError) {
    if !matches!(err, HierarchyError::Database(_)) {
        warn!("Rejected supplier change: {}", err);
    }
}
