//! Supplier-chain placement for trading-network nodes.
//!
//! A node's level is the number of supplier hops between it and the root
//! of its chain: a node without a supplier sits at level 0, a node supplied
//! by a root at level 1, and so on up to [`MAX_TIER`]. Chains are walked
//! with an explicit bounded loop over id lookups, never by recursing
//! through loaded models, so a corrupt store can never make the walk run
//! away.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use tracing::debug;

use crate::database::entities::nodes;
use crate::errors::{HierarchyError, HierarchyResult};

/// Deepest level a node may occupy
pub const MAX_TIER: i32 = 2;

/// The part of a node the resolver needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLink {
    pub id: i32,
    pub name: String,
    pub supplier_id: Option<i32>,
}

/// Read access to the supplier graph
#[async_trait]
pub trait SupplierChain: Send + Sync {
    async fn link(&self, node_id: i32) -> Result<Option<ChainLink>, DbErr>;

    async fn link_by_name(&self, name: &str) -> Result<Option<ChainLink>, DbErr>;

    /// Ids of the nodes directly supplied by `node_id`
    async fn customers(&self, node_id: i32) -> Result<Vec<i32>, DbErr>;
}

/// [`SupplierChain`] backed by the `nodes` table, usable with a plain
/// connection or inside a transaction.
pub struct StoreChain<'a, C>(pub &'a C);

impl<C> StoreChain<'_, C> {
    fn to_link(model: nodes::Model) -> ChainLink {
        ChainLink {
            id: model.id,
            name: model.name,
            supplier_id: model.supplier_id,
        }
    }
}

#[async_trait]
impl<'a, C: ConnectionTrait> SupplierChain for StoreChain<'a, C> {
    async fn link(&self, node_id: i32) -> Result<Option<ChainLink>, DbErr> {
        Ok(nodes::Entity::find_by_id(node_id)
            .one(self.0)
            .await?
            .map(Self::to_link))
    }

    async fn link_by_name(&self, name: &str) -> Result<Option<ChainLink>, DbErr> {
        Ok(nodes::Entity::find()
            .filter(nodes::Column::Name.eq(name))
            .one(self.0)
            .await?
            .map(Self::to_link))
    }

    async fn customers(&self, node_id: i32) -> Result<Vec<i32>, DbErr> {
        nodes::Entity::find()
            .select_only()
            .column(nodes::Column::Id)
            .filter(nodes::Column::SupplierId.eq(node_id))
            .into_tuple::<i32>()
            .all(self.0)
            .await
    }
}

/// Where a node sits once its supplier is applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub supplier_id: Option<i32>,
    pub level: i32,
}

impl Placement {
    pub fn root() -> Self {
        Self {
            supplier_id: None,
            level: 0,
        }
    }
}

/// Compute the level of a node supplied by `supplier_id`.
///
/// `None` yields level 0. Otherwise the chain is walked upwards from the
/// supplier, at most [`MAX_TIER`] hops; a chain that still continues after
/// that is rejected with [`HierarchyError::TooDeep`].
pub async fn resolve_tier<S>(chain: &S, supplier_id: Option<i32>) -> HierarchyResult<i32>
where
    S: SupplierChain + ?Sized,
{
    let Some(supplier_id) = supplier_id else {
        return Ok(0);
    };

    let supplier = chain
        .link(supplier_id)
        .await?
        .ok_or_else(|| HierarchyError::SupplierNotFound(supplier_id.to_string()))?;

    walk(chain, supplier, None).await
}

/// Resolve a supplier given by name, as clients address suppliers.
///
/// `node_id` is the node being placed when it already exists; naming the
/// node itself, or anything downstream of it, is reported as a cycle.
pub async fn resolve_placement<S>(
    chain: &S,
    supplier_name: Option<&str>,
    node_id: Option<i32>,
) -> HierarchyResult<Placement>
where
    S: SupplierChain + ?Sized,
{
    let Some(name) = supplier_name else {
        return Ok(Placement::root());
    };

    let supplier = chain
        .link_by_name(name)
        .await?
        .ok_or_else(|| HierarchyError::SupplierNotFound(name.to_string()))?;
    let supplier_id = supplier.id;
    let level = walk(chain, supplier, node_id).await?;

    Ok(Placement {
        supplier_id: Some(supplier_id),
        level,
    })
}

async fn walk<S>(chain: &S, supplier: ChainLink, placing: Option<i32>) -> HierarchyResult<i32>
where
    S: SupplierChain + ?Sized,
{
    let mut current = supplier;
    let mut level = 1;

    loop {
        if placing == Some(current.id) {
            return Err(HierarchyError::Cycle(current.name));
        }

        let Some(next_id) = current.supplier_id else {
            debug!(level, "supplier chain resolved");
            return Ok(level);
        };

        if level == MAX_TIER {
            if placing == Some(next_id) {
                return Err(HierarchyError::Cycle(current.name));
            }
            return Err(HierarchyError::TooDeep { max_tier: MAX_TIER });
        }

        current = chain
            .link(next_id)
            .await?
            .ok_or_else(|| HierarchyError::SupplierNotFound(next_id.to_string()))?;
        level += 1;
    }
}

/// New levels for every node downstream of `node_id` once it moves to
/// `new_level`.
///
/// Returns `(id, level)` pairs in breadth-first order. Fails with
/// [`HierarchyError::TooDeep`] if any customer would end up below
/// [`MAX_TIER`].
pub async fn downstream_levels<S>(
    chain: &S,
    node_id: i32,
    new_level: i32,
) -> HierarchyResult<Vec<(i32, i32)>>
where
    S: SupplierChain + ?Sized,
{
    let mut updates = Vec::new();
    let mut frontier = vec![node_id];
    let mut level = new_level;

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in frontier {
            next.extend(chain.customers(id).await?);
        }
        if next.is_empty() {
            break;
        }

        level += 1;
        if level > MAX_TIER {
            return Err(HierarchyError::TooDeep { max_tier: MAX_TIER });
        }
        updates.extend(next.iter().map(|id| (*id, level)));
        frontier = next;
    }

    Ok(updates)
}
