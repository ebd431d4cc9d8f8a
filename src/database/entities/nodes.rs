use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// A member of the trading network.
///
/// `level` is derived from the supplier chain and is never written by
/// clients directly. `date_of_creation` is set once on insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub supplier_id: Option<i32>,
    pub level: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub debt_to_the_supplier: Decimal,
    pub date_of_creation: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SupplierId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Supplier,
    #[sea_orm(has_one = "super::contacts::Entity")]
    Contact,
    #[sea_orm(has_many = "super::products::Entity")]
    Products,
}

impl Related<super::contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(name: String, supplier_id: Option<i32>, level: i32) -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: Set(name),
            supplier_id: Set(supplier_id),
            level: Set(level),
            debt_to_the_supplier: Set(Decimal::ZERO),
            date_of_creation: Set(chrono::Utc::now()),
        }
    }
}
