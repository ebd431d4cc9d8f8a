use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::entities::{nodes, products};
use crate::errors::{NodeError, NodeResult};
use crate::services::validation::{ValidationService, PRODUCT_MODEL_MAX, PRODUCT_NAME_MAX};

const PRICE_MAX_DIGITS: u32 = 10;
const PRICE_DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub selling_price: Decimal,
}

impl NewProduct {
    fn validate(self) -> NodeResult<Self> {
        let name = ValidationService::required_text(&self.name, PRODUCT_NAME_MAX)
            .map_err(|message| NodeError::invalid("name", message))?;
        let model = ValidationService::required_text(&self.model, PRODUCT_MODEL_MAX)
            .map_err(|message| NodeError::invalid("model", message))?;

        if self.selling_price < Decimal::ZERO {
            return Err(NodeError::invalid(
                "selling_price",
                "Ensure this value is greater than or equal to 0.",
            ));
        }
        check_price_precision(self.selling_price)
            .map_err(|message| NodeError::invalid("selling_price", message))?;

        Ok(Self {
            name,
            model,
            ..self
        })
    }
}

/// DECIMAL(10,2): at most 2 fractional and 8 integer digits
fn check_price_precision(price: Decimal) -> Result<(), String> {
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ));
    }
    if price.abs() >= Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES)) {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    pub owner_id: i32,
    /// Owning node's name
    pub owner: String,
    pub selling_price: Decimal,
}

/// Products are managed through the administrative interface only
#[derive(Clone)]
pub struct ProductService {
    db: DatabaseConnection,
}

impl ProductService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, owner_id: i32, input: NewProduct) -> NodeResult<ProductView> {
        let input = input.validate()?;

        let owner = nodes::Entity::find_by_id(owner_id)
            .one(&self.db)
            .await?
            .ok_or(NodeError::NotFound(owner_id))?;

        let product = products::ActiveModel {
            name: Set(input.name),
            model: Set(input.model),
            release_date: Set(input.release_date),
            owner_id: Set(owner.id),
            selling_price: Set(input.selling_price),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(product_id = product.id, owner_id, "Created product {}", product.name);
        Ok(view(product, owner.name))
    }

    pub async fn list_for_node(&self, owner_id: i32) -> NodeResult<Vec<ProductView>> {
        let owner = nodes::Entity::find_by_id(owner_id)
            .one(&self.db)
            .await?
            .ok_or(NodeError::NotFound(owner_id))?;

        let rows = products::Entity::find()
            .filter(products::Column::OwnerId.eq(owner_id))
            .order_by_asc(products::Column::Name)
            .order_by_asc(products::Column::Model)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|product| view(product, owner.name.clone()))
            .collect())
    }

    /// Products whose name, model or release date contains `query`,
    /// ordered by name then model
    pub async fn search(&self, query: Option<&str>) -> NodeResult<Vec<ProductView>> {
        let mut select = products::Entity::find();

        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(products::Column::Name.contains(query))
                    .add(products::Column::Model.contains(query))
                    .add(products::Column::ReleaseDate.contains(query)),
            );
        }

        let rows = select
            .find_also_related(nodes::Entity)
            .order_by_asc(products::Column::Name)
            .order_by_asc(products::Column::Model)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(product, owner)| {
                let owner = owner.map(|o| o.name).unwrap_or_default();
                view(product, owner)
            })
            .collect())
    }

    pub async fn delete(&self, id: i32) -> NodeResult<()> {
        let result = products::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(NodeError::ProductNotFound(id));
        }

        info!(product_id = id, "Deleted product");
        Ok(())
    }
}

fn view(product: products::Model, owner: String) -> ProductView {
    ProductView {
        id: product.id,
        name: product.name,
        model: product.model,
        release_date: product.release_date,
        owner_id: product.owner_id,
        owner,
        selling_price: product.selling_price,
    }
}
