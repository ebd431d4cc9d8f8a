//! Errors raised while placing a node in the supplier hierarchy

use thiserror::Error;

use super::CoreError;

#[derive(Error, Debug)]
pub enum HierarchyError {
    /// The named supplier does not exist
    #[error("Supplier '{0}' does not exist")]
    SupplierNotFound(String),

    /// The supplier chain is longer than the network allows
    #[error("Incorrect links in the hierarchical system: supplier chains may be at most {max_tier} hops deep")]
    TooDeep { max_tier: i32 },

    /// The requested supplier would make the chain loop back onto itself
    #[error("Node '{0}' cannot be supplied by itself or by one of its own customers")]
    Cycle(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<HierarchyError> for CoreError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::SupplierNotFound(name) => {
                CoreError::not_found("node", name.clone())
                    .with_field("supplier", format!("Object with name={} does not exist", name))
            }
            HierarchyError::TooDeep { .. } | HierarchyError::Cycle(_) => {
                CoreError::invalid_field("supplier", err.to_string())
            }
            HierarchyError::Database(db) => CoreError::from(db),
        }
    }
}
