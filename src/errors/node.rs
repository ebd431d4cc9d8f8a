//! Trading-network record errors (nodes, contacts, products)

use thiserror::Error;

use super::{CoreError, HierarchyError};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Node {0} not found")]
    NotFound(i32),

    #[error("Product {0} not found")]
    ProductNotFound(i32),

    /// Another node already uses this name
    #[error("trading network member with this name already exists")]
    DuplicateName(String),

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl NodeError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        NodeError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<NodeError> for CoreError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NotFound(id) => CoreError::not_found("node", id.to_string()),
            NodeError::ProductNotFound(id) => CoreError::not_found("product", id.to_string()),
            NodeError::DuplicateName(_) => CoreError::invalid_field("name", err.to_string()),
            NodeError::InvalidField { field, message } => CoreError::invalid_field(field, message),
            NodeError::Hierarchy(inner) => inner.into(),
            NodeError::Database(db) => CoreError::from(db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;

    #[test]
    fn duplicate_name_is_reported_on_name_field() {
        let err: CoreError = NodeError::DuplicateName("Acme".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert!(err.fields().is_some_and(|f| f.contains_key("name")));
    }

    #[test]
    fn hierarchy_errors_pass_through() {
        let err: CoreError = NodeError::from(HierarchyError::TooDeep { max_tier: 2 }).into();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
    }
}
