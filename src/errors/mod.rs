//! Error types for the trading-network service
//!
//! Domain errors are `thiserror` enums that convert into [`CoreError`],
//! the single error shape handed to the HTTP layer.
//!
//! # Error Categories
//!
//! - **HierarchyError**: supplier chain resolution (missing supplier, chain too deep, cycles)
//! - **NodeError**: node, contact and product records
//! - **AuthError**: signup, login, sessions and password changes

pub mod auth;
pub mod core_error;
pub mod hierarchy;
pub mod node;

pub use auth::AuthError;
pub use core_error::{CoreError, CoreErrorKind};
pub use hierarchy::HierarchyError;
pub use node::NodeError;

/// Result type alias for hierarchy resolution
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
