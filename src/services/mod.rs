pub mod account_service;
pub mod auth_service;
pub mod node_service;
pub mod password_policy;
pub mod product_service;
pub mod validation;

pub use account_service::*;
pub use auth_service::*;
pub use node_service::*;
pub use password_policy::{PasswordPolicy, PasswordValidator, UserAttributes};
pub use product_service::*;
pub use validation::ValidationService;

use serde::{Deserialize, Deserializer};

/// Deserialize a field where "absent" and "null" mean different things.
///
/// Pair with `#[serde(default)]`: a missing field stays `None`, an explicit
/// `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
