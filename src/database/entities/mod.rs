pub mod contacts;
pub mod nodes;
pub mod products;
pub mod user_sessions;
pub mod users;
