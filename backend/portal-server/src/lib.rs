pub mod config;
pub mod error;
pub mod health;
pub mod logger;
pub mod routes;
pub mod static_site;

pub use crate::config::ServeConfig;
pub use crate::routes::build_router;
