//! Domain types and configuration for the codstore COD storefront.
//!
//! Everything in this crate is pure: no database handles, no HTTP clients.
//! The server, db, and CLI crates all build on the types defined here.

use thiserror::Error;

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod money;
pub mod phone;
pub mod status;

pub use app_config::{AppConfig, Environment};
pub use catalog::{slug_from_name, CatalogSource, Offer, PricingError, Quote, StaticProduct};
pub use config::{load_app_config, load_app_config_from_env};
pub use money::Money;
pub use phone::{normalize_phone, PhoneError};
pub use status::{OrderStatus, StatusError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
