pub mod calculations;
pub mod db;
pub mod models;
pub mod service;
pub mod settings;
pub mod validation;

pub use db::repository::{DeductionRepository, RepositoryError};
pub use models::*;
pub use service::{TaxError, TaxService};
pub use settings::{ConfigError, DeductionSettings};
