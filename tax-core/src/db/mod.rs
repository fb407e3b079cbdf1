pub mod config;
pub mod repository;

pub use config::{DbConfig, SQLITE_BACKEND};
pub use repository::{DeductionRepository, RepositoryError};
