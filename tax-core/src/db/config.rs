use serde::{Deserialize, Serialize};

use super::repository::RepositoryError;

/// The only storage backend compiled into this workspace.
pub const SQLITE_BACKEND: &str = "sqlite";

/// Where the deductions row is stored.
///
/// `connection_string` is a file path (created if missing), a `sqlite:` URL
/// or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl DbConfig {
    /// Rejects any backend other than [`SQLITE_BACKEND`].
    pub fn require_sqlite(&self) -> Result<&str, RepositoryError> {
        if self.backend.eq_ignore_ascii_case(SQLITE_BACKEND) {
            Ok(&self.connection_string)
        } else {
            Err(RepositoryError::Configuration(format!(
                "unsupported backend '{}', only '{SQLITE_BACKEND}' is available",
                self.backend
            )))
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: SQLITE_BACKEND.to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}
