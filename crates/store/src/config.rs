//! Connection and repository settings.

use std::time::Duration;

use crate::repository::RepositoryConfig;

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "todo";
pub const DEFAULT_COLLECTION: &str = "todo_lists";

/// Where the list collection lives and how long calls may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// MongoDB connection string. May carry credentials; never logged.
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Reported to the server in the handshake.
    pub app_name: String,
    pub server_selection_timeout: Option<Duration>,
    /// Upper bound on each repository round trip. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            app_name: "todo-store".to_string(),
            server_selection_timeout: None,
            operation_timeout: None,
        }
    }
}

impl StoreConfig {
    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            operation_timeout: self.operation_timeout,
        }
    }
}
