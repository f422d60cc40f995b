//! Storage configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Subscription store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON snapshot file. When unset, records live only in
    /// memory and are lost on restart.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}
