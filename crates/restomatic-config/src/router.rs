//! Router component configuration

use serde::{Deserialize, Serialize};

/// Default request body limit (10 MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Endpoint router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Requests with larger bodies are rejected with 413
    pub max_body_bytes: usize,
    /// Format used to render errors when no endpoint was resolved
    /// (`html`, `json`, `plain`, ...)
    pub fallback_format: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            fallback_format: "html".to_string(),
        }
    }
}
