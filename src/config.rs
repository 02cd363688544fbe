use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ARCHIVES: usize = 50;
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_CATALOG_KEY: &str = "paydbx:catalog";
pub const DEFAULT_RECORD_KEY_PREFIX: &str = "paydbx:archive:";
pub const DEFAULT_SOURCE_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub catalog_key: String,
    pub record_key_prefix: String,
    pub max_archives: usize,
    pub max_total_bytes: u64,
    /// Semantic version of the mutable payment-status schema at capture time,
    /// stamped into every archive.
    pub source_schema_version: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            catalog_key: DEFAULT_CATALOG_KEY.to_string(),
            record_key_prefix: DEFAULT_RECORD_KEY_PREFIX.to_string(),
            max_archives: DEFAULT_MAX_ARCHIVES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            source_schema_version: DEFAULT_SOURCE_SCHEMA_VERSION.to_string(),
        }
    }
}
