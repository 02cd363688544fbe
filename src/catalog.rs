use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::Result,
    storage::StorageTab,
    store::Archive,
};

pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// Thin read model for one archive. Never contains payment records, so a
/// list view deserializes the catalog alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub total_count: u32,
    pub paid_count: u32,
    pub pending_count: u32,
    pub size_bytes: u64,
}

impl From<&Archive> for CatalogEntry {
    fn from(archive: &Archive) -> Self {
        Self {
            id: archive.id,
            name: archive.name.clone(),
            created_at: archive.created_at,
            total_count: archive.metadata.total_count,
            paid_count: archive.metadata.paid_count,
            pending_count: archive.metadata.pending_count,
            size_bytes: archive.metadata.size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub schema_version: u32,
    /// Ordered newest-first by `created_at`.
    pub entries: Vec<CatalogEntry>,
    pub last_modified: DateTime<Utc>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            schema_version: CATALOG_SCHEMA_VERSION,
            entries: Vec::new(),
            last_modified: Utc::now(),
        }
    }
}

impl Catalog {
    /// Inserts newest-first, replacing any existing entry with the same id.
    pub fn upsert(&mut self, entry: CatalogEntry) {
        self.entries.retain(|existing| existing.id != entry.id);
        let position = self
            .entries
            .iter()
            .position(|existing| existing.created_at <= entry.created_at)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, entry);
    }

    /// Returns whether an entry was actually removed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != *id);
        self.entries.len() != before
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Sum of all archive sizes plus the catalog's own serialized size.
    pub fn total_size(&self) -> Result<u64> {
        let entries: u64 = self.entries.iter().map(|entry| entry.size_bytes).sum();
        let own = serde_json::to_string(self)?.len() as u64;
        Ok(entries + own)
    }
}

/// Persistence for the singleton catalog. The catalog is a derived,
/// re-buildable index, so loading is self-healing: absent or corrupt bytes
/// yield the empty default rather than an error. Only outright storage
/// denial propagates.
pub struct CatalogStore {
    tab: StorageTab,
    key: String,
}

impl CatalogStore {
    pub fn new(tab: StorageTab, key: String) -> Self {
        Self { tab, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&self) -> Result<Catalog> {
        let Some(bytes) = self.tab.get(&self.key)? else {
            return Ok(Catalog::default());
        };
        match serde_json::from_str(&bytes) {
            Ok(catalog) => Ok(catalog),
            Err(err) => {
                warn!(key = %self.key, error = %err, "catalog corrupt, resetting to empty");
                Ok(Catalog::default())
            }
        }
    }

    pub fn save(&self, catalog: &mut Catalog) -> Result<()> {
        catalog.last_modified = Utc::now();
        let bytes = serde_json::to_string(catalog)?;
        self.tab.set(&self.key, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::StorageHub;

    fn entry(name: &str, created_at: DateTime<Utc>) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at,
            total_count: 3,
            paid_count: 1,
            pending_count: 2,
            size_bytes: 512,
        }
    }

    fn at(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, seconds).unwrap()
    }

    #[test]
    fn upsert_keeps_entries_newest_first() {
        let mut catalog = Catalog::default();
        catalog.upsert(entry("first", at(1)));
        catalog.upsert(entry("third", at(3)));
        catalog.upsert(entry("second", at(2)));
        let names: Vec<&str> = catalog.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["third", "second", "first"]);
    }

    #[test]
    fn upsert_replaces_same_id() {
        let mut catalog = Catalog::default();
        let mut original = entry("original", at(1));
        catalog.upsert(original.clone());
        original.name = "renamed".to_string();
        catalog.upsert(original);
        assert_eq!(catalog.entries.len(), 1);
        assert_eq!(catalog.entries[0].name, "renamed");
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let mut catalog = Catalog::default();
        let kept = entry("kept", at(1));
        catalog.upsert(kept.clone());
        assert!(catalog.remove(&kept.id));
        assert!(!catalog.remove(&kept.id));
    }

    #[test]
    fn total_size_includes_the_catalog_itself() {
        let mut catalog = Catalog::default();
        catalog.upsert(entry("a", at(1)));
        let own = serde_json::to_string(&catalog).unwrap().len() as u64;
        assert_eq!(catalog.total_size().unwrap(), 512 + own);
    }

    #[test]
    fn load_defaults_when_absent() {
        let hub = StorageHub::new();
        let store = CatalogStore::new(hub.tab(), "paydbx:catalog".to_string());
        let catalog = store.load().unwrap();
        assert!(catalog.entries.is_empty());
        assert_eq!(catalog.schema_version, CATALOG_SCHEMA_VERSION);
    }

    #[test]
    fn load_self_heals_on_corrupt_bytes() {
        let hub = StorageHub::new();
        let store = CatalogStore::new(hub.tab(), "paydbx:catalog".to_string());
        hub.tab().set("paydbx:catalog", "%%%").unwrap();
        let catalog = store.load().unwrap();
        assert!(catalog.entries.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let hub = StorageHub::new();
        let store = CatalogStore::new(hub.tab(), "paydbx:catalog".to_string());
        let mut catalog = Catalog::default();
        catalog.upsert(entry("October", at(5)));
        store.save(&mut catalog).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, catalog);
    }
}
