use tracing::debug;
use uuid::Uuid;

use crate::{
    catalog::{Catalog, CatalogEntry, CatalogStore},
    config::ArchiveConfig,
    error::{ArchiveError, Result},
    export,
    quota,
    snapshot::{self, SchedulePayment, StatusCollection},
    storage::StorageTab,
    store::{Archive, RecordStore},
    validation::{normalize_name, parse_archive_id},
};

/// Orchestrates archive create / get / list / delete. The underlying store
/// has no multi-key transactions, so this layer owns the ordering of side
/// effects: record before catalog on create, catalog before record on
/// delete. Any leftover from a partial failure is an orphaned record, never
/// a catalog entry pointing at missing data.
pub struct ArchiveService {
    records: RecordStore,
    catalog: CatalogStore,
    config: ArchiveConfig,
}

impl ArchiveService {
    pub fn new(tab: StorageTab) -> Self {
        Self::with_config(tab, ArchiveConfig::default())
    }

    pub fn with_config(tab: StorageTab, config: ArchiveConfig) -> Self {
        let records = RecordStore::new(tab.clone(), config.record_key_prefix.clone());
        let catalog = CatalogStore::new(tab, config.catalog_key.clone());
        Self {
            records,
            catalog,
            config,
        }
    }

    pub fn catalog_key(&self) -> &str {
        self.catalog.key()
    }

    /// Freezes the current payment-status collection into a new archive and
    /// resets the collection. Quota and count ceilings are checked against
    /// the prospective state before anything is written; the source is reset
    /// only after both the record and the catalog write succeeded.
    pub fn create(
        &self,
        name: &str,
        source: &mut dyn StatusCollection,
        schedule: &[SchedulePayment],
    ) -> Result<Archive> {
        if source.entries().is_empty() {
            return Err(ArchiveError::Validation(
                "no payments to archive".to_string(),
            ));
        }
        let name = normalize_name(name)?;
        let mut catalog = self.catalog.load()?;
        let name = dedupe_name(&catalog, &name);

        let archive = snapshot::build(
            &name,
            source.entries(),
            schedule,
            &self.config.source_schema_version,
        )?;

        quota::check_count(catalog.entries.len(), self.config.max_archives)?;
        quota::check_size(
            catalog.total_size()?,
            archive.metadata.size_bytes,
            self.config.max_total_bytes,
        )?;

        self.records.put(&archive)?;
        catalog.upsert(CatalogEntry::from(&archive));
        self.catalog.save(&mut catalog)?;
        source.reset();

        debug!(
            id = %archive.id,
            name = %archive.name,
            records = archive.metadata.total_count,
            size_bytes = archive.metadata.size_bytes,
            "archive created"
        );
        Ok(archive)
    }

    pub fn get(&self, id: &str) -> Result<Archive> {
        let id = parse_archive_id(id)?;
        self.records.get(&id)
    }

    /// Catalog entries as stored, newest-first. Reads only the catalog, so
    /// a corrupted archive cannot break the listing.
    pub fn list(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.catalog.load()?.entries)
    }

    /// Idempotent: deleting an absent or already-deleted archive succeeds.
    pub fn delete(&self, id: &str) -> Result<()> {
        let id = parse_archive_id(id)?;
        let mut catalog = self.catalog.load()?;
        if catalog.remove(&id) {
            self.catalog.save(&mut catalog)?;
        }
        self.records.remove(&id)?;
        debug!(id = %id, "archive deleted");
        Ok(())
    }

    pub fn export_to_csv(&self, archive: &Archive) -> String {
        export::export_to_csv(archive)
    }

    pub fn export_filename(&self, archive: &Archive) -> String {
        export::export_filename(&archive.name, archive.created_at)
    }

    pub fn record_key(&self, id: &Uuid) -> String {
        self.records.record_key(id)
    }
}

/// First free name among `base`, `base (2)`, `base (3)`, … Deterministic,
/// and always resolves since the suffix space is unbounded.
fn dedupe_name(catalog: &Catalog, base: &str) -> String {
    if !catalog.contains_name(base) {
        return base.to_string();
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base} ({n})");
        if !catalog.contains_name(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
