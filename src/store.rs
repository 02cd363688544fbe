use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ArchiveError, Result},
    storage::StorageTab,
};

/// An immutable frozen snapshot of payment-status records plus derived
/// metadata. Never mutated in place once persisted: any "change" is a
/// delete plus a create of a different archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub source_schema_version: String,
    pub records: Vec<PaymentArchiveRecord>,
    pub metadata: ArchiveMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentArchiveRecord {
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub autopay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAnnotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => f.write_str("paid"),
            Self::Pending => f.write_str("pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnnotation {
    pub risk_type: String,
    pub severity: RiskSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub total_count: u32,
    pub paid_count: u32,
    pub pending_count: u32,
    pub date_range: DateRange,
    /// Exact byte length of the archive JSON as persisted.
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// Semantic invariant check run on every read. Structural problems (missing
/// fields, wrong types, negative counts) never get this far: typed
/// deserialization already rejected them.
pub fn verify_archive_invariants(archive: &Archive) -> std::result::Result<(), String> {
    let meta = &archive.metadata;
    if meta.paid_count.checked_add(meta.pending_count) != Some(meta.total_count) {
        return Err(format!(
            "count mismatch: paid {} + pending {} != total {}",
            meta.paid_count, meta.pending_count, meta.total_count
        ));
    }
    match (meta.total_count, meta.date_range.earliest, meta.date_range.latest) {
        (0, None, None) => {}
        (0, _, _) => return Err("empty archive carries a date range".to_string()),
        (_, Some(earliest), Some(latest)) => {
            if earliest > latest {
                return Err(format!(
                    "date range inverted: {earliest} > {latest}"
                ));
            }
        }
        (_, _, _) => return Err("non-empty archive missing a date range".to_string()),
    }
    for record in &archive.records {
        let consistent = match record.status {
            PaymentStatus::Paid => record.paid_at.is_some(),
            PaymentStatus::Pending => record.paid_at.is_none(),
        };
        if !consistent {
            return Err(format!(
                "payment {} has paid_at inconsistent with status {}",
                record.payment_id, record.status
            ));
        }
    }
    Ok(())
}

/// Raw persistence for one archive's serialized bytes, with schema and
/// invariant validation on every read. `Corrupted` is deliberately distinct
/// from `NotFound` so a caller can offer "delete this broken entry" instead
/// of silently treating it as absent.
pub struct RecordStore {
    tab: StorageTab,
    key_prefix: String,
}

impl RecordStore {
    pub fn new(tab: StorageTab, key_prefix: String) -> Self {
        Self { tab, key_prefix }
    }

    pub fn record_key(&self, id: &Uuid) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    pub fn put(&self, archive: &Archive) -> Result<()> {
        let bytes = serde_json::to_string(archive)?;
        self.tab.set(&self.record_key(&archive.id), &bytes)?;
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Archive> {
        let key = self.record_key(id);
        let bytes = self.tab.get(&key)?.ok_or(ArchiveError::NotFound)?;
        let archive: Archive =
            serde_json::from_str(&bytes).map_err(|err| ArchiveError::Corrupted {
                id: id.to_string(),
                reason: err.to_string(),
            })?;
        verify_archive_invariants(&archive).map_err(|reason| ArchiveError::Corrupted {
            id: id.to_string(),
            reason,
        })?;
        Ok(archive)
    }

    /// Idempotent: removing an absent id is success, not `NotFound`.
    pub fn remove(&self, id: &Uuid) -> Result<()> {
        self.tab.remove(&self.record_key(id))?;
        Ok(())
    }
}
