use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ArchiveError, Result},
    store::{
        Archive, ArchiveMetadata, DateRange, PaymentArchiveRecord, PaymentStatus, RiskAnnotation,
    },
};

/// One payment's live status in the mutable collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// One row of the underlying payment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePayment {
    pub payment_id: String,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub autopay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAnnotation>,
}

/// Seam to the external mutable payment-status collection. This core never
/// touches that collection's storage format; on successful archive creation
/// it calls `reset` exactly once.
pub trait StatusCollection {
    fn entries(&self) -> &[StatusEntry];
    fn reset(&mut self);
}

impl StatusCollection for Vec<StatusEntry> {
    fn entries(&self) -> &[StatusEntry] {
        self.as_slice()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

/// Joins the live status entries with the payment schedule into a frozen
/// archive. Every input is deep-copied: the frozen records share nothing
/// with live state, so later mutation of the source cannot touch history.
///
/// The name arrives already validated and de-duplicated by the service; a
/// de-dup suffix may carry it past the user-facing length cap, so only
/// trimming and the non-empty rule apply here.
pub fn build(
    name: &str,
    statuses: &[StatusEntry],
    schedule: &[SchedulePayment],
    source_schema_version: &str,
) -> Result<Archive> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ArchiveError::Validation(
            "archive name cannot be empty".to_string(),
        ));
    }
    let name = name.to_string();
    if statuses.is_empty() {
        return Err(ArchiveError::Validation(
            "no payments to archive".to_string(),
        ));
    }

    let by_payment: BTreeMap<&str, &SchedulePayment> = schedule
        .iter()
        .map(|payment| (payment.payment_id.as_str(), payment))
        .collect();

    let mut records = Vec::with_capacity(statuses.len());
    let mut paid_count: u32 = 0;
    let mut pending_count: u32 = 0;
    let mut earliest: Option<NaiveDate> = None;
    let mut latest: Option<NaiveDate> = None;

    for status in statuses {
        let payment = by_payment.get(status.payment_id.as_str()).ok_or_else(|| {
            ArchiveError::Validation(format!(
                "payment {} has no schedule entry",
                status.payment_id
            ))
        })?;
        match (status.status, status.paid_at.is_some()) {
            (PaymentStatus::Paid, false) => {
                return Err(ArchiveError::Validation(format!(
                    "payment {} is paid but has no paid_at timestamp",
                    status.payment_id
                )));
            }
            (PaymentStatus::Pending, true) => {
                return Err(ArchiveError::Validation(format!(
                    "payment {} is pending but carries a paid_at timestamp",
                    status.payment_id
                )));
            }
            _ => {}
        }
        match status.status {
            PaymentStatus::Paid => paid_count += 1,
            PaymentStatus::Pending => pending_count += 1,
        }
        let due = payment.due_date;
        earliest = Some(earliest.map_or(due, |current| current.min(due)));
        latest = Some(latest.map_or(due, |current| current.max(due)));

        records.push(PaymentArchiveRecord {
            payment_id: status.payment_id.clone(),
            status: status.status,
            paid_at: status.paid_at,
            provider: payment.provider.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            due_date: payment.due_date,
            autopay: payment.autopay,
            risk: payment.risk.clone(),
        });
    }

    let total_count = paid_count + pending_count;
    let mut archive = Archive {
        id: Uuid::new_v4(),
        name,
        created_at: Utc::now(),
        source_schema_version: source_schema_version.to_string(),
        records,
        metadata: ArchiveMetadata {
            total_count,
            paid_count,
            pending_count,
            date_range: DateRange { earliest, latest },
            size_bytes: 0,
        },
    };
    fix_serialized_size(&mut archive)?;
    Ok(archive)
}

// size_bytes participates in its own serialization, so measuring once is not
// enough: patch and re-measure until the length is stable. Only a change in
// the digit count of the size field can perturb it, so this settles within
// a few rounds; a stale size would break exact quota accounting, so running
// out of rounds is an error, never a silent return.
fn fix_serialized_size(archive: &mut Archive) -> Result<()> {
    for _ in 0..8 {
        let len = serde_json::to_string(archive)?.len() as u64;
        if archive.metadata.size_bytes == len {
            return Ok(());
        }
        archive.metadata.size_bytes = len;
    }
    Err(ArchiveError::Serialization(
        "archive size did not stabilize".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn schedule_row(id: &str, due: NaiveDate) -> SchedulePayment {
        SchedulePayment {
            payment_id: id.to_string(),
            provider: "Enbridge".to_string(),
            amount: Decimal::new(8450, 2),
            currency: "CAD".to_string(),
            due_date: due,
            autopay: true,
            risk: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn joins_statuses_with_schedule_and_counts_by_status() {
        let paid_at = Utc.with_ymd_and_hms(2025, 10, 14, 14, 30, 0).unwrap();
        let statuses = vec![
            StatusEntry {
                payment_id: "a".to_string(),
                status: PaymentStatus::Paid,
                paid_at: Some(paid_at),
            },
            StatusEntry {
                payment_id: "b".to_string(),
                status: PaymentStatus::Pending,
                paid_at: None,
            },
        ];
        let schedule = vec![schedule_row("a", day(20)), schedule_row("b", day(5))];

        let archive = build("October", &statuses, &schedule, "1.0.0").unwrap();
        assert_eq!(archive.metadata.total_count, 2);
        assert_eq!(archive.metadata.paid_count, 1);
        assert_eq!(archive.metadata.pending_count, 1);
        assert_eq!(archive.metadata.date_range.earliest, Some(day(5)));
        assert_eq!(archive.metadata.date_range.latest, Some(day(20)));
        assert_eq!(archive.records[0].provider, "Enbridge");
        assert_eq!(archive.records[0].paid_at, Some(paid_at));
    }

    #[test]
    fn size_bytes_matches_the_persisted_form_exactly() {
        let statuses = vec![StatusEntry {
            payment_id: "a".to_string(),
            status: PaymentStatus::Pending,
            paid_at: None,
        }];
        // spans 3- through 5-digit serialized lengths so the fixed point
        // has to re-measure across digit boundaries
        for padding in [0usize, 600, 9_000, 60_000] {
            let mut row = schedule_row("a", day(1));
            row.provider = "p".repeat(padding.max(1));
            let schedule = vec![row];
            let archive = build("Sizing", &statuses, &schedule, "1.0.0").unwrap();
            let persisted = serde_json::to_string(&archive).unwrap();
            assert_eq!(archive.metadata.size_bytes, persisted.len() as u64);
        }
    }

    #[test]
    fn deduped_names_past_the_user_cap_are_accepted() {
        let statuses = vec![StatusEntry {
            payment_id: "a".to_string(),
            status: PaymentStatus::Pending,
            paid_at: None,
        }];
        let schedule = vec![schedule_row("a", day(1))];
        let name = format!("{} (2)", "x".repeat(100));
        let archive = build(&name, &statuses, &schedule, "1.0.0").unwrap();
        assert_eq!(archive.name, name);
    }

    #[test]
    fn empty_status_collection_is_a_validation_error() {
        let err = build("October", &[], &[], "1.0.0").unwrap_err();
        match err {
            ArchiveError::Validation(message) => {
                assert!(message.contains("no payments"), "message: {message}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn status_without_schedule_row_is_rejected() {
        let statuses = vec![StatusEntry {
            payment_id: "ghost".to_string(),
            status: PaymentStatus::Pending,
            paid_at: None,
        }];
        assert!(matches!(
            build("October", &statuses, &[], "1.0.0"),
            Err(ArchiveError::Validation(_))
        ));
    }

    #[test]
    fn paid_without_timestamp_is_rejected() {
        let statuses = vec![StatusEntry {
            payment_id: "a".to_string(),
            status: PaymentStatus::Paid,
            paid_at: None,
        }];
        let schedule = vec![schedule_row("a", day(1))];
        assert!(matches!(
            build("October", &statuses, &schedule, "1.0.0"),
            Err(ArchiveError::Validation(_))
        ));
    }

    #[test]
    fn fresh_ids_per_snapshot() {
        let statuses = vec![StatusEntry {
            payment_id: "a".to_string(),
            status: PaymentStatus::Pending,
            paid_at: None,
        }];
        let schedule = vec![schedule_row("a", day(1))];
        let first = build("One", &statuses, &schedule, "1.0.0").unwrap();
        let second = build("Two", &statuses, &schedule, "1.0.0").unwrap();
        assert_ne!(first.id, second.id);
    }
}
