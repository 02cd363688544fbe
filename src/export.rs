use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::{Archive, PaymentArchiveRecord, PaymentStatus};

pub const CSV_COLUMNS: [&str; 12] = [
    "provider",
    "amount",
    "currency",
    "due_date",
    "autopay",
    "risk_type",
    "risk_severity",
    "risk_message",
    "status",
    "paid_at",
    "archive_name",
    "archived_at",
];

const LINE_ENDING: &str = "\r\n";

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// One row per record, CRLF line endings, RFC 4180 quoting. Unicode in the
/// archive name field passes through byte-for-byte.
pub fn export_to_csv(archive: &Archive) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push_str(LINE_ENDING);
    for record in &archive.records {
        out.push_str(&row(archive, record));
        out.push_str(LINE_ENDING);
    }
    out
}

fn row(archive: &Archive, record: &PaymentArchiveRecord) -> String {
    let (risk_type, risk_severity, risk_message) = match &record.risk {
        Some(risk) => (
            risk.risk_type.clone(),
            risk.severity.to_string(),
            risk.message.clone(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    let paid_at = match (record.status, record.paid_at) {
        (PaymentStatus::Paid, Some(ts)) => format_timestamp(ts),
        _ => String::new(),
    };
    let fields = [
        record.provider.clone(),
        format!("{:.2}", record.amount),
        record.currency.clone(),
        record.due_date.to_string(),
        record.autopay.to_string(),
        risk_type,
        risk_severity,
        risk_message,
        record.status.to_string(),
        paid_at,
        archive.name.clone(),
        format_timestamp(archive.created_at),
    ];
    fields
        .iter()
        .map(|field| escape(field))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filename for a CSV download: URL-safe slug of the archive name plus the
/// creation timestamp. Non-ASCII is stripped from the slug only; the name
/// inside the file is untouched.
pub fn export_filename(name: &str, created_at: DateTime<Utc>) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase();
    let slug = SLUG_SEPARATORS.replace_all(&ascii, "-");
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "archive" } else { slug };
    format!("{slug}-{}.csv", created_at.format("%Y%m%dT%H%M%SZ"))
}
