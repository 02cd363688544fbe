use uuid::Uuid;

use crate::error::{ArchiveError, Result};

pub const MAX_ARCHIVE_NAME_CHARS: usize = 100;

/// Trims and length-checks an archive name. No normalization and no charset
/// restriction beyond the cap: non-ASCII passes through untouched.
pub fn normalize_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArchiveError::Validation(
            "archive name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_ARCHIVE_NAME_CHARS {
        return Err(ArchiveError::Validation(format!(
            "archive name cannot exceed {MAX_ARCHIVE_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn parse_archive_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ArchiveError::Validation(format!("invalid archive id: {raw}")))
}
