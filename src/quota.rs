use crate::error::{ArchiveError, Result};

/// Pre-write ceiling checks. Both are advisory relative to the storage
/// primitive's own enforcement: a quota refusal during the actual write maps
/// to the same error kind, so these are a fast-fail path, not the sole line
/// of defense.
pub fn check_count(current: usize, max: usize) -> Result<()> {
    if current + 1 > max {
        return Err(ArchiveError::LimitReached { current, max });
    }
    Ok(())
}

pub fn check_size(current_total: u64, candidate: u64, limit: u64) -> Result<()> {
    let projected = current_total + candidate;
    if projected > limit {
        return Err(ArchiveError::QuotaExceeded { projected, limit });
    }
    Ok(())
}
