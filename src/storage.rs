use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use thiserror::Error;

pub const DEFAULT_ORIGIN_QUOTA_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("origin storage quota exceeded: {projected} of {limit} bytes")]
    QuotaExceeded { projected: u64, limit: u64 },
    #[error("origin storage access denied")]
    AccessDenied,
}

type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct HubInner {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
    denied: bool,
    subscribers: Vec<(u64, ChangeCallback)>,
    next_tab_id: u64,
}

impl HubInner {
    fn used_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(key, value)| (key.len() + value.len()) as u64)
            .sum()
    }
}

/// One per origin. Models the synchronous per-origin key-value store the
/// archive subsystem runs on: byte-quota enforced writes, all-or-nothing
/// access denial, and change notifications delivered to every execution
/// context except the writer.
pub struct StorageHub {
    inner: Arc<Mutex<HubInner>>,
}

impl StorageHub {
    pub fn new() -> Self {
        Self::with_quota(Some(DEFAULT_ORIGIN_QUOTA_BYTES))
    }

    pub fn with_quota(quota: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                entries: BTreeMap::new(),
                quota,
                denied: false,
                subscribers: Vec::new(),
                next_tab_id: 0,
            })),
        }
    }

    pub fn set_access_denied(&self, denied: bool) {
        self.inner.lock().denied = denied;
    }

    /// Mints a handle for one execution context ("tab").
    pub fn tab(&self) -> StorageTab {
        let mut guard = self.inner.lock();
        let tab_id = guard.next_tab_id;
        guard.next_tab_id += 1;
        StorageTab {
            inner: Arc::clone(&self.inner),
            tab_id,
        }
    }
}

impl Default for StorageHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct StorageTab {
    inner: Arc<Mutex<HubInner>>,
    tab_id: u64,
}

impl StorageTab {
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.inner.lock();
        if guard.denied {
            return Err(StorageError::AccessDenied);
        }
        Ok(guard.entries.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let listeners = {
            let mut guard = self.inner.lock();
            if guard.denied {
                return Err(StorageError::AccessDenied);
            }
            let old_len = guard
                .entries
                .get(key)
                .map(|old| (key.len() + old.len()) as u64)
                .unwrap_or(0);
            let projected =
                guard.used_bytes() - old_len + (key.len() + value.len()) as u64;
            if let Some(limit) = guard.quota {
                if projected > limit {
                    return Err(StorageError::QuotaExceeded { projected, limit });
                }
            }
            guard.entries.insert(key.to_string(), value.to_string());
            other_tab_listeners(&guard, self.tab_id)
        };
        notify(listeners, key);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let listeners = {
            let mut guard = self.inner.lock();
            if guard.denied {
                return Err(StorageError::AccessDenied);
            }
            if guard.entries.remove(key).is_none() {
                return Ok(());
            }
            other_tab_listeners(&guard, self.tab_id)
        };
        notify(listeners, key);
        Ok(())
    }

    /// Registers a change callback for this tab. Fires with the changed key
    /// for writes made by other tabs only, never this tab's own, matching
    /// the browser storage-event contract.
    pub fn subscribe(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.inner
            .lock()
            .subscribers
            .push((self.tab_id, Arc::new(callback)));
    }
}

fn other_tab_listeners(inner: &HubInner, writer: u64) -> Vec<ChangeCallback> {
    inner
        .subscribers
        .iter()
        .filter(|(tab_id, _)| *tab_id != writer)
        .map(|(_, callback)| Arc::clone(callback))
        .collect()
}

// Callbacks run outside the hub lock so a listener may read storage.
fn notify(listeners: Vec<ChangeCallback>, key: &str) {
    for listener in listeners {
        listener(key);
    }
}
