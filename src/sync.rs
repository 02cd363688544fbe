use std::sync::mpsc::{self, Receiver};

use parking_lot::Mutex;

use crate::storage::StorageTab;

/// Cross-tab change signal for the catalog key. Carries no payload:
/// subscribers re-call `list()`/`get()` rather than trust an event body,
/// since the write happened in another execution context and may already
/// have been superseded.
pub struct CatalogWatcher {
    notifications: Receiver<()>,
}

impl CatalogWatcher {
    pub fn attach(tab: &StorageTab, catalog_key: &str) -> Self {
        let (tx, rx) = mpsc::channel();
        // mpsc senders are not Sync; the hub calls listeners from behind an Arc
        let tx = Mutex::new(tx);
        let key = catalog_key.to_string();
        tab.subscribe(move |changed| {
            if changed == key {
                let _ = tx.lock().send(());
            }
        });
        Self { notifications: rx }
    }

    /// Drains pending notifications; true if the catalog changed in another
    /// tab since the last call.
    pub fn catalog_changed(&self) -> bool {
        let mut changed = false;
        while self.notifications.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}
