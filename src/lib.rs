pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod quota;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod sync;
pub mod validation;

pub use crate::{
    catalog::{Catalog, CatalogEntry},
    config::ArchiveConfig,
    error::{ArchiveError, Result},
    service::ArchiveService,
    snapshot::{SchedulePayment, StatusCollection, StatusEntry},
    storage::{StorageHub, StorageTab},
    store::{
        Archive, ArchiveMetadata, DateRange, PaymentArchiveRecord, PaymentStatus, RiskAnnotation,
        RiskSeverity,
    },
    sync::CatalogWatcher,
};
