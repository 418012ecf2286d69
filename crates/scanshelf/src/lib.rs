pub mod assembler;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod sanitize;
pub mod session;
pub mod staging;
pub mod storage;
pub mod telemetry;

pub use assembler::DocumentAssembler;
pub use broadcast::{CatalogBroadcaster, CatalogChange, CatalogEvent};
pub use catalog::{
    project, CatalogEntry, CatalogStore, ClearReport, ConsistencyViolation, LoadReport, SortKey,
};
pub use config::{load_config, Config};
pub use error::{CatalogError, ConfigError, Result, ScanshelfError, StorageError};
pub use session::DocumentSession;
pub use staging::{PageImage, StagedPage, StagingBuffer, StagingSnapshot};
pub use storage::FileResolver;
pub use telemetry::init_tracing;
