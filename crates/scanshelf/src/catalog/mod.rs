pub mod entry;
pub mod format;
pub mod store;
pub mod view;

pub use entry::CatalogEntry;
pub use format::{format_byte_size, format_page_count};
pub use store::{
    CatalogStore, ClearReport, ConsistencyViolation, LoadReport, ViolationKind, CATALOG_KEY,
};
pub use view::{project, SortKey};
