//! Change notifications for catalog observers.
//!
//! Catalog mutations are published on a `tokio::sync::broadcast` channel;
//! the active file and the staging buffer are exposed as
//! `tokio::sync::watch` values by their owners.

pub mod catalog_events;

pub use catalog_events::{CatalogBroadcaster, CatalogChange, CatalogEvent};
