//! Shared test utilities for scanshelf integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated catalogs backed by temp directories
//! - Builders for page images, PDFs and configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
