//! Test harness for isolated test execution.
//!
//! Every `TestHarness` owns a temp directory with its own catalog directory
//! and SQLite file, so a harness can be "restarted" by reopening the store
//! on the same database.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use scanshelf::catalog::{CatalogStore, LoadReport};
use scanshelf::config::ThumbnailSize;
use scanshelf::db::Database;
use scanshelf::{CatalogBroadcaster, Config, DocumentAssembler, DocumentSession, FileResolver};

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory holding the cataloged PDFs.
    pub catalog_dir: PathBuf,
    /// SQLite file backing the catalog.
    pub database_path: PathBuf,
    /// Directory for files that live outside the catalog (picked PDFs).
    pub outside_dir: PathBuf,
    pub store: Arc<CatalogStore>,
    pub assembler: Arc<DocumentAssembler>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let catalog_dir = base.join("documents");
        let database_path = base.join("state").join("catalog.db");
        let outside_dir = base.join("outside");
        std::fs::create_dir_all(&outside_dir).expect("Failed to create outside dir");

        let (store, _) = open_store(&database_path, &catalog_dir);
        let assembler = DocumentAssembler::new(
            FileResolver::new(&catalog_dir),
            ThumbnailSize::default(),
            "Scanned",
        );

        Self {
            temp_dir,
            catalog_dir,
            database_path,
            outside_dir,
            store: Arc::new(store),
            assembler: Arc::new(assembler),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Loads the catalog again from disk, as a fresh process would.
    pub fn reopen(&self) -> (CatalogStore, LoadReport) {
        open_store(&self.database_path, &self.catalog_dir)
    }

    /// A session sharing this harness's store and assembler.
    pub fn session(&self) -> DocumentSession {
        DocumentSession::new(Arc::clone(&self.assembler), Arc::clone(&self.store))
    }

    /// A config pointing at this harness's directories.
    pub fn config(&self) -> Config {
        ConfigBuilder::new()
            .catalog_directory(&self.catalog_dir)
            .database_path(&self.database_path)
            .build()
    }

    /// Writes `content` outside the catalog directory.
    pub fn write_outside(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.outside_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write outside file");
        path
    }

    /// Names of the files currently in the catalog directory, sorted.
    pub fn catalog_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.catalog_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

fn open_store(database_path: &Path, catalog_dir: &Path) -> (CatalogStore, LoadReport) {
    let db = Database::open(database_path).expect("Failed to open database");
    CatalogStore::open(
        db,
        FileResolver::new(catalog_dir),
        CatalogBroadcaster::new(64),
    )
    .expect("Failed to open catalog")
}
