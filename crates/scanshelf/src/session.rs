//! One capture-to-catalog session.
//!
//! `DocumentSession` owns the staging buffer and the pending file name and
//! shares the assembler and catalog store with whoever else needs them.
//! Assembly and import run on the blocking pool so callers on an async
//! runtime are never stalled by PDF composition.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use uuid::Uuid;

use crate::assembler::DocumentAssembler;
use crate::broadcast::CatalogBroadcaster;
use crate::catalog::{project, CatalogEntry, CatalogStore, LoadReport, SortKey};
use crate::config::{validate_config, Config};
use crate::db::Database;
use crate::error::{CatalogError, ScanshelfError};
use crate::staging::{PageImage, StagedPage, StagingBuffer, StagingSnapshot};
use crate::storage::FileResolver;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Session lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

pub struct DocumentSession {
    staging: Mutex<StagingBuffer>,
    pending_name: Mutex<Option<String>>,
    staging_tx: watch::Sender<StagingSnapshot>,
    assembler: Arc<DocumentAssembler>,
    store: Arc<CatalogStore>,
}

impl DocumentSession {
    pub fn new(assembler: Arc<DocumentAssembler>, store: Arc<CatalogStore>) -> Self {
        let (staging_tx, _) = watch::channel(StagingSnapshot::default());
        Self {
            staging: Mutex::new(StagingBuffer::new()),
            pending_name: Mutex::new(None),
            staging_tx,
            assembler,
            store,
        }
    }

    /// Opens the database and catalog described by `config`.
    pub fn open(config: &Config) -> Result<(Self, LoadReport), ScanshelfError> {
        validate_config(config)?;

        let db = Database::open(&config.database_path)?;
        let resolver = FileResolver::new(&config.catalog_directory);
        let events = CatalogBroadcaster::new(config.event_capacity);
        let (store, report) = CatalogStore::open(db, resolver, events)?;
        let assembler = DocumentAssembler::from_config(config);

        Ok((Self::new(Arc::new(assembler), Arc::new(store)), report))
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    pub fn assembler(&self) -> &Arc<DocumentAssembler> {
        &self.assembler
    }

    fn update_staging<T>(&self, f: impl FnOnce(&mut StagingBuffer) -> T) -> T {
        let mut buffer = lock(&self.staging);
        let result = f(&mut buffer);
        self.staging_tx.send_replace(buffer.snapshot());
        result
    }

    pub fn select_images(&self, images: Vec<PageImage>) {
        self.update_staging(|buffer| buffer.select_images(images));
    }

    pub fn promote_selection(&self) -> usize {
        self.update_staging(StagingBuffer::promote_selection)
    }

    pub fn discard_selection(&self) {
        self.update_staging(StagingBuffer::discard_selection);
    }

    pub fn add_pages(&self, images: Vec<PageImage>) -> Vec<Uuid> {
        self.update_staging(|buffer| buffer.add(images))
    }

    pub fn toggle_include(&self, id: Uuid) -> Option<bool> {
        self.update_staging(|buffer| buffer.toggle_include(id))
    }

    pub fn included_pages(&self) -> Vec<StagedPage> {
        lock(&self.staging)
            .included_pages()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn staging_snapshot(&self) -> StagingSnapshot {
        self.staging_tx.borrow().clone()
    }

    pub fn watch_staging(&self) -> watch::Receiver<StagingSnapshot> {
        self.staging_tx.subscribe()
    }

    /// Name used by the next [`assemble`](Self::assemble). Blank clears it.
    pub fn set_file_name(&self, name: impl Into<String>) {
        let name = name.into();
        *lock(&self.pending_name) = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
    }

    pub fn file_name(&self) -> Option<String> {
        lock(&self.pending_name).clone()
    }

    /// Drops everything staged and the pending name.
    pub fn abandon(&self) {
        self.update_staging(StagingBuffer::clear);
        *lock(&self.pending_name) = None;
    }

    /// Assembles the included pages under the pending name, catalogs the
    /// result and makes it the active file. Staging is reset only on success.
    pub async fn assemble(&self) -> Result<CatalogEntry, CatalogError> {
        let images = lock(&self.staging).included_images();
        if images.is_empty() {
            return Err(CatalogError::EmptyInput);
        }
        let name = self.file_name();

        let assembler = Arc::clone(&self.assembler);
        let store = Arc::clone(&self.store);
        let entry = tokio::task::spawn_blocking(move || {
            assembler.assemble_into(&store, &images, name.as_deref())
        })
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))??;

        self.abandon();
        self.store
            .select_active(Some(entry.location().to_path_buf()));
        Ok(entry)
    }

    /// Imports a PDF picked from outside the catalog and makes it active.
    pub async fn import_pdf(
        &self,
        source: PathBuf,
        name: Option<String>,
    ) -> Result<CatalogEntry, CatalogError> {
        let assembler = Arc::clone(&self.assembler);
        let store = Arc::clone(&self.store);
        let entry = tokio::task::spawn_blocking(move || {
            assembler.import_file(&store, &source, name.as_deref())
        })
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))??;

        self.store
            .select_active(Some(entry.location().to_path_buf()));
        Ok(entry)
    }

    /// Current catalog filtered by `search_text` and ordered by `sort`.
    pub fn catalog_view(&self, search_text: &str, sort: SortKey) -> Vec<CatalogEntry> {
        project(&self.store.list(), search_text, sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThumbnailSize;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn session() -> (TempDir, DocumentSession) {
        let dir = TempDir::new().unwrap();
        let resolver = FileResolver::new(dir.path().join("docs"));
        let (store, _) = CatalogStore::open(
            Database::open_in_memory().unwrap(),
            resolver.clone(),
            CatalogBroadcaster::default(),
        )
        .unwrap();
        let assembler = DocumentAssembler::new(resolver, ThumbnailSize::default(), "Scanned");
        (dir, DocumentSession::new(Arc::new(assembler), Arc::new(store)))
    }

    fn page(shade: u8) -> PageImage {
        PageImage::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            20,
            30,
            Rgb([shade, shade, shade]),
        )))
    }

    #[test]
    fn test_selection_then_promote() {
        let (_dir, session) = session();
        let mut rx = session.watch_staging();

        session.select_images(vec![page(1), page(2)]);
        assert_eq!(session.staging_snapshot().selected, 2);
        assert!(session.staging_snapshot().pages.is_empty());

        assert_eq!(session.promote_selection(), 2);
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.selected, 0);
        assert_eq!(snapshot.pages.len(), 2);
    }

    #[test]
    fn test_blank_file_name_is_cleared() {
        let (_dir, session) = session();
        session.set_file_name("Taxes");
        assert_eq!(session.file_name().as_deref(), Some("Taxes"));

        session.set_file_name("  ");
        assert_eq!(session.file_name(), None);
    }

    #[tokio::test]
    async fn test_assemble_resets_session() {
        let (_dir, session) = session();
        session.add_pages(vec![page(10), page(20)]);
        session.set_file_name("Lease");

        let entry = session.assemble().await.unwrap();

        assert_eq!(entry.name(), "Lease");
        assert_eq!(entry.page_count(), 2);
        assert!(session.staging_snapshot().pages.is_empty());
        assert_eq!(session.file_name(), None);
        assert_eq!(session.store().active().as_deref(), Some(entry.location()));
    }

    #[tokio::test]
    async fn test_assemble_with_nothing_included() {
        let (_dir, session) = session();
        let ids = session.add_pages(vec![page(10)]);
        session.toggle_include(ids[0]);
        session.set_file_name("Kept");

        let result = session.assemble().await;

        assert!(matches!(result, Err(CatalogError::EmptyInput)));
        assert!(session.store().is_empty());
        assert_eq!(session.staging_snapshot().pages.len(), 1);
        assert_eq!(session.file_name().as_deref(), Some("Kept"));
    }

    #[tokio::test]
    async fn test_abandon_discards_everything() {
        let (_dir, session) = session();
        session.select_images(vec![page(1)]);
        session.add_pages(vec![page(2)]);
        session.set_file_name("Draft");

        session.abandon();

        assert_eq!(session.staging_snapshot(), StagingSnapshot::default());
        assert_eq!(session.file_name(), None);
    }
}
