//! Turns staged page images into a PDF on disk plus its catalog entry.

pub mod pdf;
pub mod thumbnail;

use std::path::Path;

use chrono::{DateTime, Local, Utc};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::config::{Config, ThumbnailSize};
use crate::error::{CatalogError, StorageError};
use crate::sanitize::{redact_path, sanitize_file_stem};
use crate::staging::PageImage;
use crate::storage::FileResolver;

use self::pdf::PdfSummary;

/// Local-time layout of generated names. Colons are avoided so the name is
/// usable as a file stem everywhere.
const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

fn write_error(e: StorageError) -> CatalogError {
    match e {
        StorageError::WriteFile { path, source }
        | StorageError::CreateDirectory { path, source } => CatalogError::Write { path, source },
        other => CatalogError::Storage(other),
    }
}

fn stem_of(location: &Path) -> String {
    location
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct DocumentAssembler {
    resolver: FileResolver,
    thumbnail: ThumbnailSize,
    name_prefix: String,
}

impl DocumentAssembler {
    pub fn new(
        resolver: FileResolver,
        thumbnail: ThumbnailSize,
        name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            thumbnail,
            name_prefix: name_prefix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            FileResolver::new(&config.catalog_directory),
            config.thumbnail,
            config.default_name_prefix.clone(),
        )
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    /// `Scanned(2026-10-16 14.03.59)` style name for unnamed documents.
    /// Not unique on its own; file creation resolves collisions.
    pub fn default_name(&self) -> String {
        format!(
            "{}({})",
            self.name_prefix,
            Local::now().format(DEFAULT_NAME_FORMAT)
        )
    }

    fn resolve_name(&self, name: Option<&str>) -> String {
        name.and_then(sanitize_file_stem)
            .unwrap_or_else(|| self.default_name())
    }

    /// Composes `images` into a PDF, writes it under the catalog directory
    /// and describes it. Does not touch the catalog.
    ///
    /// The entry name is the stem of the file actually written, so a taken
    /// name comes back as `name_2`, `name_3`, ...
    pub fn assemble(
        &self,
        images: &[PageImage],
        name: Option<&str>,
    ) -> Result<CatalogEntry, CatalogError> {
        let first = images.first().ok_or(CatalogError::EmptyInput)?;

        let bytes = pdf::compose_pdf(images)?;
        let preview = thumbnail::render_thumbnail(first.pixels(), self.thumbnail)?;

        let stem = self.resolve_name(name);
        let location = self.resolver.store_new(&stem, &bytes).map_err(write_error)?;
        let byte_size = self
            .resolver
            .size(&location)
            .unwrap_or(bytes.len() as u64);

        log::info!(
            "Assembled {} pages into {}",
            images.len(),
            redact_path(&location)
        );

        Ok(CatalogEntry::new(
            stem_of(&location),
            Utc::now(),
            images.len() as u32,
            byte_size,
            preview,
            location,
        ))
    }

    /// [`assemble`](Self::assemble) followed by insertion into `store`.
    /// If the insert fails the written file is removed again.
    pub fn assemble_into(
        &self,
        store: &CatalogStore,
        images: &[PageImage],
        name: Option<&str>,
    ) -> Result<CatalogEntry, CatalogError> {
        let entry = self.assemble(images, name)?;
        self.catalog(store, entry)
    }

    /// Copies an existing PDF into the catalog directory and catalogs it.
    ///
    /// Without a `name` the source file's stem is used. The thumbnail comes
    /// from the first image on page 1, or is a blank page-shaped preview.
    pub fn import_file(
        &self,
        store: &CatalogStore,
        source: &Path,
        name: Option<&str>,
    ) -> Result<CatalogEntry, CatalogError> {
        let bytes = self.resolver.read(source)?;
        let summary = pdf::inspect_pdf(&bytes)?;
        let preview = self.preview_for(&summary)?;

        let stem = name
            .and_then(sanitize_file_stem)
            .or_else(|| sanitize_file_stem(&stem_of(source)))
            .unwrap_or_else(|| self.default_name());
        let location = self.resolver.store_new(&stem, &bytes).map_err(write_error)?;

        log::info!(
            "Imported {} as {}",
            redact_path(source),
            redact_path(&location)
        );

        let entry = CatalogEntry::new(
            stem_of(&location),
            Utc::now(),
            summary.page_count,
            bytes.len() as u64,
            preview,
            location,
        );
        self.catalog(store, entry)
    }

    /// Catalogs every PDF in the catalog directory that no entry tracks yet,
    /// dated by its modification time. Unreadable files are skipped.
    pub fn reconcile_directory(
        &self,
        store: &CatalogStore,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut registered = Vec::new();

        for path in store.untracked_documents()? {
            let entry = match self.describe_existing(&path) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable document {}: {}", redact_path(&path), e);
                    continue;
                }
            };

            match store.insert(entry.clone()) {
                Ok(()) => registered.push(entry),
                Err(e) => log::warn!("Failed to register {}: {}", redact_path(&path), e),
            }
        }

        if !registered.is_empty() {
            log::info!("Registered {} untracked documents", registered.len());
        }
        Ok(registered)
    }

    fn describe_existing(&self, path: &Path) -> Result<CatalogEntry, CatalogError> {
        let bytes = self.resolver.read(path)?;
        let summary = pdf::inspect_pdf(&bytes)?;
        let preview = self.preview_for(&summary)?;
        let created_at = match self.resolver.modified(path) {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(_) => Utc::now(),
        };

        Ok(CatalogEntry::new(
            stem_of(path),
            created_at,
            summary.page_count,
            bytes.len() as u64,
            preview,
            path,
        ))
    }

    fn preview_for(&self, summary: &PdfSummary) -> Result<Vec<u8>, CatalogError> {
        match &summary.first_page_image {
            Some(image) => thumbnail::render_thumbnail(image, self.thumbnail),
            None => {
                let (width, height) = summary.first_page_size;
                thumbnail::blank_thumbnail(width, height, self.thumbnail)
            }
        }
    }

    fn catalog(
        &self,
        store: &CatalogStore,
        entry: CatalogEntry,
    ) -> Result<CatalogEntry, CatalogError> {
        if let Err(e) = store.insert(entry.clone()) {
            if let Err(cleanup) = self.resolver.remove(entry.location()) {
                log::warn!(
                    "Failed to remove uncataloged file {}: {}",
                    redact_path(entry.location()),
                    cleanup
                );
            }
            return Err(e);
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::CatalogBroadcaster;
    use crate::db::Database;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn solid(width: u32, height: u32) -> PageImage {
        PageImage::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([10, 20, 30]),
        )))
    }

    fn setup() -> (TempDir, DocumentAssembler, CatalogStore) {
        let dir = TempDir::new().unwrap();
        let resolver = FileResolver::new(dir.path().join("docs"));
        let assembler =
            DocumentAssembler::new(resolver.clone(), ThumbnailSize::default(), "Scanned");
        let (store, _) = CatalogStore::open(
            Database::open_in_memory().unwrap(),
            resolver,
            CatalogBroadcaster::default(),
        )
        .unwrap();
        (dir, assembler, store)
    }

    #[test]
    fn test_assemble_describes_written_file() {
        let (_dir, assembler, _store) = setup();

        let entry = assembler
            .assemble(&[solid(400, 600), solid(60, 40)], Some("Receipt"))
            .unwrap();

        assert_eq!(entry.name(), "Receipt");
        assert_eq!(entry.page_count(), 2);
        assert_eq!(
            entry.byte_size(),
            std::fs::metadata(entry.location()).unwrap().len()
        );
        let thumb = image::load_from_memory(entry.thumbnail()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 300));
    }

    #[test]
    fn test_assemble_empty_writes_nothing() {
        let (dir, assembler, _store) = setup();

        let result = assembler.assemble(&[], Some("Nothing"));

        assert!(matches!(result, Err(CatalogError::EmptyInput)));
        assert!(!dir.path().join("docs/Nothing.pdf").exists());
    }

    #[test]
    fn test_missing_catalog_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blocker"), b"file").unwrap();
        let assembler = DocumentAssembler::new(
            FileResolver::new(dir.path().join("blocker").join("docs")),
            ThumbnailSize::default(),
            "Scanned",
        );

        let result = assembler.assemble(&[solid(4, 4)], Some("Nowhere"));

        assert!(matches!(result, Err(CatalogError::Write { .. })));
    }

    #[test]
    fn test_empty_bitmap_writes_nothing() {
        let (dir, assembler, store) = setup();
        let empty = PageImage::from_rgb8(0, 0, Vec::new()).unwrap();

        let result = assembler.assemble_into(&store, &[empty], Some("Blank"));

        assert!(matches!(result, Err(CatalogError::Image(_))));
        assert!(store.is_empty());
        assert!(!dir.path().join("docs/Blank.pdf").exists());
    }

    #[test]
    fn test_default_name_when_blank() {
        let (_dir, assembler, _store) = setup();

        let entry = assembler.assemble(&[solid(4, 4)], Some("   ")).unwrap();

        assert!(entry.name().starts_with("Scanned("));
        assert!(entry.name().ends_with(')'));
    }

    #[test]
    fn test_name_collision_gets_suffix() {
        let (_dir, assembler, store) = setup();

        let first = assembler
            .assemble_into(&store, &[solid(4, 4)], Some("Same"))
            .unwrap();
        let second = assembler
            .assemble_into(&store, &[solid(4, 4)], Some("Same"))
            .unwrap();

        assert_eq!(first.name(), "Same");
        assert_eq!(second.name(), "Same_2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_import_copies_and_inspects() {
        let (dir, assembler, store) = setup();
        let bytes = pdf::compose_pdf(&[solid(30, 50), solid(30, 50), solid(30, 50)]).unwrap();
        let outside = dir.path().join("picked.pdf");
        std::fs::write(&outside, &bytes).unwrap();

        let entry = assembler.import_file(&store, &outside, None).unwrap();

        assert_eq!(entry.name(), "picked");
        assert_eq!(entry.page_count(), 3);
        assert_eq!(entry.byte_size(), bytes.len() as u64);
        assert!(outside.exists());
        assert_eq!(std::fs::read(entry.location()).unwrap(), bytes);
        assert!(store.get(entry.id()).is_some());
    }

    #[test]
    fn test_import_rejects_non_pdf() {
        let (dir, assembler, store) = setup();
        let outside = dir.path().join("notes.pdf");
        std::fs::write(&outside, b"plain text").unwrap();

        assert!(assembler.import_file(&store, &outside, None).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_reconcile_registers_untracked() {
        let (_dir, assembler, store) = setup();
        let tracked = assembler
            .assemble_into(&store, &[solid(8, 8)], Some("Tracked"))
            .unwrap();
        let loose = pdf::compose_pdf(&[solid(8, 8), solid(8, 8)]).unwrap();
        assembler.resolver().store_new("Loose", &loose).unwrap();
        assembler.resolver().store_new("Broken", b"junk").unwrap();

        let registered = assembler.reconcile_directory(&store).unwrap();

        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].name(), "Loose");
        assert_eq!(registered[0].page_count(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.get(tracked.id()).is_some());
    }
}
