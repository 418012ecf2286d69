//! Durable registry of produced PDFs.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::broadcast::{CatalogBroadcaster, CatalogChange, CatalogEvent};
use crate::catalog::CatalogEntry;
use crate::db::{kv_repo, Database};
use crate::error::{CatalogError, StorageError};
use crate::sanitize::{redact_path, sanitize_file_stem};
use crate::storage::FileResolver;

/// Key under which the whole catalog is stored.
pub const CATALOG_KEY: &str = "scanshelf.catalog.entries";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The entry's file no longer exists.
    MissingFile,
    /// Another entry already tracks the same file.
    DuplicateLocation,
}

/// An entry that broke the one-entry-per-existing-file rule. Detected on
/// load or during an operation, logged, and removed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    pub id: Uuid,
    pub name: String,
    pub location: PathBuf,
    pub kind: ViolationKind,
}

impl ConsistencyViolation {
    fn new(entry: &CatalogEntry, kind: ViolationKind) -> Self {
        Self {
            id: entry.id(),
            name: entry.name().to_string(),
            location: entry.location().to_path_buf(),
            kind,
        }
    }
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ViolationKind::MissingFile => "file is missing",
            ViolationKind::DuplicateLocation => "file is already tracked by another entry",
        };
        write!(
            f,
            "entry {} ('{}', {}): {}",
            self.id,
            self.name,
            redact_path(&self.location),
            reason
        )
    }
}

/// Outcome of loading the persisted catalog.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub healed: Vec<ConsistencyViolation>,
    /// Entries whose stored byte size no longer matched the file.
    pub resized: usize,
}

/// Outcome of [`CatalogStore::clear`]. The catalog is empty either way.
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: usize,
    pub already_missing: usize,
    pub failures: Vec<StorageError>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn load_persisted(db: &Database) -> Result<Vec<CatalogEntry>, CatalogError> {
    match kv_repo::get(db, CATALOG_KEY)? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(Vec::new()),
    }
}

/// Writes the full collection in one transaction. On failure the previously
/// persisted collection stays intact.
fn persist(db: &Database, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
    let bytes = serde_json::to_vec(entries)?;
    kv_repo::put(db, CATALOG_KEY, &bytes)?;
    Ok(())
}

/// The catalog of produced PDFs.
///
/// Mutations hold the write lock across the whole read-modify-write-persist
/// cycle, so they are serialized and never interleave. The in-memory list
/// only changes after the new collection has been persisted, unless files
/// were already removed (delete and clear), in which case the entries go
/// regardless. Readers get a cloned snapshot. Events go out once a change is
/// committed.
pub struct CatalogStore {
    db: Database,
    resolver: FileResolver,
    entries: RwLock<Vec<CatalogEntry>>,
    active: watch::Sender<Option<PathBuf>>,
    events: CatalogBroadcaster,
}

impl CatalogStore {
    /// Loads the persisted catalog, dropping entries whose file is gone.
    pub fn open(
        db: Database,
        resolver: FileResolver,
        events: CatalogBroadcaster,
    ) -> Result<(Self, LoadReport), CatalogError> {
        let _span = tracing::info_span!("catalog.load").entered();

        resolver.ensure_root()?;
        let stored = load_persisted(&db)?;

        let mut report = LoadReport::default();
        let mut kept = Vec::with_capacity(stored.len());
        let mut seen = HashSet::new();

        for mut entry in stored {
            if !seen.insert(entry.location().to_path_buf()) {
                report
                    .healed
                    .push(ConsistencyViolation::new(&entry, ViolationKind::DuplicateLocation));
                continue;
            }

            match resolver.size(entry.location()) {
                Ok(size) => {
                    if size != entry.byte_size() {
                        entry.set_byte_size(size);
                        report.resized += 1;
                    }
                    kept.push(entry);
                }
                Err(StorageError::NotFound(_)) => {
                    report
                        .healed
                        .push(ConsistencyViolation::new(&entry, ViolationKind::MissingFile));
                }
                Err(e) => {
                    log::warn!("Keeping entry {} with unreadable file: {}", entry.id(), e);
                    kept.push(entry);
                }
            }
        }

        for violation in &report.healed {
            log::warn!("Dropping catalog {}", violation);
        }

        if !report.healed.is_empty() || report.resized > 0 {
            if let Err(e) = persist(&db, &kept) {
                log::warn!("Failed to persist healed catalog: {}", e);
            }
        }

        report.loaded = kept.len();
        log::info!(
            "Catalog loaded: {} entries, {} dropped",
            report.loaded,
            report.healed.len()
        );

        let (active, _) = watch::channel(None);
        let store = Self {
            db,
            resolver,
            entries: RwLock::new(kept),
            active,
            events,
        };

        if !report.healed.is_empty() {
            let ids = report.healed.iter().map(|v| v.id).collect();
            store.notify(CatalogChange::Healed { ids }, report.loaded);
        }

        Ok((store, report))
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Vec<CatalogEntry>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Catalog lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<CatalogEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Catalog lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn notify(&self, change: CatalogChange, entry_count: usize) {
        self.events.send(CatalogEvent::new(change, entry_count));
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    /// Snapshot of all entries. Order is not meaningful; use
    /// [`crate::catalog::project`] for presentation.
    pub fn list(&self) -> Vec<CatalogEntry> {
        self.read_entries().clone()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<CatalogEntry> {
        self.read_entries().iter().find(|e| e.id() == id).cloned()
    }

    pub fn find_by_location(&self, location: &Path) -> Option<CatalogEntry> {
        self.read_entries()
            .iter()
            .find(|e| e.location() == location)
            .cloned()
    }

    /// `.pdf` files in the catalog directory that no entry tracks.
    pub fn untracked_documents(&self) -> Result<Vec<PathBuf>, CatalogError> {
        let documents = self.resolver.list_documents()?;
        let entries = self.read_entries();
        Ok(documents
            .into_iter()
            .filter(|path| !entries.iter().any(|e| e.location() == path))
            .collect())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// Adds a new entry and persists the whole catalog.
    pub fn insert(&self, entry: CatalogEntry) -> Result<(), CatalogError> {
        let mut entries = self.write_entries();

        if entries
            .iter()
            .any(|e| e.id() == entry.id() || e.location() == entry.location())
        {
            return Err(CatalogError::FileConflict(entry.location().to_path_buf()));
        }

        let mut next = entries.clone();
        next.push(entry.clone());
        persist(&self.db, &next)?;
        *entries = next;
        let count = entries.len();
        drop(entries);

        log::info!(
            "Cataloged '{}' ({} pages, {} bytes)",
            entry.name(),
            entry.page_count(),
            entry.byte_size()
        );
        self.notify(CatalogChange::Inserted { entry }, count);
        Ok(())
    }

    /// Renames the entry and moves its file to `<new_name>.pdf`.
    ///
    /// Fails with `FileConflict` when that file already exists; the original
    /// entry and file are left untouched.
    pub fn rename(&self, id: Uuid, new_name: &str) -> Result<CatalogEntry, CatalogError> {
        let stem = sanitize_file_stem(new_name)
            .ok_or_else(|| CatalogError::InvalidName(new_name.to_string()))?;

        let mut entries = self.write_entries();
        let index = entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or(CatalogError::NotFound(id))?;
        let current = entries[index].clone();

        if current.name() == stem {
            return Ok(current);
        }

        let destination = self.resolver.path_for_name(&stem);
        if entries
            .iter()
            .any(|e| e.id() != id && e.location() == destination)
        {
            return Err(CatalogError::FileConflict(destination));
        }

        match self.resolver.move_to(current.location(), &destination) {
            Ok(()) => {}
            Err(StorageError::FileExists(path)) => return Err(CatalogError::FileConflict(path)),
            Err(StorageError::NotFound(path)) => {
                self.drop_orphan(&mut entries, index);
                return Err(StorageError::NotFound(path).into());
            }
            Err(e) => return Err(e.into()),
        }

        let size = self
            .resolver
            .size(&destination)
            .unwrap_or(current.byte_size());
        let mut next = entries.clone();
        next[index].relocate(stem, destination.clone(), size);

        if let Err(e) = persist(&self.db, &next) {
            if let Err(undo) = self.resolver.move_to(&destination, current.location()) {
                log::error!(
                    "Failed to restore {} after persist failure: {}",
                    redact_path(current.location()),
                    undo
                );
            }
            return Err(e);
        }

        *entries = next;
        let updated = entries[index].clone();
        let count = entries.len();
        drop(entries);

        log::info!("Renamed '{}' to '{}'", current.name(), updated.name());
        self.replace_active(current.location(), Some(updated.location().to_path_buf()));
        self.notify(
            CatalogChange::Renamed {
                entry: updated.clone(),
                previous_name: current.name().to_string(),
            },
            count,
        );
        Ok(updated)
    }

    /// Copies the entry's file to the first free `<name>_copy(n).pdf` and
    /// catalogs the copy under a new id.
    pub fn duplicate(&self, id: Uuid) -> Result<CatalogEntry, CatalogError> {
        let mut entries = self.write_entries();
        let index = entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or(CatalogError::NotFound(id))?;
        let source = entries[index].clone();

        let (path, stem) = match self
            .resolver
            .copy_to_free_name(source.location(), source.name())
        {
            Ok(copied) => copied,
            Err(StorageError::NotFound(path)) => {
                self.drop_orphan(&mut entries, index);
                return Err(StorageError::NotFound(path).into());
            }
            Err(e) => return Err(e.into()),
        };

        let size = self.resolver.size(&path).unwrap_or(source.byte_size());
        let copy = source.duplicate_at(stem, path.clone(), size);

        // The path was free on disk, so any entry still pointing at it is stale.
        let mut next: Vec<CatalogEntry> = entries
            .iter()
            .filter(|e| e.location() != path)
            .cloned()
            .collect();
        next.push(copy.clone());

        if let Err(e) = persist(&self.db, &next) {
            if let Err(cleanup) = self.resolver.remove(&path) {
                log::error!(
                    "Failed to remove copy {} after persist failure: {}",
                    redact_path(&path),
                    cleanup
                );
            }
            return Err(e);
        }

        *entries = next;
        let count = entries.len();
        drop(entries);

        log::info!("Duplicated '{}' as '{}'", source.name(), copy.name());
        self.notify(
            CatalogChange::Duplicated {
                source_id: id,
                entry: copy.clone(),
            },
            count,
        );
        Ok(copy)
    }

    /// Removes the entry and its file. A file that is already gone does not
    /// stop the entry from being removed.
    pub fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        let mut entries = self.write_entries();
        let index = entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or(CatalogError::NotFound(id))?;
        let entry = entries[index].clone();

        match self.resolver.remove(entry.location()) {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                log::warn!(
                    "File for '{}' was already gone, removing entry",
                    entry.name()
                );
            }
            Err(e) => return Err(e.into()),
        }

        // The file is gone from here on, so the entry goes with it even when
        // the new collection cannot be persisted.
        let mut next = entries.clone();
        next.remove(index);
        let persisted = persist(&self.db, &next);
        *entries = next;
        let count = entries.len();
        drop(entries);

        if let Err(e) = &persisted {
            log::error!("Failed to persist catalog after deleting '{}': {}", entry.name(), e);
        } else {
            log::info!("Deleted '{}'", entry.name());
        }
        self.replace_active(entry.location(), None);
        self.notify(CatalogChange::Deleted { id }, count);
        persisted
    }

    /// Deletes every file and empties the catalog.
    ///
    /// File deletions are best effort: failures are logged and reported but
    /// never keep an entry in the catalog. An error is returned only when
    /// the empty catalog could not be persisted.
    pub fn clear(&self) -> Result<ClearReport, CatalogError> {
        let mut entries = self.write_entries();
        let mut report = ClearReport::default();

        for entry in entries.iter() {
            match self.resolver.remove(entry.location()) {
                Ok(()) => report.removed += 1,
                Err(StorageError::NotFound(_)) => report.already_missing += 1,
                Err(e) => {
                    log::error!("Failed to delete '{}': {}", entry.name(), e);
                    report.failures.push(e);
                }
            }
        }

        let total = entries.len();
        entries.clear();
        let persisted = persist(&self.db, &[]);
        drop(entries);

        log::info!(
            "Cleared catalog: {} removed, {} already missing, {} failed",
            report.removed,
            report.already_missing,
            report.failures.len()
        );
        self.set_active(None);
        self.notify(CatalogChange::Cleared { removed: total }, 0);

        persisted?;
        Ok(report)
    }

    /// Records the file handed to viewing and sharing collaborators.
    pub fn select_active(&self, location: Option<PathBuf>) {
        self.set_active(location);
    }

    pub fn active(&self) -> Option<PathBuf> {
        self.active.borrow().clone()
    }

    pub fn watch_active(&self) -> watch::Receiver<Option<PathBuf>> {
        self.active.subscribe()
    }

    fn set_active(&self, location: Option<PathBuf>) {
        let changed = self.active.send_if_modified(|current| {
            if *current == location {
                false
            } else {
                *current = location.clone();
                true
            }
        });
        if changed {
            self.notify(CatalogChange::ActiveChanged { location }, self.len());
        }
    }

    /// Points the active selection at `replacement` if it currently is `previous`.
    fn replace_active(&self, previous: &Path, replacement: Option<PathBuf>) {
        let is_previous = self.active.borrow().as_deref() == Some(previous);
        if is_previous {
            self.set_active(replacement);
        }
    }

    /// Removes an entry whose file vanished underneath it.
    fn drop_orphan(&self, entries: &mut Vec<CatalogEntry>, index: usize) {
        let violation = ConsistencyViolation::new(&entries[index], ViolationKind::MissingFile);
        log::warn!("Dropping catalog {}", violation);

        let mut next = entries.clone();
        next.remove(index);
        if let Err(e) = persist(&self.db, &next) {
            log::warn!("Failed to persist healed catalog: {}", e);
        }
        *entries = next;

        self.notify(
            CatalogChange::Healed {
                ids: vec![violation.id],
            },
            entries.len(),
        );
    }
}
