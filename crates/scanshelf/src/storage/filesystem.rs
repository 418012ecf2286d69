use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::StorageError;

/// Extension of every document file the catalog tracks.
pub const PDF_EXTENSION: &str = "pdf";

/// Upper bound on suffix probing before giving up with `FileExists`.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, which covers
/// cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// `true` when something (file, directory or dangling symlink) occupies `path`.
fn occupied(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Maps catalog entries to files under the catalog directory and performs
/// the byte-level operations behind rename, duplicate and delete.
///
/// Every failure carries the path that triggered it.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| StorageError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// The canonical location for a document called `stem`.
    pub fn path_for_name(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.{}", stem, PDF_EXTENSION))
    }

    /// Writes `content` to a fresh file named after `stem`.
    ///
    /// The first free name out of `stem.pdf`, `stem_2.pdf`, `stem_3.pdf`, ...
    /// is claimed with `create_new`, so an existing file is never
    /// overwritten. A failed write removes the half-written file.
    pub fn store_new(&self, stem: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_root()?;

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let candidate = if counter == 1 {
                stem.to_string()
            } else {
                format!("{}_{}", stem, counter)
            };
            let path = self.path_for_name(&candidate);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let written = file.write_all(content).and_then(|_| file.sync_all());
                    if let Err(e) = written {
                        drop(file);
                        if let Err(cleanup) = std::fs::remove_file(&path) {
                            log::warn!(
                                "Failed to remove partial file {}: {}",
                                path.display(),
                                cleanup
                            );
                        }
                        return Err(StorageError::WriteFile { path, source: e });
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }

        Err(StorageError::FileExists(self.path_for_name(stem)))
    }

    /// Copies `source` next to it under the first unused `stem_copy(n)` name,
    /// counting up from 1. Returns the new path and the stem that was used.
    pub fn copy_to_free_name(
        &self,
        source: &Path,
        stem: &str,
    ) -> Result<(PathBuf, String), StorageError> {
        self.ensure_root()?;

        for n in 1..=MAX_NAME_ATTEMPTS {
            let candidate = format!("{}_copy({})", stem, n);
            let path = self.path_for_name(&candidate);

            let mut target = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CopyFile {
                        from: source.to_path_buf(),
                        to: path,
                        source: e,
                    })
                }
            };

            let copied = std::fs::File::open(source)
                .and_then(|mut src| std::io::copy(&mut src, &mut target))
                .and_then(|_| target.sync_all());

            if let Err(e) = copied {
                drop(target);
                let _ = std::fs::remove_file(&path);
                if e.kind() == ErrorKind::NotFound {
                    return Err(StorageError::NotFound(source.to_path_buf()));
                }
                return Err(StorageError::CopyFile {
                    from: source.to_path_buf(),
                    to: path,
                    source: e,
                });
            }

            return Ok((path, candidate));
        }

        Err(StorageError::FileExists(
            self.path_for_name(&format!("{}_copy({})", stem, MAX_NAME_ATTEMPTS)),
        ))
    }

    /// Moves `from` to `to`, refusing to replace an existing destination.
    ///
    /// A destination that is the same file as the source (case-only renames
    /// on case-insensitive filesystems) is not treated as a conflict.
    pub fn move_to(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        if from == to {
            return Ok(());
        }
        if !occupied(from) {
            return Err(StorageError::NotFound(from.to_path_buf()));
        }
        if occupied(to) && !same_file(from, to) {
            return Err(StorageError::FileExists(to.to_path_buf()));
        }
        if let Some(parent) = to.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        move_file(from, to)
    }

    /// Copies `from` to `to`, refusing to replace an existing destination.
    pub fn copy_to(&self, from: &Path, to: &Path) -> Result<u64, StorageError> {
        if !occupied(from) {
            return Err(StorageError::NotFound(from.to_path_buf()));
        }

        let mut target = match OpenOptions::new().write(true).create_new(true).open(to) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(to.to_path_buf()))
            }
            Err(e) => {
                return Err(StorageError::CopyFile {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    source: e,
                })
            }
        };

        let copied = std::fs::File::open(from)
            .and_then(|mut src| std::io::copy(&mut src, &mut target))
            .and_then(|n| target.sync_all().map(|_| n));

        copied.map_err(|e| {
            drop(target);
            let _ = std::fs::remove_file(to);
            StorageError::CopyFile {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source: e,
            }
        })
    }

    /// Removes the file at `path`. A missing file yields `StorageError::NotFound`,
    /// which callers are free to treat as success.
    pub fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(StorageError::RemoveFile {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub fn size(&self, path: &Path) -> Result<u64, StorageError> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(StorageError::Metadata {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        std::fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(path.to_path_buf())
            } else {
                StorageError::ReadFile {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })
    }

    /// Last modification time of `path`.
    pub fn modified(&self, path: &Path) -> Result<SystemTime, StorageError> {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| StorageError::Metadata {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Lists the `.pdf` files directly inside the catalog directory.
    pub fn list_documents(&self) -> Result<Vec<PathBuf>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StorageError::Metadata {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;

            let is_pdf = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(PDF_EXTENSION))
                .unwrap_or(false);
            let hidden = entry.file_name().to_string_lossy().starts_with('.');

            if entry.file_type().is_file() && is_pdf && !hidden {
                documents.push(entry.into_path());
            }
        }
        Ok(documents)
    }
}
