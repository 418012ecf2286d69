use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ScanshelfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures of the assembler and the catalog store.
///
/// Every mutating operation returns one of these instead of panicking, and
/// leaves the catalog unchanged when it does. The exception is `Persist`
/// after files were deleted: the entries are dropped from memory anyway.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No included pages to assemble")]
    EmptyInput,

    #[error("Failed to write document '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog entry not found: {0}")]
    NotFound(Uuid),

    #[error("Destination already exists: {0}")]
    FileConflict(PathBuf),

    #[error("Invalid document name: '{0}'")]
    InvalidName(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to persist catalog: {0}")]
    Persist(#[from] crate::db::DatabaseError),

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to process image: {0}")]
    Image(String),

    #[error("Failed to compose PDF: {0}")]
    Compose(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of '{path}': {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

impl StorageError {
    /// The path that triggered the failure (the destination for two-path operations).
    pub fn path(&self) -> &std::path::Path {
        match self {
            StorageError::CreateDirectory { path, .. }
            | StorageError::WriteFile { path, .. }
            | StorageError::ReadFile { path, .. }
            | StorageError::RemoveFile { path, .. }
            | StorageError::Metadata { path, .. } => path,
            StorageError::MoveFile { to, .. } | StorageError::CopyFile { to, .. } => to,
            StorageError::NotFound(path) | StorageError::FileExists(path) => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanshelfError>;
