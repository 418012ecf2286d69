use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted metadata for one produced PDF.
///
/// `id`, `created_at` and `page_count` never change after creation. `name`
/// and `location` change together on rename; `byte_size` follows the file.
/// The thumbnail is a PNG of page 1 kept inline so the catalog can be shown
/// without touching the PDFs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    page_count: u32,
    byte_size: u64,
    #[serde(with = "base64_bytes")]
    thumbnail: Vec<u8>,
    location: PathBuf,
}

impl CatalogEntry {
    /// Creates an entry with a fresh id.
    pub fn new(
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        page_count: u32,
        byte_size: u64,
        thumbnail: Vec<u8>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at,
            page_count: page_count.max(1),
            byte_size,
            thumbnail,
            location: location.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// PNG bytes of the page-1 preview.
    pub fn thumbnail(&self) -> &[u8] {
        &self.thumbnail
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub(crate) fn relocate(&mut self, name: String, location: PathBuf, byte_size: u64) {
        self.name = name;
        self.location = location;
        self.byte_size = byte_size;
    }

    pub(crate) fn set_byte_size(&mut self, byte_size: u64) {
        self.byte_size = byte_size;
    }

    /// A new entry for a byte-identical copy at `location`.
    pub(crate) fn duplicate_at(&self, name: String, location: PathBuf, byte_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            page_count: self.page_count,
            byte_size,
            thumbnail: self.thumbnail.clone(),
            location,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
