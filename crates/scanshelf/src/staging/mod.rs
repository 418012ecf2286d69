//! Page staging buffer.
//!
//! Captured images first land in a selection. Promoting the selection turns
//! each image into a [`StagedPage`] that the user can include or exclude
//! before assembly. Order is always the order images were added in.

pub mod image;

use serde::Serialize;
use uuid::Uuid;

pub use self::image::PageImage;

#[derive(Debug, Clone)]
pub struct StagedPage {
    pub id: Uuid,
    pub image: PageImage,
    pub included: bool,
}

impl StagedPage {
    fn new(image: PageImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            included: true,
        }
    }
}

/// Lightweight view of the buffer for observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingSnapshot {
    pub selected: usize,
    pub pages: Vec<StagedPageSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedPageSummary {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub included: bool,
}

#[derive(Debug, Default)]
pub struct StagingBuffer {
    selection: Vec<PageImage>,
    pages: Vec<StagedPage>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues images picked or captured but not yet shown for review.
    pub fn select_images<I>(&mut self, images: I)
    where
        I: IntoIterator<Item = PageImage>,
    {
        self.selection.extend(images);
    }

    /// Moves the whole selection into the staged pages. Returns the number
    /// of pages added.
    pub fn promote_selection(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selection);
        self.add(selected).len()
    }

    pub fn discard_selection(&mut self) {
        self.selection.clear();
    }

    /// Appends each image as an included page. No deduplication.
    pub fn add<I>(&mut self, images: I) -> Vec<Uuid>
    where
        I: IntoIterator<Item = PageImage>,
    {
        let start = self.pages.len();
        self.pages.extend(images.into_iter().map(StagedPage::new));
        self.pages[start..].iter().map(|p| p.id).collect()
    }

    /// Flips `included` for `id`. Unknown ids are ignored; returns the new
    /// flag when the page exists.
    pub fn toggle_include(&mut self, id: Uuid) -> Option<bool> {
        let page = self.pages.iter_mut().find(|p| p.id == id)?;
        page.included = !page.included;
        Some(page.included)
    }

    pub fn included_pages(&self) -> Vec<&StagedPage> {
        self.pages.iter().filter(|p| p.included).collect()
    }

    pub fn included_images(&self) -> Vec<PageImage> {
        self.pages
            .iter()
            .filter(|p| p.included)
            .map(|p| p.image.clone())
            .collect()
    }

    pub fn pages(&self) -> &[StagedPage] {
        &self.pages
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.selection.is_empty()
    }

    /// Empties both the selection and the staged pages.
    pub fn clear(&mut self) {
        self.selection.clear();
        self.pages.clear();
    }

    pub fn snapshot(&self) -> StagingSnapshot {
        StagingSnapshot {
            selected: self.selection.len(),
            pages: self
                .pages
                .iter()
                .map(|p| StagedPageSummary {
                    id: p.id,
                    width: p.image.width(),
                    height: p.image.height(),
                    included: p.included,
                })
                .collect(),
        }
    }
}
