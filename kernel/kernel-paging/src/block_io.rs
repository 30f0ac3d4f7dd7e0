//! Backing-store block I/O primitives.
//!
//! The physical driver below the backing store is an external collaborator;
//! the pager only needs two operations that move exactly one page between a
//! frame and a slot at a page-granular offset. Both are modeled as
//! synchronous, blocking-to-completion calls that always succeed — I/O
//! failure handling is an acknowledged gap, not part of this subsystem.

use crate::backing_store::SlotId;
use crate::config::MAX_SLOT_PAGES;
use crate::phys::PageFrame;
use alloc::vec;
use alloc::vec::Vec;
use log::warn;

/// The one-page transfer primitives the pager is built on.
pub trait BackingStoreIo {
    /// Copy the page at `(slot, page_index)` into `dest`.
    fn read_page(&mut self, dest: &mut PageFrame, slot: SlotId, page_index: u32);

    /// Copy `src` into the page at `(slot, page_index)`.
    fn write_page(&mut self, src: &PageFrame, slot: SlotId, page_index: u32);
}

/// An in-memory backing store: `slot_count` slots of
/// [`MAX_SLOT_PAGES`] pages each.
pub struct MemoryBackingStore {
    pages: Vec<Vec<PageFrame>>,
}

impl MemoryBackingStore {
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        let mut pages = Vec::with_capacity(slot_count);
        pages.resize_with(slot_count, || {
            vec![PageFrame::zeroed(); MAX_SLOT_PAGES as usize]
        });
        Self { pages }
    }

    /// Stored page contents, e.g. to seed a slot before it is mapped.
    #[must_use]
    pub fn page(&self, slot: SlotId, page_index: u32) -> Option<&PageFrame> {
        self.pages.get(slot.as_usize())?.get(page_index as usize)
    }

    pub fn page_mut(&mut self, slot: SlotId, page_index: u32) -> Option<&mut PageFrame> {
        self.pages
            .get_mut(slot.as_usize())?
            .get_mut(page_index as usize)
    }
}

impl BackingStoreIo for MemoryBackingStore {
    fn read_page(&mut self, dest: &mut PageFrame, slot: SlotId, page_index: u32) {
        match self.page(slot, page_index) {
            Some(page) => dest.copy_from(page),
            None => warn!("read of {slot} page {page_index} outside the store"),
        }
    }

    fn write_page(&mut self, src: &PageFrame, slot: SlotId, page_index: u32) {
        match self.page_mut(slot, page_index) {
            Some(page) => page.copy_from(src),
            None => warn!("write of {slot} page {page_index} outside the store"),
        }
    }
}
