//! # Backing-Store Map
//!
//! Tracks which fixed-size backing-store slots are free or assigned, to
//! which process, and covering which contiguous virtual page range. The map
//! is the authority the fault handler and the eviction path consult to find
//! where a page's saved contents live.
//!
//! A freed slot carries the sentinel state: no owner, base page
//! [`HEAP_BASE_PAGE`](crate::config::HEAP_BASE_PAGE), zero pages. A slot
//! flagged `heap_reserved` is permanently bound to one process's private
//! heap window and is off limits to every other process.

use crate::config::{HEAP_BASE_PAGE, MAX_SLOT_PAGES};
use crate::error::PagingError;
use crate::process::{Pid, Process};
use alloc::vec::Vec;
use core::fmt;
use kernel_addresses::{VirtualAddress, VirtualPage};
use kernel_sync::CriticalSection;
use log::trace;

/// Bounds-checked handle for one backing-store slot.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SlotId(u16);

impl SlotId {
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        debug_assert!(index <= u16::MAX as usize);
        Self(index as u16)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bs{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    Mapped,
}

/// One backing-store slot record.
pub struct BackingSlot {
    status: SlotStatus,
    owner: Option<Pid>,
    base: VirtualPage,
    pages: u32,
    heap_reserved: bool,
    /// Reserved for per-slot serialization of the slot's block I/O; the
    /// global critical section currently dominates it.
    serial: CriticalSection<()>,
}

impl BackingSlot {
    const fn free() -> Self {
        Self {
            status: SlotStatus::Free,
            owner: None,
            base: HEAP_BASE_PAGE,
            pages: 0,
            heap_reserved: false,
            serial: CriticalSection::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn status(&self) -> SlotStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub const fn owner(&self) -> Option<Pid> {
        self.owner
    }

    /// First virtual page of the covered range.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualPage {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn pages(&self) -> u32 {
        self.pages
    }

    #[inline]
    #[must_use]
    pub const fn heap_reserved(&self) -> bool {
        self.heap_reserved
    }

    pub(crate) const fn serial(&self) -> &CriticalSection<()> {
        &self.serial
    }
}

/// The slot arena.
pub struct BackingStoreMap {
    slots: Vec<BackingSlot>,
}

impl BackingStoreMap {
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, BackingSlot::free);
        Self { slots }
    }

    /// Reset every slot to the free sentinel.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = BackingSlot::free();
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&BackingSlot> {
        self.slots.get(id.as_usize())
    }

    /// First-fit scan for a free slot.
    pub fn allocate_slot(&mut self) -> Result<SlotId, PagingError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.status == SlotStatus::Free)
            .ok_or(PagingError::ResourceExhausted)?;
        Ok(SlotId::new(index))
    }

    /// Reset one slot to the free sentinel.
    pub fn release_slot(&mut self, id: SlotId) -> Result<(), PagingError> {
        let slot = self
            .slots
            .get_mut(id.as_usize())
            .ok_or(PagingError::InvalidArgument)?;
        *slot = BackingSlot::free();
        Ok(())
    }

    /// Find the slot backing `va` for `pid` and the page offset within it.
    ///
    /// Scans for the *first* mapped slot owned by the process — at most one
    /// slot per process matters at lookup time; concurrent multi-slot
    /// mappings are not supported. The offset is the distance from the
    /// slot's base page; callers only fault on addresses inside the
    /// registered range.
    pub fn lookup(&self, pid: Pid, va: VirtualAddress) -> Result<(SlotId, u32), PagingError> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.status == SlotStatus::Mapped && slot.owner == Some(pid) {
                let offset = va.page().number().wrapping_sub(slot.base.number());
                return Ok((SlotId::new(index), offset));
            }
        }
        Err(PagingError::NotFound)
    }

    /// Bind a slot to `pid` over `pages` pages starting at `base`, and
    /// record the assignment in the process record.
    ///
    /// Rejected only when the slot is heap-reserved for a *different*
    /// process or the page count exceeds the slot capacity. A zero page
    /// count is accepted here; the syscall layer requires at least one.
    pub fn map(
        &mut self,
        pid: Pid,
        record: &mut Process,
        base: VirtualPage,
        id: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        let slot = self
            .slots
            .get_mut(id.as_usize())
            .ok_or(PagingError::InvalidArgument)?;
        if slot.heap_reserved && slot.owner != Some(pid) {
            return Err(PagingError::InvalidArgument);
        }
        if pages > MAX_SLOT_PAGES {
            return Err(PagingError::InvalidArgument);
        }
        slot.status = SlotStatus::Mapped;
        slot.owner = Some(pid);
        slot.base = base;
        slot.pages = pages;
        record.assign_backing(id, pages);
        trace!("{pid} mapped {base}..+{pages} onto {id}");
        Ok(())
    }

    /// Bind a slot as `pid`'s private heap window: like [`Self::map`] with
    /// the heap base, plus the permanent reservation flag. Used by the
    /// process-creation path that gives a process a virtual heap.
    pub fn map_heap(
        &mut self,
        pid: Pid,
        record: &mut Process,
        id: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        if pages == 0 {
            return Err(PagingError::InvalidArgument);
        }
        self.map(pid, record, HEAP_BASE_PAGE, id, pages)?;
        self.slots[id.as_usize()].heap_reserved = true;
        Ok(())
    }

    /// Resolve the slot backing `page` for `pid` and free it.
    ///
    /// Returns [`PagingError::NotFound`] when the process has no mapped
    /// slot; the syscall layer historically reports success regardless.
    pub fn unmap(&mut self, pid: Pid, page: VirtualPage) -> Result<(), PagingError> {
        let (id, _) = self.lookup(pid, page.base())?;
        self.slots[id.as_usize()] = BackingSlot::free();
        trace!("{pid} unmapped {id}");
        Ok(())
    }

    /// Claim a free slot for `pid`, or report an existing claim.
    ///
    /// A free slot becomes `Mapped` with `pid` as owner — its page count
    /// stays whatever it was (zero until a mapping sets it) — and the
    /// *requested* count is granted. A slot already mapped grants its
    /// recorded count instead, making a re-request idempotent rather than
    /// honoring the new size.
    pub fn reserve(&mut self, id: SlotId, pid: Pid, pages: u32) -> Result<u32, PagingError> {
        let slot = self
            .slots
            .get_mut(id.as_usize())
            .ok_or(PagingError::InvalidArgument)?;
        match slot.status {
            SlotStatus::Free => {
                slot.status = SlotStatus::Mapped;
                slot.owner = Some(pid);
                Ok(pages)
            }
            SlotStatus::Mapped => Ok(slot.pages),
        }
    }
}
