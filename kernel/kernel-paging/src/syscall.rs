//! # Syscall Surface
//!
//! The user-facing entry points of the paging subsystem. Every call
//! validates its arguments, then runs the whole operation — argument
//! checks, table mutations, block I/O — inside the subsystem's single
//! critical section, releasing it on every exit path.
//!
//! Protection policy: touching another process's heap-reserved slot
//! terminates the requester on the spot. The call reports
//! [`PagingError::ProcessTerminated`] instead of returning normally; a
//! protection-violation status is never handed back for the caller to
//! ignore.

use crate::backing_store::SlotId;
use crate::block_io::BackingStoreIo;
use crate::config::{MAX_SLOT_PAGES, PagingConfig};
use crate::error::PagingError;
use crate::process::{Pid, ProcessState};
use crate::vm::{DemandPager, ReplacementPolicy};
use kernel_sync::CriticalSection;
use kernel_addresses::{PhysicalAddress, VirtualAddress, VirtualPage};
use log::{trace, warn};

/// The syscall-level paging interface: one pager core behind one
/// critical section.
pub struct PagingSystem<S> {
    core: CriticalSection<DemandPager<S>>,
}

impl<S: BackingStoreIo + Send> PagingSystem<S> {
    #[must_use]
    pub fn new(config: PagingConfig, store: S) -> Self {
        Self {
            core: CriticalSection::new(DemandPager::new(config, store)),
        }
    }

    // --- initialization and collaborator hooks ---------------------------

    /// Reset the backing-store map to all-free.
    pub fn init_backing_store(&self) {
        self.core.with(DemandPager::init_backing_store);
    }

    /// Reset the frame table and empty the clock ring.
    pub fn init_frame_table(&self) {
        self.core.with(DemandPager::init_frame_table);
    }

    /// Bring a process under paging management.
    pub fn attach_process(&self, pid: Pid) -> Result<(), PagingError> {
        self.core.with(|core| core.attach_process(pid))
    }

    /// Scheduler hook: the process whose address space is active.
    pub fn set_current(&self, pid: Pid) {
        self.core.with(|core| core.set_current(pid));
    }

    /// Process-creation hook: permanently reserve `slot` as `pid`'s heap.
    pub fn reserve_heap_slot(
        &self,
        pid: Pid,
        slot: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        self.core.with(|core| core.reserve_heap_slot(pid, slot, pages))
    }

    // --- the mapping API --------------------------------------------------

    /// Request `pages` pages of backing storage in `slot`.
    ///
    /// Grants the requested count on a free slot; a slot already mapped
    /// grants its recorded count instead (idempotent re-request). A slot
    /// heap-reserved for a different process terminates the requester.
    pub fn request_store(&self, slot: SlotId, pages: u32) -> Result<u32, PagingError> {
        self.core.with(|core| {
            let pid = core.current();
            let record = core
                .backing()
                .get(slot)
                .ok_or(PagingError::InvalidArgument)?;
            if record.heap_reserved() && record.owner() != Some(pid) {
                warn!("{slot} is another process's heap; terminating {pid}");
                return Err(terminate(core, pid));
            }
            if pages == 0 || pages > MAX_SLOT_PAGES {
                return Err(PagingError::InvalidArgument);
            }
            core.backing_reserve(slot, pid, pages)
        })
    }

    /// Map `pages` pages starting at `page` onto backing slot `slot` for
    /// the running process.
    ///
    /// The slot must lie in the restricted low range user mappings may
    /// name; the page count must be `1..=256`. Touching another process's
    /// heap-reserved slot terminates the requester.
    pub fn map_region(
        &self,
        page: VirtualPage,
        slot: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        self.core.with(|core| {
            let pid = core.current();
            let record = core
                .backing()
                .get(slot)
                .ok_or(PagingError::InvalidArgument)?;
            if record.heap_reserved() && record.owner() != Some(pid) {
                warn!("{slot} is another process's heap; terminating {pid}");
                return Err(terminate(core, pid));
            }
            if slot.as_usize() >= core.user_slot_limit() {
                return Err(PagingError::InvalidArgument);
            }
            if pages == 0 || pages > MAX_SLOT_PAGES {
                return Err(PagingError::InvalidArgument);
            }
            core.map_backing(pid, page, slot, pages)
        })
    }

    /// Unbind the running process's backing slot for `page`.
    ///
    /// Reports success even when nothing was mapped — the lookup miss is
    /// swallowed here, a long-standing gap kept for compatibility.
    pub fn unmap_region(&self, page: VirtualPage) -> Result<(), PagingError> {
        self.core.with(|core| {
            let pid = core.current();
            if let Err(miss) = core.unmap_backing(pid, page) {
                trace!("unmap by {pid} at {page} ignored: {miss}");
            }
            Ok(())
        })
    }

    /// Select the page-replacement policy.
    pub fn set_policy(&self, policy: ReplacementPolicy) {
        self.core.with(|core| core.set_policy(policy));
    }

    #[must_use]
    pub fn get_policy(&self) -> ReplacementPolicy {
        self.core.with(|core| core.policy())
    }

    // --- fault entry and queries -----------------------------------------

    /// Trap-dispatch entry: service a page fault of the running process.
    pub fn page_fault(&self, va: VirtualAddress) -> Result<(), PagingError> {
        self.core.with(|core| core.handle_fault(va))
    }

    /// Translate an address in the running process's space.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.core.with(|core| core.translate(va))
    }

    #[must_use]
    pub fn process_state(&self, pid: Pid) -> ProcessState {
        self.core.with(|core| core.processes().state(pid))
    }

    /// Diagnostic access to the pager core under the critical section.
    pub fn inspect<R>(&self, f: impl FnOnce(&DemandPager<S>) -> R) -> R {
        self.core.with(|core| f(core))
    }
}

/// Terminate `pid` and produce the status the interrupted call reports.
fn terminate<S: BackingStoreIo>(core: &mut DemandPager<S>, pid: Pid) -> PagingError {
    core.terminate_process(pid);
    PagingError::ProcessTerminated
}
