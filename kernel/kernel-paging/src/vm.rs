//! # Pager Core
//!
//! [`DemandPager`] owns the managed arenas — physical memory, frame table,
//! backing-store map, process records, the modeled TLB — and implements the
//! operations that cut across them: frame allocation with clock eviction,
//! page release with write-back, the page-fault handler, and the
//! translation query.
//!
//! All methods take `&mut self`; the syscall layer wraps one instance in a
//! critical section so every operation runs to completion unobserved.

use crate::backing_store::{BackingStoreMap, SlotId};
use crate::block_io::BackingStoreIo;
use crate::config::{PagingConfig, TLB_ENTRIES};
use crate::error::PagingError;
use crate::frame_table::{FrameId, FrameKind, FrameStatus, FrameTable};
use crate::page_table::{
    DirectoryIndex, PageDirectoryEntry, PageTableEntry, TableIndex, split_indices,
};
use crate::phys::{PageFrame, PhysicalMemory};
use crate::process::{Pid, ProcessState, ProcessTable};
use crate::tlb::Tlb;
use kernel_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};
use log::{debug, trace, warn};

/// Page-replacement policy selector.
///
/// Second-chance is the only implemented policy; selecting it additionally
/// enables the replacement diagnostics the sweep logs per eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Clock sweep over the resident ring, granting one second chance per
    /// set accessed bit.
    #[default]
    SecondChance,
}

/// The demand-paging core.
pub struct DemandPager<S> {
    phys: PhysicalMemory,
    frames: FrameTable,
    store_map: BackingStoreMap,
    store: S,
    processes: ProcessTable,
    tlb: Tlb,
    policy: ReplacementPolicy,
    policy_trace: bool,
    current: Pid,
    user_slot_limit: usize,
}

impl<S: BackingStoreIo> DemandPager<S> {
    #[must_use]
    pub fn new(config: PagingConfig, store: S) -> Self {
        Self {
            phys: PhysicalMemory::new(config.frame_count),
            frames: FrameTable::new(config.frame_count),
            store_map: BackingStoreMap::new(config.slot_count),
            store,
            processes: ProcessTable::new(config.process_count),
            tlb: Tlb::new(TLB_ENTRIES),
            policy: ReplacementPolicy::default(),
            policy_trace: false,
            current: Pid::new(0),
            user_slot_limit: config.user_slot_limit,
        }
    }

    // --- collaborator surface -------------------------------------------

    /// The process whose address space is active.
    #[must_use]
    pub const fn current(&self) -> Pid {
        self.current
    }

    /// Called by the scheduler on a context switch.
    pub const fn set_current(&mut self, pid: Pid) {
        self.current = pid;
    }

    /// Bring a process under paging management (fresh translation root).
    pub fn attach_process(&mut self, pid: Pid) -> Result<(), PagingError> {
        self.processes.attach(pid)
    }

    /// Bind a slot as `pid`'s permanently reserved heap window; used by the
    /// process-creation path that grants a virtual heap.
    pub fn reserve_heap_slot(
        &mut self,
        pid: Pid,
        slot: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        let record = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::InvalidArgument)?;
        self.store_map.map_heap(pid, record, slot, pages)
    }

    /// Reset the backing-store map to all-free.
    pub fn init_backing_store(&mut self) {
        self.store_map.reset();
    }

    /// Reset the frame table: every frame free, the ring empty.
    pub fn init_frame_table(&mut self) {
        self.frames.reset();
    }

    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.policy = policy;
        // selecting the policy switches replacement diagnostics on
        self.policy_trace = true;
        debug!("replacement policy {policy:?}, diagnostics enabled");
    }

    #[must_use]
    pub const fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    // --- views -----------------------------------------------------------

    #[must_use]
    pub const fn frames(&self) -> &FrameTable {
        &self.frames
    }

    #[must_use]
    pub const fn backing(&self) -> &BackingStoreMap {
        &self.store_map
    }

    #[must_use]
    pub const fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Physical contents of a managed frame.
    #[must_use]
    pub fn frame_contents(&self, id: FrameId) -> Option<&PageFrame> {
        (id.as_usize() < self.phys.frame_count()).then(|| self.phys.frame(id))
    }

    pub fn frame_contents_mut(&mut self, id: FrameId) -> Option<&mut PageFrame> {
        (id.as_usize() < self.phys.frame_count()).then(|| self.phys.frame_mut(id))
    }

    // --- backing-store delegation ---------------------------------------

    /// Bind a backing slot to a virtual range of `pid`.
    pub fn map_backing(
        &mut self,
        pid: Pid,
        base: VirtualPage,
        slot: SlotId,
        pages: u32,
    ) -> Result<(), PagingError> {
        let record = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::InvalidArgument)?;
        self.store_map.map(pid, record, base, slot, pages)
    }

    /// Release the slot backing `page` for `pid`.
    pub fn unmap_backing(&mut self, pid: Pid, page: VirtualPage) -> Result<(), PagingError> {
        self.store_map.unmap(pid, page)
    }

    /// Claim a free slot for `pid`, or report an existing claim.
    pub fn backing_reserve(
        &mut self,
        slot: SlotId,
        pid: Pid,
        pages: u32,
    ) -> Result<u32, PagingError> {
        self.store_map.reserve(slot, pid, pages)
    }

    /// Slots below this index form the user-mappable range.
    #[must_use]
    pub const fn user_slot_limit(&self) -> usize {
        self.user_slot_limit
    }

    /// The termination primitive, invoked on protection violations.
    pub fn terminate_process(&mut self, pid: Pid) {
        self.processes.terminate(pid);
    }

    // --- translation -----------------------------------------------------

    /// Model one CPU access: TLB hit, or a walk that latches the accessed
    /// bit and fills the cache. `None` when no present translation exists.
    pub fn translate(&mut self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let pid = self.current;
        let (page, offset) = va.split();
        if let Some(frame_page) = self.tlb.lookup(pid, page) {
            return Some(frame_page.join(offset));
        }
        let (table, index, entry) = self.data_page_entry(pid, page)?;
        self.phys
            .set_table_entry(table, index, entry.with_accessed(true));
        let frame_page = entry.page();
        self.tlb.insert(pid, page, frame_page);
        Some(frame_page.join(offset))
    }

    /// Present PDE of `pid` at `index`, if any.
    fn directory_entry(&self, pid: Pid, index: DirectoryIndex) -> Option<PageDirectoryEntry> {
        let entry = self.processes.get(pid)?.directory()?.entry(index);
        entry.is_present().then_some(entry)
    }

    /// Resolve the live translation of a data page: its table page, table
    /// index, and present PTE. `None` while any level is absent.
    fn data_page_entry(
        &self,
        pid: Pid,
        page: VirtualPage,
    ) -> Option<(PhysicalPage, TableIndex, PageTableEntry)> {
        let table = self
            .directory_entry(pid, DirectoryIndex::of_page(page))?
            .table_page();
        let index = TableIndex::of_page(page);
        let entry = self.phys.table_entry(table, index)?;
        entry.is_present().then_some((table, index, entry))
    }

    // --- frame allocation and eviction ----------------------------------

    /// Hand out a frame for the given mapping: the lowest-indexed free
    /// frame, or the clock sweep's victim once the pool is exhausted. The
    /// record and ring membership are established atomically with the
    /// allocation, so the sweep never observes a half-initialized member.
    pub fn allocate_frame(
        &mut self,
        kind: FrameKind,
        owner: Pid,
        page: VirtualPage,
    ) -> Result<FrameId, PagingError> {
        if let Some(id) = self.frames.free_frame() {
            self.frames.install(id, kind, owner, page);
            trace!("allocated {id} for {owner}");
            return Ok(id);
        }
        let victim = self
            .select_victim()
            .ok_or(PagingError::ResourceExhausted)?;
        match self.release_frame(victim) {
            // a terminated owner cannot keep its frame; reuse it
            Ok(()) | Err(PagingError::ProcessTerminated) => {}
            Err(e) => return Err(e),
        }
        self.frames.install(victim, kind, owner, page);
        Ok(victim)
    }

    /// The clock sweep. Visits ring members from the persistent cursor:
    /// table pages are never candidates; a data page with a clear accessed
    /// bit is the victim (unlinked, cursor parked on its successor); a set
    /// bit is cleared for a second chance. Bounded to two laps — the first
    /// may only clear bits, the second must find a victim if any data page
    /// rides the ring — so the sweep is total even when the ring is empty,
    /// a singleton, or all table pages.
    fn select_victim(&mut self) -> Option<FrameId> {
        let members = self.frames.ring_len();
        if members == 0 {
            return None;
        }
        let mut cursor = self.frames.cursor()?;
        for _ in 0..2 * members {
            let next = self.frames.advance(cursor)?;
            let (kind, owner, page) = {
                let frame = self.frames.get(cursor)?;
                (frame.kind(), frame.owner(), frame.page())
            };
            if kind == FrameKind::DataPage {
                if let Some(pid) = owner {
                    match self.data_page_entry(pid, page) {
                        Some((_, _, entry)) if !entry.accessed() => {
                            self.frames.rotate_to(next);
                            self.frames.unlink(cursor);
                            if self.policy_trace {
                                debug!("replacing frame {cursor}");
                            }
                            return Some(cursor);
                        }
                        Some((table, index, entry)) => {
                            // second chance: clear the bit, move on
                            self.phys.set_table_entry(
                                table,
                                index,
                                entry.with_accessed(false),
                            );
                        }
                        None => {
                            trace!("sweep skipping {cursor}: translation not resolvable");
                        }
                    }
                }
            }
            cursor = next;
        }
        None
    }

    /// Evict a resident data page: persist its contents to the owner's
    /// backing slot, drop the stale TLB entry if the owner is running,
    /// clear the owning PTE, and unwind the parent table's ref count —
    /// recycling the table frame when its last child leaves.
    ///
    /// A frame whose owner has no backing slot cannot be saved anywhere;
    /// the owner is terminated and the frame reclaimed.
    pub fn release_frame(&mut self, id: FrameId) -> Result<(), PagingError> {
        let (owner, page) = {
            let frame = self.frames.get(id).ok_or(PagingError::InvalidArgument)?;
            if frame.status() != FrameStatus::Mapped || frame.kind() != FrameKind::DataPage {
                return Err(PagingError::InvalidArgument);
            }
            let owner = frame.owner().ok_or(PagingError::InvalidArgument)?;
            (owner, frame.page())
        };

        let (slot, offset) = match self.store_map.lookup(owner, page.base()) {
            Ok(found) => found,
            Err(_) => {
                warn!("no backing slot for {id} ({owner}, {page}); terminating owner");
                self.processes.terminate(owner);
                self.frames.retire(id);
                return Err(PagingError::ProcessTerminated);
            }
        };

        // persist before the frame can be handed out again
        self.store_write(id, slot, offset);

        if owner == self.current {
            self.tlb.invalidate(owner, page);
        }

        if let Some((table, index, entry)) = self.data_page_entry(owner, page) {
            self.frames.set_dirty(id, entry.dirty());
            self.phys
                .set_table_entry(table, index, entry.with_present_cleared());
            if let Some(parent) = self.phys.frame_of(table) {
                if self.frames.dec_ref(parent) == 0 {
                    self.recycle_table(owner, page, parent);
                }
            }
        }

        self.frames.retire(id);
        trace!("released {id}; contents at {slot} page {offset}");
        Ok(())
    }

    /// A table frame lost its last child entry: clear the owning directory
    /// entry and free the frame.
    fn recycle_table(&mut self, owner: Pid, page: VirtualPage, parent: FrameId) {
        let index = DirectoryIndex::of_page(page);
        if let Some(dir) = self
            .processes
            .get_mut(owner)
            .and_then(|record| record.directory_mut())
        {
            let entry = dir.entry(index);
            dir.set_entry(index, entry.with_present_cleared());
        }
        debug!("recycling page-table frame {parent} of {owner}");
        self.frames.retire(parent);
    }

    // --- fault handling --------------------------------------------------

    /// Service a page fault of the running process at `va`.
    ///
    /// Builds the missing translation levels: a fresh zeroed page table if
    /// the directory entry is absent, then a data frame loaded from the
    /// owner's backing slot. A fault on an address the process never
    /// registered is a protection violation: the process is terminated and
    /// the call does not return normally. Allocation failure is
    /// unrecoverable and reported as resource exhaustion, no retry.
    pub fn handle_fault(&mut self, va: VirtualAddress) -> Result<(), PagingError> {
        let pid = self.current;
        if self.processes.state(pid) != ProcessState::Active {
            warn!("page fault at {va} by inactive {pid}");
            self.processes.terminate(pid);
            return Err(PagingError::ProcessTerminated);
        }
        let page = va.page();
        let (dir_index, table_index, _) = split_indices(va);

        // translation already present (stale fault): refresh and return
        if self.data_page_entry(pid, page).is_some() {
            self.tlb.flush();
            return Ok(());
        }

        // fail fast before touching any table: an unregistered address is
        // a protection violation
        let (slot, offset) = match self.store_map.lookup(pid, va) {
            Ok(found) => found,
            Err(_) => {
                warn!("{pid} faulted on unbacked address {va}; terminating");
                self.processes.terminate(pid);
                return Err(PagingError::ProcessTerminated);
            }
        };

        self.ensure_table(pid, dir_index)?;
        let frame = self.allocate_frame(FrameKind::DataPage, pid, page)?;
        // the eviction above may have recycled the very table this page
        // belongs in; re-establish it before installing the entry
        let table = self.ensure_table(pid, dir_index)?;

        self.phys.set_table_entry(
            table,
            table_index,
            PageTableEntry::mapped(self.phys.page_of(frame)),
        );
        if let Some(parent) = self.phys.frame_of(table) {
            self.frames.inc_ref(parent);
        }
        self.store_read(frame, slot, offset);

        // refresh the translation root
        self.tlb.flush();
        trace!("fault at {va} serviced: {frame} from {slot} page {offset}");
        Ok(())
    }

    /// Present page table for the directory slot, creating and installing a
    /// zeroed one (present, writable, user, accessed) when absent.
    fn ensure_table(
        &mut self,
        pid: Pid,
        index: DirectoryIndex,
    ) -> Result<PhysicalPage, PagingError> {
        if let Some(entry) = self.directory_entry(pid, index) {
            return Ok(entry.table_page());
        }
        let frame = self.allocate_frame(FrameKind::TablePage, pid, VirtualPage::new(0))?;
        self.phys.zero_frame(frame);
        let table = self.phys.page_of(frame);
        let dir = self
            .processes
            .get_mut(pid)
            .and_then(|record| record.directory_mut())
            .ok_or(PagingError::InvalidArgument)?;
        dir.set_entry(index, PageDirectoryEntry::table(table));
        trace!("installed page table {frame} for {pid} (directory slot {})", index.as_usize());
        Ok(table)
    }

    // --- block I/O -------------------------------------------------------

    fn store_write(&mut self, frame: FrameId, slot: SlotId, offset: u32) {
        if let Some(record) = self.store_map.get(slot) {
            let _serial = record.serial().enter();
            self.store.write_page(self.phys.frame(frame), slot, offset);
        }
    }

    fn store_read(&mut self, frame: FrameId, slot: SlotId, offset: u32) {
        if let Some(record) = self.store_map.get(slot) {
            let _serial = record.serial().enter();
            self.store.read_page(self.phys.frame_mut(frame), slot, offset);
        }
    }
}
