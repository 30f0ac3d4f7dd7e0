//! # Process Virtual-Memory Records
//!
//! The per-process fields the pager reads and writes. Process lifecycle is
//! owned elsewhere; this table models the externally owned records so the
//! core has somewhere to read the translation root from and to write the
//! mapping side effects to. [`ProcessTable::terminate`] stands in for the
//! external kill primitive and marks the record so the effect of a
//! protection violation is observable.

use crate::backing_store::SlotId;
use crate::config::HEAP_BASE_PAGE;
use crate::page_table::PageDirectory;
use alloc::vec::Vec;
use core::fmt;
use kernel_addresses::VirtualPage;
use log::warn;

/// Process identifier; indexes the process table.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Pid(u32);

impl Pid {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Active,
    Terminated,
}

/// The virtual-memory context inside one process record.
pub struct Process {
    state: ProcessState,
    directory: Option<PageDirectory>,
    backing_slot: Option<SlotId>,
    heap_base: VirtualPage,
    heap_pages: u32,
}

impl Process {
    const fn unused() -> Self {
        Self {
            state: ProcessState::Unused,
            directory: None,
            backing_slot: None,
            heap_base: HEAP_BASE_PAGE,
            heap_pages: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ProcessState {
        self.state
    }

    /// The translation root, present once the process is attached.
    #[inline]
    #[must_use]
    pub fn directory(&self) -> Option<&PageDirectory> {
        self.directory.as_ref()
    }

    #[inline]
    pub fn directory_mut(&mut self) -> Option<&mut PageDirectory> {
        self.directory.as_mut()
    }

    /// Backing-store slot assigned by the last successful mapping.
    #[inline]
    #[must_use]
    pub const fn backing_slot(&self) -> Option<SlotId> {
        self.backing_slot
    }

    #[inline]
    #[must_use]
    pub const fn heap_base(&self) -> VirtualPage {
        self.heap_base
    }

    #[inline]
    #[must_use]
    pub const fn heap_pages(&self) -> u32 {
        self.heap_pages
    }

    /// Record the side effects of a successful mapping request.
    pub(crate) fn assign_backing(&mut self, slot: SlotId, pages: u32) {
        self.backing_slot = Some(slot);
        self.heap_base = HEAP_BASE_PAGE;
        self.heap_pages = pages;
    }
}

/// The process-record arena, indexed by [`Pid`].
pub struct ProcessTable {
    records: Vec<Process>,
}

impl ProcessTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut records = Vec::with_capacity(capacity);
        records.resize_with(capacity, Process::unused);
        Self { records }
    }

    /// Bring a process under paging management: a fresh zeroed page
    /// directory becomes its translation root.
    pub fn attach(&mut self, pid: Pid) -> Result<(), crate::PagingError> {
        let record = self
            .records
            .get_mut(pid.as_usize())
            .ok_or(crate::PagingError::InvalidArgument)?;
        if record.state == ProcessState::Active {
            return Err(crate::PagingError::InvalidArgument);
        }
        *record = Process::unused();
        record.state = ProcessState::Active;
        record.directory = Some(PageDirectory::zeroed());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.records.get(pid.as_usize())
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.records.get_mut(pid.as_usize())
    }

    #[must_use]
    pub fn state(&self, pid: Pid) -> ProcessState {
        self.records
            .get(pid.as_usize())
            .map_or(ProcessState::Unused, |p| p.state)
    }

    /// The kill primitive. Marks the record; the actual teardown (frames,
    /// slots, scheduler state) belongs to the process manager.
    pub fn terminate(&mut self, pid: Pid) {
        warn!("terminating {pid}");
        if let Some(record) = self.records.get_mut(pid.as_usize()) {
            record.state = ProcessState::Terminated;
        }
    }
}
