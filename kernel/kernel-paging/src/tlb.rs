//! Modeled translation cache.
//!
//! A small (pid, virtual page) → physical page cache standing in for the
//! hardware TLB: releasing a resident page invalidates its single entry
//! when the victim belongs to the running process, and completing a fault
//! flushes the cache wholesale (the analogue of reloading the translation
//! root).

use crate::process::Pid;
use alloc::vec::Vec;
use kernel_addresses::{PhysicalPage, VirtualPage};

struct TlbEntry {
    pid: Pid,
    page: VirtualPage,
    frame: PhysicalPage,
}

pub struct Tlb {
    capacity: usize,
    entries: Vec<TlbEntry>,
}

impl Tlb {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn lookup(&self, pid: Pid, page: VirtualPage) -> Option<PhysicalPage> {
        self.entries
            .iter()
            .find(|e| e.pid == pid && e.page == page)
            .map(|e| e.frame)
    }

    /// Cache a completed walk; the oldest entry leaves at capacity.
    pub fn insert(&mut self, pid: Pid, page: VirtualPage, frame: PhysicalPage) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.pid == pid && e.page == page)
        {
            existing.frame = frame;
            return;
        }
        if self.entries.len() == self.capacity && !self.entries.is_empty() {
            self.entries.remove(0);
        }
        self.entries.push(TlbEntry { pid, page, frame });
    }

    /// Drop the single entry for one page of one process.
    pub fn invalidate(&mut self, pid: Pid, page: VirtualPage) {
        self.entries.retain(|e| e.pid != pid || e.page != page);
    }

    /// Drop everything.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
