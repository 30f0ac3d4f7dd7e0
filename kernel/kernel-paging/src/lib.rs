//! # Demand Paging
//!
//! The demand-paging virtual-memory subsystem of the kernel: virtual pages
//! are backed by slots in a fixed-size backing store, loaded lazily on first
//! access, and reclaimed under memory pressure by a clock (second-chance)
//! replacement sweep.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Backing-store map | [`backing_store`] | Which store slots are free/assigned, to whom, covering which pages. |
//! | Frame table + clock ring | [`frame_table`], [`ring`] | Physical frame ownership and the eviction order. |
//! | Translation structures | [`entry_bits`], [`page_table`] | The two-level hardware layout and typed accessors over it. |
//! | Physical memory | [`phys`] | The managed frame arena; the only place frame words are reinterpreted as table entries. |
//! | Fault handler + pager core | [`vm`] | Walks/builds translations, allocates and evicts frames, loads pages. |
//! | Syscall surface | [`syscall`] | Validated user-facing entry points under one critical section. |
//!
//! ## Virtual Address Layout
//!
//! A 32-bit virtual address is translated through two 1024-entry levels:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! The page *directory* lives in the owning process's record; page *tables*
//! occupy managed frames of kind `TablePage` and are created on demand by
//! the fault handler. Data pages occupy `DataPage` frames and are the only
//! eviction candidates.
//!
//! ## Concurrency
//!
//! One system-wide critical section ([`kernel_sync::CriticalSection`])
//! wraps every table-mutating operation for its entire duration, block I/O
//! included; the shared tables are never observable half-updated.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod backing_store;
pub mod block_io;
pub mod config;
mod entry_bits;
mod error;
pub mod frame_table;
pub mod page_table;
pub mod phys;
pub mod process;
pub mod ring;
pub mod syscall;
mod tlb;
pub mod vm;

pub use crate::backing_store::{BackingStoreMap, SlotId};
pub use crate::block_io::{BackingStoreIo, MemoryBackingStore};
pub use crate::config::PagingConfig;
pub use crate::entry_bits::PageEntryBits;
pub use crate::error::PagingError;
pub use crate::frame_table::{FrameId, FrameKind, FrameStatus, FrameTable};
pub use crate::process::{Pid, ProcessState};
pub use crate::syscall::PagingSystem;
pub use crate::vm::{DemandPager, ReplacementPolicy};
