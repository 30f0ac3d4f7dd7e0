//! Configured constants of the paging subsystem and the per-instance
//! [`PagingConfig`] that overrides the pool sizes.

use kernel_addresses::{PhysicalPage, VirtualPage};

/// Number of slots in the backing store.
pub const BACKING_SLOT_COUNT: usize = 16;

/// Slots below this index form the restricted range user mappings may name.
pub const USER_SLOT_LIMIT: usize = 8;

/// Largest page count one backing-store slot can cover.
pub const MAX_SLOT_PAGES: u32 = 256;

/// Default size of the managed physical frame pool.
pub const DEFAULT_FRAME_COUNT: usize = 1024;

/// Physical page number of the first managed frame; frame `i` occupies
/// physical page `FRAME_POOL_BASE + i`.
pub const FRAME_POOL_BASE: PhysicalPage = PhysicalPage::new(1024);

/// First virtual page of the per-process heap window. Doubles as the base
/// page written into a freed slot's sentinel state.
pub const HEAP_BASE_PAGE: VirtualPage = VirtualPage::new(4096);

/// Capacity of the process table.
pub const MAX_PROCESSES: usize = 32;

/// Capacity of the modeled translation cache.
pub const TLB_ENTRIES: usize = 16;

/// Pool sizes for one pager instance.
///
/// The defaults mirror the constants above; tests shrink the frame pool to
/// force eviction early.
#[derive(Debug, Clone, Copy)]
pub struct PagingConfig {
    /// Managed physical frames.
    pub frame_count: usize,
    /// Backing-store slots.
    pub slot_count: usize,
    /// Slots user mappings may name (low range).
    pub user_slot_limit: usize,
    /// Process-table capacity.
    pub process_count: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            slot_count: BACKING_SLOT_COUNT,
            user_slot_limit: USER_SLOT_LIMIT,
            process_count: MAX_PROCESSES,
        }
    }
}
