use bitfield_struct::bitfield;
use kernel_addresses::PhysicalPage;

/// One 32-bit translation entry in its raw bitfield form.
///
/// Both levels of the two-level layout share this shape: a page-directory
/// entry points at the page table stored in a frame, a page-table entry maps
/// one 4 KiB data page. The [`bitfield_struct`](https://docs.rs/bitfield-struct/)
/// derive provides masked read/write access to the individual bits.
///
/// ### Bit layout
///
/// | Bits  | Name | Meaning |
/// |-------|------|---------|
/// | 0     | `P`  | Entry is valid; clear faults on access (demand paging). |
/// | 1     | `RW` | Writable if set. |
/// | 2     | `US` | User-mode accessible if set. |
/// | 3     | `PWT`| Write-through caching. |
/// | 4     | `PCD`| Disable caching. |
/// | 5     | `A`  | Accessed — set by the walk, cleared by the clock sweep. |
/// | 6     | `D`  | Dirty — set on first write (leaf only). |
/// | 7     | `PS` | Page size; always 0 in this two-level layout. |
/// | 8     | `G`  | Global translation (leaf only). |
/// | 9‒11  | —    | Available to the OS. |
/// | 12‒31 | base | Physical page number of the table or data page. |
#[bitfield(u32)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set on a translation walk; the second-chance
    /// sweep clears it to grant one more round of residency.
    pub accessed: bool,

    /// Dirty (D, bit 6). Latched into the frame record when the page is
    /// written back.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Must stay clear here.
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global_translation: bool,

    /// OS-available bits 9..=11.
    #[bits(3)]
    pub os_available: u8,

    /// Physical page number, bits 12..=31.
    #[bits(20)]
    page_number: u32,
}

impl PageEntryBits {
    /// The physical page this entry references.
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage {
        PhysicalPage::new(self.page_number())
    }

    /// Replace the referenced physical page.
    #[inline]
    #[must_use]
    pub const fn with_physical_page(self, page: PhysicalPage) -> Self {
        self.with_page_number(page.number())
    }
}
