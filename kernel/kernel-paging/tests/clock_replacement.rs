//! Clock (second-chance) replacement behavior over a small frame pool.

use kernel_addresses::{VirtualAddress, VirtualPage};
use kernel_paging::{
    DemandPager, FrameId, FrameKind, FrameStatus, MemoryBackingStore, PagingConfig, PagingError,
    Pid, SlotId,
};

const HEAP: u32 = 4096;

fn pager(frame_count: usize) -> DemandPager<MemoryBackingStore> {
    let config = PagingConfig {
        frame_count,
        ..PagingConfig::default()
    };
    let store = MemoryBackingStore::new(config.slot_count);
    let mut pager = DemandPager::new(config, store);
    pager.attach_process(Pid::new(1)).unwrap();
    pager.set_current(Pid::new(1));
    pager
        .map_backing(Pid::new(1), VirtualPage::new(HEAP), SlotId::new(0), 16)
        .unwrap();
    pager
}

fn addr(page: u32) -> VirtualAddress {
    VirtualPage::new(page).base()
}

#[test]
fn first_fault_builds_table_and_data_frame() {
    let mut pager = pager(4);
    pager.handle_fault(addr(HEAP)).unwrap();

    // one page-table frame and one data frame ride the ring
    assert_eq!(pager.frames().ring_len(), 2);
    let table = pager.frames().get(FrameId::new(0)).unwrap();
    assert_eq!(table.kind(), FrameKind::TablePage);
    assert_eq!(table.ref_count(), 1);
    let data = pager.frames().get(FrameId::new(1)).unwrap();
    assert_eq!(data.kind(), FrameKind::DataPage);
    assert_eq!(data.page(), VirtualPage::new(HEAP));
}

#[test]
fn pool_exhaustion_triggers_eviction() {
    let mut pager = pager(4);
    for n in 0..3 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }
    assert_eq!(pager.frames().ring_len(), 4);
    assert!(pager.frames().free_frame().is_none());

    // the fourth distinct data page must evict; no page was touched since
    // loading, so the first data frame after the cursor goes
    pager.handle_fault(addr(HEAP + 3)).unwrap();
    assert!(pager.translate(addr(HEAP + 3)).is_some());
    assert!(pager.translate(addr(HEAP)).is_none());
}

#[test]
fn accessed_pages_get_a_second_chance() {
    let mut pager = pager(4);
    for n in 0..3 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }
    // touch the first page only; its accessed bit protects it
    assert!(pager.translate(addr(HEAP)).is_some());

    pager.handle_fault(addr(HEAP + 3)).unwrap();

    // the untouched second page was evicted instead of the touched first
    assert!(pager.translate(addr(HEAP + 1)).is_none());
    assert!(pager.translate(addr(HEAP)).is_some());
}

#[test]
fn all_accessed_pages_are_cleared_then_one_evicted() {
    let mut pager = pager(4);
    for n in 0..3 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
        assert!(pager.translate(addr(HEAP + n)).is_some());
    }

    // every accessed bit is set: the first lap clears them, the second
    // evicts the first data frame past the cursor
    pager.handle_fault(addr(HEAP + 3)).unwrap();
    assert!(pager.translate(addr(HEAP)).is_none());
    assert!(pager.translate(addr(HEAP + 1)).is_some());
    assert!(pager.translate(addr(HEAP + 2)).is_some());
}

#[test]
fn cursor_persists_across_sweeps() {
    let mut pager = pager(4);
    for n in 0..3 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }

    // first eviction takes the first data page and parks the cursor past it
    pager.handle_fault(addr(HEAP + 3)).unwrap();
    assert!(pager.translate(addr(HEAP)).is_none());

    // the next sweep continues from the cursor: the second original page
    // goes next, not the most recently loaded one
    pager.handle_fault(addr(HEAP)).unwrap();
    assert!(pager.translate(addr(HEAP + 1)).is_none());
    assert!(pager.translate(addr(HEAP + 3)).is_some());
}

#[test]
fn evicted_contents_are_persisted_before_reuse() {
    let mut pager = pager(4);
    pager.handle_fault(addr(HEAP)).unwrap();

    // scribble into the resident page
    let data_frame = FrameId::new(1);
    pager
        .frame_contents_mut(data_frame)
        .unwrap()
        .set_word(0, 0xFEED_F00D);

    for n in 1..4 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }
    // the first page was evicted into slot 0 at page offset 0
    assert!(pager.translate(addr(HEAP)).is_none());
    assert_eq!(
        pager.store().page(SlotId::new(0), 0).unwrap().word(0),
        0xFEED_F00D
    );

    // faulting it back restores the contents
    pager.handle_fault(addr(HEAP)).unwrap();
    assert!(pager.translate(addr(HEAP)).is_some());
    let frame = pager
        .frames()
        .iter()
        .find(|(_, f)| {
            f.status() == FrameStatus::Mapped
                && f.kind() == FrameKind::DataPage
                && f.page() == VirtualPage::new(HEAP)
        })
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(pager.frame_contents(frame).unwrap().word(0), 0xFEED_F00D);
}

#[test]
fn ring_membership_matches_mapped_status() {
    let mut pager = pager(4);
    for n in 0..4 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }

    for (_, frame) in pager.frames().iter() {
        assert_eq!(frame.status() == FrameStatus::Mapped, frame.in_ring());
    }

    // traversal from the cursor visits every mapped frame exactly once
    let start = pager.frames().cursor().unwrap();
    let mut seen = vec![start];
    let mut cur = pager.frames().advance(start).unwrap();
    while cur != start {
        assert!(!seen.contains(&cur), "ring revisited {cur}");
        seen.push(cur);
        cur = pager.frames().advance(cur).unwrap();
    }
    assert_eq!(seen.len(), pager.frames().ring_len());
}

#[test]
fn table_ref_count_tracks_present_children_until_recycle() {
    let mut pager = pager(8);
    for n in 0..3 {
        pager.handle_fault(addr(HEAP + n)).unwrap();
    }
    let table = FrameId::new(0);
    assert_eq!(pager.frames().get(table).unwrap().ref_count(), 3);

    // releasing the data pages unwinds the count; the table recycles at 0
    for data in 1..=3 {
        pager.release_frame(FrameId::new(data)).unwrap();
    }
    assert_eq!(pager.frames().get(table).unwrap().status(), FrameStatus::Free);
    assert_eq!(pager.frames().ring_len(), 0);
    // the whole window faults in again from scratch afterwards
    pager.handle_fault(addr(HEAP)).unwrap();
    assert!(pager.translate(addr(HEAP)).is_some());
}

#[test]
fn table_only_ring_reports_exhaustion() {
    let mut pager = pager(1);
    // the single frame goes to the page table; no data frame can be found
    assert_eq!(
        pager.handle_fault(addr(HEAP)),
        Err(PagingError::ResourceExhausted)
    );
}
