//! The syscall-level mapping surface: validation, the idempotent
//! re-request law, the fail-fast protection policy, and the documented
//! unmap gap.

use kernel_addresses::VirtualPage;
use kernel_paging::{
    MemoryBackingStore, PagingConfig, PagingError, PagingSystem, Pid, ProcessState,
    ReplacementPolicy, SlotId,
};

fn system() -> PagingSystem<MemoryBackingStore> {
    let config = PagingConfig::default();
    let store = MemoryBackingStore::new(config.slot_count);
    let system = PagingSystem::new(config, store);
    system.attach_process(Pid::new(1)).unwrap();
    system.attach_process(Pid::new(2)).unwrap();
    system.set_current(Pid::new(1));
    system
}

#[test]
fn request_store_grants_the_requested_count_on_a_free_slot() {
    let system = system();
    assert_eq!(system.request_store(SlotId::new(0), 10), Ok(10));
}

#[test]
fn request_store_re_request_is_idempotent() {
    let system = system();
    assert_eq!(system.request_store(SlotId::new(0), 10), Ok(10));
    system
        .map_region(VirtualPage::new(4096), SlotId::new(0), 10)
        .unwrap();

    // the recorded count wins over the newly requested one
    assert_eq!(system.request_store(SlotId::new(0), 99), Ok(10));
}

#[test]
fn request_store_validates_slot_and_count() {
    let system = system();
    assert_eq!(
        system.request_store(SlotId::new(64), 10),
        Err(PagingError::InvalidArgument)
    );
    assert_eq!(
        system.request_store(SlotId::new(0), 0),
        Err(PagingError::InvalidArgument)
    );
    assert_eq!(
        system.request_store(SlotId::new(0), 257),
        Err(PagingError::InvalidArgument)
    );
}

#[test]
fn map_region_rejects_oversized_page_count() {
    let system = system();
    assert_eq!(
        system.map_region(VirtualPage::new(4096), SlotId::new(0), 300),
        Err(PagingError::InvalidArgument)
    );
}

#[test]
fn map_region_rejects_slots_outside_the_user_range() {
    let system = system();
    // slot 8 exists but is beyond the user-mappable low range
    assert_eq!(
        system.map_region(VirtualPage::new(4096), SlotId::new(8), 4),
        Err(PagingError::InvalidArgument)
    );
}

#[test]
fn request_on_anothers_heap_slot_terminates_the_requester() {
    let system = system();
    system.reserve_heap_slot(Pid::new(1), SlotId::new(2), 10).unwrap();

    system.set_current(Pid::new(2));
    assert_eq!(
        system.request_store(SlotId::new(2), 10),
        Err(PagingError::ProcessTerminated)
    );
    assert_eq!(system.process_state(Pid::new(2)), ProcessState::Terminated);
    // the reservation is untouched
    assert_eq!(system.process_state(Pid::new(1)), ProcessState::Active);
}

#[test]
fn map_on_anothers_heap_slot_terminates_the_requester() {
    let system = system();
    system.reserve_heap_slot(Pid::new(1), SlotId::new(3), 8).unwrap();

    system.set_current(Pid::new(2));
    assert_eq!(
        system.map_region(VirtualPage::new(4096), SlotId::new(3), 8),
        Err(PagingError::ProcessTerminated)
    );
    assert_eq!(system.process_state(Pid::new(2)), ProcessState::Terminated);
}

#[test]
fn re_requesting_ones_own_heap_slot_is_allowed() {
    let system = system();
    system.reserve_heap_slot(Pid::new(1), SlotId::new(2), 10).unwrap();

    // the owner's re-request reports the reserved count
    assert_eq!(system.request_store(SlotId::new(2), 50), Ok(10));
    assert_eq!(system.process_state(Pid::new(1)), ProcessState::Active);
}

#[test]
fn unmap_of_a_never_mapped_page_reports_success() {
    let system = system();
    // nothing was mapped; the lookup miss is swallowed by design
    assert_eq!(system.unmap_region(VirtualPage::new(4096)), Ok(()));
}

#[test]
fn unmap_frees_the_slot_for_reuse() {
    let system = system();
    system
        .map_region(VirtualPage::new(4096), SlotId::new(1), 4)
        .unwrap();
    system.unmap_region(VirtualPage::new(4096)).unwrap();

    // another process can claim the slot afterwards
    system.set_current(Pid::new(2));
    assert_eq!(system.request_store(SlotId::new(1), 6), Ok(6));
}

#[test]
fn policy_round_trips_through_the_api() {
    let system = system();
    system.set_policy(ReplacementPolicy::SecondChance);
    assert_eq!(system.get_policy(), ReplacementPolicy::SecondChance);
}

#[test]
fn init_calls_reset_the_tables() {
    let system = system();
    system
        .map_region(VirtualPage::new(4096), SlotId::new(0), 8)
        .unwrap();
    system.init_backing_store();
    // the slot is free again
    assert_eq!(system.request_store(SlotId::new(0), 5), Ok(5));

    system.init_frame_table();
    assert_eq!(system.inspect(|core| core.frames().ring_len()), 0);
}

#[test]
fn full_demand_paging_flow_through_the_syscall_surface() {
    let system = system();
    system
        .map_region(VirtualPage::new(4096), SlotId::new(0), 16)
        .unwrap();

    let va = VirtualPage::new(4100).base() + 0x20;
    assert!(system.translate(va).is_none());
    system.page_fault(va).unwrap();

    let pa = system.translate(va).unwrap();
    assert_eq!(pa.as_u32() & 0xFFF, 0x20);
}
