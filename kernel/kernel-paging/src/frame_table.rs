//! # Physical Frame Table
//!
//! Ownership records for the managed frame pool. Every frame is `Free` or
//! `Mapped`; a `Mapped` frame records its owner, the virtual page it holds
//! (data pages), its kind, and its intrusive position in the clock ring.
//!
//! Invariant: a frame is a ring member **iff** its status is `Mapped`, and
//! the ring visits every `Mapped` frame exactly once. `TablePage` frames
//! ride the ring but are never direct eviction targets; they leave it only
//! when their last child entry goes away and the frame is recycled.

use crate::ring::{ClockRing, RingLink, RingNode};
use alloc::vec::Vec;
use core::fmt;
use kernel_addresses::VirtualPage;

use crate::process::Pid;

/// Bounds-checked handle for one managed frame.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FrameId(u16);

impl FrameId {
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

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fr{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Free,
    Mapped,
}

/// What a mapped frame holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A process data page; eviction candidate.
    DataPage,
    /// A page table; skipped by the sweep, recycled via its ref count.
    TablePage,
}

/// One frame record.
#[derive(Debug)]
pub struct Frame {
    status: FrameStatus,
    owner: Option<Pid>,
    page: VirtualPage,
    ref_count: u16,
    kind: FrameKind,
    dirty: bool,
    link: RingLink,
}

impl Frame {
    const fn free() -> Self {
        Self {
            status: FrameStatus::Free,
            owner: None,
            page: VirtualPage::new(0),
            ref_count: 0,
            kind: FrameKind::DataPage,
            dirty: false,
            link: RingLink::unlinked(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn status(&self) -> FrameStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub const fn owner(&self) -> Option<Pid> {
        self.owner
    }

    /// Virtual page held by a mapped data frame.
    #[inline]
    #[must_use]
    pub const fn page(&self) -> VirtualPage {
        self.page
    }

    /// Live child entries; meaningful for `TablePage` frames only.
    #[inline]
    #[must_use]
    pub const fn ref_count(&self) -> u16 {
        self.ref_count
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Hardware dirty bit as latched at release time.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub const fn in_ring(&self) -> bool {
        self.link.is_linked()
    }
}

impl RingNode for Frame {
    fn link(&self) -> &RingLink {
        &self.link
    }
    fn link_mut(&mut self) -> &mut RingLink {
        &mut self.link
    }
}

/// The frame arena plus its clock ring.
pub struct FrameTable {
    frames: Vec<Frame>,
    ring: ClockRing,
}

impl FrameTable {
    #[must_use]
    pub fn new(frame_count: usize) -> Self {
        let mut frames = Vec::with_capacity(frame_count);
        frames.resize_with(frame_count, Frame::free);
        Self {
            frames,
            ring: ClockRing::new(),
        }
    }

    /// Reset every record to `Free` and empty the ring.
    pub fn reset(&mut self) {
        for frame in &mut self.frames {
            *frame = Frame::free();
        }
        self.ring.clear();
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.as_usize())
    }

    /// Lowest-indexed `Free` frame, if any.
    #[must_use]
    pub fn free_frame(&self) -> Option<FrameId> {
        self.frames
            .iter()
            .position(|f| f.status == FrameStatus::Free)
            .map(FrameId::new)
    }

    /// Record an allocation: the frame becomes `Mapped` with the given
    /// identity and joins the ring at the current position.
    pub fn install(&mut self, id: FrameId, kind: FrameKind, owner: Pid, page: VirtualPage) {
        let frame = &mut self.frames[id.as_usize()];
        debug_assert_eq!(frame.status, FrameStatus::Free);
        frame.status = FrameStatus::Mapped;
        frame.kind = kind;
        frame.owner = Some(owner);
        frame.page = page;
        frame.ref_count = 0;
        frame.dirty = false;
        self.ring.insert(&mut self.frames, id.as_usize());
    }

    /// Return a frame to `Free`: leave the ring (if still a member) and
    /// reset the record.
    pub fn retire(&mut self, id: FrameId) {
        self.ring.remove(&mut self.frames, id.as_usize());
        self.frames[id.as_usize()] = Frame::free();
    }

    /// Note a new live child entry under a table frame.
    pub fn inc_ref(&mut self, id: FrameId) {
        self.frames[id.as_usize()].ref_count += 1;
    }

    /// Drop one live child entry; returns the remaining count.
    pub fn dec_ref(&mut self, id: FrameId) -> u16 {
        let frame = &mut self.frames[id.as_usize()];
        frame.ref_count = frame.ref_count.saturating_sub(1);
        frame.ref_count
    }

    pub fn set_dirty(&mut self, id: FrameId, dirty: bool) {
        self.frames[id.as_usize()].dirty = dirty;
    }

    // --- ring view -------------------------------------------------------

    #[must_use]
    pub fn ring_len(&self) -> usize {
        self.ring.len()
    }

    /// The persistent sweep cursor.
    #[must_use]
    pub fn cursor(&self) -> Option<FrameId> {
        self.ring.cursor().map(FrameId::new)
    }

    /// Ring successor of a member.
    #[must_use]
    pub fn advance(&self, id: FrameId) -> Option<FrameId> {
        self.ring.advance(&self.frames, id.as_usize()).map(FrameId::new)
    }

    /// Park the sweep cursor.
    pub fn rotate_to(&mut self, id: FrameId) {
        self.ring.rotate_to(&self.frames, id.as_usize());
    }

    /// Unlink a member without freeing the record (the caller hands the
    /// frame straight to its next mapping).
    pub fn unlink(&mut self, id: FrameId) {
        self.ring.remove(&mut self.frames, id.as_usize());
    }

    /// All records with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (FrameId, &Frame)> {
        self.frames
            .iter()
            .enumerate()
            .map(|(i, f)| (FrameId::new(i), f))
    }
}
