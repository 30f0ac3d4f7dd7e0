//! # Kernel synchronization primitives
//!
//! The paging tables are mutated under a single system-wide critical
//! section: in the kernel proper this is the interrupts-masked region
//! between a `disable`/`restore` pair, here modeled as a mutual-exclusion
//! cell so the same code runs (and is testable) on a hosted target.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod critical;

pub use critical::{CriticalSection, SectionGuard};
