use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A mutual-exclusion cell modeling an interrupts-masked critical section.
///
/// Entering the section acquires exclusive access to the protected state and
/// stands in for saving the interrupt state and masking interrupts; dropping
/// the [`SectionGuard`] restores them. Every operation that mutates a shared
/// paging table runs for its whole duration inside one entered section, so
/// no observer can see the tables half-updated.
///
/// Acquisition is a test-and-test-and-set spin: uncontended entry is a
/// single CAS, contended entry spins on a plain load before retrying.
///
/// # Examples
///
/// ```rust
/// use kernel_sync::CriticalSection;
///
/// static TABLE: CriticalSection<u64> = CriticalSection::new(0);
///
/// {
///     let mut guard = TABLE.enter();
///     *guard += 1;
/// }
/// // section left, state restored
/// assert_eq!(TABLE.with(|v| *v), 1);
/// ```
pub struct CriticalSection<T> {
    /// `true` while some guard is live.
    entered: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross threads.
unsafe impl<T: Send> Sync for CriticalSection<T> {}

impl<T> CriticalSection<T> {
    #[must_use]
    pub const fn new(inner: T) -> Self {
        Self {
            entered: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Try once; returns immediately with `None` if the section is occupied.
    #[inline]
    pub fn try_enter(&self) -> Option<SectionGuard<'_, T>> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SectionGuard { section: self })
        } else {
            None
        }
    }

    /// Enter the section, spinning until it is free.
    #[inline]
    pub fn enter(&self) -> SectionGuard<'_, T> {
        while self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Contended: spin on a read before retrying the CAS.
            while self.entered.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        SectionGuard { section: self }
    }

    /// Run `f` inside the section; the guard is released on every exit path.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.enter();
        f(&mut guard)
    }

    /// Direct access when the section is exclusively owned anyway.
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the cell, returning the protected state.
    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// RAII guard for an entered [`CriticalSection`].
///
/// Dereferences to the protected state; dropping it leaves the section.
pub struct SectionGuard<'a, T> {
    section: &'a CriticalSection<T>,
}

impl<T> Deref for SectionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the section is entered for the guard's lifetime.
        unsafe { &*self.section.inner.get() }
    }
}

impl<T> DerefMut for SectionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the section is entered for the guard's lifetime.
        unsafe { &mut *self.section.inner.get() }
    }
}

impl<T> Drop for SectionGuard<'_, T> {
    fn drop(&mut self) {
        self.section.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_after_drop() {
        let s = CriticalSection::new(0_u32);
        {
            let mut g = s.enter();
            *g = 41;
        }
        let mut g = s.enter();
        *g += 1;
        assert_eq!(*g, 42);
    }

    #[test]
    fn try_enter_while_occupied() {
        let s = CriticalSection::new(());
        let g = s.try_enter();
        assert!(g.is_some());
        assert!(s.try_enter().is_none());
        drop(g);
        assert!(s.try_enter().is_some());
    }
}
