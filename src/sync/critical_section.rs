use crate::error::{Error, Result};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use windows::Win32::System::Threading::{
    DeleteCriticalSection, EnterCriticalSection, GetCurrentThreadId,
    InitializeCriticalSectionAndSpinCount, LeaveCriticalSection, TryEnterCriticalSection,
    CRITICAL_SECTION,
};

/// Spin count used by [`CriticalSection::new`], the value the heap manager
/// uses for its own critical sections.
pub const DEFAULT_SPIN_COUNT: u32 = 4000;

/// A mutual-exclusion lock over a native `CRITICAL_SECTION`.
///
/// Native critical sections are recursive, but handing out two guards on the
/// same thread would alias `&mut T`, so a second `lock` from the owning
/// thread is reported as an error instead.
pub struct CriticalSection<T> {
    // Boxed: a CRITICAL_SECTION must not move after initialization.
    raw: Box<UnsafeCell<CRITICAL_SECTION>>,
    owner: AtomicU32,
    data: UnsafeCell<T>,
}

// SAFETY: the critical section serializes all access to `data`.
unsafe impl<T: Send> Send for CriticalSection<T> {}
unsafe impl<T: Send> Sync for CriticalSection<T> {}

impl<T> CriticalSection<T> {
    /// Creates a critical section with [`DEFAULT_SPIN_COUNT`].
    pub fn new(value: T) -> Result<Self> {
        Self::with_spin_count(value, DEFAULT_SPIN_COUNT)
    }

    /// Creates a critical section that spins `spin_count` times before
    /// blocking on contention.
    pub fn with_spin_count(value: T, spin_count: u32) -> Result<Self> {
        let raw = Box::new(UnsafeCell::new(CRITICAL_SECTION::default()));
        // SAFETY: raw points to writable, pinned storage.
        crate::api_call!(InitializeCriticalSectionAndSpinCount, unsafe {
            InitializeCriticalSectionAndSpinCount(raw.get(), spin_count)
        })?;
        Ok(Self {
            raw,
            owner: AtomicU32::new(0),
            data: UnsafeCell::new(value),
        })
    }

    fn held_by_current_thread(&self) -> bool {
        // Only the owning thread ever stores its own id here.
        // SAFETY: GetCurrentThreadId has no preconditions.
        self.owner.load(Ordering::Relaxed) == unsafe { GetCurrentThreadId() }
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the calling thread already holds the lock.
    pub fn lock(&self) -> Result<CriticalSectionGuard<'_, T>> {
        if self.held_by_current_thread() {
            return Err(Error::custom("Critical section is already held by this thread"));
        }
        // SAFETY: raw was initialized in the constructor.
        unsafe { EnterCriticalSection(self.raw.get()) };
        Ok(self.guard())
    }

    /// Acquires the lock if it is free; returns `None` otherwise, including
    /// when the calling thread already holds it.
    pub fn try_lock(&self) -> Option<CriticalSectionGuard<'_, T>> {
        if self.held_by_current_thread() {
            return None;
        }
        // SAFETY: raw was initialized in the constructor.
        if unsafe { TryEnterCriticalSection(self.raw.get()) }.as_bool() {
            Some(self.guard())
        } else {
            None
        }
    }

    fn guard(&self) -> CriticalSectionGuard<'_, T> {
        self.mark_owned();
        CriticalSectionGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub(super) fn mark_owned(&self) {
        // SAFETY: GetCurrentThreadId has no preconditions.
        self.owner.store(unsafe { GetCurrentThreadId() }, Ordering::Relaxed);
    }

    pub(super) fn mark_released(&self) {
        self.owner.store(0, Ordering::Relaxed);
    }

    pub(super) fn raw(&self) -> *mut CRITICAL_SECTION {
        self.raw.get()
    }

    /// Returns a mutable reference without locking; `&mut self` proves
    /// exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T> Drop for CriticalSection<T> {
    fn drop(&mut self) {
        // SAFETY: no guard can outlive the lock.
        unsafe { DeleteCriticalSection(self.raw.get()) };
    }
}

/// Holds a [`CriticalSection`]; released on drop by the thread that took it.
pub struct CriticalSectionGuard<'a, T> {
    pub(super) lock: &'a CriticalSection<T>,
    // Leaving must happen on the owning thread.
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for CriticalSectionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for CriticalSectionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for CriticalSectionGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.mark_released();
        // SAFETY: this thread entered the section when the guard was made.
        unsafe { LeaveCriticalSection(self.lock.raw.get()) };
    }
}
