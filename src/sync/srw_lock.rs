use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use windows::Win32::System::Threading::{
    AcquireSRWLockExclusive, AcquireSRWLockShared, ReleaseSRWLockExclusive,
    ReleaseSRWLockShared, TryAcquireSRWLockExclusive, TryAcquireSRWLockShared, SRWLOCK,
};

/// A reader/writer lock over a native `SRWLOCK`.
///
/// Slim reader/writer locks are not recursive: acquiring the write side
/// twice on one thread deadlocks.
pub struct SrwLock<T> {
    raw: UnsafeCell<SRWLOCK>,
    data: UnsafeCell<T>,
}

// SAFETY: the SRW lock serializes writers and excludes them from readers.
unsafe impl<T: Send> Send for SrwLock<T> {}
unsafe impl<T: Send + Sync> Sync for SrwLock<T> {}

impl<T: Default> Default for SrwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> SrwLock<T> {
    /// Creates an unlocked lock. Needs no native initialization beyond
    /// `SRWLOCK_INIT`, so it cannot fail.
    pub fn new(value: T) -> Self {
        Self {
            raw: UnsafeCell::new(SRWLOCK::default()),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires shared access, blocking while a writer holds the lock.
    pub fn read(&self) -> SrwLockReadGuard<'_, T> {
        // SAFETY: raw is a valid SRWLOCK that cannot move while borrowed.
        unsafe { AcquireSRWLockShared(self.raw.get()) };
        SrwLockReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires shared access if no writer holds the lock.
    pub fn try_read(&self) -> Option<SrwLockReadGuard<'_, T>> {
        // SAFETY: as in `read`.
        let acquired = unsafe { TryAcquireSRWLockShared(self.raw.get()) };
        (acquired.0 != 0).then(|| SrwLockReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Acquires exclusive access, blocking until the lock is free.
    pub fn write(&self) -> SrwLockWriteGuard<'_, T> {
        // SAFETY: as in `read`.
        unsafe { AcquireSRWLockExclusive(self.raw.get()) };
        SrwLockWriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires exclusive access if the lock is free.
    pub fn try_write(&self) -> Option<SrwLockWriteGuard<'_, T>> {
        // SAFETY: as in `read`.
        let acquired = unsafe { TryAcquireSRWLockExclusive(self.raw.get()) };
        (acquired.0 != 0).then(|| SrwLockWriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Returns a mutable reference without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    pub(super) fn raw(&self) -> *mut SRWLOCK {
        self.raw.get()
    }
}

/// Shared access to an [`SrwLock`].
pub struct SrwLockReadGuard<'a, T> {
    lock: &'a SrwLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for SrwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: shared mode excludes writers.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for SrwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: this guard holds the lock in shared mode.
        unsafe { ReleaseSRWLockShared(self.lock.raw.get()) };
    }
}

/// Exclusive access to an [`SrwLock`].
pub struct SrwLockWriteGuard<'a, T> {
    pub(super) lock: &'a SrwLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for SrwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: exclusive mode.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SrwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: exclusive mode.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SrwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: this guard holds the lock in exclusive mode.
        unsafe { ReleaseSRWLockExclusive(self.lock.raw.get()) };
    }
}
