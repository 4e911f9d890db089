//! Native user-mode synchronization primitives.
//!
//! Thin owners of `CRITICAL_SECTION`, `SRWLOCK`, `CONDITION_VARIABLE` and the
//! interlocked `SLIST_HEADER`, each guarding the data it protects the way
//! `std::sync` does.
//!
//! ```no_run
//! use win32_shim::sync::{ConditionVariable, SrwLock};
//! use std::sync::Arc;
//!
//! let state = Arc::new((SrwLock::new(false), ConditionVariable::new()));
//!
//! let worker = {
//!     let state = Arc::clone(&state);
//!     std::thread::spawn(move || {
//!         let (lock, ready) = &*state;
//!         *lock.write() = true;
//!         ready.notify_all();
//!     })
//! };
//!
//! let (lock, ready) = &*state;
//! let mut done = lock.write();
//! ready.wait_while(&mut done, |done| !*done)?;
//! # drop(done);
//! # worker.join().unwrap();
//! # Ok::<(), win32_shim::error::Error>(())
//! ```

mod condvar;
mod critical_section;
mod slist;
mod srw_lock;

pub use condvar::{ConditionVariable, WaitGuard};
pub use critical_section::{CriticalSection, CriticalSectionGuard, DEFAULT_SPIN_COUNT};
pub use slist::SList;
pub use srw_lock::{SrwLock, SrwLockReadGuard, SrwLockWriteGuard};

use std::time::Duration;
use windows::Win32::System::Threading::INFINITE;

/// Result of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// Woken (or, for predicate waits, the predicate was satisfied).
    Signaled,
    /// The timeout elapsed first.
    Timeout,
}

impl WaitResult {
    /// Returns true if the wait timed out.
    #[inline]
    pub fn timed_out(self) -> bool {
        self == WaitResult::Timeout
    }
}

/// Converts a timeout to milliseconds, saturating just below `INFINITE`.
pub(crate) fn timeout_ms(timeout: Option<Duration>) -> u32 {
    match timeout {
        None => INFINITE,
        Some(d) => u32::try_from(d.as_millis()).unwrap_or(INFINITE - 1).min(INFINITE - 1),
    }
}
