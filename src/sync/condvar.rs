use super::critical_section::CriticalSectionGuard;
use super::srw_lock::SrwLockWriteGuard;
use super::{timeout_ms, WaitResult};
use crate::error::Result;
use std::cell::UnsafeCell;
use std::ops::DerefMut;
use std::time::{Duration, Instant};
use windows::Win32::Foundation::ERROR_TIMEOUT;
use windows::Win32::System::Threading::{
    SleepConditionVariableCS, SleepConditionVariableSRW, WakeAllConditionVariable,
    WakeConditionVariable, CONDITION_VARIABLE,
};

mod sealed {
    pub trait Sealed {}
}

/// A lock guard a [`ConditionVariable`] can atomically release while it
/// sleeps: [`SrwLockWriteGuard`] or [`CriticalSectionGuard`].
pub trait WaitGuard: DerefMut + sealed::Sealed {
    #[doc(hidden)]
    fn sleep_on(&mut self, cv: *mut CONDITION_VARIABLE, ms: u32) -> windows::core::Result<()>;
}

impl<T> sealed::Sealed for SrwLockWriteGuard<'_, T> {}

impl<T> WaitGuard for SrwLockWriteGuard<'_, T> {
    fn sleep_on(&mut self, cv: *mut CONDITION_VARIABLE, ms: u32) -> windows::core::Result<()> {
        // SAFETY: this guard holds the lock exclusively; the call releases
        // and reacquires it in the same mode.
        unsafe { SleepConditionVariableSRW(cv, self.lock.raw(), ms, 0) }
    }
}

impl<T> sealed::Sealed for CriticalSectionGuard<'_, T> {}

impl<T> WaitGuard for CriticalSectionGuard<'_, T> {
    fn sleep_on(&mut self, cv: *mut CONDITION_VARIABLE, ms: u32) -> windows::core::Result<()> {
        // Another thread owns the section while we sleep.
        self.lock.mark_released();
        // SAFETY: this thread holds the critical section.
        let slept = unsafe { SleepConditionVariableCS(cv, self.lock.raw(), ms) };
        self.lock.mark_owned();
        slept
    }
}

/// A native `CONDITION_VARIABLE`, usable with either lock type.
pub struct ConditionVariable {
    raw: UnsafeCell<CONDITION_VARIABLE>,
}

// SAFETY: condition variables are designed for cross-thread use.
unsafe impl Send for ConditionVariable {}
unsafe impl Sync for ConditionVariable {}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionVariable {
    /// Creates a condition variable (`CONDITION_VARIABLE_INIT`).
    pub fn new() -> Self {
        Self {
            raw: UnsafeCell::new(CONDITION_VARIABLE::default()),
        }
    }

    /// Wakes one waiting thread.
    pub fn notify_one(&self) {
        // SAFETY: raw is a valid condition variable.
        unsafe { WakeConditionVariable(self.raw.get()) };
    }

    /// Wakes every waiting thread.
    pub fn notify_all(&self) {
        // SAFETY: raw is a valid condition variable.
        unsafe { WakeAllConditionVariable(self.raw.get()) };
    }

    /// Releases the guard's lock, sleeps until woken, and reacquires it.
    ///
    /// May wake spuriously; prefer [`wait_while`](Self::wait_while).
    pub fn wait<G: WaitGuard>(&self, guard: &mut G) -> Result<()> {
        self.wait_timeout(guard, None).map(|_| ())
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout<G: WaitGuard>(
        &self,
        guard: &mut G,
        timeout: Option<Duration>,
    ) -> Result<WaitResult> {
        match guard.sleep_on(self.raw.get(), timeout_ms(timeout)) {
            Ok(()) => Ok(WaitResult::Signaled),
            Err(e) if e.code() == ERROR_TIMEOUT.to_hresult() => Ok(WaitResult::Timeout),
            Err(e) => Err(crate::error::report_api_failure(
                "SleepConditionVariable",
                file!(),
                line!(),
                e,
            )),
        }
    }

    /// Sleeps for as long as `condition` holds, re-checking after every
    /// wakeup, so spurious and stolen wakeups are never observed.
    pub fn wait_while<G, F>(&self, guard: &mut G, mut condition: F) -> Result<()>
    where
        G: WaitGuard,
        F: FnMut(&mut G::Target) -> bool,
    {
        while condition(&mut **guard) {
            self.wait(guard)?;
        }
        Ok(())
    }

    /// Like [`wait_while`](Self::wait_while) with an overall deadline.
    ///
    /// Returns [`WaitResult::Timeout`] if `condition` still holds when the
    /// timeout elapses.
    pub fn wait_timeout_while<G, F>(
        &self,
        guard: &mut G,
        timeout: Duration,
        mut condition: F,
    ) -> Result<WaitResult>
    where
        G: WaitGuard,
        F: FnMut(&mut G::Target) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while condition(&mut **guard) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(WaitResult::Timeout);
            }
            self.wait_timeout(guard, Some(remaining))?;
        }
        Ok(WaitResult::Signaled)
    }
}
