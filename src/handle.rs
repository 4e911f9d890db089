//! RAII ownership of kernel object handles.

use crate::error::{Error, Result};
use windows::Win32::Foundation::{CloseHandle, HANDLE};

/// A kernel object handle that is closed on drop.
#[derive(Debug)]
pub struct OwnedHandle {
    handle: HANDLE,
}

impl OwnedHandle {
    /// Takes ownership of `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for null or `INVALID_HANDLE_VALUE`.
    #[inline]
    pub fn new(handle: HANDLE) -> Result<Self> {
        if handle.is_invalid() || handle.0.is_null() {
            return Err(Error::invalid_handle("Cannot take ownership of an invalid handle"));
        }
        Ok(Self { handle })
    }

    /// Returns the raw `HANDLE` without giving up ownership.
    #[inline]
    pub fn as_raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was validated in `new` and is owned exclusively.
        if let Err(e) = unsafe { CloseHandle(self.handle) } {
            log::debug!("CloseHandle({:?}) failed: {e}", self.handle.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::Foundation::INVALID_HANDLE_VALUE;

    #[test]
    fn test_invalid_handles_rejected() {
        assert!(OwnedHandle::new(INVALID_HANDLE_VALUE).is_err());
        assert!(OwnedHandle::new(HANDLE::default()).is_err());
    }
}
