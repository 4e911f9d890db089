//! Handles, message identifiers, and the message value passed to handlers.

use std::fmt;

/// Identifies the kind of event delivered to a window procedure.
pub type MessageId = u32;

/// Well-known message identifiers, with their Win32 values.
pub mod ids {
    use super::MessageId;

    /// `WM_DESTROY`: the window is being destroyed.
    pub const DESTROY: MessageId = 0x0002;
    /// `WM_PAINT`
    pub const PAINT: MessageId = 0x000F;
    /// `WM_CLOSE`: the user or system asked the window to close.
    pub const CLOSE: MessageId = 0x0010;
    /// `WM_NCCREATE`: first message a window receives.
    pub const NCCREATE: MessageId = 0x0081;
    /// `WM_NCDESTROY`: last message a window receives.
    pub const NCDESTROY: MessageId = 0x0082;
    /// `WM_INITDIALOG`
    pub const INITDIALOG: MessageId = 0x0110;
    /// `WM_COMMAND`
    pub const COMMAND: MessageId = 0x0111;
    /// `WM_USER`: start of the private window-class range.
    pub const USER: MessageId = 0x0400;
    /// `WM_APP`: start of the application-wide private range.
    pub const APP: MessageId = 0x8000;
}

/// Opaque identifier of a host-managed window or dialog.
///
/// Stores the raw handle value so it can key a map and cross threads; it
/// never dereferences it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WindowHandle(usize);

impl WindowHandle {
    /// Wraps a raw handle value.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Returns true for the null handle.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle({:#x})", self.0)
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(windows)]
impl From<windows::Win32::Foundation::HWND> for WindowHandle {
    #[inline]
    fn from(hwnd: windows::Win32::Foundation::HWND) -> Self {
        Self(hwnd.0 as usize)
    }
}

#[cfg(windows)]
impl From<WindowHandle> for windows::Win32::Foundation::HWND {
    #[inline]
    fn from(handle: WindowHandle) -> Self {
        windows::Win32::Foundation::HWND(handle.0 as *mut std::ffi::c_void)
    }
}

/// A message delivered to a window procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    /// The target window.
    pub handle: WindowHandle,
    /// The message identifier.
    pub id: MessageId,
    /// First generic parameter (`WPARAM`).
    pub wparam: usize,
    /// Second generic parameter (`LPARAM`).
    pub lparam: isize,
}

impl Message {
    /// Creates a message.
    #[inline]
    pub const fn new(handle: WindowHandle, id: MessageId, wparam: usize, lparam: isize) -> Self {
        Self {
            handle,
            id,
            wparam,
            lparam,
        }
    }

    /// Low word of `wparam`, e.g. the command id of `WM_COMMAND`.
    #[inline]
    pub const fn wparam_low(&self) -> u16 {
        (self.wparam & 0xFFFF) as u16
    }

    /// High word of `wparam`, e.g. the notification code of `WM_COMMAND`.
    #[inline]
    pub const fn wparam_high(&self) -> u16 {
        ((self.wparam >> 16) & 0xFFFF) as u16
    }
}
