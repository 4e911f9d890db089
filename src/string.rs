//! UTF-16 strings for class names, window titles and kernel object names.

/// Encodes `s` as a null-terminated UTF-16 buffer.
#[inline]
pub fn to_wide(s: &str) -> Vec<u16> {
    let mut wide = Vec::with_capacity(s.len() + 1);
    wide.extend(s.encode_utf16());
    wide.push(0);
    wide
}

/// An owned, null-terminated wide string that can be passed as `PCWSTR`.
///
/// Keep the `WideString` alive for as long as the native call reads the
/// pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WideString {
    buffer: Vec<u16>,
}

impl WideString {
    /// Encodes `s`.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self { buffer: to_wide(s) }
    }

    /// The string as a `PCWSTR`.
    #[inline]
    pub fn as_pcwstr(&self) -> windows::core::PCWSTR {
        windows::core::PCWSTR::from_raw(self.buffer.as_ptr())
    }

    /// Length in UTF-16 code units, without the terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    /// Returns true if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
