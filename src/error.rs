//! Error handling utilities for Win32 calls and the dispatch registry.
//!
//! Native failures are converted into [`Error`] and logged in one place, so
//! every wrapper in this crate reports failures the same way.

use crate::dispatch::WindowHandle;
use thiserror::Error;

#[cfg(windows)]
use windows::core::Error as WinError;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A named Win32 call failed.
    #[cfg(windows)]
    #[error("{api} failed: {source}")]
    Api {
        /// Name of the failing API, e.g. `CreateJobObjectW`.
        api: &'static str,
        /// The native error.
        #[source]
        source: WinError,
    },

    /// A handler table is already registered for this handle and the
    /// registry rejects duplicates.
    #[error("A handler table is already registered for {0}")]
    AlreadyRegistered(WindowHandle),

    /// No registry is bound to the native procedure.
    #[error("No registry bound: {context}")]
    NotBound {
        /// Which procedure was looked up.
        context: &'static str,
    },

    /// A registry is already bound to the native procedure.
    #[error("Registry already bound: {context}")]
    AlreadyBound {
        /// Which procedure was being bound.
        context: &'static str,
    },

    /// An invalid handle was provided or returned.
    #[error("Invalid handle: {context}")]
    InvalidHandle {
        /// Description of the invalid handle context.
        context: &'static str,
    },

    /// A custom error with a message.
    #[error("{0}")]
    Custom(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new invalid handle error with the given context.
    pub fn invalid_handle(context: &'static str) -> Self {
        Error::InvalidHandle { context }
    }

    /// Creates a custom error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Returns the Win32 error code if this error came from a native call.
    #[cfg(windows)]
    pub fn win32_error_code(&self) -> Option<u32> {
        match self {
            Error::Api { source, .. } => Some(source.code().0 as u32),
            _ => None,
        }
    }

    /// Returns the name of the failing API, if known.
    pub fn api_name(&self) -> Option<&'static str> {
        match self {
            #[cfg(windows)]
            Error::Api { api, .. } => Some(*api),
            _ => None,
        }
    }
}

/// Logs a failed native call and converts it into [`Error::Api`].
///
/// This is the single place native failures are reported; use it through
/// [`api_call!`](crate::api_call) rather than directly.
#[cfg(windows)]
#[doc(hidden)]
pub fn report_api_failure(api: &'static str, file: &'static str, line: u32, err: WinError) -> Error {
    log::error!("{api} failed at {file}:{line}: {err}");
    Error::Api { api, source: err }
}

/// Evaluates a `windows::core::Result`-returning native call, logging and
/// converting any failure into [`Error::Api`] tagged with the API name.
///
/// ```ignore
/// let job = api_call!(CreateJobObjectW, CreateJobObjectW(None, None))?;
/// ```
#[cfg(windows)]
#[macro_export]
macro_rules! api_call {
    ($api:ident, $call:expr) => {
        ($call).map_err(|e| {
            $crate::error::report_api_failure(stringify!($api), file!(), line!(), e.into())
        })
    };
}

/// Gets the last Windows error, logged and tagged with the failing API.
#[cfg(windows)]
#[track_caller]
pub fn last_api_error(api: &'static str) -> Error {
    let caller = std::panic::Location::caller();
    report_api_failure(api, caller.file(), caller.line(), WinError::from_win32())
}
