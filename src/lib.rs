//! # win32-shim
//!
//! A thin convenience layer over Win32.
//!
//! - **Dispatch**: one shared window procedure for any number of windows and
//!   dialogs, routing each message to a per-window handler table
//! - **Windows**: the native `WNDPROC`/`DLGPROC` entry points, a window
//!   builder, and the message loop
//! - **Synchronization**: critical sections, SRW locks, condition variables,
//!   and the interlocked singly-linked list
//! - **Jobs**: job objects for grouping processes
//! - **Error Handling**: native failures become [`error::Error`] and are
//!   logged through one path
//!
//! The [`dispatch`] module is platform-independent; everything that calls
//! into Win32 is only compiled on Windows.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_shim::error::Result<()> {
//! use std::sync::Arc;
//! use win32_shim::dispatch::{ids, HandlerTable, Message, Registry};
//! use win32_shim::window::{bind_window_registry, quit_on_destroy, run_message_loop};
//! use win32_shim::window::{ShowCommand, WindowBuilder};
//!
//! let binding = bind_window_registry(Arc::new(Registry::new()))?;
//!
//! let mut table = HandlerTable::new();
//! table.set(ids::PAINT, |_: &Message| None::<isize>);
//! table.set_shared(ids::DESTROY, quit_on_destroy(0));
//!
//! let window = WindowBuilder::new().title("Hello").build(table)?;
//! window.show(ShowCommand::DEFAULT);
//! let exit_code = run_message_loop();
//! # drop(binding);
//! # let _ = exit_code;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

#![warn(missing_docs)]

// Core modules
pub mod dispatch;
pub mod error;

#[cfg(windows)]
pub mod handle;
#[cfg(windows)]
pub mod string;

// System modules
#[cfg(windows)]
pub mod job;
#[cfg(windows)]
pub mod sync;
#[cfg(windows)]
pub mod window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dispatch::{
        ids, DuplicatePolicy, Handler, HandlerTable, Message, MessageId, Registry,
        RegistryBuilder, WindowHandle,
    };
    pub use crate::error::{Error, Result};

    #[cfg(windows)]
    pub use crate::job::Job;
    #[cfg(windows)]
    pub use crate::sync::{ConditionVariable, CriticalSection, SList, SrwLock, WaitResult};
    #[cfg(windows)]
    pub use crate::window::{
        bind_dialog_registry, bind_window_registry, dialog_proc, run_message_loop, window_proc,
        Binding, ShowCommand, Style, Window, WindowBuilder,
    };
}
