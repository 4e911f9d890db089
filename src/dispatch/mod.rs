//! Window-procedure dispatch.
//!
//! Many windows share one native window procedure; each window registers a
//! [`HandlerTable`] mapping message ids to handlers, and the [`Registry`]
//! routes every delivered [`Message`] to the right table.
//!
//! This module is platform-independent. The native entry points that feed it
//! live in [`crate::window`].

mod handler;
mod message;
mod registry;
mod table;

pub use handler::{shared, Always, Handler, Ignore, SharedHandler};
pub use message::{ids, Message, MessageId, WindowHandle};
pub use registry::{DuplicatePolicy, Registry, RegistryBuilder, Route};
pub use table::HandlerTable;
