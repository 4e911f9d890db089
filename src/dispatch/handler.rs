//! The handler abstraction shared by tables and the registry's global slots.

use super::message::Message;
use std::sync::Arc;

/// Handles a window message.
///
/// Return `Some(result)` to claim the message with that result, or `None` to
/// let routing fall through to the next handler in line.
///
/// Any `Fn(&Message) -> Option<isize>` closure that is `Send + Sync` is a
/// handler. Handlers take `&self`: the registry may invoke the same handler
/// re-entrantly (e.g. a close handler that destroys its window receives the
/// nested destroy message before it returns), so state belongs behind
/// interior mutability.
pub trait Handler: Send + Sync {
    /// Handles a window message.
    fn handle(&self, msg: &Message) -> Option<isize>;
}

impl<F> Handler for F
where
    F: Fn(&Message) -> Option<isize> + Send + Sync,
{
    #[inline]
    fn handle(&self, msg: &Message) -> Option<isize> {
        self(msg)
    }
}

/// A reference-counted, type-erased handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Wraps a handler for storage in a table or registry slot.
#[inline]
pub fn shared<H: Handler + 'static>(handler: H) -> SharedHandler {
    Arc::new(handler)
}

/// A handler that claims every message with a fixed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Always(pub isize);

impl Handler for Always {
    fn handle(&self, _msg: &Message) -> Option<isize> {
        Some(self.0)
    }
}

/// A handler that never claims a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ignore;

impl Handler for Ignore {
    fn handle(&self, _msg: &Message) -> Option<isize> {
        None
    }
}
