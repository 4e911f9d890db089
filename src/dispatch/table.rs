//! Per-window mapping from message identifier to handler.

use super::handler::{shared, Handler, SharedHandler};
use super::message::MessageId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps message identifiers to handlers for a single window.
///
/// Cloning a table is cheap and shares the handler instances, so a clone
/// compares equal to its source.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<MessageId, SharedHandler>,
    default: Option<SharedHandler>,
}

impl HandlerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` for `id`, returning the handler it replaced.
    pub fn set<H: Handler + 'static>(&mut self, id: MessageId, handler: H) -> Option<SharedHandler> {
        self.set_shared(id, shared(handler))
    }

    /// Installs an already-shared handler for `id`.
    pub fn set_shared(&mut self, id: MessageId, handler: SharedHandler) -> Option<SharedHandler> {
        self.handlers.insert(id, handler)
    }

    /// Returns the handler for `id`, if any.
    #[inline]
    pub fn get(&self, id: MessageId) -> Option<&SharedHandler> {
        self.handlers.get(&id)
    }

    /// Removes and returns the handler for `id`.
    pub fn remove(&mut self, id: MessageId) -> Option<SharedHandler> {
        self.handlers.remove(&id)
    }

    /// Returns true if a handler is installed for `id`.
    #[inline]
    pub fn contains(&self, id: MessageId) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Installs the fallback used when no per-message handler claims a message.
    pub fn set_default<H: Handler + 'static>(&mut self, handler: H) -> Option<SharedHandler> {
        self.default.replace(shared(handler))
    }

    /// Removes the fallback handler.
    pub fn clear_default(&mut self) -> Option<SharedHandler> {
        self.default.take()
    }

    /// Returns the fallback handler, if any.
    #[inline]
    pub fn default_handler(&self) -> Option<&SharedHandler> {
        self.default.as_ref()
    }

    /// Number of per-message handlers (the default slot is not counted).
    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if there are no per-message handlers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterates over the message ids that have a handler.
    pub fn message_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.handlers.keys().copied()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn on<H: Handler + 'static>(mut self, id: MessageId, handler: H) -> Self {
        self.set(id, handler);
        self
    }

    /// Builder form of [`set_default`](Self::set_default).
    #[must_use]
    pub fn or_else<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.set_default(handler);
        self
    }

    /// The handler that should see `id` first, and the table's fallback.
    pub(crate) fn candidates(&self, id: MessageId) -> (Option<SharedHandler>, Option<SharedHandler>) {
        (self.handlers.get(&id).cloned(), self.default.clone())
    }
}

fn same_handler(a: &SharedHandler, b: &SharedHandler) -> bool {
    Arc::ptr_eq(a, b)
}

impl PartialEq for HandlerTable {
    /// Two tables are equal when they route every id to the same handler
    /// instances.
    fn eq(&self, other: &Self) -> bool {
        let defaults_match = match (&self.default, &other.default) {
            (Some(a), Some(b)) => same_handler(a, b),
            (None, None) => true,
            _ => false,
        };
        defaults_match
            && self.handlers.len() == other.handlers.len()
            && self
                .handlers
                .iter()
                .all(|(id, a)| other.handlers.get(id).is_some_and(|b| same_handler(a, b)))
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("message_ids", &ids)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}
