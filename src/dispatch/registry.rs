//! The process-wide handle→table registry and its routing logic.

use super::handler::{shared, Handler, SharedHandler};
use super::message::{ids, Message, MessageId, WindowHandle};
use super::table::HandlerTable;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

/// What [`Registry::register`] does when the handle already holds a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`Error::AlreadyRegistered`] and keep the existing table.
    #[default]
    Reject,
    /// Replace the existing table and hand it back to the caller.
    Replace,
}

/// Which handler produced a routed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// The global pre-processing handler short-circuited routing.
    PreHandler,
    /// The table's handler for the message id.
    Table,
    /// The table's default slot.
    TableDefault,
    /// The registry's global default handler.
    GlobalDefault,
    /// Nothing claimed the message; the native default applies.
    Native,
}

/// Configuration for a [`Registry`].
#[derive(Clone, Debug)]
pub struct RegistryBuilder {
    policy: DuplicatePolicy,
    cleanup_message: MessageId,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            policy: DuplicatePolicy::Reject,
            cleanup_message: ids::DESTROY,
        }
    }
}

impl RegistryBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what happens on double registration. Defaults to
    /// [`DuplicatePolicy::Reject`].
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the message whose delivery unregisters the target handle.
    /// Defaults to [`ids::DESTROY`].
    pub fn cleanup_message(mut self, id: MessageId) -> Self {
        self.cleanup_message = id;
        self
    }

    /// Creates the registry.
    pub fn build(self) -> Registry {
        Registry {
            tables: Mutex::new(HashMap::new()),
            pre_handler: RwLock::new(None),
            default_handler: RwLock::new(None),
            policy: self.policy,
            cleanup_message: self.cleanup_message,
        }
    }
}

/// Routes messages for many windows through one entry point.
///
/// Each registered window owns a [`HandlerTable`]. The registry itself is an
/// ordinary owned value; share it with `Arc` and bind it to the native
/// procedures (see [`crate::window`]) for as long as windows use it.
///
/// Registration, unregistration and dispatch may run on any thread. The
/// internal lock is released before any handler runs, so handlers can call
/// back into the registry.
///
/// # Example
///
/// ```
/// use win32_shim::dispatch::{ids, HandlerTable, Message, Registry, WindowHandle};
///
/// let registry = Registry::new();
/// let hwnd = WindowHandle::from_raw(42);
/// registry.register(hwnd, HandlerTable::new().on(ids::PAINT, |_: &Message| Some(0isize)))?;
///
/// let native = |_: &Message| -1isize;
/// assert_eq!(registry.dispatch(&Message::new(hwnd, ids::PAINT, 0, 0), native), 0);
/// assert_eq!(registry.dispatch(&Message::new(hwnd, ids::CLOSE, 0, 0), native), -1);
/// # Ok::<(), win32_shim::error::Error>(())
/// ```
pub struct Registry {
    tables: Mutex<HashMap<WindowHandle, HandlerTable>>,
    pre_handler: RwLock<Option<SharedHandler>>,
    default_handler: RwLock<Option<SharedHandler>>,
    policy: DuplicatePolicy,
    cleanup_message: MessageId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry that rejects double registration and cleans up on
    /// [`ids::DESTROY`].
    pub fn new() -> Self {
        RegistryBuilder::default().build()
    }

    /// Returns a builder for a customized registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The configured double-registration policy.
    #[inline]
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// The message whose delivery unregisters its target.
    #[inline]
    pub fn cleanup_message(&self) -> MessageId {
        self.cleanup_message
    }

    // A panicking handler never runs under this lock, so the map is
    // consistent even if the mutex is poisoned.
    fn tables(&self) -> MutexGuard<'_, HashMap<WindowHandle, HandlerTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `table` for `handle`.
    ///
    /// Returns the replaced table under [`DuplicatePolicy::Replace`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] if `handle` already holds a table
    /// and the policy is [`DuplicatePolicy::Reject`]. The existing table is
    /// left untouched.
    pub fn register(&self, handle: WindowHandle, table: HandlerTable) -> Result<Option<HandlerTable>> {
        let mut tables = self.tables();
        match self.policy {
            DuplicatePolicy::Reject if tables.contains_key(&handle) => {
                log::warn!("Registry: rejected second table for {handle}");
                Err(Error::AlreadyRegistered(handle))
            }
            _ => {
                let previous = tables.insert(handle, table);
                log::debug!(
                    "Registry: registered {handle} ({} windows){}",
                    tables.len(),
                    if previous.is_some() { ", replaced previous table" } else { "" }
                );
                Ok(previous)
            }
        }
    }

    /// Registers `table` for a handle that was just created, replacing any
    /// table left behind under the same value.
    ///
    /// A freshly created handle cannot own a live table, so this ignores the
    /// duplicate policy. Returns the stale table, if there was one.
    pub fn register_created(&self, handle: WindowHandle, table: HandlerTable) -> Option<HandlerTable> {
        let stale = self.tables().insert(handle, table);
        if stale.is_some() {
            log::warn!("Registry: dropped stale table left behind for {handle}");
        } else {
            log::debug!("Registry: registered new window {handle}");
        }
        stale
    }

    /// Removes the table for `handle`.
    ///
    /// Idempotent: unregistering an absent handle returns `None` and is not
    /// an error, since cleanup on destruction may race with a manual call.
    pub fn unregister(&self, handle: WindowHandle) -> Option<HandlerTable> {
        let removed = self.tables().remove(&handle);
        if removed.is_some() {
            log::debug!("Registry: unregistered {handle}");
        }
        removed
    }

    /// Returns true if `handle` has a table.
    pub fn is_registered(&self, handle: WindowHandle) -> bool {
        self.tables().contains_key(&handle)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.tables().len()
    }

    /// Returns true if no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.tables().is_empty()
    }

    /// Returns a snapshot of the table registered for `handle`.
    ///
    /// The snapshot shares handler instances with the registered table, so
    /// it compares equal to what was registered.
    pub fn table(&self, handle: WindowHandle) -> Option<HandlerTable> {
        self.tables().get(&handle).cloned()
    }

    /// Mutates the table registered for `handle` in place.
    ///
    /// Returns false if `handle` is not registered. `f` runs under the
    /// registry lock and must not call back into the registry.
    pub fn update<F>(&self, handle: WindowHandle, f: F) -> bool
    where
        F: FnOnce(&mut HandlerTable),
    {
        match self.tables().get_mut(&handle) {
            Some(table) => {
                f(table);
                true
            }
            None => false,
        }
    }

    /// Installs the pre-processing handler, invoked before any table lookup.
    ///
    /// If it claims a message, routing stops there.
    pub fn set_pre_handler<H: Handler + 'static>(&self, handler: H) {
        *self.pre_handler.write().unwrap_or_else(PoisonError::into_inner) = Some(shared(handler));
    }

    /// Removes the pre-processing handler.
    pub fn clear_pre_handler(&self) {
        *self.pre_handler.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Installs the global default handler, consulted for registered windows
    /// after their own table declined a message.
    pub fn set_default_handler<H: Handler + 'static>(&self, handler: H) {
        *self.default_handler.write().unwrap_or_else(PoisonError::into_inner) =
            Some(shared(handler));
    }

    /// Removes the global default handler.
    pub fn clear_default_handler(&self) {
        *self.default_handler.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn pre_handler(&self) -> Option<SharedHandler> {
        self.pre_handler.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn global_default(&self) -> Option<SharedHandler> {
        self.default_handler.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Routes `msg` and reports which handler produced the result.
    ///
    /// Returns `(Route::Native, None)` when nothing claimed the message.
    /// Delivery of the cleanup message unregisters the target handle after
    /// its handlers have run, whichever of them claimed it. So does
    /// [`ids::NCDESTROY`], the last message any window receives; a window
    /// whose creation is aborted never sees the cleanup message.
    pub fn route_traced(&self, msg: &Message) -> (Route, Option<isize>) {
        let routed = self.route_inner(msg);
        if msg.id == self.cleanup_message || msg.id == ids::NCDESTROY {
            self.unregister(msg.handle);
        }
        log::trace!("Registry: {:#06x} for {} -> {:?}", msg.id, msg.handle, routed);
        routed
    }

    fn route_inner(&self, msg: &Message) -> (Route, Option<isize>) {
        if let Some(pre) = self.pre_handler() {
            if let Some(result) = pre.handle(msg) {
                return (Route::PreHandler, Some(result));
            }
        }

        // Clone the handlers out so the lock is not held while they run.
        let Some((handler, table_default)) = self
            .tables()
            .get(&msg.handle)
            .map(|table| table.candidates(msg.id))
        else {
            return (Route::Native, None);
        };

        if let Some(result) = handler.and_then(|h| h.handle(msg)) {
            return (Route::Table, Some(result));
        }
        if let Some(result) = table_default.and_then(|h| h.handle(msg)) {
            return (Route::TableDefault, Some(result));
        }
        if let Some(result) = self.global_default().and_then(|h| h.handle(msg)) {
            return (Route::GlobalDefault, Some(result));
        }
        (Route::Native, None)
    }

    /// Routes `msg` without a native fallback.
    ///
    /// Returns `None` when nothing claimed the message.
    #[inline]
    pub fn route(&self, msg: &Message) -> Option<isize> {
        self.route_traced(msg).1
    }

    /// Routes `msg`, falling back to `native_default` when nothing claims it.
    ///
    /// Order: pre-processing handler, the window's handler for `msg.id`, the
    /// window's default slot, the global default handler, `native_default`.
    /// The pre-processing handler sees every message, including those for
    /// unregistered handles, so it can claim those too. Without one,
    /// unregistered handles always get `native_default`.
    pub fn dispatch<F>(&self, msg: &Message, native_default: F) -> isize
    where
        F: FnOnce(&Message) -> isize,
    {
        match self.route(msg) {
            Some(result) => result,
            None => native_default(msg),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("windows", &self.len())
            .field("policy", &self.policy)
            .field("cleanup_message", &self.cleanup_message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::{Always, Ignore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NATIVE: isize = -999;

    fn native(_: &Message) -> isize {
        NATIVE
    }

    fn h(raw: usize) -> WindowHandle {
        WindowHandle::from_raw(raw)
    }

    fn msg(handle: WindowHandle, id: MessageId) -> Message {
        Message::new(handle, id, 0, 0)
    }

    /// A handler that counts its invocations and answers with `result`.
    fn counting(counter: &Arc<AtomicUsize>, result: Option<isize>) -> impl Handler + 'static {
        let counter = Arc::clone(counter);
        move |_: &Message| {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        }
    }

    #[test]
    fn test_paint_destroy_scenario() {
        let registry = Registry::new();
        let paints = Arc::new(AtomicUsize::new(0));
        let destroys = Arc::new(AtomicUsize::new(0));
        let table = HandlerTable::new()
            .on(ids::PAINT, counting(&paints, Some(11)))
            .on(ids::DESTROY, counting(&destroys, Some(0)));
        registry.register(h(42), table).unwrap();

        assert_eq!(registry.dispatch(&msg(h(42), ids::PAINT), native), 11);
        assert_eq!(paints.load(Ordering::SeqCst), 1);

        assert_eq!(registry.dispatch(&msg(h(42), ids::DESTROY), native), 0);
        assert_eq!(destroys.load(Ordering::SeqCst), 1);
        assert!(!registry.is_registered(h(42)));

        assert_eq!(registry.dispatch(&msg(h(42), ids::PAINT), native), NATIVE);
        assert_eq!(paints.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistered_handle_gets_native_result() {
        let registry = Registry::new();
        registry
            .register(h(1), HandlerTable::new().on(ids::PAINT, Always(1)).or_else(Always(2)))
            .unwrap();
        registry.set_default_handler(Always(3));

        for id in [ids::PAINT, ids::CLOSE, ids::DESTROY, ids::USER + 5, ids::APP] {
            assert_eq!(registry.dispatch(&msg(h(99), id), native), NATIVE);
        }
        assert_eq!(registry.route_traced(&msg(h(99), ids::PAINT)), (Route::Native, None));
        assert!(registry.is_registered(h(1)));
    }

    #[test]
    fn test_handles_are_isolated() {
        let registry = Registry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        registry
            .register(h(1), HandlerTable::new().on(ids::PAINT, counting(&first, Some(1))))
            .unwrap();
        registry
            .register(h(2), HandlerTable::new().on(ids::PAINT, counting(&second, Some(2))))
            .unwrap();

        assert_eq!(registry.dispatch(&msg(h(1), ids::PAINT), native), 1);
        assert_eq!(registry.dispatch(&msg(h(1), ids::PAINT), native), 1);
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        assert_eq!(registry.dispatch(&msg(h(2), ids::PAINT), native), 2);
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_does_not_resurrect() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(h(5), HandlerTable::new().on(ids::CLOSE, counting(&calls, Some(0))))
            .unwrap();

        assert!(registry.unregister(h(5)).is_some());
        for _ in 0..3 {
            assert_eq!(registry.dispatch(&msg(h(5), ids::CLOSE), native), NATIVE);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = Registry::new();
        registry.register(h(5), HandlerTable::new()).unwrap();

        assert!(registry.unregister(h(5)).is_some());
        assert!(registry.unregister(h(5)).is_none());
        assert!(registry.unregister(h(6)).is_none());
    }

    #[test]
    fn test_not_handled_falls_to_table_default() {
        let registry = Registry::new();
        let table = HandlerTable::new()
            .on(ids::PAINT, Ignore)
            .or_else(|m: &Message| Some(m.id as isize + 1000));
        registry.register(h(7), table).unwrap();

        assert_eq!(
            registry.route_traced(&msg(h(7), ids::PAINT)),
            (Route::TableDefault, Some(ids::PAINT as isize + 1000))
        );
        // Ids missing from the table take the same path.
        assert_eq!(
            registry.dispatch(&msg(h(7), ids::CLOSE), native),
            ids::CLOSE as isize + 1000
        );
    }

    #[test]
    fn test_not_handled_without_default_falls_to_native() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(h(7), HandlerTable::new().on(ids::PAINT, counting(&calls, None)))
            .unwrap();

        assert_eq!(registry.dispatch(&msg(h(7), ids::PAINT), native), NATIVE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.dispatch(&msg(h(7), ids::USER), native), NATIVE);
    }

    #[test]
    fn test_declining_table_default_reaches_global_default() {
        let registry = Registry::new();
        registry
            .register(h(8), HandlerTable::new().on(ids::PAINT, Ignore).or_else(Ignore))
            .unwrap();
        registry.set_default_handler(Always(77));

        assert_eq!(
            registry.route_traced(&msg(h(8), ids::PAINT)),
            (Route::GlobalDefault, Some(77))
        );

        registry.clear_default_handler();
        assert_eq!(registry.dispatch(&msg(h(8), ids::PAINT), native), NATIVE);
    }

    #[test]
    fn test_set_replaces_registered_handler() {
        let registry = Registry::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        registry
            .register(h(3), HandlerTable::new().on(ids::PAINT, counting(&old, Some(1))))
            .unwrap();
        assert_eq!(registry.dispatch(&msg(h(3), ids::PAINT), native), 1);

        let replaced = registry.update(h(3), |table| {
            table.set(ids::PAINT, counting(&new, Some(2)));
        });
        assert!(replaced);

        assert_eq!(registry.dispatch(&msg(h(3), ids::PAINT), native), 2);
        assert_eq!(registry.dispatch(&msg(h(3), ids::PAINT), native), 2);
        assert_eq!(old.load(Ordering::SeqCst), 1);
        assert_eq!(new.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_unregistered_handle() {
        let registry = Registry::new();
        assert!(!registry.update(h(3), |table| {
            table.set(ids::PAINT, Ignore);
        }));
        assert!(!registry.is_registered(h(3)));
    }

    #[test]
    fn test_reject_policy_keeps_first_table() {
        let registry = Registry::new();
        assert_eq!(registry.duplicate_policy(), DuplicatePolicy::Reject);
        registry
            .register(h(4), HandlerTable::new().on(ids::PAINT, Always(1)))
            .unwrap();

        let err = registry
            .register(h(4), HandlerTable::new().on(ids::PAINT, Always(2)))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(handle) if handle == h(4)));

        assert_eq!(registry.dispatch(&msg(h(4), ids::PAINT), native), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_policy_returns_previous_table() {
        let registry = Registry::builder()
            .duplicate_policy(DuplicatePolicy::Replace)
            .build();
        let first = HandlerTable::new().on(ids::PAINT, Always(1));
        assert!(registry.register(h(4), first.clone()).unwrap().is_none());

        let previous = registry
            .register(h(4), HandlerTable::new().on(ids::PAINT, Always(2)))
            .unwrap();
        assert_eq!(previous, Some(first));
        assert_eq!(registry.dispatch(&msg(h(4), ids::PAINT), native), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_then_table_round_trip() {
        let registry = Registry::new();
        let table = HandlerTable::new()
            .on(ids::PAINT, Always(1))
            .on(ids::CLOSE, Ignore)
            .or_else(Always(0));
        registry.register(h(10), table.clone()).unwrap();

        assert_eq!(registry.table(h(10)), Some(table));
        assert_eq!(registry.table(h(11)), None);
    }

    #[test]
    fn test_pre_handler_short_circuits() {
        let registry = Registry::new();
        let table_calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(h(20), HandlerTable::new().on(ids::PAINT, counting(&table_calls, Some(1))))
            .unwrap();
        registry.set_pre_handler(|m: &Message| (m.id == ids::PAINT).then_some(500isize));

        assert_eq!(
            registry.route_traced(&msg(h(20), ids::PAINT)),
            (Route::PreHandler, Some(500))
        );
        assert_eq!(table_calls.load(Ordering::SeqCst), 0);

        // Declined messages continue to normal routing, even for unknown handles.
        assert_eq!(registry.dispatch(&msg(h(20), ids::CLOSE), native), NATIVE);
        assert_eq!(registry.dispatch(&msg(h(21), ids::PAINT), native), 500);

        registry.clear_pre_handler();
        assert_eq!(registry.dispatch(&msg(h(20), ids::PAINT), native), 1);
        assert_eq!(table_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleanup_runs_when_destroy_is_unhandled_or_preempted() {
        let registry = Registry::new();
        registry.register(h(30), HandlerTable::new()).unwrap();
        assert_eq!(registry.dispatch(&msg(h(30), ids::DESTROY), native), NATIVE);
        assert!(!registry.is_registered(h(30)));

        registry.register(h(31), HandlerTable::new()).unwrap();
        registry.set_pre_handler(|m: &Message| (m.id == ids::DESTROY).then_some(0isize));
        assert_eq!(registry.dispatch(&msg(h(31), ids::DESTROY), native), 0);
        assert!(!registry.is_registered(h(31)));
    }

    #[test]
    fn test_custom_cleanup_message() {
        let registry = Registry::builder().cleanup_message(ids::CLOSE).build();
        registry.register(h(40), HandlerTable::new()).unwrap();

        registry.dispatch(&msg(h(40), ids::DESTROY), native);
        assert!(registry.is_registered(h(40)));

        registry.dispatch(&msg(h(40), ids::CLOSE), native);
        assert!(!registry.is_registered(h(40)));
    }

    #[test]
    fn test_ncdestroy_without_destroy_unregisters() {
        // Aborted creation: the window only ever sees WM_NCDESTROY.
        let registry = Registry::new();
        registry
            .register(h(0x10), HandlerTable::new().on(ids::PAINT, Always(1)))
            .unwrap();

        assert_eq!(registry.dispatch(&msg(h(0x10), ids::NCDESTROY), native), NATIVE);
        assert!(!registry.is_registered(h(0x10)));

        registry
            .register(h(0x10), HandlerTable::new().on(ids::PAINT, Always(2)))
            .unwrap();
        assert_eq!(registry.dispatch(&msg(h(0x10), ids::PAINT), native), 2);
    }

    #[test]
    fn test_register_created_replaces_stale_table() {
        let registry = Registry::new();
        registry
            .register(h(0x11), HandlerTable::new().on(ids::PAINT, Always(1)))
            .unwrap();

        let fresh = HandlerTable::new().on(ids::PAINT, Always(2));
        let stale = registry.register_created(h(0x11), fresh).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(registry.dispatch(&msg(h(0x11), ids::PAINT), native), 2);

        assert!(registry.register_created(h(0x12), HandlerTable::new()).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_destroy_handler_sees_its_table_and_may_unregister_itself() {
        let registry = Arc::new(Registry::new());
        let weak = Arc::downgrade(&registry);
        let table = HandlerTable::new().on(ids::DESTROY, move |m: &Message| {
            let registry = weak.upgrade()?;
            assert!(registry.is_registered(m.handle));
            registry.unregister(m.handle);
            Some(0)
        });
        registry.register(h(50), table).unwrap();

        assert_eq!(registry.dispatch(&msg(h(50), ids::DESTROY), native), 0);
        assert!(!registry.is_registered(h(50)));
    }

    #[test]
    fn test_handler_may_dispatch_reentrantly() {
        // Mirrors DestroyWindow inside a close handler: the destroy message
        // is delivered before the close handler returns.
        let registry = Arc::new(Registry::new());
        let weak = Arc::downgrade(&registry);
        let destroyed = Arc::new(AtomicUsize::new(0));
        let table = HandlerTable::new()
            .on(ids::CLOSE, move |m: &Message| {
                let registry = weak.upgrade()?;
                registry.dispatch(&Message::new(m.handle, ids::DESTROY, 0, 0), native);
                Some(0)
            })
            .on(ids::DESTROY, counting(&destroyed, Some(0)));
        registry.register(h(60), table).unwrap();

        assert_eq!(registry.dispatch(&msg(h(60), ids::CLOSE), native), 0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(!registry.is_registered(h(60)));
    }

    #[test]
    fn test_handler_receives_parameters() {
        let registry = Registry::new();
        registry
            .register(
                h(70),
                HandlerTable::new().on(ids::USER, |m: &Message| Some(m.wparam as isize + m.lparam)),
            )
            .unwrap();

        let result = registry.dispatch(&Message::new(h(70), ids::USER, 40, 2), native);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_registration_from_other_threads() {
        let registry = Arc::new(Registry::new());
        let workers: Vec<_> = (1..=8usize)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let table = HandlerTable::new().on(ids::PAINT, Always(i as isize));
                    registry.register(h(i), table).unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(registry.len(), 8);
        for i in 1..=8usize {
            assert_eq!(registry.dispatch(&msg(h(i), ids::PAINT), native), i as isize);
        }
    }
}
