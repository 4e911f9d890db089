//! Native entry points for the dispatch registry.
//!
//! [`window_proc`] and [`dialog_proc`] are the single `WNDPROC`/`DLGPROC`
//! every window class or dialog can use. Each forwards to the [`Registry`]
//! bound to it with [`bind_window_registry`] or [`bind_dialog_registry`];
//! unclaimed messages go to `DefWindowProcW` (windows) or back to the dialog
//! manager (dialogs).

use crate::dispatch::{shared, HandlerTable, Message, Registry, SharedHandler, WindowHandle};
use crate::error::{Error, Result};
use crate::string::WideString;
use std::cell::Cell;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use windows::Win32::Foundation::{HMODULE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, HBRUSH, WHITE_BRUSH};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, IsWindow,
    LoadCursorW, PeekMessageW, PostQuitMessage, RegisterClassExW, ShowWindow, TranslateMessage,
    UnregisterClassW, CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, IDC_ARROW, MSG,
    PM_REMOVE, SHOW_WINDOW_CMD, SW_HIDE, SW_SHOW, SW_SHOWDEFAULT, WINDOW_EX_STYLE, WINDOW_STYLE,
    WM_INITDIALOG, WM_NCCREATE, WM_QUIT, WNDCLASSEXW, WS_CAPTION, WS_OVERLAPPEDWINDOW,
    WS_SYSMENU, WS_VISIBLE,
};

/// Which native procedure a registry is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcKind {
    /// [`window_proc`]
    Window,
    /// [`dialog_proc`]
    Dialog,
}

static WINDOW_REGISTRY: RwLock<Option<Arc<Registry>>> = RwLock::new(None);
static DIALOG_REGISTRY: RwLock<Option<Arc<Registry>>> = RwLock::new(None);

impl ProcKind {
    fn slot(self) -> &'static RwLock<Option<Arc<Registry>>> {
        match self {
            ProcKind::Window => &WINDOW_REGISTRY,
            ProcKind::Dialog => &DIALOG_REGISTRY,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ProcKind::Window => "window_proc",
            ProcKind::Dialog => "dialog_proc",
        }
    }
}

/// Keeps a registry bound to a native procedure. Dropping it unbinds.
#[must_use = "the registry is unbound when the binding is dropped"]
#[derive(Debug)]
pub struct Binding {
    kind: ProcKind,
    registry: Arc<Registry>,
}

impl Binding {
    /// The bound registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The procedure this binding feeds.
    pub fn kind(&self) -> ProcKind {
        self.kind
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        let mut slot = self.kind.slot().write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, &self.registry)) {
            *slot = None;
            log::debug!("Unbound registry from {}", self.kind.name());
        }
    }
}

/// Binds `registry` to the procedure `kind`.
///
/// # Errors
///
/// Returns [`Error::AlreadyBound`] if another registry is bound to it.
pub fn bind(kind: ProcKind, registry: Arc<Registry>) -> Result<Binding> {
    let mut slot = kind.slot().write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(Error::AlreadyBound { context: kind.name() });
    }
    *slot = Some(Arc::clone(&registry));
    log::debug!("Bound registry to {}", kind.name());
    Ok(Binding { kind, registry })
}

/// Binds `registry` to [`window_proc`].
pub fn bind_window_registry(registry: Arc<Registry>) -> Result<Binding> {
    bind(ProcKind::Window, registry)
}

/// Binds `registry` to [`dialog_proc`].
pub fn bind_dialog_registry(registry: Arc<Registry>) -> Result<Binding> {
    bind(ProcKind::Dialog, registry)
}

/// Returns the registry bound to `kind`.
///
/// # Errors
///
/// Returns [`Error::NotBound`] if nothing is bound.
pub fn bound_registry(kind: ProcKind) -> Result<Arc<Registry>> {
    kind.slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(Error::NotBound { context: kind.name() })
}

const PENDING_TAG: u64 = 0x5348_494D_5441_424C;

/// A handler table handed to a window before it has a handle.
///
/// Pass it as the creation parameter (`lpParam` of `CreateWindowExW`, or
/// `dwInitParam` of `CreateDialogParamW`/`DialogBoxParamW`) and the native
/// procedure registers the table on `WM_NCCREATE` or `WM_INITDIALOG`, so no
/// message after creation is missed. The value must outlive the creating
/// call.
pub struct PendingTable {
    tag: u64,
    table: Cell<Option<HandlerTable>>,
}

impl PendingTable {
    /// Wraps `table` for delivery at creation.
    pub fn new(table: HandlerTable) -> Self {
        Self {
            tag: PENDING_TAG,
            table: Cell::new(Some(table)),
        }
    }

    /// Pointer to pass as `lpParam` of `CreateWindowExW`.
    pub fn as_create_param(&self) -> *const c_void {
        self as *const Self as *const c_void
    }

    /// Value to pass as `dwInitParam` of the dialog creation functions.
    pub fn as_lparam(&self) -> LPARAM {
        LPARAM(self as *const Self as isize)
    }

    /// Takes the table back if the procedure never claimed it.
    pub fn take(&self) -> Option<HandlerTable> {
        self.table.take()
    }

    /// # Safety
    ///
    /// `ptr` must be null or point to readable memory at least as large as a
    /// `u64`; if that starts with the tag it must be a live `PendingTable`.
    unsafe fn claim(ptr: *const c_void) -> Option<HandlerTable> {
        if ptr.is_null() {
            return None;
        }
        let pending = &*(ptr as *const PendingTable);
        if pending.tag != PENDING_TAG {
            return None;
        }
        pending.table.take()
    }
}

fn register_pending(registry: &Registry, hwnd: HWND, table: HandlerTable) {
    registry.register_created(WindowHandle::from(hwnd), table);
}

/// The shared window procedure.
///
/// Routes every message through the registry bound with
/// [`bind_window_registry`], falling back to `DefWindowProcW`.
///
/// # Safety
///
/// Called by Windows with the parameters of a message for a window whose
/// class uses this procedure. A `lpParam` given to `CreateWindowExW` must be
/// null or a live [`PendingTable`].
pub unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let Ok(registry) = bound_registry(ProcKind::Window) else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    if msg == WM_NCCREATE {
        // SAFETY: during WM_NCCREATE, lparam points to a CREATESTRUCTW.
        let create = &*(lparam.0 as *const CREATESTRUCTW);
        if let Some(table) = PendingTable::claim(create.lpCreateParams) {
            register_pending(&registry, hwnd, table);
        }
    }

    let message = Message::new(WindowHandle::from(hwnd), msg, wparam.0, lparam.0);
    let result = registry.dispatch(&message, |m| {
        // SAFETY: forwards the parameters Windows handed us unchanged.
        DefWindowProcW(hwnd, m.id, WPARAM(m.wparam), LPARAM(m.lparam)).0
    });
    LRESULT(result)
}

/// The shared dialog procedure.
///
/// Routes every message through the registry bound with
/// [`bind_dialog_registry`]. Handler results are returned to the dialog
/// manager as-is, so handlers answer with the `INT_PTR` it expects
/// (usually `TRUE` when handled). Unclaimed messages return `FALSE`.
///
/// # Safety
///
/// Called by Windows for a dialog created with this procedure. A
/// `dwInitParam` given at creation must be zero or a live [`PendingTable`].
pub unsafe extern "system" fn dialog_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> isize {
    let Ok(registry) = bound_registry(ProcKind::Dialog) else {
        return 0;
    };

    if msg == WM_INITDIALOG {
        if let Some(table) = PendingTable::claim(lparam.0 as *const c_void) {
            register_pending(&registry, hwnd, table);
        }
    }

    let message = Message::new(WindowHandle::from(hwnd), msg, wparam.0, lparam.0);
    registry.dispatch(&message, |_| 0)
}

/// A handler that ends the message loop; install it for `WM_DESTROY` on the
/// main window.
pub fn quit_on_destroy(exit_code: i32) -> SharedHandler {
    shared(move |_: &Message| {
        // SAFETY: PostQuitMessage only posts WM_QUIT to this thread's queue.
        unsafe { PostQuitMessage(exit_code) };
        Some(0)
    })
}

/// Window styles for creating windows.
#[derive(Clone, Copy, Debug)]
pub struct Style(pub WINDOW_STYLE);

impl Style {
    /// A standard overlapped window with title bar, border, and system menu.
    pub const OVERLAPPED: Self = Self(WS_OVERLAPPEDWINDOW);
    /// A window with a caption.
    pub const CAPTION: Self = Self(WS_CAPTION);
    /// A window with a system menu.
    pub const SYSMENU: Self = Self(WS_SYSMENU);
    /// A visible window.
    pub const VISIBLE: Self = Self(WS_VISIBLE);

    /// Combines two styles.
    pub fn with(self, other: Self) -> Self {
        Self(WINDOW_STYLE(self.0 .0 | other.0 .0))
    }
}

/// Show window commands.
#[derive(Clone, Copy, Debug)]
pub struct ShowCommand(pub SHOW_WINDOW_CMD);

impl ShowCommand {
    /// Shows the window in its default state.
    pub const DEFAULT: Self = Self(SW_SHOWDEFAULT);
    /// Shows the window normally.
    pub const SHOW: Self = Self(SW_SHOW);
    /// Hides the window.
    pub const HIDE: Self = Self(SW_HIDE);
}

static CLASS_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Builder for windows routed through [`window_proc`].
pub struct WindowBuilder {
    class_name: Option<String>,
    title: String,
    style: Style,
    ex_style: WINDOW_EX_STYLE,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowBuilder {
    /// Creates a builder: overlapped style, system-chosen position and size.
    pub fn new() -> Self {
        Self {
            class_name: None,
            title: String::from("Window"),
            style: Style::OVERLAPPED,
            ex_style: WINDOW_EX_STYLE(0),
            x: CW_USEDEFAULT,
            y: CW_USEDEFAULT,
            width: CW_USEDEFAULT,
            height: CW_USEDEFAULT,
        }
    }

    /// Sets the window class name. A unique name is generated otherwise.
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// Sets the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the window style.
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Sets the extended window style.
    pub fn ex_style(mut self, ex_style: WINDOW_EX_STYLE) -> Self {
        self.ex_style = ex_style;
        self
    }

    /// Sets the window position.
    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Sets the window size.
    pub fn size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Registers a class using [`window_proc`], creates the window, and
    /// registers `table` for it before its first message is routed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotBound`] if no registry is bound to
    /// [`window_proc`], or the native error if class registration or window
    /// creation fails.
    pub fn build(self, table: HandlerTable) -> Result<Window> {
        let registry = bound_registry(ProcKind::Window)?;

        let class_name = self.class_name.unwrap_or_else(|| {
            format!(
                "Win32Shim_{}_{}",
                std::process::id(),
                CLASS_COUNTER.fetch_add(1, Ordering::Relaxed)
            )
        });
        let class_name = WideString::new(&class_name);
        // SAFETY: GetModuleHandleW(None) returns the current executable's handle.
        let hinstance = crate::api_call!(GetModuleHandleW, unsafe { GetModuleHandleW(None) })?;

        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            // SAFETY: loads a shared system cursor.
            hCursor: crate::api_call!(LoadCursorW, unsafe { LoadCursorW(None, IDC_ARROW) })?,
            // SAFETY: stock objects are never freed.
            hbrBackground: unsafe { HBRUSH(GetStockObject(WHITE_BRUSH).0) },
            lpszClassName: class_name.as_pcwstr(),
            ..Default::default()
        };

        // SAFETY: wc is fully initialized and class_name outlives the call.
        if unsafe { RegisterClassExW(&wc) } == 0 {
            return Err(crate::error::last_api_error("RegisterClassExW"));
        }

        let pending = PendingTable::new(table);
        let title = WideString::new(&self.title);
        // SAFETY: strings are null-terminated and alive; `pending` outlives
        // the call and is claimed by window_proc on WM_NCCREATE.
        let created = crate::api_call!(CreateWindowExW, unsafe {
            CreateWindowExW(
                self.ex_style,
                class_name.as_pcwstr(),
                title.as_pcwstr(),
                self.style.0,
                self.x,
                self.y,
                self.width,
                self.height,
                None,
                None,
                hinstance,
                Some(pending.as_create_param()),
            )
        });

        let hwnd = match created {
            Ok(hwnd) => hwnd,
            Err(e) => {
                // SAFETY: the class was registered above and has no windows.
                let _ = unsafe { UnregisterClassW(class_name.as_pcwstr(), hinstance) };
                return Err(e);
            }
        };

        if let Some(table) = pending.take() {
            register_pending(&registry, hwnd, table);
        }

        Ok(Window {
            hwnd,
            class_name,
            hinstance,
        })
    }
}

/// A window created by [`WindowBuilder`]. Destroyed on drop.
pub struct Window {
    hwnd: HWND,
    class_name: WideString,
    hinstance: HMODULE,
}

impl Window {
    /// Returns the native window handle.
    #[inline]
    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Returns the registry key of this window.
    #[inline]
    pub fn handle(&self) -> WindowHandle {
        WindowHandle::from(self.hwnd)
    }

    /// Shows the window.
    pub fn show(&self, cmd: ShowCommand) {
        // SAFETY: ShowWindow tolerates any window handle.
        unsafe {
            let _ = ShowWindow(self.hwnd, cmd.0);
        }
    }

    /// Returns true while the native window exists.
    pub fn is_alive(&self) -> bool {
        // SAFETY: IsWindow accepts stale handles.
        unsafe { IsWindow(self.hwnd).as_bool() }
    }

    /// Destroys the window now. Equivalent to dropping it.
    pub fn destroy(self) {}
}

impl Drop for Window {
    fn drop(&mut self) {
        // SAFETY: the window and class were created by WindowBuilder::build.
        // DestroyWindow delivers WM_DESTROY, which unregisters the table.
        unsafe {
            if IsWindow(self.hwnd).as_bool() {
                let _ = DestroyWindow(self.hwnd);
            }
            let _ = UnregisterClassW(self.class_name.as_pcwstr(), self.hinstance);
        }
    }
}

/// Runs the message loop until `WM_QUIT` is received.
///
/// Returns the exit code passed to `PostQuitMessage`.
pub fn run_message_loop() -> i32 {
    let mut msg = MSG::default();

    // SAFETY: msg is a valid out-parameter; None receives messages for
    // every window of this thread.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    msg.wParam.0 as i32
}

/// Processes pending messages without blocking.
///
/// Returns `true` if `WM_QUIT` was received.
pub fn process_messages() -> bool {
    let mut msg = MSG::default();

    // SAFETY: as in run_message_loop; PM_REMOVE dequeues what is read.
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return true;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ids, Always};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // The procedure slots are process-wide; tests that bind run one at a time.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> std::sync::MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_bind_twice_fails_and_drop_unbinds() {
        let _serial = serial();
        let first = bind_dialog_registry(Arc::new(Registry::new())).unwrap();
        let second = bind_dialog_registry(Arc::new(Registry::new()));
        assert!(matches!(second, Err(Error::AlreadyBound { .. })));

        let bound = bound_registry(ProcKind::Dialog).unwrap();
        assert!(Arc::ptr_eq(&bound, first.registry()));

        drop(first);
        assert!(matches!(
            bound_registry(ProcKind::Dialog),
            Err(Error::NotBound { .. })
        ));
    }

    #[test]
    fn test_build_requires_binding() {
        let _serial = serial();
        let result = WindowBuilder::new().build(HandlerTable::new());
        assert!(matches!(result, Err(Error::NotBound { .. })));
    }

    #[test]
    fn test_pending_table_is_claimed_once() {
        let pending = PendingTable::new(HandlerTable::new().on(ids::PAINT, Always(1)));
        // SAFETY: points at a live PendingTable.
        let claimed = unsafe { PendingTable::claim(pending.as_create_param()) };
        assert!(claimed.is_some());
        assert!(unsafe { PendingTable::claim(pending.as_create_param()) }.is_none());
        assert!(pending.take().is_none());
        assert!(unsafe { PendingTable::claim(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_window_lifecycle_routes_and_unregisters() {
        let _serial = serial();
        let binding = bind_window_registry(Arc::new(Registry::new())).unwrap();
        let registry = Arc::clone(binding.registry());

        let user_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&user_calls);
        let table = HandlerTable::new().on(ids::USER + 1, move |m: &Message| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(m.wparam as isize * 2)
        });

        let window = WindowBuilder::new()
            .title("dispatch test")
            .style(Style::CAPTION)
            .build(table)
            .unwrap();
        let handle = window.handle();
        assert!(registry.is_registered(handle));

        use windows::Win32::UI::WindowsAndMessaging::SendMessageW;
        // SAFETY: the window is alive and owned by this thread.
        let result =
            unsafe { SendMessageW(window.hwnd(), ids::USER + 1, WPARAM(21), LPARAM(0)) };
        assert_eq!(result.0, 42);
        assert_eq!(user_calls.load(Ordering::SeqCst), 1);

        drop(window);
        assert!(!registry.is_registered(handle));
    }

    #[test]
    fn test_aborted_creation_leaves_no_table() {
        let _serial = serial();
        let binding = bind_window_registry(Arc::new(Registry::new())).unwrap();
        let registry = Arc::clone(binding.registry());

        // Returning FALSE from WM_NCCREATE aborts creation; only
        // WM_NCDESTROY follows.
        let table = HandlerTable::new().on(ids::NCCREATE, Always(0));
        let result = WindowBuilder::new().title("aborted").build(table);
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dialog_proc_routes_through_bound_registry() {
        let _serial = serial();
        let hwnd = HWND(0x5150 as *mut c_void);
        let handle = WindowHandle::from(hwnd);

        // SAFETY: dialog_proc only reads the pending table behind lparam and
        // never calls into Windows for these messages.
        unsafe {
            assert_eq!(dialog_proc(hwnd, ids::USER, WPARAM(0), LPARAM(0)), 0);
        }

        let binding = bind_dialog_registry(Arc::new(Registry::new())).unwrap();
        let registry = Arc::clone(binding.registry());

        let pending = PendingTable::new(
            HandlerTable::new()
                .on(ids::INITDIALOG, Always(1))
                .on(ids::USER, |m: &Message| Some(m.wparam as isize + 1)),
        );
        unsafe {
            assert_eq!(dialog_proc(hwnd, ids::INITDIALOG, WPARAM(0), pending.as_lparam()), 1);
            assert!(pending.take().is_none());
            assert!(registry.is_registered(handle));

            assert_eq!(dialog_proc(hwnd, ids::USER, WPARAM(6), LPARAM(0)), 7);
            assert_eq!(dialog_proc(hwnd, ids::USER + 1, WPARAM(0), LPARAM(0)), 0);

            assert_eq!(dialog_proc(hwnd, ids::DESTROY, WPARAM(0), LPARAM(0)), 0);
        }
        assert!(!registry.is_registered(handle));
    }
}
