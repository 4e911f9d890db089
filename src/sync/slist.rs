use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ptr;
use windows::Win32::System::Kernel::{SLIST_ENTRY, SLIST_HEADER};
use windows::Win32::System::Threading::{
    InitializeSListHead, InterlockedFlushSList, InterlockedPopEntrySList,
    InterlockedPushEntrySList, QueryDepthSList,
};

// Interlocked lists require MEMORY_ALLOCATION_ALIGNMENT (16 on 64-bit).
#[repr(C, align(16))]
struct Header(UnsafeCell<SLIST_HEADER>);

#[repr(C, align(16))]
struct Node<T> {
    // Must stay the first field: entries are cast back to nodes.
    entry: SLIST_ENTRY,
    value: T,
}

/// A lock-free LIFO stack on the native interlocked singly-linked list.
///
/// `push` and `pop` are single atomic operations; any number of threads may
/// use the list concurrently.
pub struct SList<T> {
    head: Box<Header>,
    _owns: PhantomData<T>,
}

// SAFETY: values move between threads only through the interlocked list.
unsafe impl<T: Send> Send for SList<T> {}
unsafe impl<T: Send> Sync for SList<T> {}

impl<T> Default for SList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        let head = Box::new(Header(UnsafeCell::new(SLIST_HEADER::default())));
        // SAFETY: head is aligned, writable, and never moves.
        unsafe { InitializeSListHead(head.0.get()) };
        Self {
            head,
            _owns: PhantomData,
        }
    }

    fn header(&self) -> *mut SLIST_HEADER {
        self.head.0.get()
    }

    /// Pushes `value` onto the list.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            entry: SLIST_ENTRY::default(),
            value,
        }));
        // SAFETY: node is a live, aligned allocation whose ownership moves
        // into the list until popped or flushed.
        unsafe {
            InterlockedPushEntrySList(self.header(), ptr::addr_of!((*node).entry));
        }
    }

    /// Pops the most recently pushed value.
    pub fn pop(&self) -> Option<T> {
        // SAFETY: every entry in the list is the first field of a boxed Node<T>.
        unsafe {
            let entry = InterlockedPopEntrySList(self.header());
            if entry.is_null() {
                None
            } else {
                let node = Box::from_raw(entry as *mut Node<T>);
                Some(node.value)
            }
        }
    }

    /// Atomically takes every entry, most recently pushed first.
    pub fn flush(&self) -> Vec<T> {
        let mut values = Vec::new();
        // SAFETY: the flushed chain is no longer reachable through the list,
        // so this thread owns every node in it.
        unsafe {
            let mut entry = InterlockedFlushSList(self.header());
            while !entry.is_null() {
                let node = Box::from_raw(entry as *mut Node<T>);
                entry = node.entry.Next;
                values.push(node.value);
            }
        }
        values
    }

    /// Number of entries. Only a snapshot under concurrent use; the native
    /// counter wraps at `u16::MAX`.
    pub fn depth(&self) -> usize {
        // SAFETY: the header is initialized.
        usize::from(unsafe { QueryDepthSList(self.header()) })
    }

    /// Returns true if the list had no entries at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }
}

impl<T> Drop for SList<T> {
    fn drop(&mut self) {
        drop(self.flush());
    }
}
