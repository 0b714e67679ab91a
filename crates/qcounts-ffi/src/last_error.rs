//! Per-thread storage for the most recent failure diagnostic.

use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::ptr;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record `message` as this thread's last error.
pub(crate) fn set(message: &str) {
    // Interior NULs would truncate the C string; keep the rest of the text.
    let sanitized = message.replace('\0', " ");
    let cstring = CString::new(sanitized).unwrap_or_default();
    LAST_ERROR.with_borrow_mut(|slot| *slot = Some(cstring));
}

pub(crate) fn clear() {
    LAST_ERROR.with_borrow_mut(|slot| *slot = None);
}

/// Pointer to this thread's last error, or null. Valid until the next call
/// into this library from the same thread.
pub(crate) fn as_ptr() -> *const c_char {
    LAST_ERROR.with_borrow(|slot| slot.as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}
