/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Functions and macros that are not very specific to gdbind, but come in handy.

use std::ffi::{c_char, CStr};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Macros

/// Verifies a condition at compile time.
// https://blog.rust-lang.org/2021/12/02/Rust-1.57.0.html#panic-in-const-contexts
#[macro_export]
macro_rules! static_assert {
    ($cond:expr) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:literal) => {
        const _: () = assert!($cond, $msg);
    };
}

/// Trace output.
#[cfg(feature = "trace")]
#[macro_export]
macro_rules! out {
    ()                          => ($crate::__log::trace!(""));
    ($fmt:literal)              => ($crate::__log::trace!($fmt));
    ($fmt:literal, $($arg:tt)*) => ($crate::__log::trace!($fmt, $($arg)*));
}

/// Trace output.
#[cfg(not(feature = "trace"))]
#[macro_export]
macro_rules! out {
    ()                          => ({});
    ($fmt:literal)              => ({ let _ = format_args!($fmt); });
    ($fmt:literal, $($arg:tt)*) => ({ let _ = format_args!($fmt, $($arg)*); });
}

#[doc(hidden)]
pub use log as __log;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Utility functions

/// If `ptr` is not null, returns `Some(mapper(ptr))`; otherwise `None`.
#[inline]
pub fn ptr_then<T, R, F>(ptr: *mut T, mapper: F) -> Option<R>
where
    F: FnOnce(*mut T) -> R,
{
    // Could also use NonNull in signature, but for this project we always deal with FFI raw pointers
    if ptr.is_null() {
        None
    } else {
        Some(mapper(ptr))
    }
}

/// Returns a C `const char*` for a null-terminated byte string.
#[inline]
pub fn c_str(s: &[u8]) -> *const c_char {
    // Ensure null-terminated
    debug_assert!(!s.is_empty() && s[s.len() - 1] == 0);

    s.as_ptr() as *const c_char
}

/// Copies a C string owned by the engine into a Rust string. Null yields an empty string.
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string.
pub unsafe fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }

    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Extracts a function pointer loaded from the engine, panicking with its name if absent.
#[track_caller]
pub fn unwrap_fn<F>(function: Option<F>, name: &str) -> F {
    match function {
        Some(f) => f,
        None => panic!("engine interface function `{name}` is null"),
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn extract_panic_message(err: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        format!("(panic of type ID {:?})", err.type_id())
    }
}
