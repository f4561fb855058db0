/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_void;
use std::fmt;
use std::ptr;

use crate::sys;
use sys::{interface_fn, GodotFfi};

/// Engine-owned string.
///
/// The value is a single opaque word managed by the engine. Creating, copying and destroying a `GString` goes through the engine
/// interface, so the binding must be initialized.
#[repr(C, align(8))]
pub struct GString {
    opaque: *mut c_void,
}

impl GString {
    pub fn new() -> Self {
        Self::from_str_sys("")
    }

    fn from_str_sys(text: &str) -> Self {
        let mut result = Self {
            opaque: ptr::null_mut(),
        };

        // SAFETY: `result` is a valid destination; the engine copies `len` bytes from `text`.
        unsafe {
            interface_fn!(string_new_with_utf8_chars_and_len)(
                result.string_sys_mut(),
                text.as_ptr().cast(),
                text.len() as sys::GDExtensionInt,
            );
        }
        result
    }

    /// Pointer to the opaque word, as expected by string interface functions.
    pub fn string_sys(&self) -> sys::GDExtensionConstStringPtr {
        ptr::addr_of!(self.opaque).cast()
    }

    fn string_sys_mut(&mut self) -> sys::GDExtensionStringPtr {
        ptr::addr_of_mut!(self.opaque).cast()
    }

    /// Number of UTF-8 bytes.
    pub fn len(&self) -> usize {
        // SAFETY: `self` is a valid string; a null buffer only queries the length.
        let len = unsafe { interface_fn!(string_to_utf8_chars)(self.string_sys(), ptr::null_mut(), 0) };
        len.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the contents into a Rust string.
    pub fn to_rust_string(&self) -> String {
        let len = self.len();
        let mut buf = vec![0u8; len];

        // SAFETY: `buf` has room for `len` bytes.
        unsafe {
            interface_fn!(string_to_utf8_chars)(
                self.string_sys(),
                buf.as_mut_ptr().cast(),
                len as sys::GDExtensionInt,
            );
        }

        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl Default for GString {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GString {
    fn clone(&self) -> Self {
        let mut result = Self {
            opaque: ptr::null_mut(),
        };

        // SAFETY: valid source string and uninitialized destination.
        unsafe { interface_fn!(string_new_copy)(result.string_sys_mut(), self.string_sys()) };
        result
    }
}

impl Drop for GString {
    fn drop(&mut self) {
        // SAFETY: the string is owned by this value and destroyed exactly once.
        unsafe { interface_fn!(string_destroy)(self.string_sys_mut()) };
    }
}

impl PartialEq for GString {
    fn eq(&self, other: &Self) -> bool {
        self.to_rust_string() == other.to_rust_string()
    }
}

impl Eq for GString {}

impl fmt::Display for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rust_string())
    }
}

impl fmt::Debug for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GString({:?})", self.to_rust_string())
    }
}

impl From<&str> for GString {
    fn from(s: &str) -> Self {
        Self::from_str_sys(s)
    }
}

impl From<&String> for GString {
    fn from(s: &String) -> Self {
        Self::from_str_sys(s)
    }
}

impl From<&GString> for String {
    fn from(s: &GString) -> Self {
        s.to_rust_string()
    }
}

// SAFETY: a string is one opaque word; all-zero is the engine's empty string.
unsafe impl GodotFfi for GString {
    type Repr = *mut c_void;

    fn to_repr(&self) -> Self::Repr {
        self.opaque
    }

    fn into_repr(self) -> Self::Repr {
        let opaque = self.opaque;
        std::mem::forget(self);
        opaque
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        Self { opaque: repr }
    }

    unsafe fn from_arg_repr(repr: &Self::Repr) -> Self {
        let mut result = Self {
            opaque: ptr::null_mut(),
        };

        // The engine keeps ownership of the argument; take an independent copy.
        interface_fn!(string_new_copy)(result.string_sys_mut(), ptr::from_ref(repr).cast());
        result
    }
}
