/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Internal crate of [**gdbind**](https://docs.rs/gdbind)
//!
//! Do not depend on this crate directly, instead use the `gdbind` crate.
//! No SemVer or other guarantees are provided.

#![cfg_attr(test, allow(unused))]

pub mod builtin;
pub mod classes;
pub mod global;
pub mod init;
pub mod meta;
pub mod obj;
pub mod registry;

mod storage;

#[doc(hidden)]
pub use gdbind_ffi as sys;
#[doc(hidden)]
pub use gdbind_ffi::out;

/// Items used by macros and callbacks; not part of the public API.
#[doc(hidden)]
pub mod private {
    pub use crate::registry::callbacks;
    pub use crate::registry::plugin::{ClassPlugin, PluginItem, __gdbind_plugin_CLASS_PLUGINS};

    use crate::sys;

    /// Runs `code`, converting a panic into an error message that is logged together with `error_context`.
    ///
    /// Every callback invoked by the engine must go through this, since unwinding across the C boundary aborts the process.
    pub fn handle_panic<E, F, R, S>(error_context: E, code: F) -> Result<R, String>
    where
        E: FnOnce() -> S,
        F: FnOnce() -> R + std::panic::UnwindSafe,
        S: std::fmt::Display,
    {
        match std::panic::catch_unwind(code) {
            Ok(result) => Ok(result),
            Err(err) => {
                let msg = sys::extract_panic_message(err.as_ref());
                log::error!("{}: {msg}", error_context());
                Err(msg)
            }
        }
    }
}
