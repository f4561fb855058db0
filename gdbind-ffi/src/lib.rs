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
//!
//! Contains the C ABI of the engine boundary, the argument frame used to marshal every native call, per-class method-bind tables
//! and the process-wide binding storage.

#![cfg_attr(test, allow(unused))]

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Validations

// Handles are pointer-sized words; frames rely on that.
#[cfg(not(target_pointer_width = "64"))]
compile_error!("gdbind currently only supports 64-bit targets");

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Modules

mod binding;
mod config;
mod conv;
mod error;
mod extension_api;
mod frame;
mod global;
mod godot_ffi;
mod init_level;
mod interface;
mod method_table;
mod plugins;
mod toolbox;

#[cfg(feature = "mock-engine")]
pub mod mock;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Public re-exports

// See https://github.com/dtolnay/paste/issues/69#issuecomment-962418430
// and https://users.rust-lang.org/t/proc-macros-using-third-party-crate/42465/4
#[doc(hidden)]
pub use paste;

pub use binding::*;
pub use config::{BindingConfig, Safeguards};
pub use conv::*;
pub use error::BindingError;
pub use extension_api::{ApiClass, ApiMethod, ExtensionApi};
pub use frame::{CallFrame, Nil, PtrArgs, PtrReturn, Ret, MAX_ARGS, SLOT_SIZE};
pub use global::*;
pub use godot_ffi::GodotFfi;
pub use init_level::InitLevel;
pub use interface::*;
pub use method_table::{
    BindResolver, ClassMethodBind, ClassMethodTable, MethodDescriptor, MethodTable, ResolveState,
};
pub use toolbox::*;

// Registry of all static per-class method tables, filled at load time by the class wrappers.
plugin_registry!(pub METHOD_TABLES: &'static ClassMethodTable);

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Macros

/// Access a function of the loaded engine interface.
///
/// The binding must have been initialized; all function pointers are non-null after a successful load.
#[macro_export]
#[doc(hidden)]
macro_rules! interface_fn {
    ($name:ident) => {{
        unsafe { $crate::get_interface().$name.unwrap_unchecked() }
    }};
}
