/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};

use crate::out;
use crate::sys;

pub use sys::{BindingConfig, Safeguards};

#[doc(hidden)]
pub unsafe fn __gdbind_load_library<E: ExtensionLibrary>(
    get_proc_address: sys::GDExtensionInterfaceGetProcAddress,
    library: sys::GDExtensionClassLibraryPtr,
    init: *mut sys::GDExtensionInitialization,
) -> sys::GDExtensionBool {
    let init_code = || {
        if init.is_null() {
            log::error!("extension entry point called without initialization struct");
            return false;
        }

        // A library loaded twice into the same process keeps the first binding.
        if sys::is_initialized() {
            log::warn!("binding already initialized; keeping existing interface");
        } else if let Err(err) = sys::initialize(get_proc_address, library, E::config()) {
            log::error!("cannot load engine interface: {err}");
            return false;
        }

        let init_params = sys::GDExtensionInitialization {
            minimum_initialization_level: E::min_level().to_sys(),
            userdata: std::ptr::null_mut(),
            initialize: Some(ffi_initialize_layer::<E>),
            deinitialize: Some(ffi_deinitialize_layer::<E>),
        };

        *init = init_params;
        true
    };

    let ctx = || "error when loading GDExtension library";
    let is_success = crate::private::handle_panic(ctx, AssertUnwindSafe(init_code));

    sys::bool_to_sys(is_success.unwrap_or(false))
}

static LOWER_LEVELS_LOADED: AtomicBool = AtomicBool::new(false);

unsafe extern "C" fn ffi_initialize_layer<E: ExtensionLibrary>(
    _userdata: *mut std::ffi::c_void,
    init_level: sys::GDExtensionInitializationLevel,
) {
    let level = InitLevel::from_sys(init_level);
    let ctx = || format!("failed to initialize GDExtension level `{level:?}`");

    let _ = crate::private::handle_panic(ctx, || {
        // The engine starts at the library's min level. Tables and classes of lower levels are loaded together with it.
        if level == E::min_level() && !LOWER_LEVELS_LOADED.swap(true, Relaxed) {
            for lower in InitLevel::ALL.into_iter().filter(|&l| l < level) {
                // SAFETY: called by the engine after the entry point, once per level.
                unsafe { gdbind_on_level_init(lower) };
            }
        }

        // SAFETY: see above.
        unsafe { gdbind_on_level_init(level) };
        E::on_level_init(level);
    });
}

unsafe extern "C" fn ffi_deinitialize_layer<E: ExtensionLibrary>(
    _userdata: *mut std::ffi::c_void,
    init_level: sys::GDExtensionInitializationLevel,
) {
    let level = InitLevel::from_sys(init_level);
    let ctx = || format!("failed to deinitialize GDExtension level `{level:?}`");

    let _ = crate::private::handle_panic(ctx, || {
        E::on_level_deinit(level);
        gdbind_on_level_deinit(level);

        if level == E::min_level() && LOWER_LEVELS_LOADED.swap(false, Relaxed) {
            for lower in InitLevel::ALL.into_iter().rev().filter(|&l| l < level) {
                gdbind_on_level_deinit(lower);
            }
        }
    });
}

/// Loads method tables and registers classes of `level`. Called before user code.
///
/// # Safety
/// The binding must be initialized. Must only be called once per level.
unsafe fn gdbind_on_level_init(level: InitLevel) {
    out!("init level {level:?}");

    sys::load_class_method_tables(level);
    crate::registry::class::auto_register_classes(level);
}

/// Unregisters classes of `level`. Called after user code.
fn gdbind_on_level_deinit(level: InitLevel) {
    out!("deinit level {level:?}");

    crate::registry::class::unregister_classes(level);
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Defines the entry point for a GDExtension Rust library.
///
/// Every library should have exactly one implementation of this trait, exported with [`gdextension_entry!`](crate::gdextension_entry).
/// Classes declared with [`register_class!`](crate::register_class) are registered automatically at their init level.
///
/// ```no_run
/// # use gdbind_core::init::*;
/// struct MyExtension;
///
/// unsafe impl ExtensionLibrary for MyExtension {}
///
/// gdbind_core::gdextension_entry!(MyExtension);
/// ```
///
/// # Safety
/// The library cannot enforce any safety guarantees outside Rust code. Engine-side code that violates object lifetimes or
/// passes ill-typed arguments causes undefined behavior, even when invoking _safe_ functions.
pub unsafe trait ExtensionLibrary {
    /// Settings of the binding, fixed when the library is loaded.
    fn config() -> BindingConfig {
        BindingConfig::default()
    }

    /// Determines the initialization level at which the extension is loaded (`Scene` by default).
    fn min_level() -> InitLevel {
        Self::config().min_level
    }

    /// Custom logic when a certain init-level of the engine is loaded.
    ///
    /// Invoked for levels >= [`Self::min_level()`], in ascending order.
    #[allow(unused_variables)]
    fn on_level_init(level: InitLevel) {
        // Nothing by default.
    }

    /// Custom logic when a certain init-level of the engine is unloaded.
    ///
    /// Invoked for levels >= [`Self::min_level()`], in descending order.
    #[allow(unused_variables)]
    fn on_level_deinit(level: InitLevel) {
        // Nothing by default.
    }
}

/// Stage of the engine initialization process.
///
/// Initialization and deinitialization are split into multiple stages, like a stack. At each level, a different amount of engine
/// functionality is available. Deinitialization happens in reverse order.
pub type InitLevel = sys::InitLevel;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Macros

/// Exports the entry point of the library, which the engine calls when loading it.
///
/// The default symbol name is `gdext_rust_init`; a different one can be passed as second argument and must match the
/// `entry_symbol` of the `.gdextension` file.
#[macro_export]
macro_rules! gdextension_entry {
    ($Ext:ty) => {
        $crate::gdextension_entry!($Ext, gdext_rust_init);
    };

    ($Ext:ty, $entry_symbol:ident) => {
        #[no_mangle]
        unsafe extern "C" fn $entry_symbol(
            get_proc_address: $crate::sys::GDExtensionInterfaceGetProcAddress,
            library: $crate::sys::GDExtensionClassLibraryPtr,
            init: *mut $crate::sys::GDExtensionInitialization,
        ) -> $crate::sys::GDExtensionBool {
            $crate::init::__gdbind_load_library::<$Ext>(get_proc_address, library, init)
        }
    };
}

/// Adds an extension class to the set of classes registered when the library loads.
///
/// The class must implement [`UserClass`](crate::obj::UserClass); it is registered at its
/// [`INIT_LEVEL`](crate::obj::UserClass::INIT_LEVEL).
#[macro_export]
macro_rules! register_class {
    ($Class:ty) => {
        $crate::sys::plugin_add!(CLASS_PLUGINS in $crate::private; $crate::private::ClassPlugin::user::<$Class>());
    };
}
