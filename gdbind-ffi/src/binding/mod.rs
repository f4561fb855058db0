/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Process-wide binding state: the loaded engine interface, the library pointer, configuration and per-level method tables.
//!
//! Written once when the engine loads the extension; read from everywhere afterwards.

use std::sync::OnceLock;

use crate as sys;
use crate::{
    BindingConfig, BindingError, ClassMethodBind, ClassMethodTable, GDExtensionClassLibraryPtr,
    GDExtensionInterface, GDExtensionInterfaceGetProcAddress, InitLevel, MethodTable,
};

struct GodotBinding {
    interface: GDExtensionInterface,
    library: ClassLibraryPtr,
    config: BindingConfig,
    method_tables: [OnceLock<MethodTable>; 4],
}

/// Newtype around `GDExtensionClassLibraryPtr` so we can implement `Sync` and `Send` manually for this.
struct ClassLibraryPtr(GDExtensionClassLibraryPtr);

// SAFETY: only the pointer value is shared; the engine treats it as an opaque token and never lets us dereference it.
unsafe impl Sync for ClassLibraryPtr {}
// SAFETY: See `Sync` impl safety doc.
unsafe impl Send for ClassLibraryPtr {}

static BINDING: OnceLock<GodotBinding> = OnceLock::new();

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Public API

/// Loads the engine interface and stores the binding.
///
/// # Panics
/// If called more than once per process.
///
/// # Safety
/// `get_proc_address` and `library` must be the values passed by the engine to the extension entry point.
pub unsafe fn initialize(
    get_proc_address: GDExtensionInterfaceGetProcAddress,
    library: GDExtensionClassLibraryPtr,
    config: BindingConfig,
) -> Result<(), BindingError> {
    assert!(!is_initialized(), "initialize must only be called once");

    let interface = GDExtensionInterface::load(get_proc_address)?;
    let version = interface.godot_version();
    log::info!(
        "Initialize GDExtension API for Rust: {}",
        sys::read_version_string(&version)
    );

    let binding = GodotBinding {
        interface,
        library: ClassLibraryPtr(library),
        config,
        method_tables: Default::default(),
    };

    if BINDING.set(binding).is_err() {
        panic!("initialize must only be called once");
    }

    Ok(())
}

pub fn is_initialized() -> bool {
    BINDING.get().is_some()
}

/// # Safety
/// The binding must have been initialized before calling this function.
#[inline(always)]
pub unsafe fn get_interface() -> &'static GDExtensionInterface {
    &get_binding().interface
}

/// # Safety
/// The binding must have been initialized before calling this function.
#[inline(always)]
pub unsafe fn get_library() -> GDExtensionClassLibraryPtr {
    get_binding().library.0
}

/// Configuration of the loaded binding, or the default configuration before initialization.
pub fn config() -> &'static BindingConfig {
    static DEFAULT: OnceLock<BindingConfig> = OnceLock::new();

    match BINDING.get() {
        Some(binding) => &binding.config,
        None => DEFAULT.get_or_init(BindingConfig::default),
    }
}

/// Resolves the method tables of all classes that become available at `level`.
///
/// With [`BindingConfig::eager_method_tables`], every bind is resolved now, so that an incompatible engine is reported at startup.
/// Otherwise tables resolve on first use.
///
/// # Safety
/// The binding must have been initialized.
pub unsafe fn load_class_method_tables(level: InitLevel) {
    let binding = get_binding();
    let eager = binding.config.eager_method_tables;

    let mut tables: Vec<&'static ClassMethodTable> = Vec::new();
    sys::plugin_foreach!(METHOD_TABLES in sys; |table: &&'static ClassMethodTable| {
        if table.level == level {
            tables.push(*table);
        }
    });
    tables.sort_by_key(|t| t.class_name);

    binding.method_tables[level.index()].get_or_init(|| {
        if !eager {
            log::debug!("{level:?}: {} class method table(s) deferred", tables.len());
            return MethodTable::new();
        }

        let mut resolver = |class: &str, method: &str, hash: i64| {
            // SAFETY: binding initialized (function contract).
            unsafe { crate::method_table::engine_method_bind(class, method, hash) }
        };
        let table = MethodTable::load(&tables, &mut resolver);
        log::debug!(
            "{level:?}: loaded {} method bind(s) of {} class(es)",
            table.method_count(),
            table.class_count()
        );
        table
    });
}

/// Looks up a method bind by class and method name.
///
/// Searches the eagerly loaded tables first. Classes whose table was deferred are resolved now, through their static table.
pub fn resolve_method(class: &str, method: &str) -> Result<ClassMethodBind, BindingError> {
    let binding = BINDING.get().ok_or(BindingError::NotInitialized)?;

    for table in binding.method_tables.iter().filter_map(OnceLock::get) {
        if let Ok(bind) = table.resolve(class, method) {
            return Ok(bind);
        }
    }

    let mut bind = None;
    sys::plugin_foreach!(METHOD_TABLES in sys; |table: &&'static ClassMethodTable| {
        if bind.is_none() && table.class_name == class {
            bind = table.index_of(method).map(|index| table.bind(index));
        }
    });

    bind.ok_or_else(|| BindingError::MethodBindNotFound {
        class: class.to_string(),
        method: method.to_string(),
        hash: 0,
    })
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[inline(always)]
unsafe fn get_binding() -> &'static GodotBinding {
    debug_assert!(
        is_initialized(),
        "Engine not available; make sure you are not calling it from unit/doc tests"
    );

    // SAFETY: The binding has been initialized before calling this method.
    BINDING.get().unwrap_unchecked()
}
