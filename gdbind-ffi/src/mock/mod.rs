/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! In-process stand-in for the engine, enabled with the `mock-engine` feature.
//!
//! Implements the subset of the engine interface used by gdbind with plain Rust data structures, so that the full call path
//! (interface loading, method binds, ptrcalls, object lifetime, extension classes, virtual calls) can be exercised in `cargo test`.
//!
//! Behavior follows the engine where the binding relies on it:
//! - Object pointers stay readable after destruction; a destroyed object's instance ID no longer maps back to it.
//! - Instance IDs of reference-counted objects have bit 63 set.
//! - Destroying a node destroys its children. Destroying an extension object calls the class's `free_instance_func`.
//! - `classdb_get_method_bind` returns null if the hash does not match. Methods registered by extension classes are bound
//!   like engine methods, but only by name.
//! - Strings are 8-byte values holding a heap pointer.
//! - Objects returned from ptrcalls start with reference count 0; the receiver takes the first reference.
//!
//! No engine lock is held while engine-side behaviors or binding callbacks run, so callbacks can re-enter the engine.

mod classes;
mod engine;
mod state;

use std::ffi::{c_void, CString};

use crate as sys;
use crate::{CallFrame, GodotFfi};

pub use classes::{MockCall, MockMethod};
pub use engine::get_proc_address;

/// Signature of an extension's entry point.
pub type ExtensionEntry = unsafe extern "C" fn(
    sys::GDExtensionInterfaceGetProcAddress,
    sys::GDExtensionClassLibraryPtr,
    *mut sys::GDExtensionInitialization,
) -> sys::GDExtensionBool;

/// Version reported by `get_godot_version`.
pub const VERSION: (u32, u32, u32) = (4, 3, 0);

/// `get_proc_address` in the form the entry point receives it.
pub fn proc_address() -> sys::GDExtensionInterfaceGetProcAddress {
    Some(get_proc_address)
}

/// Opaque library token handed to the extension.
pub fn library() -> sys::GDExtensionClassLibraryPtr {
    static TOKEN: u8 = 0;
    (&TOKEN as *const u8).cast_mut().cast()
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Extension lifecycle

/// Calls the extension entry point and runs its initialization up to `Scene` (or `Editor` with the editor hint set).
///
/// Returns `false` if the entry point reports failure.
///
/// # Safety
/// `entry` must be a valid extension entry point.
pub unsafe fn load_extension(entry: ExtensionEntry) -> bool {
    let mut init = sys::GDExtensionInitialization {
        minimum_initialization_level: sys::GDEXTENSION_INITIALIZATION_CORE,
        userdata: std::ptr::null_mut(),
        initialize: None,
        deinitialize: None,
    };

    if !sys::bool_from_sys(entry(proc_address(), library(), &mut init)) {
        log::error!("mock engine: extension entry point failed");
        return false;
    }

    let top = if state::lock().editor_hint {
        sys::GDEXTENSION_INITIALIZATION_EDITOR
    } else {
        sys::GDEXTENSION_INITIALIZATION_SCENE
    };

    let mut loaded = Vec::new();
    if let Some(initialize) = init.initialize {
        for level in init.minimum_initialization_level..=top {
            initialize(init.userdata, level);
            loaded.push(level);
        }
    }

    state::lock().extensions.push(state::LoadedExtension {
        init: state::SendPtr::new(init),
        levels: loaded,
    });
    true
}

/// Deinitializes all loaded extensions, in reverse level order.
///
/// # Safety
/// Extensions must have been loaded with [`load_extension`].
pub unsafe fn unload_extensions() {
    let extensions = std::mem::take(&mut state::lock().extensions);

    for extension in extensions.into_iter().rev() {
        let init = extension.init.into_inner();
        if let Some(deinitialize) = init.deinitialize {
            for level in extension.levels.into_iter().rev() {
                deinitialize(init.userdata, level);
            }
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Driving the engine

/// Invokes a virtual method on an extension object, as the engine would.
///
/// Returns `false` if the object has no extension instance or the extension does not implement `name`.
///
/// # Safety
/// `args` must point to arguments matching the virtual method's signature; `ret` must be large enough for its return value.
pub unsafe fn call_virtual(
    object: sys::GDExtensionObjectPtr,
    name: &str,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
) -> bool {
    engine::call_virtual(object, name, args, ret)
}

/// Invokes a virtual method with arguments from a frame. Returns `None` if the virtual is not implemented.
///
/// # Safety
/// See [`call_virtual`].
pub unsafe fn call_virtual_frame<R: GodotFfi>(
    object: sys::GDExtensionObjectPtr,
    name: &str,
    frame: CallFrame<'_>,
) -> Option<R> {
    let mut called = false;
    let result: R = frame.ptrcall_with(|args, ret| {
        called = unsafe { call_virtual(object, name, args, ret) };
    });

    called.then_some(result)
}

/// Calls a method by name on `object`, as scripts do: engine methods and methods registered by extension classes alike.
///
/// Returns `None` if the runtime class of `object` has no such method.
///
/// # Safety
/// The frame's arguments and `R` must match the method's signature.
pub unsafe fn call_method<R: GodotFfi>(
    object: sys::GDExtensionObjectPtr,
    name: &str,
    frame: CallFrame<'_>,
) -> Option<R> {
    let mut called = false;
    let result: R = frame.ptrcall_with(|args, ret| {
        called = unsafe { engine::call_method(object, name, args, ret) };
    });

    called.then_some(result)
}

/// Whether `class_name` or one of its ancestors has a method `method_name`.
pub fn has_method(class_name: &str, method_name: &str) -> bool {
    state::lock().find_method(class_name, method_name).is_some()
}

/// Advances one frame: increments the frame counter and calls `_process(delta)` on all live extension objects.
pub fn process_frame(delta: f64) {
    let objects = {
        let mut state = state::lock();
        state.frames_drawn += 1;
        state.extension_objects()
    };

    for object in objects {
        let mut frame = CallFrame::new();
        frame.arg(&delta);

        // SAFETY: `_process` takes one f64 and returns nothing.
        let _: Option<()> = unsafe { call_virtual_frame(object, "_process", frame) };
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Inspection and setup for tests

/// Whether `object` refers to a live object.
pub fn is_alive(object: sys::GDExtensionObjectPtr) -> bool {
    state::lock().record_of(object).is_some()
}

/// Reference count of a live reference-counted object.
pub fn reference_count(object: sys::GDExtensionObjectPtr) -> Option<i64> {
    let state = state::lock();
    let record = state.record_of(object)?;
    record.ref_counted.then_some(record.refcount)
}

/// Total number of objects destroyed so far.
pub fn destroyed_count() -> u64 {
    state::lock().destroyed
}

/// Runtime class of a live object.
pub fn object_class(object: sys::GDExtensionObjectPtr) -> Option<String> {
    state::lock().record_of(object).map(|r| r.class.clone())
}

pub fn class_exists(name: &str) -> bool {
    state::lock().classes.contains_key(name)
}

/// Number of times a class has been registered as extension class (including replacements).
pub fn registration_count(name: &str) -> usize {
    state::lock()
        .registrations
        .get(name)
        .copied()
        .unwrap_or_default()
}

/// Adds a file readable through `FileAccess.open`.
pub fn add_file(path: &str, contents: &str) {
    state::lock()
        .files
        .insert(path.to_string(), contents.to_string());
}

pub fn set_editor_hint(editor: bool) {
    state::lock().editor_hint = editor;
}

/// Constructs an object of a native or extension class, like `ClassDB.instantiate`.
pub fn construct(class_name: &str) -> sys::GDExtensionObjectPtr {
    let Ok(c_name) = CString::new(class_name) else {
        return std::ptr::null_mut();
    };

    // SAFETY: valid null-terminated class name.
    unsafe { engine::classdb_construct_object(c_name.as_ptr()) }
}

/// Destroys an object, like `Object.free()`.
pub fn destroy(object: sys::GDExtensionObjectPtr) {
    // SAFETY: the mock tolerates dead or unknown pointers.
    unsafe { engine::object_destroy(object) }
}

/// Registers an additional engine-side method, e.g. for testing custom calls.
pub fn define_method(
    class_name: &str,
    method_name: &str,
    hash: i64,
    arity: usize,
    behavior: impl Fn(&mut MockCall<'_>) + Send + Sync + 'static,
) {
    state::lock().define(class_name, method_name, hash, arity, behavior);
}

/// Raw pointer to a heap string in the engine's string layout, for building arguments in tests.
pub fn leak_string(text: &str) -> *mut c_void {
    engine::string_into_word(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c_str;

    #[test]
    fn interface_loads_from_mock() {
        let interface = unsafe { sys::GDExtensionInterface::load(proc_address()) }.expect("all functions present");
        let version = interface.godot_version();

        assert_eq!((version.major, version.minor, version.patch), VERSION);
        assert!(sys::read_version_string(&version).starts_with("4.3"));
    }

    #[test]
    fn construct_and_destroy_node_tree() {
        let parent = construct("Node");
        let child = construct("Node");
        assert!(is_alive(parent) && is_alive(child));

        let add_child = unsafe {
            engine::classdb_get_method_bind(c_str(b"Node\0"), c_str(b"add_child\0"), classes::NODE_ADD_CHILD_HASH)
        };
        assert!(!add_child.is_null());

        let mut frame = CallFrame::new();
        frame.arg(&child);
        let () = unsafe {
            frame.ptrcall_with(|args, ret| engine::object_method_bind_ptrcall(add_child, parent, args, ret))
        };

        destroy(parent);
        assert!(!is_alive(parent));
        assert!(!is_alive(child), "children are destroyed with their parent");
    }

    #[test]
    fn hash_mismatch_yields_null_bind() {
        let bind = unsafe { engine::classdb_get_method_bind(c_str(b"Node\0"), c_str(b"add_child\0"), 1) };
        assert!(bind.is_null());
    }

    #[test]
    fn inherited_method_bind_is_found() {
        // get_child_count is declared on Node; Control inherits it.
        let bind = unsafe {
            engine::classdb_get_method_bind(
                c_str(b"Control\0"),
                c_str(b"get_child_count\0"),
                classes::NODE_GET_CHILD_COUNT_HASH,
            )
        };
        assert!(!bind.is_null());
    }

    #[test]
    fn instance_ids_of_dead_objects_do_not_resolve() {
        let object = construct("RefCounted");
        let id = unsafe { engine::object_get_instance_id(object) };
        assert_ne!(id & sys::REF_COUNTED_ID_BIT, 0);
        assert_eq!(unsafe { engine::object_get_instance_from_id(id) }, object);

        destroy(object);
        assert_eq!(unsafe { engine::object_get_instance_id(object) }, 0);
        assert!(unsafe { engine::object_get_instance_from_id(id) }.is_null());
    }
}
