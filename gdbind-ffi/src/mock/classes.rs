/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Engine-side classes and methods known to the mock engine.

use std::ffi::c_void;
use std::ptr;

use crate as sys;
use crate::{GodotFfi, PtrArgs, PtrReturn};

use super::engine;
use super::state::{self, State};

pub(super) type Behavior = Box<dyn Fn(&mut MockCall<'_>) + Send + Sync>;

/// Engine-side implementation of one method; the target of a method bind.
pub struct MockMethod {
    pub class_name: String,
    pub name: String,
    pub hash: i64,
    pub arity: usize,
    pub(super) behavior: Behavior,
}

/// Arguments, receiver and return slot of one ptrcall, as seen by the engine.
pub struct MockCall<'a> {
    object: sys::GDExtensionObjectPtr,
    raw_args: *const sys::GDExtensionConstTypePtr,
    args: PtrArgs<'a>,
    ret: sys::GDExtensionTypePtr,
}

impl MockCall<'_> {
    /// # Safety
    /// `args` must hold `arity` readable argument pointers (or be null for arity 0); `ret` must be null or writable.
    pub(super) unsafe fn new(
        object: sys::GDExtensionObjectPtr,
        args: *const sys::GDExtensionConstTypePtr,
        arity: usize,
        ret: sys::GDExtensionTypePtr,
    ) -> Self {
        let arity = if args.is_null() { 0 } else { arity };

        Self {
            object,
            raw_args: args,
            args: PtrArgs::new(args, arity),
            ret,
        }
    }

    pub fn object(&self) -> sys::GDExtensionObjectPtr {
        self.object
    }

    /// Argument array and return slot as passed to the ptrcall, for forwarding to extension methods.
    pub(super) fn raw_parts(&self) -> (*const sys::GDExtensionConstTypePtr, sys::GDExtensionTypePtr) {
        (self.raw_args, self.ret)
    }

    /// Reads a positional argument; the binding is trusted to pass the declared types.
    pub fn arg<T: GodotFfi>(&self, index: usize) -> T {
        // SAFETY: the caller of the method bind passes arguments matching the method's signature.
        unsafe { self.args.get(index) }
    }

    pub fn arg_string(&self, index: usize) -> String {
        let word: *mut c_void = self.arg(index);
        engine::string_from_word(word)
    }

    pub fn ret<T: GodotFfi>(&mut self, value: T) {
        // SAFETY: the return slot is sized for the method's return type.
        unsafe { PtrReturn::new(self.ret) }.set(value)
    }

    pub fn ret_string(&mut self, text: String) {
        let word = engine::string_into_word(text);
        if self.ret.is_null() {
            // Nobody takes ownership.
            // SAFETY: freshly created, not shared.
            unsafe { engine::string_destroy(ptr::addr_of!(word).cast_mut().cast()) };
            return;
        }
        self.ret(word);
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Hashes of the methods known to the mock engine

pub(super) const REF_COUNTED_INIT_REF_HASH: i64 = 2240911060;
pub(super) const REF_COUNTED_REFERENCE_HASH: i64 = 2240911060;
pub(super) const REF_COUNTED_UNREFERENCE_HASH: i64 = 2240911060;
pub(super) const REF_COUNTED_GET_REFERENCE_COUNT_HASH: i64 = 3905245786;

pub(super) const NODE_ADD_CHILD_HASH: i64 = 3863233950;
pub(super) const NODE_GET_CHILD_COUNT_HASH: i64 = 894402480;
pub(super) const NODE_GET_CHILD_HASH: i64 = 541253412;
pub(super) const NODE_GET_PARENT_HASH: i64 = 3160264692;
pub(super) const NODE_SET_NAME_HASH: i64 = 83702148;
pub(super) const NODE_GET_NAME_HASH: i64 = 2002593661;

pub(super) const CONTROL_SET_SIZE_HASH: i64 = 743155724;
pub(super) const CONTROL_GET_SIZE_HASH: i64 = 3341600327;
pub(super) const CONTROL_SET_POSITION_HASH: i64 = 2436320129;
pub(super) const CONTROL_GET_POSITION_HASH: i64 = 3341600327;

pub(super) const FILE_ACCESS_OPEN_HASH: i64 = 1247358404;
pub(super) const FILE_ACCESS_GET_OPEN_ERROR_HASH: i64 = 166280745;
pub(super) const FILE_ACCESS_GET_AS_TEXT_HASH: i64 = 1162154673;
pub(super) const FILE_ACCESS_GET_LENGTH_HASH: i64 = 3905245786;

/// Extension methods are bound by name only; the engine does not check their hash.
pub(super) const EXTENSION_METHOD_HASH: i64 = 0;

pub(super) const ENGINE_IS_EDITOR_HINT_HASH: i64 = 36873697;
pub(super) const ENGINE_SET_PHYSICS_TICKS_HASH: i64 = 1286410249;
pub(super) const ENGINE_GET_PHYSICS_TICKS_HASH: i64 = 3905245786;
pub(super) const ENGINE_GET_FRAMES_DRAWN_HASH: i64 = 3905245786;

/// `FileAccess.ModeFlags.READ`.
const FILE_READ: i64 = 1;
/// `FileAccess.ModeFlags.WRITE`.
const FILE_WRITE: i64 = 2;

const ERR_OK: i64 = 0;
const ERR_FILE_NOT_FOUND: i64 = 7;
const ERR_INVALID_PARAMETER: i64 = 31;

const DEFAULT_PHYSICS_TICKS: i64 = 60;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Installation

pub(super) fn install(state: &mut State) {
    state.add_native_class("Object", None);
    state.add_native_class("RefCounted", Some("Object"));
    state.add_native_class("Node", Some("Object"));
    state.add_native_class("Control", Some("Node"));
    state.add_native_class("FileAccess", Some("RefCounted"));
    state.add_native_class("Engine", Some("Object"));

    install_ref_counted(state);
    install_node(state);
    install_control(state);
    install_file_access(state);
    install_engine(state);
}

fn install_ref_counted(state: &mut State) {
    state.define("RefCounted", "init_ref", REF_COUNTED_INIT_REF_HASH, 0, |call| {
        let ok = with_record(call.object(), |r| {
            r.refcount += 1;
            true
        });
        call.ret(ok.unwrap_or(false));
    });

    state.define("RefCounted", "reference", REF_COUNTED_REFERENCE_HASH, 0, |call| {
        let ok = with_record(call.object(), |r| {
            r.refcount += 1;
            r.refcount > 1
        });
        call.ret(ok.unwrap_or(false));
    });

    // Returns whether the last reference was dropped; the caller is then responsible for destroying the object.
    state.define("RefCounted", "unreference", REF_COUNTED_UNREFERENCE_HASH, 0, |call| {
        let dead = with_record(call.object(), |r| {
            r.refcount -= 1;
            r.refcount <= 0
        });
        call.ret(dead.unwrap_or(false));
    });

    state.define(
        "RefCounted",
        "get_reference_count",
        REF_COUNTED_GET_REFERENCE_COUNT_HASH,
        0,
        |call| {
            let count = with_record(call.object(), |r| r.refcount);
            call.ret(count.unwrap_or(0));
        },
    );
}

fn install_node(state: &mut State) {
    // add_child(node: Node, force_readable_name: bool, internal: InternalMode)
    state.define("Node", "add_child", NODE_ADD_CHILD_HASH, 3, |call| {
        let child: sys::GDExtensionObjectPtr = call.arg(0);

        let attached = {
            let mut state = state::lock();
            let parent_id = State::header_id(call.object());
            let child_id = State::header_id(child);

            match (parent_id, child_id) {
                (Some(parent_id), Some(child_id))
                    if parent_id != child_id
                        && state.objects.contains_key(&parent_id)
                        && state.objects.get(&child_id).is_some_and(|c| c.parent.is_none()) =>
                {
                    if let Some(child) = state.objects.get_mut(&child_id) {
                        child.parent = Some(parent_id);
                    }
                    if let Some(parent) = state.objects.get_mut(&parent_id) {
                        parent.children.push(child_id);
                    }
                    true
                }
                _ => false,
            }
        };

        if !attached {
            log::error!("mock engine: add_child: invalid parent or child, or child already has a parent");
            return;
        }

        // Entering the tree triggers the notifications the engine would send.
        // SAFETY: both virtuals take no arguments and return nothing.
        unsafe {
            engine::call_virtual(child, "_enter_tree", ptr::null(), ptr::null_mut());
            engine::call_virtual(child, "_ready", ptr::null(), ptr::null_mut());
        }
    });

    state.define("Node", "get_child_count", NODE_GET_CHILD_COUNT_HASH, 1, |call| {
        let count = with_record(call.object(), |r| r.children.len() as i64);
        call.ret(count.unwrap_or(0));
    });

    state.define("Node", "get_child", NODE_GET_CHILD_HASH, 2, |call| {
        let index: i64 = call.arg(0);

        let child = {
            let state = state::lock();
            let children = state.record_of(call.object()).map(|r| r.children.clone()).unwrap_or_default();

            // Negative indices count from the end, as in the engine.
            let len = children.len() as i64;
            let index = if index < 0 { len + index } else { index };

            usize::try_from(index)
                .ok()
                .and_then(|i| children.get(i))
                .and_then(|id| state.objects.get(id))
                .map_or(ptr::null_mut(), |r| r.object_ptr())
        };

        call.ret(child);
    });

    state.define("Node", "get_parent", NODE_GET_PARENT_HASH, 0, |call| {
        let parent = {
            let state = state::lock();
            state
                .record_of(call.object())
                .and_then(|r| r.parent)
                .and_then(|id| state.objects.get(&id))
                .map_or(ptr::null_mut(), |r| r.object_ptr())
        };

        call.ret(parent);
    });

    state.define("Node", "set_name", NODE_SET_NAME_HASH, 1, |call| {
        let name = call.arg_string(0);
        with_record(call.object(), |r| r.name = name);
    });

    state.define("Node", "get_name", NODE_GET_NAME_HASH, 0, |call| {
        let name = with_record(call.object(), |r| r.name.clone());
        call.ret_string(name.unwrap_or_default());
    });
}

fn install_control(state: &mut State) {
    fn define_vector_property(state: &mut State, property: &'static str, set_hash: i64, get_hash: i64) {
        // set_xy(value: Vector2, keep_offsets: bool)
        state.define("Control", &format!("set_{property}"), set_hash, 2, move |call| {
            let value: [f32; 2] = call.arg(0);
            with_record(call.object(), |r| r.vectors.insert(property, value));
        });

        state.define("Control", &format!("get_{property}"), get_hash, 0, move |call| {
            let value = with_record(call.object(), |r| r.vectors.get(property).copied());
            call.ret(value.flatten().unwrap_or([0.0, 0.0]));
        });
    }

    define_vector_property(state, "size", CONTROL_SET_SIZE_HASH, CONTROL_GET_SIZE_HASH);
    define_vector_property(state, "position", CONTROL_SET_POSITION_HASH, CONTROL_GET_POSITION_HASH);
}

fn install_file_access(state: &mut State) {
    // static open(path: String, flags: ModeFlags) -> FileAccess
    state.define("FileAccess", "open", FILE_ACCESS_OPEN_HASH, 2, |call| {
        let path = call.arg_string(0);
        let flags: i64 = call.arg(1);

        let file = {
            let mut state = state::lock();

            let contents = match flags {
                FILE_READ => state.files.get(&path).cloned().ok_or(ERR_FILE_NOT_FOUND),
                FILE_WRITE => {
                    state.files.insert(path.clone(), String::new());
                    Ok(String::new())
                }
                _ => Err(ERR_INVALID_PARAMETER),
            };

            match contents {
                Ok(text) => {
                    state.last_open_error = ERR_OK;
                    let file = state.allocate("FileAccess");
                    if let Some(record) = state.record_of_mut(file) {
                        record.text = text;
                    }
                    file
                }
                Err(code) => {
                    state.last_open_error = code;
                    ptr::null_mut()
                }
            }
        };

        call.ret(file);
    });

    state.define("FileAccess", "get_open_error", FILE_ACCESS_GET_OPEN_ERROR_HASH, 0, |call| {
        let error = state::lock().last_open_error;
        call.ret(error);
    });

    state.define("FileAccess", "get_as_text", FILE_ACCESS_GET_AS_TEXT_HASH, 1, |call| {
        let skip_cr: bool = call.arg(0);
        let text = with_record(call.object(), |r| r.text.clone()).unwrap_or_default();
        let text = if skip_cr { text.replace('\r', "") } else { text };
        call.ret_string(text);
    });

    state.define("FileAccess", "get_length", FILE_ACCESS_GET_LENGTH_HASH, 0, |call| {
        let len = with_record(call.object(), |r| r.text.len() as i64);
        call.ret(len.unwrap_or(0));
    });
}

fn install_engine(state: &mut State) {
    state.define("Engine", "is_editor_hint", ENGINE_IS_EDITOR_HINT_HASH, 0, |call| {
        let editor = state::lock().editor_hint;
        call.ret(editor);
    });

    state.define("Engine", "set_physics_ticks_per_second", ENGINE_SET_PHYSICS_TICKS_HASH, 1, |call| {
        let ticks: i64 = call.arg(0);
        with_record(call.object(), |r| r.ints.insert("physics_ticks_per_second", ticks));
    });

    state.define("Engine", "get_physics_ticks_per_second", ENGINE_GET_PHYSICS_TICKS_HASH, 0, |call| {
        let ticks = with_record(call.object(), |r| r.ints.get("physics_ticks_per_second").copied());
        call.ret(ticks.flatten().unwrap_or(DEFAULT_PHYSICS_TICKS));
    });

    state.define("Engine", "get_frames_drawn", ENGINE_GET_FRAMES_DRAWN_HASH, 0, |call| {
        let frames = state::lock().frames_drawn;
        call.ret(frames);
    });

    let engine = state.allocate("Engine");
    if let Some(id) = State::header_id(engine) {
        state.singletons.insert("Engine".to_string(), id);
    }
}

/// Runs `f` on the live record of `object` under the state lock.
fn with_record<R>(
    object: sys::GDExtensionObjectPtr,
    f: impl FnOnce(&mut state::ObjectRecord) -> R,
) -> Option<R> {
    let mut state = state::lock();
    match state.record_of_mut(object) {
        Some(record) => Some(f(record)),
        None => {
            log::error!("mock engine: method called on null or destroyed object");
            None
        }
    }
}
