/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::OnceLock;

use crate::classes::Object;
use crate::meta::{panic_call_error, CallContext};
use crate::obj::{Gd, RawHandle};
use crate::sys::{self, interface_fn, BindingError, CallFrame, ClassMethodTable, InitLevel, MethodDescriptor};

super::engine_class! {
    /// Access to engine properties and state; a singleton.
    pub struct Engine;
    parent: Object,
    ancestors: [],
    init_level: Core,
    virtuals: [],
}

static ENGINE_METHODS: ClassMethodTable = ClassMethodTable::new(
    "Engine",
    InitLevel::Core,
    &[
        MethodDescriptor::new("is_editor_hint", 36873697),
        MethodDescriptor::new("set_physics_ticks_per_second", 1286410249),
        MethodDescriptor::new("get_physics_ticks_per_second", 3905245786),
        MethodDescriptor::new("get_frames_drawn", 3905245786),
    ],
);

sys::plugin_add!(METHOD_TABLES in crate::sys; &ENGINE_METHODS);

const IS_EDITOR_HINT: usize = 0;
const SET_PHYSICS_TICKS_PER_SECOND: usize = 1;
const GET_PHYSICS_TICKS_PER_SECOND: usize = 2;
const GET_FRAMES_DRAWN: usize = 3;

impl Engine {
    /// The engine singleton. Looked up once; the handle is borrowed from the engine.
    ///
    /// # Panics
    /// If the binding is not initialized, or the engine does not provide the singleton.
    pub fn singleton() -> Gd<Engine> {
        let result = singleton_ptr().and_then(|ptr| {
            // SAFETY: pointer handed out by the engine; validated.
            unsafe { RawHandle::must_assert_instance_id(ptr) }
        });

        match result {
            Ok(raw) => Gd::from_raw(raw),
            Err(err) => panic_call_error(&CallContext::outbound("Engine", "singleton"), &err),
        }
    }

    /// Whether the code runs inside the editor.
    pub fn is_editor_hint(&self) -> bool {
        let frame = CallFrame::new();

        // SAFETY: () -> bool.
        unsafe { frame.ptrcall(ENGINE_METHODS.bind(IS_EDITOR_HINT), self.object_ptr) }
    }

    pub fn set_physics_ticks_per_second(&mut self, physics_ticks_per_second: i32) {
        let ticks = physics_ticks_per_second as i64;

        let mut frame = CallFrame::new();
        frame.arg(&ticks);

        // SAFETY: (int) -> void.
        let () = unsafe { frame.ptrcall(ENGINE_METHODS.bind(SET_PHYSICS_TICKS_PER_SECOND), self.object_ptr) };
    }

    pub fn get_physics_ticks_per_second(&self) -> i32 {
        let frame = CallFrame::new();

        // SAFETY: () -> int.
        let ticks: i64 = unsafe { frame.ptrcall(ENGINE_METHODS.bind(GET_PHYSICS_TICKS_PER_SECOND), self.object_ptr) };
        ticks as i32
    }

    /// Number of frames drawn since the engine started.
    pub fn get_frames_drawn(&self) -> i32 {
        let frame = CallFrame::new();

        // SAFETY: () -> int.
        let frames: i64 = unsafe { frame.ptrcall(ENGINE_METHODS.bind(GET_FRAMES_DRAWN), self.object_ptr) };
        frames as i32
    }
}

fn singleton_ptr() -> Result<sys::GDExtensionObjectPtr, BindingError> {
    // Stored as address; the pointer itself is not Sync.
    static SINGLETON: OnceLock<usize> = OnceLock::new();

    if !sys::is_initialized() {
        return Err(BindingError::NotInitialized);
    }

    if let Some(&addr) = SINGLETON.get() {
        return Ok(addr as sys::GDExtensionObjectPtr);
    }

    // SAFETY: binding initialized; valid class name.
    let ptr = unsafe { interface_fn!(global_get_singleton)(c"Engine".as_ptr()) };
    if ptr.is_null() {
        return Err(BindingError::UnregisteredClass("Engine".to_string()));
    }

    let addr = *SINGLETON.get_or_init(|| ptr as usize);
    Ok(addr as sys::GDExtensionObjectPtr)
}
