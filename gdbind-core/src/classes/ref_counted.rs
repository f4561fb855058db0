/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::classes::Object;
use crate::sys::{self, CallFrame, ClassMethodTable, InitLevel, MethodDescriptor};

super::engine_class! {
    /// Base class of all reference-counted engine objects.
    ///
    /// Handles to such objects are always shared; see [`Ownership::RefCounted`](crate::obj::Ownership::RefCounted).
    pub struct RefCounted;
    parent: Object,
    ancestors: [],
    init_level: Core,
    virtuals: [],
}

static REF_COUNTED_METHODS: ClassMethodTable = ClassMethodTable::new(
    "RefCounted",
    InitLevel::Core,
    &[
        MethodDescriptor::new("init_ref", 2240911060),
        MethodDescriptor::new("reference", 2240911060),
        MethodDescriptor::new("unreference", 2240911060),
        MethodDescriptor::new("get_reference_count", 3905245786),
    ],
);

sys::plugin_add!(METHOD_TABLES in crate::sys; &REF_COUNTED_METHODS);

const INIT_REF: usize = 0;
const REFERENCE: usize = 1;
const UNREFERENCE: usize = 2;
const GET_REFERENCE_COUNT: usize = 3;

impl RefCounted {
    pub fn get_reference_count(&self) -> i32 {
        let frame = CallFrame::new();

        // SAFETY: () -> int.
        let count: i64 = unsafe { frame.ptrcall(REF_COUNTED_METHODS.bind(GET_REFERENCE_COUNT), self.object_ptr) };
        count as i32
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Reference counting on raw pointers, used by object handles

/// Takes the first reference of a newly obtained object. Returns `false` if the engine refused.
pub(crate) fn init_ref(object_ptr: sys::GDExtensionObjectPtr) -> bool {
    call_bool(INIT_REF, object_ptr)
}

/// Takes an additional reference.
pub(crate) fn reference(object_ptr: sys::GDExtensionObjectPtr) -> bool {
    call_bool(REFERENCE, object_ptr)
}

/// Gives back one reference. Returns `true` if it was the last one; the caller must then destroy the object.
pub(crate) fn unreference(object_ptr: sys::GDExtensionObjectPtr) -> bool {
    call_bool(UNREFERENCE, object_ptr)
}

fn call_bool(method_index: usize, object_ptr: sys::GDExtensionObjectPtr) -> bool {
    let frame = CallFrame::new();

    // SAFETY: all reference-counting methods have signature () -> bool; callers pass live RefCounted objects.
    unsafe { frame.ptrcall(REF_COUNTED_METHODS.bind(method_index), object_ptr) }
}
