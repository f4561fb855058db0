/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::obj::{class_name_of, class_tag, EngineClass, GodotClass, InstanceId};
use crate::registry::plugin::ClassPlugin;
use crate::sys::{self, interface_fn};

/// Root of the engine class hierarchy.
#[repr(transparent)]
pub struct Object {
    object_ptr: sys::GDExtensionObjectPtr,
}

impl Object {
    /// Runtime class name, as reported by the engine.
    pub fn get_class(&self) -> String {
        class_name_of(self.object_ptr)
    }

    /// Whether the object is an instance of `class` or one of its subclasses.
    pub fn is_class(&self, class: &str) -> bool {
        let tag = class_tag(class);
        if tag.is_null() {
            return false;
        }

        // SAFETY: valid object pointer and class tag.
        let cast = unsafe { interface_fn!(object_cast_to)(self.object_ptr, tag) };
        !cast.is_null()
    }

    /// # Panics
    /// If the object has been destroyed; dereferencing `Gd` checks this before.
    pub fn get_instance_id(&self) -> InstanceId {
        // SAFETY: valid object pointer.
        let id = unsafe { interface_fn!(object_get_instance_id)(self.object_ptr) };

        InstanceId::try_from_u64(id).unwrap_or_else(|| panic!("Object::get_instance_id() called on destroyed object"))
    }
}

impl GodotClass for Object {
    const CLASS_NAME: &'static str = "Object";
    type EngineBase = Self;
}

// SAFETY: repr(transparent) over the object pointer.
unsafe impl EngineClass for Object {
    fn __from_object_ptr(object_ptr: sys::GDExtensionObjectPtr) -> Self {
        Self { object_ptr }
    }

    fn __object_ptr(&self) -> sys::GDExtensionObjectPtr {
        self.object_ptr
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({:p})", self.object_ptr)
    }
}

sys::plugin_add!(CLASS_PLUGINS in crate::registry::plugin;
    ClassPlugin::engine::<Object>(None, sys::InitLevel::Core)
);
