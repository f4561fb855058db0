/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::marker::PhantomData;

use crate::meta::{panic_call_error, CallContext};
use crate::obj::{EngineClass, Gd, InstanceId, RawHandle};
use crate::sys;

/// Engine-side part of an extension object, handed to [`UserClass::init()`](crate::obj::UserClass::init).
///
/// Holds no ownership: the engine object owns the Rust instance, not the other way around.
pub struct Base<T: EngineClass> {
    object_ptr: sys::GDExtensionObjectPtr,
    instance_id: InstanceId,
    _marker: PhantomData<*const T>,
}

impl<T: EngineClass> Base<T> {
    pub(crate) fn from_sys(object_ptr: sys::GDExtensionObjectPtr, instance_id: InstanceId) -> Self {
        Self {
            object_ptr,
            instance_id,
            _marker: PhantomData,
        }
    }

    /// Borrowed handle to the engine object, e.g. to call engine methods from within a virtual.
    ///
    /// # Panics
    /// If the object has been destroyed, which can only happen if the handle outlives the object it belongs to.
    pub fn to_gd(&self) -> Gd<T> {
        // SAFETY: the pointer was handed out by the engine; liveness is validated.
        let raw = unsafe { RawHandle::must_assert_instance_id(self.object_ptr) };

        match raw {
            Ok(raw) => Gd::from_raw(raw),
            Err(err) => panic_call_error(&CallContext::gd::<T>("Base::to_gd"), &err),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }
}

impl<T: EngineClass> Clone for Base<T> {
    fn clone(&self) -> Self {
        Self::from_sys(self.object_ptr, self.instance_id)
    }
}

impl<T: EngineClass> fmt::Debug for Base<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base {{ id: {}, class: {} }}", self.instance_id, T::CLASS_NAME)
    }
}
