/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};

use crate::obj::{Base, InstanceId, UserClass};
use crate::out;
use crate::sys;

/// Rust-side state of one extension object, attached to the engine object as its instance pointer.
pub(crate) struct InstanceStorage<T: UserClass> {
    user_instance: RefCell<T>,
    base: Base<T::EngineBase>,
}

impl<T: UserClass> InstanceStorage<T> {
    pub fn construct(user_instance: T, base: Base<T::EngineBase>) -> Self {
        out!("    Storage::construct             <{}>", T::CLASS_NAME);

        Self {
            user_instance: RefCell::new(user_instance),
            base,
        }
    }

    pub fn borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.user_instance.try_borrow()
    }

    pub fn borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.user_instance.try_borrow_mut()
    }

    /// Whether a guard to the user instance is currently alive.
    pub fn is_bound(&self) -> bool {
        self.user_instance.try_borrow_mut().is_err()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.base.instance_id()
    }
}

impl<T: UserClass> Drop for InstanceStorage<T> {
    fn drop(&mut self) {
        out!("    Storage::drop                  <{}>", T::CLASS_NAME);
    }
}

/// Moves the storage to the heap; the result is passed to the engine as instance pointer.
pub(crate) fn into_instance_ptr<T: UserClass>(storage: InstanceStorage<T>) -> sys::GDExtensionClassInstancePtr {
    Box::into_raw(Box::new(storage)).cast()
}

/// # Safety
/// `instance_ptr` must come from [`into_instance_ptr::<T>`] and not have been destroyed.
pub(crate) unsafe fn as_storage<'u, T: UserClass>(
    instance_ptr: sys::GDExtensionClassInstancePtr,
) -> &'u InstanceStorage<T> {
    &*instance_ptr.cast::<InstanceStorage<T>>()
}

/// # Safety
/// `instance_ptr` must come from [`into_instance_ptr::<T>`], and no references obtained through [`as_storage`] may be alive.
pub(crate) unsafe fn destroy_storage<T: UserClass>(instance_ptr: sys::GDExtensionClassInstancePtr) {
    drop(Box::from_raw(instance_ptr.cast::<InstanceStorage<T>>()));
}
