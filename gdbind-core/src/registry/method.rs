/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Methods of extension classes that the engine can call by name.
//!
//! The inbound counterpart of engine method binds: the engine passes ptrcall-encoded arguments, a trampoline decodes them,
//! calls the Rust method on the bound instance and encodes the return value.

use std::ffi::CString;
use std::fmt;

use crate::obj::UserClass;
use crate::sys::{self, interface_fn, BindingError, PtrArgs, PtrReturn};

/// Trampoline of one method: decodes the positional arguments, calls the implementation, encodes the return value.
pub type MethodFn<T> = fn(&mut T, &PtrArgs<'_>, PtrReturn);

/// A method exposed to the engine under `name`.
pub struct MethodSlot<T> {
    name: &'static str,
    arity: usize,
    has_return: bool,
    is_const: bool,
    call: MethodFn<T>,
}

impl<T> MethodSlot<T> {
    /// Method `name` taking `arity` arguments and returning nothing.
    pub fn new(name: &'static str, arity: usize, call: MethodFn<T>) -> Self {
        Self {
            name,
            arity,
            has_return: false,
            is_const: false,
            call,
        }
    }

    /// Method `name` taking `arity` arguments and writing a value into the return slot.
    pub fn returning(name: &'static str, arity: usize, call: MethodFn<T>) -> Self {
        Self {
            has_return: true,
            ..Self::new(name, arity, call)
        }
    }

    /// Marks the method as not modifying the object.
    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn has_return(&self) -> bool {
        self.has_return
    }

    fn flags(&self) -> sys::GDExtensionClassMethodFlags {
        if self.is_const {
            sys::GDEXTENSION_METHOD_FLAGS_DEFAULT | sys::GDEXTENSION_METHOD_FLAG_CONST
        } else {
            sys::GDEXTENSION_METHOD_FLAGS_DEFAULT
        }
    }

    /// Calls the implementation.
    ///
    /// # Safety
    /// `args` must point to `arity` arguments of the types the slot decodes; `ret` must be null or large enough for its return
    /// value.
    pub(crate) unsafe fn invoke(
        &self,
        instance: &mut T,
        args: *const sys::GDExtensionConstTypePtr,
        ret: sys::GDExtensionTypePtr,
    ) {
        let args = PtrArgs::new(args, self.arity);
        (self.call)(instance, &args, PtrReturn::new(ret));
    }
}

impl<T> Clone for MethodSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MethodSlot<T> {}

impl<T> fmt::Debug for MethodSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret = if self.has_return { " -> _" } else { "" };
        write!(f, "MethodSlot({}/{}{ret})", self.name, self.arity)
    }
}

/// Method userdata handed to the engine. Lives until the process ends, like the class userdata.
pub(crate) struct MethodInfo<T> {
    pub class_name: &'static str,
    pub slot: MethodSlot<T>,
}

/// Registers `slot` as method of the already registered class `T`.
pub(crate) fn register_method<T: UserClass>(slot: MethodSlot<T>) -> Result<(), BindingError> {
    let invalid_name = || BindingError::MethodBindNotFound {
        class: T::CLASS_NAME.to_string(),
        method: slot.name.to_string(),
        hash: 0,
    };

    let class_name = CString::new(T::CLASS_NAME).map_err(|_| invalid_name())?;
    let method_name = CString::new(slot.name).map_err(|_| invalid_name())?;
    let argument_count = u32::try_from(slot.arity).map_err(|_| invalid_name())?;

    let info: &'static MethodInfo<T> = Box::leak(Box::new(MethodInfo {
        class_name: T::CLASS_NAME,
        slot,
    }));

    let method_info = sys::GDExtensionClassMethodInfo {
        name: method_name.as_ptr(),
        method_userdata: (info as *const MethodInfo<T>).cast_mut().cast(),
        ptrcall_func: Some(crate::registry::callbacks::method_ptrcall::<T>),
        method_flags: slot.flags(),
        has_return_value: sys::bool_to_sys(slot.has_return),
        argument_count,
    };

    // SAFETY: binding initialized (class registered before); names outlive the call, the engine copies what it keeps.
    unsafe {
        interface_fn!(classdb_register_extension_class_method)(
            sys::get_library(),
            class_name.as_ptr(),
            &method_info,
        )
    };

    log::debug!("{}: registered method {:?}", T::CLASS_NAME, slot);
    Ok(())
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
