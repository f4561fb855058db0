/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Callbacks that are passed as function pointers to the engine upon class registration.
//!
//! Re-exported to `crate::private`.
#![allow(clippy::missing_safety_doc)]

use std::ffi::{c_char, c_void, CString};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::ptr;

use crate::classes::Engine;
use crate::meta::CallContext;
use crate::obj::handle_registry::handle_registry;
use crate::obj::{Base, GodotClass, InstanceId, UserClass};
use crate::private::handle_panic;
use crate::registry::class::ClassInfo;
use crate::registry::method::MethodInfo;
use crate::registry::virtuals::Resolved;
use crate::storage::{as_storage, destroy_storage, into_instance_ptr, InstanceStorage};
use crate::sys::{self, interface_fn, out, BindingError};

pub unsafe extern "C" fn create<T: UserClass>(class_userdata: *mut c_void) -> sys::GDExtensionObjectPtr {
    let ctx = || format!("failed to create instance of {}", T::CLASS_NAME);
    let result = handle_panic(ctx, AssertUnwindSafe(|| create_custom::<T>(class_userdata)));

    match result {
        Ok(Ok(object_ptr)) => object_ptr,
        Ok(Err(err)) => {
            log::error!("failed to create instance of {}: {err}", T::CLASS_NAME);
            ptr::null_mut()
        }
        // Panic already logged.
        Err(_) => ptr::null_mut(),
    }
}

pub unsafe extern "C" fn free<T: UserClass>(
    _class_userdata: *mut c_void,
    instance: sys::GDExtensionClassInstancePtr,
) {
    let ctx = || format!("failed to free instance of {}", T::CLASS_NAME);
    let _ = handle_panic(ctx, AssertUnwindSafe(|| {
        // SAFETY: the engine passes the instance pointer returned by create().
        let storage = unsafe { as_storage::<T>(instance) };
        let id = storage.instance_id();

        if let Err(err) = handle_registry().remove(id) {
            log::warn!("{}: instance {id} not in handle registry: {err}", T::CLASS_NAME);
        }

        if storage.is_bound() {
            log::error!(
                "{}: object {id} destroyed while its Rust instance is bound; the instance is leaked",
                T::CLASS_NAME
            );
            return;
        }

        out!("free instance {id} of {}", T::CLASS_NAME);

        // SAFETY: instance created by create(); no guards alive (checked above), and the engine never passes it again.
        unsafe { destroy_storage::<T>(instance) };
    }));
}

pub unsafe extern "C" fn get_virtual<T: UserClass>(
    class_userdata: *mut c_void,
    name: *const c_char,
) -> *mut c_void {
    // SAFETY: the engine passes a valid method name.
    let method_name = unsafe { sys::read_c_str(name) };

    let ctx = || CallContext::virtual_method(T::CLASS_NAME, &method_name).to_string();
    let result = handle_panic(ctx, AssertUnwindSafe(|| {
        if !virtuals_enabled::<T>() {
            return ptr::null_mut();
        }

        // SAFETY: userdata is the ClassInfo passed on registration, which is never freed.
        let info = unsafe { &*class_userdata.cast::<ClassInfo<T>>() };

        match info.virtuals.resolve(&method_name) {
            Some(Resolved::Override { class_name, depth }) => {
                out!("virtual {method_name} of {} resolved to {class_name} (depth {depth})", T::CLASS_NAME);
                class_userdata
            }
            _ => ptr::null_mut(),
        }
    }));

    result.unwrap_or(ptr::null_mut())
}

pub unsafe extern "C" fn call_virtual_with_data<T: UserClass>(
    instance: sys::GDExtensionClassInstancePtr,
    name: *const c_char,
    virtual_call_userdata: *mut c_void,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
) {
    // SAFETY: the engine passes a valid method name.
    let method_name = unsafe { sys::read_c_str(name) };

    let call_ctx = CallContext::virtual_method(T::CLASS_NAME, &method_name);
    let _ = handle_panic(|| call_ctx, AssertUnwindSafe(|| {
        // SAFETY: userdata is what get_virtual() returned: the ClassInfo of T.
        let info = unsafe { &*virtual_call_userdata.cast::<ClassInfo<T>>() };

        // SAFETY: the engine passes the instance pointer returned by create(), which is alive during the call.
        let storage = unsafe { as_storage::<T>(instance) };

        let Ok(mut guard) = storage.borrow_mut() else {
            log::error!("{call_ctx}: instance is already bound; virtual call skipped");
            return;
        };

        // SAFETY: the engine passes arguments matching the virtual method's signature.
        let called = unsafe { info.virtuals.invoke(&mut guard, &method_name, args, ret) };
        if !called {
            log::warn!("{call_ctx}: no implementation");
        }
    }));
}

pub unsafe extern "C" fn method_ptrcall<T: UserClass>(
    method_userdata: *mut c_void,
    instance: sys::GDExtensionClassInstancePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
) {
    // SAFETY: userdata is the MethodInfo passed on method registration, which is never freed.
    let info = unsafe { &*method_userdata.cast::<MethodInfo<T>>() };

    let call_ctx = CallContext::inbound(info.class_name, info.slot.name());
    let _ = handle_panic(|| call_ctx, AssertUnwindSafe(|| {
        // SAFETY: the engine passes the instance pointer returned by create(), which is alive during the call.
        let storage = unsafe { as_storage::<T>(instance) };

        let Ok(mut guard) = storage.borrow_mut() else {
            log::error!("{call_ctx}: instance is already bound; call skipped");
            return;
        };

        // SAFETY: the engine passes as many arguments as registered, encoded as the method decodes them.
        unsafe { info.slot.invoke(&mut guard, args, ret) };
    }));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Helpers

unsafe fn create_custom<T: UserClass>(class_userdata: *mut c_void) -> Result<sys::GDExtensionObjectPtr, BindingError> {
    // SAFETY: userdata is the ClassInfo passed on registration, which is never freed.
    let info = unsafe { &*class_userdata.cast::<ClassInfo<T>>() };

    let base_class = <T::EngineBase as GodotClass>::CLASS_NAME;
    let base_class_c =
        CString::new(base_class).map_err(|_| BindingError::UnregisteredClass(base_class.to_string()))?;

    // SAFETY: binding initialized, since the class was registered.
    let object_ptr = unsafe { interface_fn!(classdb_construct_object)(base_class_c.as_ptr()) };
    if object_ptr.is_null() {
        return Err(BindingError::UnregisteredClass(base_class.to_string()));
    }

    // SAFETY: freshly constructed object.
    let raw_id = unsafe { interface_fn!(object_get_instance_id)(object_ptr) };
    let Some(id) = InstanceId::try_from_u64(raw_id) else {
        // SAFETY: object is alive and not referenced anywhere else.
        unsafe { interface_fn!(object_destroy)(object_ptr) };
        return Err(BindingError::NullObject);
    };

    let base = Base::<T::EngineBase>::from_sys(object_ptr, id);
    let user_instance = match catch_unwind(AssertUnwindSafe(|| T::init(base.clone()))) {
        Ok(user_instance) => user_instance,
        Err(panic) => {
            // SAFETY: the base object has no instance attached yet and is referenced nowhere else.
            unsafe { interface_fn!(object_destroy)(object_ptr) };
            resume_unwind(panic);
        }
    };

    let instance_ptr = into_instance_ptr(InstanceStorage::construct(user_instance, base));
    handle_registry().insert::<T>(id, instance_ptr.cast_const().cast());

    // SAFETY: object alive; class name registered; instance pointer owned by the engine from now on.
    unsafe { interface_fn!(object_set_instance)(object_ptr, info.class_name.as_ptr(), instance_ptr) };

    out!("created instance {id} of {}", T::CLASS_NAME);
    Ok(object_ptr)
}

/// Whether the engine may call virtual methods of `T`. Outside the editor always; inside only for tools, if so configured.
fn virtuals_enabled<T: UserClass>() -> bool {
    if T::IS_TOOL || !sys::config().tool_only_in_editor {
        return true;
    }

    !Engine::singleton().is_editor_hint()
}
