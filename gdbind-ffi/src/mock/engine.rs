/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Interface functions of the mock engine.
//!
//! These are called through C function pointers, so they must never unwind: invalid input is logged and ignored.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

use crate as sys;

use super::classes::{MockCall, MockMethod, EXTENSION_METHOD_HASH};
use super::state::{self, SendPtr, State};

/// Engine-side `get_proc_address`: looks up interface functions by name.
pub unsafe extern "C" fn get_proc_address(
    p_function_name: *const c_char,
) -> sys::GDExtensionInterfaceFunctionPtr {
    if p_function_name.is_null() {
        return None;
    }

    let name = CStr::from_ptr(p_function_name).to_bytes();

    macro_rules! lookup {
        ($( $function:ident ),* $(,)?) => {
            match name {
                $(
                    n if n == stringify!($function).as_bytes() => $function as *const (),
                )*
                _ => {
                    log::debug!("mock engine: unknown interface function {}", String::from_utf8_lossy(name));
                    return None;
                }
            }
        };
    }

    let raw: *const () = lookup!(
        get_godot_version,
        object_method_bind_ptrcall,
        object_destroy,
        object_get_instance_id,
        object_get_instance_from_id,
        object_get_class_name,
        object_cast_to,
        object_set_instance,
        global_get_singleton,
        string_new_with_utf8_chars_and_len,
        string_new_copy,
        string_to_utf8_chars,
        string_destroy,
        classdb_construct_object,
        classdb_get_method_bind,
        classdb_get_class_tag,
        classdb_register_extension_class,
        classdb_register_extension_class_method,
        classdb_unregister_extension_class,
    );

    // SAFETY: the receiver transmutes back to the signature registered for the name.
    Some(std::mem::transmute::<*const (), unsafe extern "C" fn()>(raw))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Version

unsafe extern "C" fn get_godot_version(r_godot_version: *mut sys::GDExtensionGodotVersion) {
    static VERSION_STRING: &CStr = c"4.3.stable.mock";

    if r_godot_version.is_null() {
        return;
    }

    let (major, minor, patch) = super::VERSION;
    *r_godot_version = sys::GDExtensionGodotVersion {
        major,
        minor,
        patch,
        string: VERSION_STRING.as_ptr(),
    };
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Objects

pub(super) unsafe extern "C" fn object_method_bind_ptrcall(
    p_method_bind: sys::GDExtensionMethodBindPtr,
    p_instance: sys::GDExtensionObjectPtr,
    p_args: *const sys::GDExtensionConstTypePtr,
    r_ret: sys::GDExtensionTypePtr,
) {
    if p_method_bind.is_null() {
        log::error!("mock engine: ptrcall with null method bind");
        return;
    }

    // SAFETY: non-null binds are only ever handed out by classdb_get_method_bind, pointing to leaked MockMethods.
    let method = &*p_method_bind.cast::<MockMethod>();

    if !p_instance.is_null() && state::lock().record_of(p_instance).is_none() {
        log::error!(
            "mock engine: {}::{} called on destroyed object",
            method.class_name,
            method.name
        );
        return;
    }

    let mut call = MockCall::new(p_instance, p_args, method.arity, r_ret);
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        (method.behavior)(&mut call)
    }));

    if let Err(err) = outcome {
        log::error!(
            "mock engine: {}::{} panicked: {}",
            method.class_name,
            method.name,
            sys::extract_panic_message(err.as_ref())
        );
    }
}

pub(super) unsafe extern "C" fn object_destroy(p_o: sys::GDExtensionObjectPtr) {
    let Some(id) = State::header_id(p_o) else {
        return;
    };

    let free_calls: Vec<_> = {
        let mut state = state::lock();
        if !state.objects.contains_key(&id) {
            log::error!("mock engine: object_destroy on dead object {id}");
            return;
        }

        let removed = state.remove_tree(id);
        removed
            .iter()
            .filter(|record| record.instance != 0)
            .filter_map(|record| {
                let (free_fn, userdata) = state.free_callback(record)?;
                Some((free_fn?, SendPtr::new(userdata), record.instance))
            })
            .collect()
    };

    for (free_fn, userdata, instance) in free_calls {
        free_fn(userdata.into_inner(), instance as sys::GDExtensionClassInstancePtr);
    }
}

pub(super) unsafe extern "C" fn object_get_instance_id(
    p_object: sys::GDExtensionConstObjectPtr,
) -> sys::GDObjectInstanceID {
    match State::header_id(p_object) {
        Some(id) if state::lock().objects.contains_key(&id) => id,
        _ => 0,
    }
}

pub(super) unsafe extern "C" fn object_get_instance_from_id(
    p_instance_id: sys::GDObjectInstanceID,
) -> sys::GDExtensionObjectPtr {
    state::lock()
        .objects
        .get(&p_instance_id)
        .map_or(ptr::null_mut(), |record| record.object_ptr())
}

unsafe extern "C" fn object_get_class_name(p_object: sys::GDExtensionConstObjectPtr) -> *const c_char {
    let mut state = state::lock();
    let Some(class) = state.record_of(p_object).map(|r| r.class.clone()) else {
        return ptr::null();
    };

    state.c_name(&class).as_ptr()
}

unsafe extern "C" fn object_cast_to(
    p_object: sys::GDExtensionConstObjectPtr,
    p_class_tag: *mut c_void,
) -> sys::GDExtensionObjectPtr {
    let mut state = state::lock();
    let Some(class) = state.record_of(p_object).map(|r| r.class.clone()) else {
        return ptr::null_mut();
    };

    let ancestry: Vec<String> = state.ancestry(&class).map(str::to_string).collect();
    let matches = ancestry.iter().any(|c| state.tag(c) == p_class_tag);

    if matches {
        p_object.cast_mut()
    } else {
        ptr::null_mut()
    }
}

unsafe extern "C" fn object_set_instance(
    p_o: sys::GDExtensionObjectPtr,
    p_classname: *const c_char,
    p_instance: sys::GDExtensionClassInstancePtr,
) {
    let class_name = sys::read_c_str(p_classname);

    let mut state = state::lock();
    if !state.classes.contains_key(&class_name) {
        log::error!("mock engine: object_set_instance with unknown class {class_name}");
        return;
    }

    match state.record_of_mut(p_o) {
        Some(record) => {
            record.class = class_name;
            record.instance = p_instance as usize;
        }
        None => log::error!("mock engine: object_set_instance on dead object"),
    }
}

unsafe extern "C" fn global_get_singleton(p_name: *const c_char) -> sys::GDExtensionObjectPtr {
    let name = sys::read_c_str(p_name);
    let state = state::lock();

    state
        .singletons
        .get(&name)
        .and_then(|id| state.objects.get(id))
        .map_or(ptr::null_mut(), |record| record.object_ptr())
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Strings
//
// A string value is one pointer-sized word holding a `Box<String>`; null is the empty string.

pub(super) fn string_into_word(text: String) -> *mut c_void {
    Box::into_raw(Box::new(text)).cast()
}

/// Copies the string a word refers to.
pub(super) fn string_from_word(word: *mut c_void) -> String {
    if word.is_null() {
        return String::new();
    }

    // SAFETY: non-null words are created by string_into_word and owned by a live string value.
    unsafe { (*word.cast::<String>()).clone() }
}

unsafe extern "C" fn string_new_with_utf8_chars_and_len(
    r_dest: sys::GDExtensionUninitializedStringPtr,
    p_contents: *const c_char,
    p_size: sys::GDExtensionInt,
) {
    if r_dest.is_null() {
        return;
    }

    let text = match usize::try_from(p_size) {
        Ok(len) if !p_contents.is_null() => {
            let bytes = std::slice::from_raw_parts(p_contents.cast::<u8>(), len);
            String::from_utf8_lossy(bytes).into_owned()
        }
        _ => String::new(),
    };

    r_dest.cast::<*mut c_void>().write(string_into_word(text));
}

unsafe extern "C" fn string_new_copy(
    r_dest: sys::GDExtensionUninitializedStringPtr,
    p_src: sys::GDExtensionConstStringPtr,
) {
    if r_dest.is_null() || p_src.is_null() {
        return;
    }

    let text = string_from_word(p_src.cast::<*mut c_void>().read());
    r_dest.cast::<*mut c_void>().write(string_into_word(text));
}

unsafe extern "C" fn string_to_utf8_chars(
    p_self: sys::GDExtensionConstStringPtr,
    r_text: *mut c_char,
    p_max_write_length: sys::GDExtensionInt,
) -> sys::GDExtensionInt {
    if p_self.is_null() {
        return 0;
    }

    let text = string_from_word(p_self.cast::<*mut c_void>().read());
    let bytes = text.as_bytes();

    if !r_text.is_null() {
        let max = usize::try_from(p_max_write_length).unwrap_or(0);
        let count = bytes.len().min(max);
        ptr::copy_nonoverlapping(bytes.as_ptr(), r_text.cast::<u8>(), count);
    }

    bytes.len() as sys::GDExtensionInt
}

pub(super) unsafe extern "C" fn string_destroy(p_self: sys::GDExtensionStringPtr) {
    if p_self.is_null() {
        return;
    }

    let word_ptr = p_self.cast::<*mut c_void>();
    let word = word_ptr.read();
    if !word.is_null() {
        drop(Box::from_raw(word.cast::<String>()));
    }
    word_ptr.write(ptr::null_mut());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// ClassDB

pub(super) unsafe extern "C" fn classdb_construct_object(p_classname: *const c_char) -> sys::GDExtensionObjectPtr {
    let class_name = sys::read_c_str(p_classname);

    let extension = {
        let mut state = state::lock();
        match state.classes.get(&class_name) {
            None => {
                log::error!("mock engine: cannot construct unknown class {class_name}");
                return ptr::null_mut();
            }
            Some(record) => match &record.extension {
                Some(info) => info.get(),
                None => return state.allocate(&class_name),
            },
        }
    };

    // Extension classes are created by the extension, which calls back into construct + set_instance.
    if sys::bool_from_sys(extension.is_abstract) {
        log::error!("mock engine: cannot construct abstract class {class_name}");
        return ptr::null_mut();
    }

    match extension.create_instance_func {
        Some(create) => create(extension.class_userdata),
        None => {
            log::error!("mock engine: class {class_name} has no create function");
            ptr::null_mut()
        }
    }
}

pub(super) unsafe extern "C" fn classdb_get_method_bind(
    p_classname: *const c_char,
    p_methodname: *const c_char,
    p_hash: sys::GDExtensionInt,
) -> sys::GDExtensionMethodBindPtr {
    let class_name = sys::read_c_str(p_classname);
    let method_name = sys::read_c_str(p_methodname);

    let state = state::lock();
    match state.find_method(&class_name, &method_name) {
        Some(method) if method.hash == p_hash => (method as *const MockMethod).cast(),
        Some(method) => {
            log::warn!(
                "mock engine: hash mismatch for {class_name}::{method_name}: requested {p_hash}, known {}",
                method.hash
            );
            ptr::null()
        }
        None => ptr::null(),
    }
}

unsafe extern "C" fn classdb_get_class_tag(p_classname: *const c_char) -> *mut c_void {
    let class_name = sys::read_c_str(p_classname);

    let mut state = state::lock();
    if !state.classes.contains_key(&class_name) {
        return ptr::null_mut();
    }

    state.tag(&class_name)
}

unsafe extern "C" fn classdb_register_extension_class(
    _p_library: sys::GDExtensionClassLibraryPtr,
    p_class_name: *const c_char,
    p_parent_class_name: *const c_char,
    p_extension_funcs: *const sys::GDExtensionClassCreationInfo,
) {
    let class_name = sys::read_c_str(p_class_name);
    let parent_name = sys::read_c_str(p_parent_class_name);

    if p_extension_funcs.is_null() {
        log::error!("mock engine: registering {class_name} without creation info");
        return;
    }

    let mut state = state::lock();
    if !state.classes.contains_key(&parent_name) {
        log::error!("mock engine: cannot register {class_name}; parent {parent_name} unknown");
        return;
    }

    let replaced = state
        .classes
        .insert(
            class_name.clone(),
            state::ClassRecord {
                parent: Some(parent_name),
                extension: Some(SendPtr::new(*p_extension_funcs)),
            },
        )
        .is_some();

    *state.registrations.entry(class_name.clone()).or_default() += 1;
    log::debug!("mock engine: registered extension class {class_name} (replaced: {replaced})");
}

unsafe extern "C" fn classdb_register_extension_class_method(
    _p_library: sys::GDExtensionClassLibraryPtr,
    p_class_name: *const c_char,
    p_method_info: *const sys::GDExtensionClassMethodInfo,
) {
    let class_name = sys::read_c_str(p_class_name);
    if p_method_info.is_null() {
        log::error!("mock engine: registering method of {class_name} without method info");
        return;
    }

    let info = *p_method_info;
    let method_name = sys::read_c_str(info.name);
    let Some(ptrcall) = info.ptrcall_func else {
        log::error!("mock engine: method {class_name}::{method_name} has no ptrcall function");
        return;
    };

    let mut state = state::lock();
    let is_extension = state
        .classes
        .get(&class_name)
        .is_some_and(|record| record.extension.is_some());

    if !is_extension {
        log::error!("mock engine: cannot add method {method_name} to {class_name}; not an extension class");
        return;
    }

    // Stored as address, since behaviors are shared between threads.
    let userdata = info.method_userdata as usize;
    let arity = info.argument_count as usize;

    state.define(&class_name, &method_name, EXTENSION_METHOD_HASH, arity, move |call| {
        let instance = state::lock().record_of(call.object()).map_or(0, |record| record.instance);
        if instance == 0 {
            log::error!("mock engine: extension method called on object without extension instance");
            return;
        }

        let (args, ret) = call.raw_parts();

        // SAFETY: userdata and instance were handed out by the extension; arguments come from the caller of the bind.
        unsafe {
            ptrcall(
                userdata as *mut c_void,
                instance as sys::GDExtensionClassInstancePtr,
                args,
                ret,
            )
        };
    });

    log::debug!("mock engine: registered method {class_name}::{method_name}/{arity}");
}

unsafe extern "C" fn classdb_unregister_extension_class(
    _p_library: sys::GDExtensionClassLibraryPtr,
    p_class_name: *const c_char,
) {
    let class_name = sys::read_c_str(p_class_name);

    let mut state = state::lock();
    let is_extension = state
        .classes
        .get(&class_name)
        .is_some_and(|record| record.extension.is_some());

    if is_extension {
        state.classes.remove(&class_name);
        state.methods.retain(|(class, _), _| *class != class_name);
    } else {
        log::error!("mock engine: cannot unregister {class_name}; not an extension class");
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Calls by name

pub(super) unsafe fn call_method(
    object: sys::GDExtensionObjectPtr,
    name: &str,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
) -> bool {
    let method = {
        let state = state::lock();
        let Some(class) = state.record_of(object).map(|record| record.class.clone()) else {
            return false;
        };
        let Some(method) = state.find_method(&class, name) else {
            return false;
        };
        method
    };

    object_method_bind_ptrcall((method as *const MockMethod).cast(), object, args, ret);
    true
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Virtual calls

pub(super) unsafe fn call_virtual(
    object: sys::GDExtensionObjectPtr,
    name: &str,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
) -> bool {
    let (info, instance) = {
        let state = state::lock();
        let Some(record) = state.record_of(object) else {
            return false;
        };
        if record.instance == 0 {
            return false;
        }

        let Some(info) = state
            .classes
            .get(&record.class)
            .and_then(|class| class.extension.as_ref())
            .map(SendPtr::get)
        else {
            return false;
        };

        (info, record.instance as sys::GDExtensionClassInstancePtr)
    };

    let (Some(get_virtual), Some(call_with_data)) =
        (info.get_virtual_call_data_func, info.call_virtual_with_data_func)
    else {
        return false;
    };

    let Ok(c_name) = CString::new(name) else {
        return false;
    };

    let call_data = get_virtual(info.class_userdata, c_name.as_ptr());
    if call_data.is_null() {
        return false;
    }

    call_with_data(instance, c_name.as_ptr(), call_data, args, ret);
    true
}
