/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! C ABI of the engine boundary.
//!
//! Mirrors the subset of `gdextension_interface.h` that the marshaling core needs. All engine functionality is reached through
//! function pointers obtained with `get_proc_address`; the struct [`GDExtensionInterface`] holds them after loading.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_void, CStr};

use crate::BindingError;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Scalar and pointer types

pub type GDExtensionBool = u8;
pub type GDExtensionInt = i64;
pub type GDObjectInstanceID = u64;

pub type GDExtensionObjectPtr = *mut c_void;
pub type GDExtensionConstObjectPtr = *const c_void;
pub type GDExtensionTypePtr = *mut c_void;
pub type GDExtensionConstTypePtr = *const c_void;
pub type GDExtensionUninitializedTypePtr = *mut c_void;
pub type GDExtensionStringPtr = *mut c_void;
pub type GDExtensionConstStringPtr = *const c_void;
pub type GDExtensionUninitializedStringPtr = *mut c_void;
pub type GDExtensionMethodBindPtr = *const c_void;
pub type GDExtensionClassInstancePtr = *mut c_void;
pub type GDExtensionClassLibraryPtr = *mut c_void;

pub type GDExtensionInitializationLevel = u32;
pub const GDEXTENSION_INITIALIZATION_CORE: GDExtensionInitializationLevel = 0;
pub const GDEXTENSION_INITIALIZATION_SERVERS: GDExtensionInitializationLevel = 1;
pub const GDEXTENSION_INITIALIZATION_SCENE: GDExtensionInitializationLevel = 2;
pub const GDEXTENSION_INITIALIZATION_EDITOR: GDExtensionInitializationLevel = 3;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionGodotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub string: *const c_char,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Callbacks implemented by the binding, invoked by the engine

pub type GDExtensionClassCreateInstance =
    Option<unsafe extern "C" fn(p_class_userdata: *mut c_void) -> GDExtensionObjectPtr>;

pub type GDExtensionClassFreeInstance = Option<
    unsafe extern "C" fn(p_class_userdata: *mut c_void, p_instance: GDExtensionClassInstancePtr),
>;

pub type GDExtensionClassGetVirtualCallData = Option<
    unsafe extern "C" fn(p_class_userdata: *mut c_void, p_name: *const c_char) -> *mut c_void,
>;

pub type GDExtensionClassCallVirtualWithData = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: *const c_char,
        p_virtual_call_userdata: *mut c_void,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    ),
>;

/// Creation parameters of an extension class, passed to `classdb_register_extension_class`.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionClassCreationInfo {
    pub is_virtual: GDExtensionBool,
    pub is_abstract: GDExtensionBool,
    pub create_instance_func: GDExtensionClassCreateInstance,
    pub free_instance_func: GDExtensionClassFreeInstance,
    pub get_virtual_call_data_func: GDExtensionClassGetVirtualCallData,
    pub call_virtual_with_data_func: GDExtensionClassCallVirtualWithData,
    pub class_userdata: *mut c_void,
}

pub type GDExtensionClassMethodPtrCall = Option<
    unsafe extern "C" fn(
        method_userdata: *mut c_void,
        p_instance: GDExtensionClassInstancePtr,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    ),
>;

pub type GDExtensionClassMethodFlags = u32;
pub const GDEXTENSION_METHOD_FLAG_NORMAL: GDExtensionClassMethodFlags = 1;
pub const GDEXTENSION_METHOD_FLAG_CONST: GDExtensionClassMethodFlags = 4;
pub const GDEXTENSION_METHOD_FLAGS_DEFAULT: GDExtensionClassMethodFlags = GDEXTENSION_METHOD_FLAG_NORMAL;

/// Method of an extension class callable by the engine, passed to `classdb_register_extension_class_method`.
///
/// Arguments and return value use the ptrcall encoding; `argument_count` slots are passed.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionClassMethodInfo {
    pub name: *const c_char,
    pub method_userdata: *mut c_void,
    pub ptrcall_func: GDExtensionClassMethodPtrCall,
    pub method_flags: GDExtensionClassMethodFlags,
    pub has_return_value: GDExtensionBool,
    pub argument_count: u32,
}

pub type GDExtensionInitializeCallback = Option<
    unsafe extern "C" fn(userdata: *mut c_void, p_level: GDExtensionInitializationLevel),
>;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionInitialization {
    pub minimum_initialization_level: GDExtensionInitializationLevel,
    pub userdata: *mut c_void,
    pub initialize: GDExtensionInitializeCallback,
    pub deinitialize: GDExtensionInitializeCallback,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Entry point

pub type GDExtensionInterfaceFunctionPtr = Option<unsafe extern "C" fn()>;

pub type GDExtensionInterfaceGetProcAddress =
    Option<unsafe extern "C" fn(p_function_name: *const c_char) -> GDExtensionInterfaceFunctionPtr>;

pub type GDExtensionInitializationFunction = Option<
    unsafe extern "C" fn(
        p_get_proc_address: GDExtensionInterfaceGetProcAddress,
        p_library: GDExtensionClassLibraryPtr,
        r_initialization: *mut GDExtensionInitialization,
    ) -> GDExtensionBool,
>;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Functions provided by the engine

macro_rules! interface_functions {
    (
        $(
            $( #[doc = $doc:literal] )*
            $name:ident: $Alias:ident = fn( $( $param:ident : $ParamTy:ty ),* ) $( -> $Ret:ty )?;
        )*
    ) => {
        $(
            pub type $Alias = Option<unsafe extern "C" fn( $( $param: $ParamTy ),* ) $( -> $Ret )?>;
        )*

        /// Function table of the engine, loaded once through `get_proc_address`.
        #[derive(Copy, Clone)]
        pub struct GDExtensionInterface {
            $(
                $( #[doc = $doc] )*
                pub $name: $Alias,
            )*
        }

        impl GDExtensionInterface {
            /// Loads every function pointer by name.
            ///
            /// # Safety
            /// `get_proc_address` must be the engine-provided lookup function. Each returned pointer must have the
            /// signature declared for its name.
            pub unsafe fn load(
                get_proc_address: GDExtensionInterfaceGetProcAddress,
            ) -> Result<Self, BindingError> {
                let Some(get_proc_address) = get_proc_address else {
                    return Err(BindingError::MissingInterfaceFn("get_proc_address"));
                };

                Ok(Self {
                    $(
                        $name: {
                            let c_name = concat!(stringify!($name), "\0");
                            let raw = get_proc_address(crate::c_str(c_name.as_bytes()));
                            if raw.is_none() {
                                return Err(BindingError::MissingInterfaceFn(stringify!($name)));
                            }

                            // SAFETY: both are Option<fn> of identical size; the engine guarantees the signature for this name.
                            std::mem::transmute::<GDExtensionInterfaceFunctionPtr, $Alias>(raw)
                        },
                    )*
                })
            }
        }
    };
}

interface_functions! {
    get_godot_version: GDExtensionInterfaceGetGodotVersion = fn(r_godot_version: *mut GDExtensionGodotVersion);

    /// The single polymorphic entry point for engine method calls.
    object_method_bind_ptrcall: GDExtensionInterfaceObjectMethodBindPtrcall = fn(
        p_method_bind: GDExtensionMethodBindPtr,
        p_instance: GDExtensionObjectPtr,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr
    );
    object_destroy: GDExtensionInterfaceObjectDestroy = fn(p_o: GDExtensionObjectPtr);
    object_get_instance_id: GDExtensionInterfaceObjectGetInstanceId = fn(p_object: GDExtensionConstObjectPtr) -> GDObjectInstanceID;
    object_get_instance_from_id: GDExtensionInterfaceObjectGetInstanceFromId = fn(p_instance_id: GDObjectInstanceID) -> GDExtensionObjectPtr;
    /// Returns the runtime class name; the string is owned by the engine and lives as long as the class is registered.
    object_get_class_name: GDExtensionInterfaceObjectGetClassName = fn(p_object: GDExtensionConstObjectPtr) -> *const c_char;
    object_cast_to: GDExtensionInterfaceObjectCastTo = fn(p_object: GDExtensionConstObjectPtr, p_class_tag: *mut c_void) -> GDExtensionObjectPtr;
    object_set_instance: GDExtensionInterfaceObjectSetInstance = fn(
        p_o: GDExtensionObjectPtr,
        p_classname: *const c_char,
        p_instance: GDExtensionClassInstancePtr
    );
    global_get_singleton: GDExtensionInterfaceGlobalGetSingleton = fn(p_name: *const c_char) -> GDExtensionObjectPtr;

    string_new_with_utf8_chars_and_len: GDExtensionInterfaceStringNewWithUtf8CharsAndLen = fn(
        r_dest: GDExtensionUninitializedStringPtr,
        p_contents: *const c_char,
        p_size: GDExtensionInt
    );
    string_new_copy: GDExtensionInterfaceStringNewCopy = fn(r_dest: GDExtensionUninitializedStringPtr, p_src: GDExtensionConstStringPtr);
    /// Writes at most `p_max_write_length` bytes and returns the full UTF-8 length.
    string_to_utf8_chars: GDExtensionInterfaceStringToUtf8Chars = fn(
        p_self: GDExtensionConstStringPtr,
        r_text: *mut c_char,
        p_max_write_length: GDExtensionInt
    ) -> GDExtensionInt;
    string_destroy: GDExtensionInterfaceStringDestroy = fn(p_self: GDExtensionStringPtr);

    classdb_construct_object: GDExtensionInterfaceClassdbConstructObject = fn(p_classname: *const c_char) -> GDExtensionObjectPtr;
    classdb_get_method_bind: GDExtensionInterfaceClassdbGetMethodBind = fn(
        p_classname: *const c_char,
        p_methodname: *const c_char,
        p_hash: GDExtensionInt
    ) -> GDExtensionMethodBindPtr;
    classdb_get_class_tag: GDExtensionInterfaceClassdbGetClassTag = fn(p_classname: *const c_char) -> *mut c_void;
    classdb_register_extension_class: GDExtensionInterfaceClassdbRegisterExtensionClass = fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: *const c_char,
        p_parent_class_name: *const c_char,
        p_extension_funcs: *const GDExtensionClassCreationInfo
    );
    /// The engine copies the info; `method_userdata` must stay valid while the class is registered.
    classdb_register_extension_class_method: GDExtensionInterfaceClassdbRegisterExtensionClassMethod = fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: *const c_char,
        p_method_info: *const GDExtensionClassMethodInfo
    );
    classdb_unregister_extension_class: GDExtensionInterfaceClassdbUnregisterExtensionClass = fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: *const c_char
    );
}

impl GDExtensionInterface {
    /// Queries the running engine's version.
    pub fn godot_version(&self) -> GDExtensionGodotVersion {
        let mut version = GDExtensionGodotVersion {
            major: 0,
            minor: 0,
            patch: 0,
            string: std::ptr::null(),
        };

        // SAFETY: all functions are non-null after `load()`; the engine fills the struct.
        unsafe { crate::unwrap_fn(self.get_godot_version, "get_godot_version")(&mut version) };
        version
    }
}

/// Reads the human-readable version string.
pub fn read_version_string(version: &GDExtensionGodotVersion) -> String {
    if version.string.is_null() {
        return format!("{}.{}.{}", version.major, version.minor, version.patch);
    }

    // SAFETY: the engine provides a static, null-terminated version string.
    let c_str = unsafe { CStr::from_ptr(version.string) };
    c_str.to_string_lossy().into_owned()
}
