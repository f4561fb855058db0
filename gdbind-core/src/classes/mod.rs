/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Wrappers of engine classes.
//!
//! Each class file declares the wrapper struct, a static method-bind table (name and hash per method, resolved when the table's
//! init level starts) and the methods, which encode their arguments into a [`CallFrame`](crate::sys::CallFrame) and call
//! through the bind. Interface traits such as [`INode`] declare the virtual methods a Rust class can override.

mod control;
mod engine;
mod file_access;
mod node;
mod object;

pub(crate) mod ref_counted;

pub use control::*;
pub use engine::*;
pub use file_access::*;
pub use node::*;
pub use object::*;
pub use ref_counted::RefCounted;

/// Declares the wrapper struct of an engine class, its place in the inheritance chain and its registration.
macro_rules! engine_class {
    (
        $( #[doc = $doc:literal] )*
        pub struct $Class:ident;
        parent: $Parent:ident,
        ancestors: [ $( $Ancestor:ident ),* ],
        init_level: $level:ident,
        virtuals: [ $( $virtual_name:literal ),* $(,)? ],
    ) => {
        $( #[doc = $doc] )*
        #[repr(transparent)]
        pub struct $Class {
            object_ptr: $crate::sys::GDExtensionObjectPtr,
        }

        impl $crate::obj::GodotClass for $Class {
            const CLASS_NAME: &'static str = stringify!($Class);
            type EngineBase = Self;
        }

        // SAFETY: repr(transparent) over the object pointer.
        unsafe impl $crate::obj::EngineClass for $Class {
            const VIRTUAL_METHODS: &'static [&'static str] = &[ $( $virtual_name ),* ];

            fn __from_object_ptr(object_ptr: $crate::sys::GDExtensionObjectPtr) -> Self {
                Self { object_ptr }
            }

            fn __object_ptr(&self) -> $crate::sys::GDExtensionObjectPtr {
                self.object_ptr
            }
        }

        // SAFETY: matches the engine's class hierarchy.
        unsafe impl $crate::obj::Inherits<$Parent> for $Class {}
        $(
            unsafe impl $crate::obj::Inherits<$Ancestor> for $Class {}
        )*

        impl std::ops::Deref for $Class {
            type Target = $Parent;

            fn deref(&self) -> &$Parent {
                // SAFETY: both wrappers are repr(transparent) over the same object pointer.
                unsafe { &*(self as *const Self).cast::<$Parent>() }
            }
        }

        impl std::ops::DerefMut for $Class {
            fn deref_mut(&mut self) -> &mut $Parent {
                // SAFETY: see Deref.
                unsafe { &mut *(self as *mut Self).cast::<$Parent>() }
            }
        }

        impl std::fmt::Debug for $Class {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:p})", stringify!($Class), self.object_ptr)
            }
        }

        $crate::sys::plugin_add!(CLASS_PLUGINS in $crate::registry::plugin;
            $crate::registry::plugin::ClassPlugin::engine::<$Class>(
                Some(<$Parent as $crate::obj::GodotClass>::CLASS_NAME),
                $crate::sys::InitLevel::$level,
            )
        );
    };
}

use engine_class;
