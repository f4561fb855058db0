/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::obj::Base;
use crate::registry::method::MethodSlot;
use crate::registry::virtuals::VirtualTable;
use crate::sys::{self, InitLevel};

/// Makes `T` eligible to be managed by the engine and stored in [`Gd<T>`][crate::obj::Gd] pointers.
///
/// Implemented by engine class wrappers and by extension classes defined in Rust.
pub trait GodotClass: Sized + 'static {
    /// Name of the class in the engine's ClassDB.
    const CLASS_NAME: &'static str;

    /// Closest engine class: the class itself for engine classes, the native base for extension classes.
    ///
    /// `Gd<Self>` dereferences to it, so its methods are available on every handle.
    type EngineBase: EngineClass;
}

/// Wrapper of a class provided by the engine.
///
/// # Safety
/// Implementors must be `#[repr(transparent)]` over a single object pointer, so that references can be reinterpreted along the
/// inheritance chain.
pub unsafe trait EngineClass: GodotClass<EngineBase = Self> {
    /// Virtual methods the engine declares on this class and its ancestors, with their engine names (e.g. `"_ready"`).
    const VIRTUAL_METHODS: &'static [&'static str] = &[];

    #[doc(hidden)]
    fn __from_object_ptr(object_ptr: sys::GDExtensionObjectPtr) -> Self;

    #[doc(hidden)]
    fn __object_ptr(&self) -> sys::GDExtensionObjectPtr;
}

/// Non-strict inheritance relationship in the engine class hierarchy.
///
/// `Derived: Inherits<Base>` means that an object of `Derived` can be used wherever `Base` is expected.
///
/// # Safety
/// Must only be implemented if `Self` actually derives from `Base` in the engine.
pub unsafe trait Inherits<Base: GodotClass>: GodotClass {}

// SAFETY: every class inherits itself.
unsafe impl<T: GodotClass> Inherits<T> for T {}

/// Extension class implemented in Rust.
///
/// Objects consist of two parts: the engine object of class [`EngineBase`](GodotClass::EngineBase), and an instance of `Self`
/// attached to it. The engine creates and destroys both together.
///
/// To pass `Gd<Self>` where an engine class is expected (e.g. to [`Node::add_child()`](crate::classes::Node::add_child)),
/// implement [`Inherits`] for that class.
pub trait UserClass: GodotClass {
    /// Whether virtual callbacks run inside the editor even when the library is configured to only run tool classes there.
    const IS_TOOL: bool = false;

    /// Initialization level at which the class is registered with the engine.
    const INIT_LEVEL: InitLevel = InitLevel::Scene;

    /// Parent class as registered with the engine.
    ///
    /// The native base by default. Extension classes inheriting from another Rust class return that class's name and forward its
    /// virtuals through [`VirtualTable::inherit()`].
    fn parent_class_name() -> &'static str {
        <Self::EngineBase as GodotClass>::CLASS_NAME
    }

    /// Creates the Rust part of a new object.
    fn init(base: Base<Self::EngineBase>) -> Self;

    /// Virtual methods overridden by this class. By default, none: the engine uses its own implementations.
    fn virtuals() -> VirtualTable<Self> {
        VirtualTable::for_class()
    }

    /// Methods the engine can call by name, e.g. from scripts. By default, none.
    fn methods() -> Vec<MethodSlot<Self>> {
        Vec::new()
    }
}

/// Auto-implemented for engine-provided enums.
pub trait EngineEnum: Copy {
    fn try_from_ord(ord: i32) -> Option<Self>;

    /// Ordinal value of the enumerator, as specified by the engine.
    fn ord(self) -> i32;

    /// # Panics
    /// If `ord` is not a known enumerator.
    fn from_ord(ord: i32) -> Self {
        Self::try_from_ord(ord)
            .unwrap_or_else(|| panic!("ordinal {ord} does not map to any enumerator"))
    }

    /// The name of the enumerator, or an empty string for unknown ordinals.
    fn as_str(&self) -> &'static str;

    /// All known enumerators, in ordinal order.
    fn values() -> &'static [Self];
}
