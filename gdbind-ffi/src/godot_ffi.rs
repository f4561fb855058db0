/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_void;

use crate as sys;

/// Types that have a fixed-width native representation in ptrcall argument and return slots.
///
/// Integers are widened to `i64`, floats to `f64`, `bool` is a single byte; objects and strings are pointer-sized words.
/// The representation must fit into one [`CallFrame`](crate::CallFrame) slot.
///
/// # Safety
///
/// `Repr` must be exactly the layout the engine reads and writes for this type in ptrcalls. [`into_repr`](GodotFfi::into_repr)
/// and [`from_repr`](GodotFfi::from_repr) must be inverse to each other with regard to ownership: a value moved into its
/// representation must be reconstructible exactly once. All-zero bytes must be a valid `Repr` (return slots start zeroed).
#[doc(hidden)] // shows up in implementors otherwise
pub unsafe trait GodotFfi: Sized {
    /// Native encoding in a slot.
    type Repr: Copy + 'static;

    /// Encodes the value without giving up ownership.
    ///
    /// The result is only valid as long as `self` is alive; the engine reads it as a borrowed argument.
    fn to_repr(&self) -> Self::Repr;

    /// Encodes the value, transferring any owned resource into the representation.
    ///
    /// The default is only correct for types that own no resources; types such as strings must override it.
    fn into_repr(self) -> Self::Repr {
        self.to_repr()
    }

    /// Takes ownership of a representation written by the engine (return slot).
    ///
    /// # Safety
    /// `repr` must have been produced by the engine or by [`into_repr`](GodotFfi::into_repr), and not be consumed twice.
    unsafe fn from_repr(repr: Self::Repr) -> Self;

    /// Constructs a value from a borrowed argument the engine passes into a callback.
    ///
    /// For types owning resources, this must make an independent copy; the engine keeps ownership of `repr`.
    ///
    /// # Safety
    /// `repr` must be a valid representation of `Self`.
    unsafe fn from_arg_repr(repr: &Self::Repr) -> Self {
        Self::from_repr(*repr)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementations for primitives

macro_rules! impl_godot_ffi_as {
    ($Repr:ty; $($T:ty),+ $(,)?) => {
        $(
            unsafe impl GodotFfi for $T {
                type Repr = $Repr;

                fn to_repr(&self) -> $Repr {
                    *self as $Repr
                }

                unsafe fn from_repr(repr: $Repr) -> Self {
                    // Values outside the range of Self are truncated, like the engine's own narrowing casts.
                    repr as $T
                }
            }
        )+
    };
}

impl_godot_ffi_as!(i64; i8, i16, i32, i64, isize, u8, u16, u32, usize);
impl_godot_ffi_as!(u64; u64);
impl_godot_ffi_as!(f64; f32, f64);

unsafe impl GodotFfi for bool {
    type Repr = sys::GDExtensionBool;

    fn to_repr(&self) -> Self::Repr {
        sys::bool_to_sys(*self)
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        sys::bool_from_sys(repr)
    }
}

unsafe impl GodotFfi for () {
    type Repr = ();

    fn to_repr(&self) -> Self::Repr {}

    unsafe fn from_repr(_repr: Self::Repr) -> Self {}
}

/// Raw object or opaque handle words.
unsafe impl GodotFfi for *mut c_void {
    type Repr = *mut c_void;

    fn to_repr(&self) -> Self::Repr {
        *self
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        repr
    }
}

unsafe impl GodotFfi for *const c_void {
    type Repr = *const c_void;

    fn to_repr(&self) -> Self::Repr {
        *self
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        repr
    }
}

/// Two packed `f32` components, the layout of `Vector2` in ptrcalls.
unsafe impl GodotFfi for [f32; 2] {
    type Repr = [f32; 2];

    fn to_repr(&self) -> Self::Repr {
        *self
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        repr
    }
}
