/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::sys::GodotFfi;

/// Vector used for 2D math using floating point coordinates.
///
/// Uses 32-bit components, matching an engine built with single precision.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Vector2 {
    /// The vector's X component.
    pub x: f32,

    /// The vector's Y component.
    pub y: f32,
}

impl Vector2 {
    /// Vector with all components set to `0.0`.
    pub const ZERO: Self = Self::splat(0.0);

    /// Vector with all components set to `1.0`.
    pub const ONE: Self = Self::splat(1.0);

    /// Unit vector in +X direction (right in 2D coordinate system).
    pub const RIGHT: Self = Self::new(1.0, 0.0);

    /// Unit vector in +Y direction (down in 2D coordinate system).
    pub const DOWN: Self = Self::new(0.0, 1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Constructs a new `Vector2` with both components set to `v`.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v)
    }

    /// Converts the corresponding `glam` type to `Self`.
    pub fn from_glam(v: glam::Vec2) -> Self {
        Self::new(v.x, v.y)
    }

    /// Converts `self` to the corresponding `glam` type.
    pub fn to_glam(self) -> glam::Vec2 {
        glam::Vec2::new(self.x, self.y)
    }

    pub fn length(self) -> f32 {
        self.to_glam().length()
    }

    pub fn dot(self, with: Self) -> f32 {
        self.to_glam().dot(with.to_glam())
    }

    /// Area of the rectangle spanned by the components; for sizes.
    pub fn area(self) -> f32 {
        self.x * self.y
    }

    pub fn normalized(self) -> Self {
        Self::from_glam(self.to_glam().normalize_or_zero())
    }

    pub fn is_equal_approx(self, to: Self) -> bool {
        self.to_glam().abs_diff_eq(to.to_glam(), 1e-5)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_glam(self.to_glam() + rhs.to_glam())
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_glam(self.to_glam() - rhs.to_glam())
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::from_glam(self.to_glam() * rhs)
    }
}

impl Div<f32> for Vector2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::from_glam(self.to_glam() / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Self::from_glam(v)
    }
}

// SAFETY: two packed f32, identical to the engine's single-precision Vector2.
unsafe impl GodotFfi for Vector2 {
    type Repr = [f32; 2];

    fn to_repr(&self) -> Self::Repr {
        [self.x, self.y]
    }

    unsafe fn from_repr(repr: Self::Repr) -> Self {
        Self::new(repr[0], repr[1])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, -1.0);

        assert_eq!(a + b, Vector2::new(4.0, 1.0));
        assert_eq!(a - b, Vector2::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
        assert_eq!(a.dot(b), 1.0);
    }

    #[test]
    fn length_and_normalization() {
        let v = Vector2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert!(v.normalized().is_equal_approx(Vector2::new(0.6, 0.8)));
        assert_eq!(Vector2::ZERO.normalized(), Vector2::ZERO);
    }

    #[test]
    fn ffi_layout() {
        let v = Vector2::new(120.0, 45.5);
        assert_eq!(v.to_repr(), [120.0, 45.5]);
        assert_eq!(unsafe { Vector2::from_repr(v.to_repr()) }, v);
        assert_eq!(std::mem::size_of::<Vector2>(), 8);
    }

    mod proptests {
        use proptest::prelude::*;

        use crate::builtin::Vector2;
        use crate::sys::{CallFrame, PtrArgs, PtrReturn};

        fn component() -> impl Strategy<Value = f32> {
            -1.0e3_f32..1.0e3
        }

        fn vector() -> impl Strategy<Value = Vector2> {
            (component(), component()).prop_map(|(x, y)| Vector2::new(x, y))
        }

        /// Passes both vectors to a callback that returns their sum, like an engine method taking two `Vector2`.
        fn sum_through_frame(a: Vector2, b: Vector2) -> Vector2 {
            let mut frame = CallFrame::new();
            frame.arg(&a).arg(&b);

            unsafe {
                frame.ptrcall_with(|args, ret| {
                    let args = PtrArgs::new(args, 2);
                    let sum = args.get::<Vector2>(0) + args.get::<Vector2>(1);
                    PtrReturn::new(ret).set(sum);
                })
            }
        }

        proptest! {
            #[test]
            fn frame_carries_vectors(a in vector(), b in vector()) {
                prop_assert_eq!(sum_through_frame(a, b), a + b);
                prop_assert_eq!(sum_through_frame(a, Vector2::ZERO), a);
            }

            #[test]
            fn sub_undoes_add(a in vector(), b in vector()) {
                let back = (a + b) - b;
                prop_assert!(back.to_glam().abs_diff_eq(a.to_glam(), 1e-3), "{back} != {a}");
            }

            #[test]
            fn normalized_has_unit_length(v in vector().prop_filter("too short to normalize", |v| v.length() > 0.1)) {
                prop_assert!((v.normalized().length() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let v = Vector2::new(1.5, -2.0);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":-2.0}"#);

        let back: Vector2 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
