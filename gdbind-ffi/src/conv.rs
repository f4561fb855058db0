/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Conversions between Rust primitives and their engine-side encodings.

use crate as sys;

/// Converts a rust-bool into a sys-bool.
pub const fn bool_to_sys(value: bool) -> sys::GDExtensionBool {
    value as sys::GDExtensionBool
}

/// Converts a sys-bool into a rust-bool. Any non-zero value is `true`.
pub const fn bool_from_sys(value: sys::GDExtensionBool) -> bool {
    value != SYS_FALSE
}

pub const SYS_TRUE: sys::GDExtensionBool = bool_to_sys(true);
pub const SYS_FALSE: sys::GDExtensionBool = bool_to_sys(false);

/// Bit set in instance IDs of reference-counted objects.
pub const REF_COUNTED_ID_BIT: u64 = 1 << 63;
