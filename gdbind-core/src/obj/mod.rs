/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Types and traits related to objects.
//!
//! The most important symbols in this module are:
//! * [`GodotClass`], which is implemented for every class that the engine can manage.
//! * [`Gd`], a smart pointer that manages instances of engine classes.
//! * [`RawHandle`] and [`Ownership`], the untyped handle below `Gd` and the rules for releasing it.

mod base;
mod gd;
mod guards;
mod instance_id;
mod raw;
mod traits;

pub(crate) mod handle_registry;

pub use base::*;
pub use gd::*;
pub use guards::{GdMut, GdRef};
pub use instance_id::*;
pub use raw::{Ownership, RawHandle};
pub use traits::*;

pub(crate) use raw::{class_name_of, class_tag};
