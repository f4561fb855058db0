/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The **gdbind** library implements Rust bindings for GDExtension, the C interface of the Godot engine.
//!
//! # Objects and ownership
//!
//! Engine objects are accessed through [`Gd<T>`][crate::obj::Gd] handles. Each handle carries one of three ownership modes,
//! decided by how it was obtained:
//!
//! 1. **Owned**: objects created with [`Gd::new_alloc()`][crate::obj::Gd::new_alloc] that are not reference-counted, e.g. nodes.
//!    The handle destroys the object when it is freed or dropped, unless ownership is handed to the engine first (e.g. by
//!    adding a node to the scene tree). <br><br>
//!
//! 2. **Reference-counted**: objects deriving from [`RefCounted`][crate::classes::RefCounted]. Each handle holds one
//!    reference; the object is destroyed when the last one goes away. <br><br>
//!
//! 3. **Borrowed**: objects owned by someone else, e.g. a child returned by the scene tree or an engine singleton. The handle
//!    never destroys the object. If bound to a parent, it becomes invalid together with that parent.
//!
//! Accessing a destroyed object through a handle panics, as far as the configured [`Safeguards`][crate::init::Safeguards]
//! check it.
//!
//! # Extension classes
//!
//! Rust types implementing [`UserClass`][crate::obj::UserClass] become classes of the engine. Their virtual methods
//! (`_ready`, `_process`, ...) are dispatched through a [`VirtualTable`][crate::register::VirtualTable]; slots the class
//! does not override fall back to a parent extension class, then to the engine's own implementation.
//!
//! Methods listed in [`UserClass::methods()`][crate::obj::UserClass::methods] are registered with the engine as well, so that
//! scripts and other extensions can call them by name.
//!
//! # Public API
//!
//! The following API symbols are considered private:
//!
//! * Symbols annotated with `#[doc(hidden)]`.
//! * Any of the dependency crates (crate `gdbind` is the only public interface).
//! * Modules named `private` and all their contents.
//!
//! There are **no guarantees** regarding API stability, robustness or correctness of private symbols.

#[doc(inline)]
pub use gdbind_core::{builtin, classes, global, meta, obj};

#[doc(hidden)]
pub use gdbind_core::sys;

pub mod init {
    pub use gdbind_core::init::*;

    // Re-exports
    pub use gdbind_core::gdextension_entry;
}

/// Registration of extension classes and their virtual methods.
pub mod register {
    pub use gdbind_core::registry::class::{register_class, ClassBuilder, ClassRegistry};
    pub use gdbind_core::registry::method::{MethodFn, MethodSlot};
    pub use gdbind_core::registry::virtuals::{Resolved, VirtualFn, VirtualSlot, VirtualTable};
    pub use gdbind_core::register_class;
}

#[doc(hidden)]
pub use gdbind_core::private;

/// Engine stand-in for tests of extension crates.
#[cfg(feature = "mock-engine")]
pub use gdbind_core::sys::mock;

pub mod prelude;
