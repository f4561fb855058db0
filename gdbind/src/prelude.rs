/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub use super::builtin::{GString, Vector2};
pub use super::classes::{
    Control, ControlVirtual, Engine, FileAccess, IControl, INode, ModeFlags, Node, NodeVirtual, Object, RefCounted,
};
pub use super::global::Error;
pub use super::init::{gdextension_entry, BindingConfig, ExtensionLibrary, InitLevel, Safeguards};
pub use super::obj::{Base, Gd, GdMut, GdRef, GodotClass, Inherits, InstanceId, Ownership, UserClass};
pub use super::register::{register_class, MethodSlot, VirtualTable};

// Make trait methods available.
pub use super::obj::EngineEnum as _;
