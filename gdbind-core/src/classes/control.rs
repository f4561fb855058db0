/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::Vector2;
use crate::classes::{INode, Node, NodeVirtual, Object};
use crate::obj::UserClass;
use crate::registry::virtuals::{VirtualSlot, VirtualTable};
use crate::sys::{self, CallFrame, ClassMethodTable, InitLevel, MethodDescriptor};

super::engine_class! {
    /// Base class of all UI elements, with a rectangle defined by position and size.
    pub struct Control;
    parent: Node,
    ancestors: [Object],
    init_level: Scene,
    virtuals: [
        "_enter_tree", "_exit_tree", "_ready", "_process", "_physics_process",
        "_has_point", "_get_minimum_size",
    ],
}

static CONTROL_METHODS: ClassMethodTable = ClassMethodTable::new(
    "Control",
    InitLevel::Scene,
    &[
        MethodDescriptor::new("set_size", 743155724),
        MethodDescriptor::new("get_size", 3341600327),
        MethodDescriptor::new("set_position", 2436320129),
        MethodDescriptor::new("get_position", 3341600327),
    ],
);

sys::plugin_add!(METHOD_TABLES in crate::sys; &CONTROL_METHODS);

const SET_SIZE: usize = 0;
const GET_SIZE: usize = 1;
const SET_POSITION: usize = 2;
const GET_POSITION: usize = 3;

impl Control {
    pub fn set_size(&mut self, size: Vector2) {
        self.set_vector(SET_SIZE, size);
    }

    pub fn get_size(&self) -> Vector2 {
        self.get_vector(GET_SIZE)
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.set_vector(SET_POSITION, position);
    }

    pub fn get_position(&self) -> Vector2 {
        self.get_vector(GET_POSITION)
    }

    /// Virtual table overriding the given slots with the implementations of `T`.
    pub fn virtual_table<T>(overrides: &[ControlVirtual]) -> VirtualTable<T>
    where
        T: UserClass + IControl,
    {
        overrides.iter().fold(
            VirtualTable::for_class(),
            |table, slot| table.with_override(slot.slot::<T>()),
        )
    }

    fn set_vector(&mut self, method_index: usize, value: Vector2) {
        let keep_offsets = false;

        let mut frame = CallFrame::new();
        frame.arg(&value).arg(&keep_offsets);

        // SAFETY: (Vector2, bool) -> void.
        let () = unsafe { frame.ptrcall(CONTROL_METHODS.bind(method_index), self.object_ptr) };
    }

    fn get_vector(&self, method_index: usize) -> Vector2 {
        let frame = CallFrame::new();

        // SAFETY: () -> Vector2.
        unsafe { frame.ptrcall(CONTROL_METHODS.bind(method_index), self.object_ptr) }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Virtual methods

/// Virtual methods of [`Control`] that Rust classes can override, in addition to those of [`INode`].
#[allow(unused_variables)]
pub trait IControl: INode {
    /// Whether `point` (in local coordinates) is inside the control, for input handling.
    fn has_point(&self, point: Vector2) -> bool {
        false
    }

    /// Minimum size for container layout.
    fn get_minimum_size(&self) -> Vector2 {
        Vector2::ZERO
    }
}

/// Overridable virtual slots of [`Control`], including the inherited ones of [`Node`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ControlVirtual {
    Node(NodeVirtual),
    HasPoint,
    GetMinimumSize,
}

impl ControlVirtual {
    pub fn name(self) -> &'static str {
        match self {
            Self::Node(inherited) => inherited.name(),
            Self::HasPoint => "_has_point",
            Self::GetMinimumSize => "_get_minimum_size",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "_has_point" => Some(Self::HasPoint),
            "_get_minimum_size" => Some(Self::GetMinimumSize),
            _ => NodeVirtual::from_name(name).map(Self::Node),
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Node(inherited) => inherited.arity(),
            Self::HasPoint => 1,
            Self::GetMinimumSize => 0,
        }
    }

    pub fn slot<T: IControl>(self) -> VirtualSlot<T> {
        match self {
            Self::Node(inherited) => inherited.slot::<T>(),
            Self::HasPoint => VirtualSlot::new(self.name(), self.arity(), |this, args, ret| {
                // SAFETY: the engine passes one Vector2.
                let point = unsafe { args.get::<Vector2>(0) };
                ret.set(this.has_point(point));
            }),
            Self::GetMinimumSize => VirtualSlot::new(self.name(), self.arity(), |this, _args, ret| {
                ret.set(this.get_minimum_size());
            }),
        }
    }
}

impl From<NodeVirtual> for ControlVirtual {
    fn from(inherited: NodeVirtual) -> Self {
        Self::Node(inherited)
    }
}
