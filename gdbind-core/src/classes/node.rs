/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::Any;

use crate::builtin::GString;
use crate::classes::Object;
use crate::meta::{panic_call_error, CallContext};
use crate::obj::{Gd, Inherits, RawHandle, UserClass};
use crate::registry::class::class_registry;
use crate::registry::virtuals::{VirtualSlot, VirtualTable};
use crate::sys::{self, CallFrame, ClassMethodTable, InitLevel, MethodDescriptor};

super::engine_class! {
    /// Base class of everything that can be part of the scene tree.
    pub struct Node;
    parent: Object,
    ancestors: [],
    init_level: Scene,
    virtuals: ["_enter_tree", "_exit_tree", "_ready", "_process", "_physics_process"],
}

static NODE_METHODS: ClassMethodTable = ClassMethodTable::new(
    "Node",
    InitLevel::Scene,
    &[
        MethodDescriptor::new("add_child", 3863233950),
        MethodDescriptor::new("get_child_count", 894402480),
        MethodDescriptor::new("get_child", 541253412),
        MethodDescriptor::new("get_parent", 3160264692),
        MethodDescriptor::new("set_name", 83702148),
        MethodDescriptor::new("get_name", 2002593661),
    ],
);

sys::plugin_add!(METHOD_TABLES in crate::sys; &NODE_METHODS);

const ADD_CHILD: usize = 0;
const GET_CHILD_COUNT: usize = 1;
const GET_CHILD: usize = 2;
const GET_PARENT: usize = 3;
const SET_NAME: usize = 4;
const GET_NAME: usize = 5;

/// `Node.InternalMode.INTERNAL_MODE_DISABLED`.
const INTERNAL_MODE_DISABLED: i64 = 0;

impl Node {
    /// Adds `node` as a child. The scene tree takes ownership; the returned handle is bound to the lifetime of `self`.
    ///
    /// Entering the tree invokes the child's `_enter_tree` and `_ready` virtuals.
    pub fn add_child<T>(&mut self, node: Gd<T>) -> Gd<T>
    where
        T: Inherits<Node>,
    {
        let child_ptr = node.into_engine();
        let force_readable_name = false;

        let mut frame = CallFrame::new();
        frame
            .arg(&child_ptr)
            .arg(&force_readable_name)
            .arg_owned(INTERNAL_MODE_DISABLED);

        // SAFETY: (Node, bool, InternalMode) -> void.
        let () = unsafe { frame.ptrcall(NODE_METHODS.bind(ADD_CHILD), self.object_ptr) };

        // SAFETY: both pointers were handed out by the engine.
        match unsafe { RawHandle::lifetime_bound_to(self.object_ptr, child_ptr) } {
            Ok(raw) => Gd::from_raw(raw),
            Err(err) => panic_call_error(&CallContext::outbound("Node", "add_child"), &err),
        }
    }

    pub fn get_child_count(&self) -> i32 {
        let include_internal = false;

        let mut frame = CallFrame::new();
        frame.arg(&include_internal);

        // SAFETY: (bool) -> int.
        let count: i64 = unsafe { frame.ptrcall(NODE_METHODS.bind(GET_CHILD_COUNT), self.object_ptr) };
        count as i32
    }

    /// Child at position `idx`; negative indices count from the end. The handle is bound to the lifetime of `self`.
    pub fn get_child(&self, idx: i32) -> Option<Gd<Node>> {
        let child_ptr = self.get_child_ptr(idx);

        // SAFETY: null or a pointer handed out by the engine.
        unsafe { RawHandle::lifetime_bound_to(self.object_ptr, child_ptr) }
            .ok()
            .map(Gd::from_raw)
    }

    /// Child at position `idx`, wrapped as the most derived class registered for its runtime class.
    ///
    /// The result is a `Gd<C>` for some class `C`, to be recovered with [`Box::downcast`].
    pub fn get_child_dyn(&self, idx: i32) -> Option<Box<dyn Any>> {
        let child_ptr = self.get_child_ptr(idx);

        // SAFETY: null or a pointer handed out by the engine.
        let raw = unsafe { RawHandle::lifetime_bound_to(self.object_ptr, child_ptr) }.ok()?;

        class_registry()
            .instantiate(raw)
            .map_err(|err| log::warn!("Node::get_child_dyn(): {err}"))
            .ok()
    }

    /// Parent in the scene tree, if any.
    pub fn get_parent(&self) -> Option<Gd<Node>> {
        let frame = CallFrame::new();

        // SAFETY: () -> Node.
        let parent_ptr: sys::GDExtensionObjectPtr =
            unsafe { frame.ptrcall(NODE_METHODS.bind(GET_PARENT), self.object_ptr) };

        // SAFETY: null or a pointer handed out by the engine.
        unsafe { RawHandle::must_assert_instance_id(parent_ptr) }
            .ok()
            .map(Gd::from_raw)
    }

    pub fn set_name(&mut self, name: impl Into<GString>) {
        let name = name.into();

        let mut frame = CallFrame::new();
        frame.arg(&name);

        // SAFETY: (String) -> void.
        let () = unsafe { frame.ptrcall(NODE_METHODS.bind(SET_NAME), self.object_ptr) };
    }

    pub fn get_name(&self) -> GString {
        let frame = CallFrame::new();

        // SAFETY: () -> String.
        unsafe { frame.ptrcall(NODE_METHODS.bind(GET_NAME), self.object_ptr) }
    }

    /// Virtual table overriding the given slots with the implementations of `T`.
    pub fn virtual_table<T>(overrides: &[NodeVirtual]) -> VirtualTable<T>
    where
        T: UserClass + INode,
    {
        overrides.iter().fold(
            VirtualTable::for_class(),
            |table, slot| table.with_override(slot.slot::<T>()),
        )
    }

    fn get_child_ptr(&self, idx: i32) -> sys::GDExtensionObjectPtr {
        let idx = idx as i64;
        let include_internal = false;

        let mut frame = CallFrame::new();
        frame.arg(&idx).arg(&include_internal);

        // SAFETY: (int, bool) -> Node.
        unsafe { frame.ptrcall(NODE_METHODS.bind(GET_CHILD), self.object_ptr) }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Virtual methods

/// Virtual methods of [`Node`] that Rust classes can override.
///
/// Implementations take effect for the slots listed in [`UserClass::virtuals()`], usually via [`Node::virtual_table()`].
#[allow(unused_variables)]
pub trait INode {
    /// Called when the node enters the scene tree.
    fn enter_tree(&mut self) {}

    /// Called when the node is about to leave the scene tree.
    fn exit_tree(&mut self) {}

    /// Called when the node and its children have entered the scene tree.
    fn ready(&mut self) {}

    /// Called every frame, with the elapsed time in seconds since the previous frame.
    fn process(&mut self, delta: f64) {}

    /// Called every physics tick.
    fn physics_process(&mut self, delta: f64) {}
}

/// Overridable virtual slots of [`Node`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NodeVirtual {
    EnterTree,
    ExitTree,
    Ready,
    Process,
    PhysicsProcess,
}

impl NodeVirtual {
    pub const ALL: [NodeVirtual; 5] = [
        Self::EnterTree,
        Self::ExitTree,
        Self::Ready,
        Self::Process,
        Self::PhysicsProcess,
    ];

    /// Name of the virtual method in the engine.
    pub fn name(self) -> &'static str {
        match self {
            Self::EnterTree => "_enter_tree",
            Self::ExitTree => "_exit_tree",
            Self::Ready => "_ready",
            Self::Process => "_process",
            Self::PhysicsProcess => "_physics_process",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    /// Number of arguments the engine passes.
    pub fn arity(self) -> usize {
        match self {
            Self::Process | Self::PhysicsProcess => 1,
            _ => 0,
        }
    }

    /// Slot dispatching to the implementation in `T`.
    pub fn slot<T: INode>(self) -> VirtualSlot<T> {
        match self {
            Self::EnterTree => VirtualSlot::new(self.name(), self.arity(), |this, _args, _ret| this.enter_tree()),
            Self::ExitTree => VirtualSlot::new(self.name(), self.arity(), |this, _args, _ret| this.exit_tree()),
            Self::Ready => VirtualSlot::new(self.name(), self.arity(), |this, _args, _ret| this.ready()),
            Self::Process => VirtualSlot::new(self.name(), self.arity(), |this, args, _ret| {
                // SAFETY: the engine passes one float.
                let delta = unsafe { args.get::<f64>(0) };
                this.process(delta)
            }),
            Self::PhysicsProcess => VirtualSlot::new(self.name(), self.arity(), |this, args, _ret| {
                // SAFETY: the engine passes one float.
                let delta = unsafe { args.get::<f64>(0) };
                this.physics_process(delta)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_names_match_engine_declaration() {
        use crate::obj::EngineClass;

        for slot in NodeVirtual::ALL {
            assert!(Node::VIRTUAL_METHODS.contains(&slot.name()), "{slot:?}");
            assert_eq!(NodeVirtual::from_name(slot.name()), Some(slot));
        }

        assert_eq!(NodeVirtual::from_name("_draw"), None);
        assert_eq!(NodeVirtual::Process.arity(), 1);
        assert_eq!(NodeVirtual::Ready.arity(), 0);
    }
}
