/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use gdbind::prelude::*;
use gdbind::register::ClassBuilder;
use gdbind::sys::{mock, CallFrame};

/// Extension class overriding `_ready` and `_process`.
struct Walker {
    base: Base<Node>,
    ready_calls: u32,
    travelled: f64,
    name_on_ready: String,
}

impl GodotClass for Walker {
    const CLASS_NAME: &'static str = "Walker";
    type EngineBase = Node;
}

impl UserClass for Walker {
    fn init(base: Base<Node>) -> Self {
        Self {
            base,
            ready_calls: 0,
            travelled: 0.0,
            name_on_ready: String::new(),
        }
    }

    fn virtuals() -> VirtualTable<Self> {
        Node::virtual_table(&[NodeVirtual::Ready, NodeVirtual::Process])
    }
}

impl INode for Walker {
    fn ready(&mut self) {
        self.ready_calls += 1;
        self.name_on_ready = self.base.to_gd().get_name().to_string();
    }

    fn process(&mut self, delta: f64) {
        self.travelled += delta;
    }
}

// SAFETY: Walker's engine object is a Node.
unsafe impl Inherits<Node> for Walker {}

register_class!(Walker);

/// Extension class deriving from `Walker`; overrides only `_ready`.
struct Runner {
    walker: Walker,
    ready_calls: u32,
}

impl GodotClass for Runner {
    const CLASS_NAME: &'static str = "Runner";
    type EngineBase = Node;
}

impl UserClass for Runner {
    fn parent_class_name() -> &'static str {
        Walker::CLASS_NAME
    }

    fn init(base: Base<Node>) -> Self {
        Self {
            walker: Walker::init(base),
            ready_calls: 0,
        }
    }

    fn virtuals() -> VirtualTable<Self> {
        Node::virtual_table(&[NodeVirtual::Ready]).inherit(Walker::virtuals(), |runner| &mut runner.walker)
    }
}

impl INode for Runner {
    fn ready(&mut self) {
        self.ready_calls += 1;
    }
}

register_class!(Runner);

fn call_virtual(node: &Gd<impl GodotClass>, name: &str, frame: CallFrame<'_>) -> Option<()> {
    // SAFETY: the virtuals called in these tests take at most one f64 and return nothing.
    unsafe { mock::call_virtual_frame(node.obj_sys(), name, frame) }
}

#[test]
fn derived_class_registered_after_parent() {
    let _engine = common::engine();

    assert!(mock::class_exists("Walker"));
    assert!(mock::class_exists("Runner"));

    let runner = Gd::<Runner>::new_alloc();
    assert_eq!(runner.dynamic_class_name(), "Runner");
    assert!(runner.is_class("Walker"));
    assert!(runner.is_class("Node"));
}

#[test]
fn own_override_is_called() {
    let _engine = common::engine();

    let runner = Gd::<Runner>::new_alloc();
    assert_eq!(call_virtual(&runner, "_ready", CallFrame::new()), Some(()));

    let runner = runner.bind();
    assert_eq!(runner.ready_calls, 1);
    assert_eq!(runner.walker.ready_calls, 0);
}

#[test]
fn missing_override_falls_back_to_parent_class() {
    let _engine = common::engine();

    let runner = Gd::<Runner>::new_alloc();

    let mut frame = CallFrame::new();
    frame.arg(&0.25_f64);
    assert_eq!(call_virtual(&runner, "_process", frame), Some(()));

    let mut frame = CallFrame::new();
    frame.arg(&0.5_f64);
    assert_eq!(call_virtual(&runner, "_process", frame), Some(()));

    assert_eq!(runner.bind().walker.travelled, 0.75);
}

#[test]
fn missing_override_falls_back_to_native_default() {
    let _engine = common::engine();

    let runner = Gd::<Runner>::new_alloc();

    // Not implemented in Rust: the engine runs its own (empty) implementation.
    assert_eq!(call_virtual(&runner, "_exit_tree", CallFrame::new()), None);
    assert_eq!(call_virtual(&runner, "_enter_tree", CallFrame::new()), None);
    assert_eq!(call_virtual(&runner, "_no_such_virtual", CallFrame::new()), None);
}

#[test]
fn entering_tree_calls_ready() {
    let _engine = common::engine();

    let mut parent = Gd::<Node>::new_alloc();
    let mut walker = Gd::<Walker>::new_alloc();
    walker.set_name("Scout");

    let walker = parent.add_child(walker);
    assert_eq!(walker.bind().ready_calls, 1);
    assert_eq!(walker.bind().name_on_ready, "Scout");
    assert_eq!(parent.get_child_count(), 1);

    parent.free();
    assert!(!walker.is_instance_valid());
}

#[test]
fn process_frame_reaches_live_objects() {
    let _engine = common::engine();

    let walker = Gd::<Walker>::new_alloc();
    let frames_before = Engine::singleton().get_frames_drawn();

    mock::process_frame(0.5);
    mock::process_frame(0.25);

    assert_eq!(walker.bind().travelled, 0.75);
    assert_eq!(Engine::singleton().get_frames_drawn(), frames_before + 2);
}

#[test]
fn registering_again_replaces_class() {
    let _engine = common::engine();

    let before = mock::registration_count("Walker");
    ClassBuilder::<Walker>::new().register().expect("re-registration succeeds");
    assert_eq!(mock::registration_count("Walker"), before + 1);

    // Objects created after re-registration use the new class data.
    let walker = Gd::<Walker>::new_alloc();
    assert_eq!(call_virtual(&walker, "_ready", CallFrame::new()), Some(()));
    assert_eq!(walker.bind().ready_calls, 1);
}

#[test]
fn virtual_table_resolution() {
    let _engine = common::engine();

    let table = Runner::virtuals();
    assert_eq!(
        table.resolve("_ready"),
        Some(gdbind::register::Resolved::Override {
            class_name: "Runner",
            depth: 0
        })
    );
    assert_eq!(
        table.resolve("_process"),
        Some(gdbind::register::Resolved::Override {
            class_name: "Walker",
            depth: 1
        })
    );
    assert_eq!(
        table.resolve("_physics_process"),
        Some(gdbind::register::Resolved::NativeDefault { class_name: "Node" })
    );
}

#[test]
fn dynamic_child_lookup_yields_most_derived_class() {
    let _engine = common::engine();

    let mut parent = Gd::<Node>::new_alloc();
    parent.add_child(Gd::<Walker>::new_alloc());
    parent.add_child(Gd::<Node>::new_alloc());

    let first = parent.get_child_dyn(0).expect("first child exists");
    let walker = first.downcast::<Gd<Walker>>().expect("registered as Walker");
    assert_eq!(walker.bind().ready_calls, 1);

    let second = parent.get_child_dyn(-1).expect("last child exists");
    assert!(second.downcast_ref::<Gd<Walker>>().is_none());
    assert!(second.downcast_ref::<Gd<Node>>().is_some());

    assert!(parent.get_child_dyn(5).is_none());
    parent.free();
}
