/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use gdbind::prelude::*;
use gdbind::sys::{self, mock, BindingError, CallFrame};

#[test]
fn engine_singleton_properties() {
    let _engine = common::engine();

    let mut engine = Engine::singleton();
    assert!(!engine.is_editor_hint());
    assert_eq!(engine.get_physics_ticks_per_second(), 60);

    engine.set_physics_ticks_per_second(144);
    assert_eq!(Engine::singleton().get_physics_ticks_per_second(), 144);

    engine.set_physics_ticks_per_second(60);
}

#[test]
fn frames_drawn_follow_engine_loop() {
    let _engine = common::engine();

    let before = Engine::singleton().get_frames_drawn();
    mock::process_frame(1.0 / 60.0);

    assert_eq!(Engine::singleton().get_frames_drawn(), before + 1);
}

#[test]
fn gstring_round_trip() {
    let _engine = common::engine();

    let text = GString::from("héllo wörld");
    assert_eq!(text.to_string(), "héllo wörld");
    assert_eq!(text.len(), "héllo wörld".len());
    assert_eq!(text.clone(), text);

    let empty = GString::new();
    assert!(empty.is_empty());
    assert_eq!(String::from(&empty), "");
}

#[test]
fn node_name_is_engine_string() {
    let _engine = common::engine();

    let mut node = Gd::<Node>::new_alloc();
    node.set_name("Root");

    assert_eq!(node.get_name(), GString::from("Root"));
    assert_eq!(node.get_child_count(), 0);
    assert!(node.get_child(0).is_none());
    assert!(node.get_parent().is_none());
}

#[test]
fn method_binds_resolve_by_name() {
    let _engine = common::engine();
    assert!(sys::config().eager_method_tables);

    let set_name = sys::resolve_method("Node", "set_name").expect("Node::set_name is bound");
    let get_name = sys::resolve_method("Node", "get_name").expect("Node::get_name is bound");
    assert!(!set_name.is_null());

    let node = Gd::<Node>::new_alloc();
    let name = GString::from("ByName");
    let mut frame = CallFrame::new();
    frame.arg(&name);

    // SAFETY: set_name(String) -> void; get_name() -> String.
    let () = unsafe { frame.ptrcall(set_name, node.obj_sys()) };
    let read: GString = unsafe { CallFrame::new().ptrcall(get_name, node.obj_sys()) };
    assert_eq!(read, name);

    let err = sys::resolve_method("Node", "queue_free").unwrap_err();
    assert!(matches!(err, BindingError::MethodBindNotFound { ref method, .. } if method == "queue_free"));
    assert!(sys::resolve_method("Spaceship", "set_name").is_err());
}
