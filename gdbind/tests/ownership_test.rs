/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use gdbind::obj::RawHandle;
use gdbind::prelude::*;
use gdbind::sys::{mock, BindingError};

#[test]
fn owned_handle_destroys_on_free() {
    let _engine = common::engine();

    let node = Gd::<Node>::new_alloc();
    let ptr = node.obj_sys();
    assert_eq!(node.ownership(), Ownership::Owned);
    assert!(mock::is_alive(ptr));

    node.free();
    assert!(!mock::is_alive(ptr));
}

#[test]
fn owned_handle_destroys_on_drop() {
    let _engine = common::engine();

    let destroyed_before = mock::destroyed_count();
    let ptr = {
        let node = Gd::<Node>::new_alloc();
        node.obj_sys()
    };

    assert!(!mock::is_alive(ptr));
    assert_eq!(mock::destroyed_count(), destroyed_before + 1);
}

#[test]
fn transferred_object_is_released_exactly_once() {
    let _engine = common::engine();

    let ptr = mock::construct("Node");
    // SAFETY: freshly constructed object, owned by nobody else.
    let handle = unsafe { RawHandle::from_transferred(ptr) }.expect("live object");
    assert_eq!(handle.ownership(), Ownership::Owned);

    let before = mock::destroyed_count();
    assert_eq!(handle.release(), Ok(()));
    assert_eq!(mock::destroyed_count(), before + 1);
    assert!(!mock::is_alive(ptr));

    // Dropped without release: the destructor destroys it, once.
    let ptr = mock::construct("Node");
    let before = mock::destroyed_count();
    // SAFETY: see above.
    drop(unsafe { RawHandle::from_transferred(ptr) }.expect("live object"));
    assert_eq!(mock::destroyed_count(), before + 1);

    // SAFETY: the pointer stays readable after destruction.
    let err = unsafe { RawHandle::from_transferred(ptr) }.unwrap_err();
    assert_eq!(err, BindingError::ObjectDestroyed { address: ptr as usize });
    assert_eq!(mock::destroyed_count(), before + 1);
}

#[test]
fn destroyed_word_fails_instance_assertion() {
    let _engine = common::engine();

    let node = Gd::<Node>::new_alloc();
    let ptr = node.obj_sys();

    // SAFETY: pointer handed out by the engine.
    let live = unsafe { RawHandle::must_assert_instance_id(ptr) }.expect("live object");
    assert_eq!(live.instance_id(), node.instance_id());
    assert_eq!(live.ownership(), Ownership::Borrowed { parent: None });
    drop(live);

    node.free();

    // SAFETY: see above; the pointer stays readable after destruction.
    let err = unsafe { RawHandle::must_assert_instance_id(ptr) }.unwrap_err();
    assert_eq!(err, BindingError::ObjectDestroyed { address: ptr as usize });
    assert!(err.to_string().contains("has been destroyed"), "{err}");

    // SAFETY: null is accepted and rejected.
    let err = unsafe { RawHandle::must_assert_instance_id(std::ptr::null_mut()) }.unwrap_err();
    assert_eq!(err, BindingError::NullObject);
}

#[test]
fn borrowed_handle_cannot_release() {
    let _engine = common::engine();

    let node = Gd::<Node>::new_alloc();
    let borrowed = node.to_borrowed();

    assert_eq!(borrowed.try_free(), Err(BindingError::ReleaseBorrowed));
    assert!(mock::is_alive(node.obj_sys()));
    assert!(node.try_clone().is_none(), "owned handles are not shared");
}

#[test]
fn child_handle_bound_to_parent_lifetime() {
    let _engine = common::engine();

    let mut parent = Gd::<Node>::new_alloc();
    let child = parent.add_child(Gd::<Node>::new_alloc());
    let child_ptr = child.obj_sys();

    assert!(matches!(child.ownership(), Ownership::Borrowed { parent: Some(_) }));
    assert_eq!(child.get_parent(), Some(parent.to_borrowed()));

    // Dropping the bound handle leaves the child to the tree.
    drop(child);
    assert!(mock::is_alive(child_ptr));

    let child = parent.get_child(0).expect("child still attached");
    parent.free();

    assert!(!mock::is_alive(child_ptr));
    assert!(!child.is_instance_valid());
}

#[test]
fn ref_counted_handles_share_one_object() {
    let _engine = common::engine();

    let first = FileAccess::open("user://scratch.txt", ModeFlags::WRITE).expect("file opened");
    let ptr = first.obj_sys();
    assert_eq!(first.ownership(), Ownership::RefCounted);
    assert_eq!(mock::reference_count(ptr), Some(1));

    let second = first.try_clone().expect("ref-counted handles are shared");
    assert_eq!(mock::reference_count(ptr), Some(2));
    assert_eq!(second.get_reference_count(), 2);

    drop(first);
    assert_eq!(mock::reference_count(ptr), Some(1));

    drop(second);
    assert!(!mock::is_alive(ptr));
}

#[test]
fn destroyed_instance_access_panics() {
    let _engine = common::engine();

    let node = Gd::<Node>::new_alloc();
    let stale = node.to_borrowed();
    node.free();

    assert!(!stale.is_instance_valid());

    let err = catch_unwind(AssertUnwindSafe(|| stale.get_name())).expect_err("access to destroyed object must panic");
    let msg = gdbind::sys::extract_panic_message(err.as_ref());
    assert!(msg.contains("destroyed"), "unexpected message: {msg}");
}

#[test]
fn engine_destroyed_object_is_detected() {
    let _engine = common::engine();

    let node = Gd::<Node>::new_alloc();
    let id = node.instance_id();
    mock::destroy(node.obj_sys());

    assert!(!node.is_instance_valid());
    assert_eq!(
        node.try_free(),
        Err(BindingError::InstanceDestroyed { id: id.to_u64() })
    );
}

#[test]
fn singleton_is_borrowed() {
    let _engine = common::engine();

    let mut engine = Engine::singleton();
    assert!(matches!(engine.ownership(), Ownership::Borrowed { .. }));

    assert_eq!(engine.get_physics_ticks_per_second(), 60);
    engine.set_physics_ticks_per_second(30);
    assert_eq!(Engine::singleton().get_physics_ticks_per_second(), 30);
    engine.set_physics_ticks_per_second(60);

    assert_eq!(engine.try_free(), Err(BindingError::ReleaseBorrowed));
    assert!(Engine::singleton().is_instance_valid());
}
