/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use gdbind::prelude::*;
use gdbind::register::ClassBuilder;
use gdbind::sys::{mock, CallFrame, GDExtensionObjectPtr};

/// Extension class whose methods are called by the engine.
struct Ledger {
    balance: i64,
    owner: String,
}

impl GodotClass for Ledger {
    const CLASS_NAME: &'static str = "Ledger";
    type EngineBase = Node;
}

impl UserClass for Ledger {
    fn init(_base: Base<Node>) -> Self {
        Self {
            balance: 0,
            owner: String::new(),
        }
    }

    fn methods() -> Vec<MethodSlot<Self>> {
        vec![
            MethodSlot::<Self>::new("deposit", 1, |this, args, _ret| {
                // SAFETY: registered with one int argument.
                this.balance += unsafe { args.get::<i64>(0) };
            }),
            MethodSlot::<Self>::returning("balance", 0, |this, _args, ret| ret.set(this.balance)).with_const(),
            MethodSlot::<Self>::returning("set_owner", 1, |this, args, ret| {
                // SAFETY: registered with one string argument.
                let owner: GString = unsafe { args.get(0) };
                let previous = std::mem::replace(&mut this.owner, owner.to_string());
                ret.set(GString::from(&previous));
            }),
            MethodSlot::<Self>::new("overdraw", 0, |_this, _args, _ret| panic!("balance must not become negative")),
        ]
    }
}

register_class!(Ledger);

fn deposit(ledger: GDExtensionObjectPtr, amount: i64) -> Option<()> {
    let mut frame = CallFrame::new();
    frame.arg(&amount);

    // SAFETY: deposit(int) -> void.
    unsafe { mock::call_method(ledger, "deposit", frame) }
}

fn balance(ledger: GDExtensionObjectPtr) -> Option<i64> {
    // SAFETY: balance() -> int.
    unsafe { mock::call_method(ledger, "balance", CallFrame::new()) }
}

#[test]
fn engine_calls_registered_methods() {
    let _engine = common::engine();
    assert!(mock::has_method("Ledger", "deposit"));
    assert!(mock::has_method("Ledger", "get_name"), "engine methods are inherited");

    let ledger = Gd::<Ledger>::new_alloc();
    assert_eq!(deposit(ledger.obj_sys(), 40), Some(()));
    assert_eq!(deposit(ledger.obj_sys(), 2), Some(()));

    assert_eq!(balance(ledger.obj_sys()), Some(42));
    assert_eq!(ledger.bind().balance, 42);

    ledger.free();
}

#[test]
fn string_arguments_and_returns_cross_the_boundary() {
    let _engine = common::engine();

    let ledger = Gd::<Ledger>::new_alloc();

    let owner = GString::from("Ada");
    let mut frame = CallFrame::new();
    frame.arg(&owner);
    // SAFETY: set_owner(String) -> String.
    let previous: Option<GString> = unsafe { mock::call_method(ledger.obj_sys(), "set_owner", frame) };
    assert_eq!(previous, Some(GString::new()));

    let owner = GString::from("Grace");
    let mut frame = CallFrame::new();
    frame.arg(&owner);
    // SAFETY: see above.
    let previous: Option<GString> = unsafe { mock::call_method(ledger.obj_sys(), "set_owner", frame) };
    assert_eq!(previous, Some(GString::from("Ada")));
    assert_eq!(ledger.bind().owner, "Grace");

    ledger.free();
}

#[test]
fn panicking_method_leaves_object_usable() {
    let _engine = common::engine();

    let ledger = Gd::<Ledger>::new_alloc();
    assert_eq!(deposit(ledger.obj_sys(), 5), Some(()));

    // SAFETY: overdraw() -> void.
    let called: Option<()> = unsafe { mock::call_method(ledger.obj_sys(), "overdraw", CallFrame::new()) };
    assert_eq!(called, Some(()));

    assert_eq!(balance(ledger.obj_sys()), Some(5));
    ledger.free();
}

#[test]
fn method_on_bound_instance_is_skipped() {
    let _engine = common::engine();

    let mut ledger = Gd::<Ledger>::new_alloc();
    let ptr = ledger.obj_sys();
    {
        let _guard = ledger.bind_mut();
        assert_eq!(deposit(ptr, 100), Some(()));
    }

    assert_eq!(balance(ledger.obj_sys()), Some(0));
    ledger.free();
}

#[test]
fn unknown_method_is_not_called() {
    let _engine = common::engine();

    let ledger = Gd::<Ledger>::new_alloc();

    // SAFETY: no method runs.
    let result: Option<i64> = unsafe { mock::call_method(ledger.obj_sys(), "withdraw", CallFrame::new()) };
    assert_eq!(result, None);
    assert!(!mock::has_method("Ledger", "withdraw"));

    ledger.free();
}

/// Registered by hand, with methods added on the builder.
struct Tally {
    count: i64,
}

impl GodotClass for Tally {
    const CLASS_NAME: &'static str = "Tally";
    type EngineBase = Object;
}

impl UserClass for Tally {
    fn init(_base: Base<Object>) -> Self {
        Self { count: 0 }
    }
}

#[test]
fn builder_methods_replace_by_name() {
    let _engine = common::engine();

    ClassBuilder::<Tally>::new()
        .method(MethodSlot::<Tally>::returning("bump", 0, |this, _args, ret| {
            this.count += 1;
            ret.set(this.count);
        }))
        .method(MethodSlot::<Tally>::returning("bump", 0, |this, _args, ret| {
            this.count += 10;
            ret.set(this.count);
        }))
        .register()
        .expect("Tally registers");

    let tally = mock::construct("Tally");

    // SAFETY: bump() -> int.
    let count: Option<i64> = unsafe { mock::call_method(tally, "bump", CallFrame::new()) };
    assert_eq!(count, Some(10));

    mock::destroy(tally);
    assert!(!mock::is_alive(tally));
}
