/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Method tables resolved on first use instead of at startup. One test only: loading is process-wide.

use gdbind::prelude::*;
use gdbind::sys::{self, mock, BindingError, CallFrame};

struct DeferredExtension;

unsafe impl ExtensionLibrary for DeferredExtension {
    fn config() -> BindingConfig {
        BindingConfig {
            eager_method_tables: false,
            ..BindingConfig::default()
        }
    }
}

gdextension_entry!(DeferredExtension, gdbind_deferred_test_init);

#[test]
fn deferred_tables_resolve_by_name() {
    // SAFETY: entry point generated by gdextension_entry!.
    assert!(unsafe { mock::load_extension(gdbind_deferred_test_init) });
    assert!(!sys::config().eager_method_tables);

    // Control has not been used yet: its table resolves on this lookup.
    let set_size = sys::resolve_method("Control", "set_size").expect("Control::set_size is bound");
    assert!(!set_size.is_null());

    let mut control = Gd::<Control>::new_alloc();
    let size = Vector2::new(32.0, 16.0);
    let keep_offsets = false;
    let mut frame = CallFrame::new();
    frame.arg(&size).arg(&keep_offsets);

    // SAFETY: set_size(Vector2, bool) -> void.
    let () = unsafe { frame.ptrcall(set_size, control.obj_sys()) };
    assert_eq!(control.get_size(), size);

    // Node's table was resolved by first use; name lookup finds the same binds.
    control.set_name("Panel");
    let get_name = sys::resolve_method("Node", "get_name").expect("Node::get_name is bound");

    // SAFETY: get_name() -> String.
    let name: GString = unsafe { CallFrame::new().ptrcall(get_name, control.obj_sys()) };
    assert_eq!(name, GString::from("Panel"));

    let err = sys::resolve_method("Node", "queue_free").unwrap_err();
    assert_eq!(
        err,
        BindingError::MethodBindNotFound {
            class: "Node".to_string(),
            method: "queue_free".to_string(),
            hash: 0,
        }
    );

    control.free();
}
