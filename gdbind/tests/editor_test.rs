/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Runs the whole library lifecycle inside the editor, with its own configuration. One test only: loading is process-wide.

use std::sync::Mutex;

use gdbind::prelude::*;
use gdbind::sys::{self, mock, CallFrame};

static LEVELS: Mutex<Vec<(InitLevel, bool)>> = Mutex::new(Vec::new());

struct EditorExtension;

unsafe impl ExtensionLibrary for EditorExtension {
    fn config() -> BindingConfig {
        BindingConfig {
            tool_only_in_editor: true,
            min_level: InitLevel::Servers,
            safeguards: Safeguards::Strict,
            ..BindingConfig::default()
        }
    }

    fn on_level_init(level: InitLevel) {
        LEVELS.lock().expect("not poisoned").push((level, true));
    }

    fn on_level_deinit(level: InitLevel) {
        LEVELS.lock().expect("not poisoned").push((level, false));
    }
}

gdextension_entry!(EditorExtension, gdbind_editor_test_init);

struct Gizmo {
    ready_calls: u32,
}

impl GodotClass for Gizmo {
    const CLASS_NAME: &'static str = "Gizmo";
    type EngineBase = Node;
}

impl UserClass for Gizmo {
    const IS_TOOL: bool = true;

    fn init(_base: Base<Node>) -> Self {
        Self { ready_calls: 0 }
    }

    fn virtuals() -> VirtualTable<Self> {
        Node::virtual_table(&[NodeVirtual::Ready])
    }
}

impl INode for Gizmo {
    fn ready(&mut self) {
        self.ready_calls += 1;
    }
}

register_class!(Gizmo);

struct Enemy {
    ready_calls: u32,
}

impl GodotClass for Enemy {
    const CLASS_NAME: &'static str = "Enemy";
    type EngineBase = Node;
}

impl UserClass for Enemy {
    fn init(_base: Base<Node>) -> Self {
        Self { ready_calls: 0 }
    }

    fn virtuals() -> VirtualTable<Self> {
        Node::virtual_table(&[NodeVirtual::Ready])
    }
}

impl INode for Enemy {
    fn ready(&mut self) {
        self.ready_calls += 1;
    }
}

register_class!(Enemy);

fn call_ready(object: &Gd<impl GodotClass>) -> Option<()> {
    // SAFETY: `_ready` takes no arguments and returns nothing.
    unsafe { mock::call_virtual_frame(object.obj_sys(), "_ready", CallFrame::new()) }
}

#[test]
fn editor_lifecycle() {
    mock::set_editor_hint(true);

    // SAFETY: entry point generated by gdextension_entry!.
    assert!(unsafe { mock::load_extension(gdbind_editor_test_init) });

    // User hooks start at the min level; the editor level follows the scene level.
    assert_eq!(
        *LEVELS.lock().expect("not poisoned"),
        [
            (InitLevel::Servers, true),
            (InitLevel::Scene, true),
            (InitLevel::Editor, true)
        ]
    );

    assert!(sys::config().tool_only_in_editor);
    assert_eq!(sys::config().safeguards, Safeguards::Strict);
    assert!(Engine::singleton().is_editor_hint());

    // Both classes are registered; only the tool runs its virtuals in the editor.
    let gizmo = Gd::<Gizmo>::new_alloc();
    let enemy = Gd::<Enemy>::new_alloc();

    assert_eq!(call_ready(&gizmo), Some(()));
    assert_eq!(call_ready(&enemy), None);
    assert_eq!(gizmo.bind().ready_calls, 1);
    assert_eq!(enemy.bind().ready_calls, 0);

    // Leaving the editor (e.g. running the game) enables all classes.
    mock::set_editor_hint(false);
    assert_eq!(call_ready(&enemy), Some(()));
    assert_eq!(enemy.bind().ready_calls, 1);

    drop(gizmo);
    drop(enemy);

    // SAFETY: loaded above; no handles to extension objects remain.
    unsafe { mock::unload_extensions() };

    assert!(!mock::class_exists("Gizmo"));
    assert!(!mock::class_exists("Enemy"));

    let levels = LEVELS.lock().expect("not poisoned");
    assert_eq!(
        levels[3..],
        [
            (InitLevel::Editor, false),
            (InitLevel::Scene, false),
            (InitLevel::Servers, false)
        ]
    );
}
