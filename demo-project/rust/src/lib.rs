/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdbind::prelude::*;

mod hud;
mod score_keeper;

pub use hud::Hud;
pub use score_keeper::ScoreKeeper;

struct DemoExtension;

unsafe impl ExtensionLibrary for DemoExtension {
    fn on_level_init(level: InitLevel) {
        log::info!("demo: level {level:?} initialized");
    }
}

gdextension_entry!(DemoExtension);

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard, Once, PoisonError};

    use gdbind::mock;
    use gdbind::prelude::*;

    use super::*;

    fn engine() -> MutexGuard<'static, ()> {
        static LOAD: Once = Once::new();
        static SERIAL: Mutex<()> = Mutex::new(());

        let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        LOAD.call_once(|| {
            // SAFETY: entry point generated by gdextension_entry!.
            assert!(unsafe { mock::load_extension(gdext_rust_init) });
        });
        guard
    }

    #[test]
    fn score_keeper_counts_survived_seconds() {
        let _engine = engine();

        let mut root = Gd::<Node>::new_alloc();
        let mut keeper = root.add_child(Gd::<ScoreKeeper>::new_alloc());
        assert!(keeper.bind().is_running());

        for _ in 0..150 {
            mock::process_frame(0.01);
        }
        assert_eq!(keeper.bind().total(), 1);

        keeper.bind_mut().add(10);
        assert_eq!(keeper.bind().total(), 11);

        root.free();
        assert!(!keeper.is_instance_valid());
    }

    #[test]
    fn score_keeper_methods_are_callable_by_the_engine() {
        let _engine = engine();

        let mut root = Gd::<Node>::new_alloc();
        let keeper = root.add_child(Gd::<ScoreKeeper>::new_alloc());
        let ptr = keeper.obj_sys();

        let bonus = 25_i64;
        let mut frame = gdbind::sys::CallFrame::new();
        frame.arg(&bonus);

        // SAFETY: `add(int)` and `total() -> int`.
        let added: Option<()> = unsafe { mock::call_method(ptr, "add", frame) };
        let total: Option<i64> = unsafe { mock::call_method(ptr, "total", gdbind::sys::CallFrame::new()) };

        assert_eq!(added, Some(()));
        assert_eq!(total, Some(25));
        assert_eq!(keeper.bind().total(), 25);

        root.free();
    }

    #[test]
    fn hud_sizes_itself_on_ready() {
        let _engine = engine();

        let mut root = Gd::<Node>::new_alloc();
        let hud = root.add_child(Gd::<Hud>::new_alloc());

        assert_eq!(hud.get_size(), Hud::DEFAULT_SIZE);

        let point = Vector2::new(10.0, 10.0);
        let mut frame = gdbind::sys::CallFrame::new();
        frame.arg(&point);

        // SAFETY: `_has_point(Vector2) -> bool`.
        let inside: Option<bool> = unsafe { mock::call_virtual_frame(hud.obj_sys(), "_has_point", frame) };
        assert_eq!(inside, Some(true));

        root.free();
    }
}
