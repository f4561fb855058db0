/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard, Once, PoisonError};

use gdbind::prelude::*;
use gdbind::sys::mock;

pub struct TestExtension;

unsafe impl ExtensionLibrary for TestExtension {}

gdextension_entry!(TestExtension, gdbind_test_init);

static LOAD: Once = Once::new();
static SERIAL: Mutex<()> = Mutex::new(());

/// Loads the test extension into the mock engine on first use.
///
/// The returned guard serializes tests of one binary: the engine is single-threaded, and engine-driven callbacks such as
/// `_process` reach every live extension object.
pub fn engine() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);

    LOAD.call_once(|| {
        // SAFETY: entry point generated by gdextension_entry!.
        let loaded = unsafe { mock::load_extension(gdbind_test_init) };
        assert!(loaded, "test extension failed to load");
    });

    guard
}
