/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use gdbind::prelude::*;
use gdbind::sys::mock;

#[test]
fn open_missing_file_reports_engine_error() {
    let _engine = common::engine();

    let file = FileAccess::open("res://does_not_exist.txt", ModeFlags::READ);
    assert!(file.is_none());

    let error = FileAccess::get_open_error();
    assert_eq!(error, Error::ERR_FILE_NOT_FOUND);
    assert_eq!(error.ord(), 7);
    assert_eq!(error.into_result(), Err(Error::ERR_FILE_NOT_FOUND));
}

#[test]
fn open_existing_file_reads_text() {
    let _engine = common::engine();
    mock::add_file("res://notes.txt", "a\r\nb");

    let file = FileAccess::open("res://notes.txt", ModeFlags::READ).expect("file exists");
    assert_eq!(FileAccess::get_open_error(), Error::OK);

    assert_eq!(file.get_as_text().to_string(), "a\r\nb");
    assert_eq!(file.get_length(), 4);
    assert_eq!(file.get_reference_count(), 1);
    assert_eq!(file.dynamic_class_name(), "FileAccess");
}

#[test]
fn unsupported_mode_passes_error_through() {
    let _engine = common::engine();
    mock::add_file("res://locked.txt", "x");

    assert!(FileAccess::open("res://locked.txt", ModeFlags::READ_WRITE).is_none());
    assert_eq!(FileAccess::get_open_error(), Error::ERR_INVALID_PARAMETER);
    assert_eq!(FileAccess::get_open_error().ord(), 31);
}

#[test]
fn file_is_destroyed_with_last_handle() {
    let _engine = common::engine();
    mock::add_file("res://short.txt", "");

    let file = FileAccess::open("res://short.txt", ModeFlags::READ).expect("file exists");
    let ptr = file.obj_sys();
    assert!(mock::is_alive(ptr));

    file.free();
    assert!(!mock::is_alive(ptr));
}
