/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::GString;
use crate::classes::{Object, RefCounted};
use crate::global::{engine_enum, Error};
use crate::obj::{Gd, RawHandle};
use crate::sys::{self, CallFrame, ClassMethodTable, InitLevel, MethodDescriptor};

super::engine_class! {
    /// Reads and writes files through the engine's virtual file system.
    pub struct FileAccess;
    parent: RefCounted,
    ancestors: [Object],
    init_level: Core,
    virtuals: [],
}

engine_enum! {
    /// Access mode of [`FileAccess::open()`].
    pub struct ModeFlags {
        READ = 1,
        WRITE = 2,
        READ_WRITE = 3,
        WRITE_READ = 7,
    }
}

static FILE_ACCESS_METHODS: ClassMethodTable = ClassMethodTable::new(
    "FileAccess",
    InitLevel::Core,
    &[
        MethodDescriptor::new("open", 1247358404),
        MethodDescriptor::new("get_open_error", 166280745),
        MethodDescriptor::new("get_as_text", 1162154673),
        MethodDescriptor::new("get_length", 3905245786),
    ],
);

sys::plugin_add!(METHOD_TABLES in crate::sys; &FILE_ACCESS_METHODS);

const OPEN: usize = 0;
const GET_OPEN_ERROR: usize = 1;
const GET_AS_TEXT: usize = 2;
const GET_LENGTH: usize = 3;

impl FileAccess {
    /// Opens a file. Returns `None` on failure; the reason is available through [`get_open_error()`](Self::get_open_error).
    pub fn open(path: impl Into<GString>, flags: ModeFlags) -> Option<Gd<FileAccess>> {
        let path = path.into();

        let mut frame = CallFrame::new();
        frame.arg(&path).arg(&flags);

        // SAFETY: static (String, ModeFlags) -> FileAccess.
        let file_ptr: sys::GDExtensionObjectPtr =
            unsafe { frame.ptrcall_static(FILE_ACCESS_METHODS.bind(OPEN)) };

        // SAFETY: null, or a new reference-counted object whose first reference is taken here.
        unsafe { RawHandle::ref_counted(file_ptr) }
            .ok()
            .map(Gd::from_raw)
    }

    /// Result of the last [`open()`](Self::open) call, passed through unchanged.
    pub fn get_open_error() -> Error {
        let frame = CallFrame::new();

        // SAFETY: static () -> Error.
        unsafe { frame.ptrcall_static(FILE_ACCESS_METHODS.bind(GET_OPEN_ERROR)) }
    }

    /// Whole file as text. Carriage returns are kept.
    pub fn get_as_text(&self) -> GString {
        let skip_cr = false;

        let mut frame = CallFrame::new();
        frame.arg(&skip_cr);

        // SAFETY: (bool) -> String.
        unsafe { frame.ptrcall(FILE_ACCESS_METHODS.bind(GET_AS_TEXT), self.object_ptr) }
    }

    /// Size of the file in bytes.
    pub fn get_length(&self) -> u64 {
        let frame = CallFrame::new();

        // SAFETY: () -> int.
        let len: i64 = unsafe { frame.ptrcall(FILE_ACCESS_METHODS.bind(GET_LENGTH), self.object_ptr) };
        len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::EngineEnum;

    #[test]
    fn mode_flags_ordinals() {
        assert_eq!(ModeFlags::READ.ord(), 1);
        assert_eq!(ModeFlags::WRITE_READ.ord(), 7);
        assert_eq!(ModeFlags::try_from_ord(4), None);
        assert_eq!(format!("{:?}", ModeFlags::READ_WRITE), "ModeFlags::READ_WRITE");
    }
}
