/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

/// Errors raised by the binding layer itself.
///
/// Operational errors reported by the engine are not represented here; wrappers surface those unchanged as engine error codes.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum BindingError {
    #[error("engine interface function `{0}` is not available")]
    MissingInterfaceFn(&'static str),

    #[error("method bind {class}::{method} (hash {hash}) not found in engine")]
    MethodBindNotFound {
        class: String,
        method: String,
        hash: i64,
    },

    #[error("object pointer is null")]
    NullObject,

    #[error("instance with ID {id} has been destroyed")]
    InstanceDestroyed { id: u64 },

    /// The engine no longer reports an instance ID for the pointer.
    #[error("object at {address:#x} has been destroyed")]
    ObjectDestroyed { address: usize },

    #[error("cannot release a handle whose lifetime is bound to another object")]
    ReleaseBorrowed,

    #[error("handle has already been released")]
    AlreadyReleased,

    #[error("class `{0}` is not registered")]
    UnregisteredClass(String),

    #[error("cannot cast object of class `{from}` to `{to}`")]
    InvalidCast { from: String, to: String },

    #[error("argument frame overflow: at most {max} arguments are supported")]
    FrameOverflow { max: usize },

    #[error("argument index {index} out of range; frame has {len} arguments")]
    ArgumentIndex { index: usize, len: usize },

    #[error("binding is not initialized; engine not available")]
    NotInitialized,

    #[error("invalid configuration: {0}")]
    Config(String),
}
