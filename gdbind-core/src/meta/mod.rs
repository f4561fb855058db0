/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Call metadata used in diagnostics.

use std::fmt;

use crate::obj::GodotClass;
use crate::sys::BindingError;

/// Class and function of a call crossing the engine boundary, for error messages.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct CallContext<'a> {
    pub(crate) class_name: &'a str,
    pub(crate) function_name: &'a str,
}

impl<'a> CallContext<'a> {
    /// Outbound call from Rust into an engine class method.
    pub const fn outbound(class_name: &'a str, function_name: &'a str) -> Self {
        Self {
            class_name,
            function_name,
        }
    }

    /// Inbound call from the engine into a virtual method of an extension class.
    pub const fn virtual_method(class_name: &'a str, function_name: &'a str) -> Self {
        Self {
            class_name,
            function_name,
        }
    }

    /// Inbound call from the engine into a method registered by an extension class.
    pub const fn inbound(class_name: &'a str, function_name: &'a str) -> Self {
        Self {
            class_name,
            function_name,
        }
    }

    /// Call through `Gd<T>` methods.
    pub fn gd<T: GodotClass>(function_name: &'a str) -> Self {
        Self {
            class_name: T::CLASS_NAME,
            function_name,
        }
    }

    pub fn class_name(&self) -> &str {
        self.class_name
    }

    pub fn function_name(&self) -> &str {
        self.function_name
    }
}

impl fmt::Display for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_name, self.function_name)
    }
}

/// Panics with the context of a failed call. Only for errors that indicate a bug or a violated ownership contract.
#[track_caller]
pub(crate) fn panic_call_error(call_ctx: &CallContext, err: &BindingError) -> ! {
    panic!("call {call_ctx} failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_class_and_function() {
        let ctx = CallContext::outbound("Node", "add_child");
        assert_eq!(ctx.to_string(), "Node::add_child");
    }

    #[test]
    fn call_error_message_includes_context() {
        let ctx = CallContext::outbound("Node", "free");
        let err = std::panic::catch_unwind(|| panic_call_error(&ctx, &BindingError::ReleaseBorrowed)).unwrap_err();

        let msg = crate::sys::extract_panic_message(err.as_ref());
        assert!(msg.starts_with("call Node::free failed:"), "{msg}");
    }
}
