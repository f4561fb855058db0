/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::Any;
use std::fmt;

use crate::obj::{EngineClass, Gd, GodotClass, RawHandle, UserClass};
use crate::registry::class;
use crate::sys::{self, InitLevel};

/// Wraps an untyped handle into the typed pointer of one class; the result is a `Gd<T>` behind `dyn Any`.
pub type WrapperFactory = fn(RawHandle) -> Box<dyn Any>;

// Registry of all classes known to the binding, filled at load time.
sys::plugin_registry!(pub CLASS_PLUGINS: ClassPlugin);

/// Piece of information that is gathered by the self-registration ("plugin") system.
///
/// You should not manually construct this struct, but rather use [`ClassPlugin::engine()`] or [`ClassPlugin::user()`] through
/// the registration macros.
#[derive(Clone, Debug)]
pub struct ClassPlugin {
    pub(crate) class_name: &'static str,

    /// Parent in the class hierarchy; `None` only for the root class.
    pub(crate) parent_class_name: Option<&'static str>,

    /// Which [`InitLevel`] this plugin should be registered at.
    pub(crate) init_level: InitLevel,

    pub(crate) item: PluginItem,
}

impl ClassPlugin {
    /// Plugin of an engine class wrapper.
    pub fn engine<T: EngineClass>(parent_class_name: Option<&'static str>, init_level: InitLevel) -> Self {
        Self {
            class_name: T::CLASS_NAME,
            parent_class_name,
            init_level,
            item: PluginItem::Engine {
                factory: wrap_raw::<T>,
            },
        }
    }

    /// Plugin of an extension class implemented in Rust.
    pub fn user<T: UserClass>() -> Self {
        Self {
            class_name: T::CLASS_NAME,
            parent_class_name: Some(T::parent_class_name()),
            init_level: T::INIT_LEVEL,
            item: PluginItem::User {
                register_fn: ErasedRegisterFn {
                    raw: class::register_class::<T>,
                },
                factory: wrap_raw::<T>,
            },
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn factory(&self) -> WrapperFactory {
        match &self.item {
            PluginItem::Engine { factory } | PluginItem::User { factory, .. } => *factory,
        }
    }
}

/// Type-erased function object, holding a function which registers a class with the engine.
#[derive(Copy, Clone)]
pub struct ErasedRegisterFn {
    pub raw: fn(),
}

impl fmt::Debug for ErasedRegisterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0>16x}", self.raw as usize)
    }
}

/// Kind of a registered class.
#[derive(Clone)]
pub enum PluginItem {
    /// Class provided by the engine; only its wrapper is registered.
    Engine { factory: WrapperFactory },

    /// Extension class, registered with the engine when its init level starts.
    User {
        register_fn: ErasedRegisterFn,
        factory: WrapperFactory,
    },
}

impl fmt::Debug for PluginItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine { .. } => write!(f, "Engine"),
            Self::User { register_fn, .. } => write!(f, "User {{ register_fn: {register_fn:?} }}"),
        }
    }
}

fn wrap_raw<T: GodotClass>(raw: RawHandle) -> Box<dyn Any> {
    Box::new(Gd::<T>::from_raw(raw))
}

/// Calls `visitor` for every plugin registered so far.
pub(crate) fn iterate_plugins(mut visitor: impl FnMut(&ClassPlugin)) {
    sys::plugin_foreach!(CLASS_PLUGINS; |plugin: &ClassPlugin| visitor(plugin));
}
