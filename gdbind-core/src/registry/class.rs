/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::Any;
use std::collections::HashMap;
use std::ffi::CString;
use std::marker::PhantomData;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::obj::{class_tag, RawHandle, UserClass};
use crate::private::{ClassPlugin, PluginItem};
use crate::registry::callbacks;
use crate::registry::method::{self, MethodSlot};
use crate::registry::plugin::{self, ErasedRegisterFn, WrapperFactory};
use crate::registry::virtuals::VirtualTable;
use crate::sys::{self, interface_fn, out, BindingError, Global, InitLevel};

// Names of extension classes registered with the engine, per level, in registration order. Used for unregistering.
static LOADED_CLASSES: Global<HashMap<InitLevel, Vec<&'static str>>> = Global::default();

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Wrapper registry

struct Entry {
    parent: Option<String>,
    factory: WrapperFactory,
}

/// Maps class names to the factories that wrap untyped handles into typed pointers.
///
/// Registering a name again replaces the previous factory. Readers never observe a removed or half-written entry.
#[derive(Default)]
pub struct ClassRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of all classes that added themselves through the plugin system.
    pub fn from_plugins() -> Self {
        let registry = Self::new();
        plugin::iterate_plugins(|plugin| {
            registry.register_plugin(plugin);
        });

        out!("class registry: {} class(es) from plugins", registry.len());
        registry
    }

    /// Registers `factory` for `class_name`. Returns `true` if an earlier registration was replaced.
    pub fn register(&self, class_name: &str, factory: WrapperFactory) -> bool {
        self.insert(class_name, None, factory)
    }

    /// Registers the wrapper of a plugin, remembering its parent class.
    pub fn register_plugin(&self, plugin: &ClassPlugin) -> bool {
        self.insert(plugin.class_name, plugin.parent_class_name, plugin.factory())
    }

    /// Returns `true` if the class was registered.
    pub fn unregister(&self, class_name: &str) -> bool {
        self.write().remove(class_name).is_some()
    }

    pub fn factory_for(&self, class_name: &str) -> Option<WrapperFactory> {
        self.read().get(class_name).map(|entry| entry.factory)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.read().contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wraps `raw` as `Gd<C>`, where `C` is its runtime class if registered.
    ///
    /// Otherwise `C` is the most derived registered class the object can be cast to, e.g. `Node` for a node subclass that has no
    /// Rust wrapper.
    pub fn instantiate(&self, raw: RawHandle) -> Result<Box<dyn Any>, BindingError> {
        let runtime_class = raw.class_name();

        let factory = {
            let entries = self.read();
            match entries.get(&runtime_class) {
                Some(entry) => Some(entry.factory),
                None => closest_registered(&entries, &raw),
            }
        };

        match factory {
            Some(factory) => Ok(factory(raw)),
            None => Err(BindingError::UnregisteredClass(runtime_class)),
        }
    }

    fn insert(&self, class_name: &str, parent: Option<&str>, factory: WrapperFactory) -> bool {
        let entry = Entry {
            parent: parent.map(str::to_string),
            factory,
        };

        let replaced = self.write().insert(class_name.to_string(), entry).is_some();
        if replaced {
            log::debug!("class registry: replaced wrapper of {class_name}");
        }
        replaced
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide registry, filled from the plugins on first access.
pub fn class_registry() -> &'static ClassRegistry {
    static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ClassRegistry::from_plugins)
}

fn closest_registered(entries: &HashMap<String, Entry>, raw: &RawHandle) -> Option<WrapperFactory> {
    entries
        .iter()
        .filter(|(name, _)| {
            let tag = class_tag(name);

            // SAFETY: live object; tag is non-null.
            !tag.is_null() && !unsafe { interface_fn!(object_cast_to)(raw.get(), tag) }.is_null()
        })
        .max_by_key(|(name, _)| depth(entries, name))
        .map(|(_, entry)| entry.factory)
}

/// Number of registered ancestors of `class_name`.
fn depth(entries: &HashMap<String, Entry>, class_name: &str) -> usize {
    let mut depth = 0;
    let mut current = entries.get(class_name);

    // Bounded, in case of an inconsistent parent chain.
    while let Some(parent) = current.and_then(|entry| entry.parent.as_deref()) {
        if depth > entries.len() {
            break;
        }
        depth += 1;
        current = entries.get(parent);
    }
    depth
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Extension classes

/// Per-class data handed to the engine as class userdata. Lives until the process ends, since objects may outlive the registration.
pub(crate) struct ClassInfo<T: UserClass> {
    pub class_name: CString,
    pub virtuals: VirtualTable<T>,
}

/// Registers an extension class `T` with the engine.
pub struct ClassBuilder<T: UserClass> {
    virtuals: VirtualTable<T>,
    methods: Vec<MethodSlot<T>>,
    is_abstract: bool,
    _marker: PhantomData<T>,
}

impl<T: UserClass> ClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            virtuals: T::virtuals(),
            methods: T::methods(),
            is_abstract: false,
            _marker: PhantomData,
        }
    }

    /// Replaces the virtual table returned by [`UserClass::virtuals()`].
    pub fn virtuals(mut self, virtuals: VirtualTable<T>) -> Self {
        self.virtuals = virtuals;
        self
    }

    /// Exposes a method to the engine, in addition to those returned by [`UserClass::methods()`].
    ///
    /// A method of the same name replaces the earlier one.
    pub fn method(mut self, slot: MethodSlot<T>) -> Self {
        self.methods.retain(|existing| existing.name() != slot.name());
        self.methods.push(slot);
        self
    }

    /// Abstract classes cannot be instantiated; they only serve as parents of other classes.
    pub fn abstract_class(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// Registers the class, replacing an earlier registration of the same name.
    pub fn register(self) -> Result<(), BindingError> {
        if !sys::is_initialized() {
            return Err(BindingError::NotInitialized);
        }

        let unregistered = || BindingError::UnregisteredClass(T::CLASS_NAME.to_string());
        let class_name = CString::new(T::CLASS_NAME).map_err(|_| unregistered())?;
        let parent_name = CString::new(T::parent_class_name()).map_err(|_| unregistered())?;

        out!("register class {} (parent {})", T::CLASS_NAME, T::parent_class_name());
        log::debug!(
            "{}: overrides {:?}",
            T::CLASS_NAME,
            self.virtuals.overridden_names()
        );

        let info: &'static ClassInfo<T> = Box::leak(Box::new(ClassInfo {
            class_name: class_name.clone(),
            virtuals: self.virtuals,
        }));

        let creation_info = sys::GDExtensionClassCreationInfo {
            is_virtual: sys::SYS_FALSE,
            is_abstract: sys::bool_to_sys(self.is_abstract),
            create_instance_func: Some(callbacks::create::<T>),
            free_instance_func: Some(callbacks::free::<T>),
            get_virtual_call_data_func: Some(callbacks::get_virtual::<T>),
            call_virtual_with_data_func: Some(callbacks::call_virtual_with_data::<T>),
            class_userdata: (info as *const ClassInfo<T>).cast_mut().cast(),
        };

        // SAFETY: binding initialized; names and creation info outlive the call, the engine copies what it keeps.
        let registration_failed = unsafe {
            let () = interface_fn!(classdb_register_extension_class)(
                sys::get_library(),
                class_name.as_ptr(),
                parent_name.as_ptr(),
                &creation_info,
            );

            // Registration reports no errors; check whether it took effect.
            interface_fn!(classdb_get_class_tag)(class_name.as_ptr()).is_null()
        };

        if registration_failed {
            return Err(unregistered());
        }

        class_registry().register_plugin(&ClassPlugin::user::<T>());

        let mut loaded = LOADED_CLASSES.lock();
        let level_classes = loaded.entry(T::INIT_LEVEL).or_default();
        if !level_classes.contains(&T::CLASS_NAME) {
            level_classes.push(T::CLASS_NAME);
        }

        drop(loaded);

        for slot in self.methods {
            method::register_method::<T>(slot)?;
        }

        log::info!("registered class {} at level {:?}", T::CLASS_NAME, T::INIT_LEVEL);
        Ok(())
    }
}

impl<T: UserClass> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers `T` with its default settings; errors are logged.
pub fn register_class<T: UserClass>() {
    if let Err(err) = ClassBuilder::<T>::new().register() {
        log::error!("failed to register class {}: {err}", T::CLASS_NAME);
    }
}

/// Registers all extension classes of `level` that added themselves through the plugin system, parents first.
pub fn auto_register_classes(level: InitLevel) {
    out!("auto-register classes at level {level:?}");

    let mut user_classes = Vec::new();
    plugin::iterate_plugins(|plugin| {
        if plugin.init_level == level {
            if let PluginItem::User { register_fn, .. } = &plugin.item {
                user_classes.push(PendingClass {
                    name: plugin.class_name,
                    parent: plugin.parent_class_name,
                    register_fn: *register_fn,
                });
            }
        }
    });

    for class in parent_first(user_classes) {
        (class.register_fn.raw)();
    }
}

/// Unregisters all extension classes of `level`, in reverse registration order.
pub fn unregister_classes(level: InitLevel) {
    let class_names = LOADED_CLASSES.lock().remove(&level).unwrap_or_default();
    out!("unregister {} class(es) at level {level:?}", class_names.len());

    for class_name in class_names.into_iter().rev() {
        let Ok(c_name) = CString::new(class_name) else {
            continue;
        };

        // SAFETY: binding initialized, since classes were registered.
        unsafe { interface_fn!(classdb_unregister_extension_class)(sys::get_library(), c_name.as_ptr()) };

        class_registry().unregister(class_name);
        log::debug!("unregistered class {class_name}");
    }
}

#[derive(Copy, Clone, Debug)]
struct PendingClass {
    name: &'static str,
    parent: Option<&'static str>,
    register_fn: ErasedRegisterFn,
}

/// Orders classes so that every class comes after its parent, if the parent is in the list. Otherwise sorted by name.
fn parent_first(mut pending: Vec<PendingClass>) -> Vec<PendingClass> {
    pending.sort_by_key(|class| class.name);

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|class| {
            class
                .parent
                .is_none_or(|parent| !pending.iter().any(|other| other.name == parent))
        });

        // A cycle cannot be ordered; keep the remaining classes as they are.
        let Some(index) = ready else {
            log::warn!("class hierarchy contains a cycle: {pending:?}");
            ordered.append(&mut pending);
            break;
        };

        ordered.push(pending.remove(index));
    }
    ordered
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
