/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::TypeId;
use std::collections::HashMap;

use crate::obj::{InstanceId, UserClass};
use crate::storage::InstanceStorage;
use crate::sys::{BindingError, Global, GlobalGuard};

static HANDLE_REGISTRY: Global<HandleRegistry> = Global::default();

/// Locks the process-wide registry of live extension instances.
pub(crate) fn handle_registry() -> GlobalGuard<'static, HandleRegistry> {
    HANDLE_REGISTRY.lock()
}

struct Entry {
    storage: usize,
    type_id: TypeId,
    class_name: &'static str,
}

/// Maps instance IDs of live extension objects to their Rust-side storage.
///
/// Entries are added when the engine creates an extension object and removed when it frees it, so a lookup never yields
/// storage of a destroyed object.
#[derive(Default)]
pub(crate) struct HandleRegistry {
    entries: HashMap<InstanceId, Entry>,
}

impl HandleRegistry {
    pub fn insert<T: UserClass>(&mut self, id: InstanceId, storage: *const InstanceStorage<T>) {
        let previous = self.entries.insert(
            id,
            Entry {
                storage: storage as usize,
                type_id: TypeId::of::<T>(),
                class_name: T::CLASS_NAME,
            },
        );

        if let Some(previous) = previous {
            log::warn!(
                "instance {id} was already registered as {}; replaced by {}",
                previous.class_name,
                T::CLASS_NAME
            );
        }
    }

    /// Forgets the storage of `id`. Fails if the instance is not registered (freed twice, or never created by this binding).
    pub fn remove(&mut self, id: InstanceId) -> Result<(), BindingError> {
        self.entries
            .remove(&id)
            .map(|_| ())
            .ok_or(BindingError::AlreadyReleased)
    }

    /// Storage of `id`, if it is a live instance of exactly `T`.
    pub fn get<T: UserClass>(&self, id: InstanceId) -> Result<*const InstanceStorage<T>, BindingError> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(BindingError::InstanceDestroyed { id: id.to_u64() })?;

        if entry.type_id != TypeId::of::<T>() {
            return Err(BindingError::InvalidCast {
                from: entry.class_name.to_string(),
                to: T::CLASS_NAME.to_string(),
            });
        }

        Ok(entry.storage as *const InstanceStorage<T>)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::Node;
    use crate::obj::{Base, GodotClass};

    struct First;
    struct Second;

    impl GodotClass for First {
        const CLASS_NAME: &'static str = "First";
        type EngineBase = Node;
    }

    impl UserClass for First {
        fn init(_base: Base<Node>) -> Self {
            First
        }
    }

    impl GodotClass for Second {
        const CLASS_NAME: &'static str = "Second";
        type EngineBase = Node;
    }

    impl UserClass for Second {
        fn init(_base: Base<Node>) -> Self {
            Second
        }
    }

    fn id(value: u64) -> InstanceId {
        InstanceId::try_from_u64(value).unwrap()
    }

    #[test]
    fn lookup_is_type_checked() {
        let mut registry = HandleRegistry::default();
        let fake_storage = 0x1000 as *const InstanceStorage<First>;

        registry.insert::<First>(id(5), fake_storage);
        assert!(registry.contains(id(5)));
        assert_eq!(registry.get::<First>(id(5)), Ok(fake_storage));

        let err = registry.get::<Second>(id(5)).unwrap_err();
        assert_eq!(
            err,
            BindingError::InvalidCast {
                from: "First".to_string(),
                to: "Second".to_string()
            }
        );
    }

    #[test]
    fn removed_instance_is_reported_destroyed() {
        let mut registry = HandleRegistry::default();
        registry.insert::<First>(id(9), 0x2000 as *const InstanceStorage<First>);

        assert_eq!(registry.remove(id(9)), Ok(()));
        assert_eq!(registry.remove(id(9)), Err(BindingError::AlreadyReleased));
        assert_eq!(
            registry.get::<First>(id(9)).unwrap_err(),
            BindingError::InstanceDestroyed { id: 9 }
        );
        assert_eq!(registry.len(), 0);
    }
}
