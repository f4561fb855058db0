/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};

use crate as sys;
use crate::{Global, GlobalGuard};

use super::classes::{self, Behavior, MockCall, MockMethod};

static STATE: Global<State> = Global::new(State::new);

pub(super) fn lock() -> GlobalGuard<'static, State> {
    STATE.lock()
}

/// Wrapper for engine-side values holding raw pointers that are only ever touched under the state lock.
pub(super) struct SendPtr<T>(T);

// SAFETY: the mock engine accesses these values only while holding the state mutex, or after copying them out of it.
unsafe impl<T> Send for SendPtr<T> {}

impl<T: Copy> SendPtr<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> T {
        self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// First bytes of every object allocation. Never freed, so stale pointers remain readable.
#[repr(C)]
pub(super) struct ObjectHeader {
    pub id: u64,
}

pub(super) struct ObjectRecord {
    pub ptr: usize,
    pub class: String,
    pub instance: usize,
    pub ref_counted: bool,
    pub refcount: i64,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
    pub name: String,
    pub ints: HashMap<&'static str, i64>,
    pub vectors: HashMap<&'static str, [f32; 2]>,
    pub text: String,
}

impl ObjectRecord {
    pub fn object_ptr(&self) -> sys::GDExtensionObjectPtr {
        self.ptr as sys::GDExtensionObjectPtr
    }
}

pub(super) struct ClassRecord {
    pub parent: Option<String>,
    pub extension: Option<SendPtr<sys::GDExtensionClassCreationInfo>>,
}

pub(super) struct LoadedExtension {
    pub init: SendPtr<sys::GDExtensionInitialization>,
    pub levels: Vec<sys::GDExtensionInitializationLevel>,
}

pub(super) struct State {
    next_id: u64,
    pub objects: HashMap<u64, ObjectRecord>,
    pub classes: HashMap<String, ClassRecord>,
    pub methods: HashMap<(String, String), &'static MockMethod>,
    pub singletons: HashMap<String, u64>,
    pub files: HashMap<String, String>,
    pub registrations: HashMap<String, usize>,
    pub extensions: Vec<LoadedExtension>,
    names: HashMap<String, &'static CStr>,
    tags: HashMap<String, usize>,
    pub last_open_error: i64,
    pub destroyed: u64,
    pub frames_drawn: i64,
    pub editor_hint: bool,
}

impl State {
    fn new() -> Self {
        let mut state = Self {
            next_id: 1,
            objects: HashMap::new(),
            classes: HashMap::new(),
            methods: HashMap::new(),
            singletons: HashMap::new(),
            files: HashMap::new(),
            registrations: HashMap::new(),
            extensions: Vec::new(),
            names: HashMap::new(),
            tags: HashMap::new(),
            last_open_error: 0,
            destroyed: 0,
            frames_drawn: 0,
            editor_hint: false,
        };

        classes::install(&mut state);
        state
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Classes

    pub fn add_native_class(&mut self, name: &str, parent: Option<&str>) {
        self.classes.insert(
            name.to_string(),
            ClassRecord {
                parent: parent.map(str::to_string),
                extension: None,
            },
        );
    }

    pub fn define<F>(&mut self, class_name: &str, method_name: &str, hash: i64, arity: usize, behavior: F)
    where
        F: Fn(&mut MockCall<'_>) + Send + Sync + 'static,
    {
        let method: &'static MockMethod = Box::leak(Box::new(MockMethod {
            class_name: class_name.to_string(),
            name: method_name.to_string(),
            hash,
            arity,
            behavior: Box::new(behavior) as Behavior,
        }));

        self.methods
            .insert((class_name.to_string(), method_name.to_string()), method);
    }

    /// Looks up a method on `class_name` or its ancestors.
    pub fn find_method(&self, class_name: &str, method_name: &str) -> Option<&'static MockMethod> {
        self.ancestry(class_name).find_map(|class| {
            self.methods
                .get(&(class.to_string(), method_name.to_string()))
                .copied()
        })
    }

    /// `class_name` followed by all its ancestors.
    pub fn ancestry<'s>(&'s self, class_name: &'s str) -> impl Iterator<Item = &'s str> + 's {
        std::iter::successors(Some(class_name), move |class| {
            self.classes.get(*class)?.parent.as_deref()
        })
    }

    pub fn inherits(&self, class_name: &str, base: &str) -> bool {
        self.ancestry(class_name).any(|c| c == base)
    }

    /// Native class at the root of an extension class chain.
    pub fn native_base<'s>(&'s self, class_name: &'s str) -> &'s str {
        self.ancestry(class_name)
            .find(|c| {
                self.classes
                    .get(*c)
                    .is_some_and(|record| record.extension.is_none())
            })
            .unwrap_or(class_name)
    }

    /// Null-terminated class name with process lifetime.
    pub fn c_name(&mut self, class_name: &str) -> &'static CStr {
        if let Some(name) = self.names.get(class_name) {
            return name;
        }

        let owned = CString::new(class_name).unwrap_or_default();
        let leaked: &'static CStr = Box::leak(owned.into_boxed_c_str());
        self.names.insert(class_name.to_string(), leaked);
        leaked
    }

    /// Stable, unique tag per class name. Survives re-registration.
    pub fn tag(&mut self, class_name: &str) -> *mut c_void {
        let next = self.tags.len() + 1;
        let tag = *self.tags.entry(class_name.to_string()).or_insert(next);
        tag as *mut c_void
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Objects

    /// Allocates a native object of `class_name`. The class must exist.
    pub fn allocate(&mut self, class_name: &str) -> sys::GDExtensionObjectPtr {
        let ref_counted = self.inherits(class_name, "RefCounted");

        let mut id = self.next_id;
        self.next_id += 1;
        if ref_counted {
            id |= sys::REF_COUNTED_ID_BIT;
        }

        let header = Box::into_raw(Box::new(ObjectHeader { id }));
        self.objects.insert(
            id,
            ObjectRecord {
                ptr: header as usize,
                class: class_name.to_string(),
                instance: 0,
                ref_counted,
                refcount: 0,
                parent: None,
                children: Vec::new(),
                name: String::new(),
                ints: HashMap::new(),
                vectors: HashMap::new(),
                text: String::new(),
            },
        );

        header.cast()
    }

    /// Instance ID stored in the object header, whether alive or not.
    pub fn header_id(object: sys::GDExtensionConstObjectPtr) -> Option<u64> {
        if object.is_null() {
            return None;
        }

        // SAFETY: all object pointers handed out point to leaked headers, which are never freed.
        Some(unsafe { (*object.cast::<ObjectHeader>()).id })
    }

    pub fn record_of(&self, object: sys::GDExtensionConstObjectPtr) -> Option<&ObjectRecord> {
        let id = Self::header_id(object)?;
        self.objects.get(&id)
    }

    pub fn record_of_mut(
        &mut self,
        object: sys::GDExtensionConstObjectPtr,
    ) -> Option<&mut ObjectRecord> {
        let id = Self::header_id(object)?;
        self.objects.get_mut(&id)
    }

    /// Removes `id` and all its descendants. Returns the removed records, root first.
    pub fn remove_tree(&mut self, id: u64) -> Vec<ObjectRecord> {
        let mut removed = Vec::new();
        let mut pending = vec![id];

        while let Some(next) = pending.pop() {
            if let Some(record) = self.objects.remove(&next) {
                pending.extend(record.children.iter().copied());
                removed.push(record);
            }
        }

        if let Some(parent_id) = removed.first().and_then(|r| r.parent) {
            if let Some(parent) = self.objects.get_mut(&parent_id) {
                parent.children.retain(|&child| child != id);
            }
        }

        self.destroyed += removed.len() as u64;
        removed
    }

    /// Live objects carrying an extension instance.
    pub fn extension_objects(&self) -> Vec<sys::GDExtensionObjectPtr> {
        let mut objects: Vec<_> = self
            .objects
            .iter()
            .filter(|(_, r)| r.instance != 0)
            .map(|(&id, r)| (id, r.object_ptr()))
            .collect();

        objects.sort_by_key(|(id, _)| *id);
        objects.into_iter().map(|(_, ptr)| ptr).collect()
    }

    /// Free function and userdata of the extension class an instance belongs to.
    pub fn free_callback(&self, record: &ObjectRecord) -> Option<(sys::GDExtensionClassFreeInstance, *mut c_void)> {
        let info = self.classes.get(&record.class)?.extension.as_ref()?.get();
        Some((info.free_instance_func, info.class_userdata))
    }
}
