/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::CString;
use std::fmt;
use std::marker::PhantomData;

use crate::classes::ref_counted;
use crate::obj::InstanceId;
use crate::sys::{self, interface_fn, BindingError, Safeguards};
use crate::out;

/// Who is responsible for releasing an engine object.
///
/// Fixed when a handle is created; there is no transition between modes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Ownership {
    /// The handle owns the object and destroys it on release, or when dropped without release.
    Owned,

    /// The object is owned elsewhere and never released through this handle.
    ///
    /// With a parent, the object is only valid while the parent is; otherwise it is owned by the engine.
    Borrowed { parent: Option<InstanceId> },

    /// Shared ownership through the engine's reference count.
    RefCounted,
}

/// Opaque, untyped handle to an engine object.
///
/// The object word is never dereferenced by the binding; it is only passed back to the engine.
pub struct RawHandle {
    obj: sys::GDExtensionObjectPtr,
    id: InstanceId,
    ownership: Ownership,

    // Handles are used on the thread that created them.
    _not_send: PhantomData<*const ()>,
}

impl RawHandle {
    /// Takes ownership of a newly created object; it must be released exactly once.
    ///
    /// # Safety
    /// The binding must be initialized. `word` must be null or point to an engine object not owned by anyone else.
    pub unsafe fn from_transferred(word: sys::GDExtensionObjectPtr) -> Result<Self, BindingError> {
        let id = live_instance_id(word)?;
        Ok(Self::with_ownership(word, id, Ownership::Owned))
    }

    /// Borrows an object owned by `parent`. The handle is never released and is invalid once `parent` is destroyed.
    ///
    /// # Safety
    /// The binding must be initialized. `parent` and `word` must be null or point to engine objects.
    pub unsafe fn lifetime_bound_to(
        parent: sys::GDExtensionObjectPtr,
        word: sys::GDExtensionObjectPtr,
    ) -> Result<Self, BindingError> {
        let parent_id = live_instance_id(parent)?;
        let id = live_instance_id(word)?;

        Ok(Self::with_ownership(
            word,
            id,
            Ownership::Borrowed {
                parent: Some(parent_id),
            },
        ))
    }

    /// Borrows an object owned by the engine, after validating that `word` refers to a live instance.
    ///
    /// Fails instead of returning a dangling handle: the pointer must be non-null, have a non-zero instance ID, and the engine
    /// must map that ID back to the same pointer.
    ///
    /// # Safety
    /// The binding must be initialized. `word` must be null or a pointer that was handed out by the engine.
    pub unsafe fn must_assert_instance_id(word: sys::GDExtensionObjectPtr) -> Result<Self, BindingError> {
        let id = live_instance_id(word)?;
        Ok(Self::with_ownership(word, id, Ownership::Borrowed { parent: None }))
    }

    /// Acquires one reference to a reference-counted object.
    ///
    /// The reference is given back when the handle is dropped or released; the last one destroys the object.
    ///
    /// # Safety
    /// The binding must be initialized. `word` must be null or point to an engine object.
    pub unsafe fn ref_counted(word: sys::GDExtensionObjectPtr) -> Result<Self, BindingError> {
        let id = live_instance_id(word)?;
        if !id.is_ref_counted() {
            return Err(BindingError::InvalidCast {
                from: class_name_of(word),
                to: "RefCounted".to_string(),
            });
        }

        ref_counted::init_ref(word);
        out!("acquired reference to {id:?}");

        Ok(Self::with_ownership(word, id, Ownership::RefCounted))
    }

    /// Wraps a newly created object: reference-counted objects are shared, all others are owned.
    ///
    /// # Safety
    /// See [`from_transferred()`](Self::from_transferred).
    pub unsafe fn from_new_object(word: sys::GDExtensionObjectPtr) -> Result<Self, BindingError> {
        let id = live_instance_id(word)?;
        if id.is_ref_counted() {
            Self::ref_counted(word)
        } else {
            Ok(Self::with_ownership(word, id, Ownership::Owned))
        }
    }

    fn with_ownership(obj: sys::GDExtensionObjectPtr, id: InstanceId, ownership: Ownership) -> Self {
        Self {
            obj,
            id,
            ownership,
            _not_send: PhantomData,
        }
    }

    /// Raw word for an argument frame; ownership stays with the handle.
    pub fn get(&self) -> sys::GDExtensionObjectPtr {
        self.obj
    }

    /// Instance ID at the time the handle was created.
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether the object, and the parent of a lifetime-bound handle, are still alive.
    pub fn is_instance_valid(&self) -> bool {
        if !is_alive(self.obj, self.id) {
            return false;
        }

        match self.ownership {
            Ownership::Borrowed {
                parent: Some(parent),
            } => parent_is_alive(parent),
            _ => true,
        }
    }

    /// Checks validity as far as the configured safeguards require.
    pub fn check_access(&self, safeguards: Safeguards) -> Result<(), BindingError> {
        let valid = match (safeguards, self.ownership) {
            (Safeguards::Disengaged, _) => true,
            (Safeguards::Balanced, Ownership::RefCounted) => true,
            (Safeguards::Balanced, _) => is_alive(self.obj, self.id),
            (Safeguards::Strict, _) => self.is_instance_valid(),
        };

        if valid {
            Ok(())
        } else {
            Err(BindingError::InstanceDestroyed {
                id: self.id.to_u64(),
            })
        }
    }

    /// A second handle to the same object, if the ownership mode allows sharing.
    ///
    /// Reference-counted handles acquire another reference; borrowed handles are copied. Owned handles cannot be shared.
    pub fn share(&self) -> Option<Self> {
        match self.ownership {
            Ownership::Owned => None,
            Ownership::Borrowed { .. } => Some(Self::with_ownership(self.obj, self.id, self.ownership)),
            Ownership::RefCounted => {
                ref_counted::reference(self.obj);
                Some(Self::with_ownership(self.obj, self.id, self.ownership))
            }
        }
    }

    /// A handle that borrows the object from this one; invalid once this object is destroyed.
    pub fn borrow_bound(&self) -> Self {
        Self::with_ownership(
            self.obj,
            self.id,
            Ownership::Borrowed {
                parent: Some(self.id),
            },
        )
    }

    /// Releases the object exactly once.
    ///
    /// Owned objects are destroyed; reference-counted handles give back their reference. Borrowed handles are refused.
    pub fn release(self) -> Result<(), BindingError> {
        let result = match self.ownership {
            Ownership::Borrowed { .. } => Err(BindingError::ReleaseBorrowed),
            Ownership::Owned => {
                if is_alive(self.obj, self.id) {
                    destroy(self.obj, self.id);
                    Ok(())
                } else {
                    Err(BindingError::InstanceDestroyed {
                        id: self.id.to_u64(),
                    })
                }
            }
            Ownership::RefCounted => {
                self.drop_reference();
                Ok(())
            }
        };

        // Released above (or refused); the destructor must not release again.
        std::mem::forget(self);
        result
    }

    /// Hands an owned object over to the engine, e.g. when it becomes part of the scene tree. Returns the word to pass.
    ///
    /// The handle no longer releases the object. Other modes give up their handle as usual.
    pub fn into_engine(self) -> sys::GDExtensionObjectPtr {
        let obj = self.obj;
        if self.ownership == Ownership::Owned {
            std::mem::forget(self);
        }
        obj
    }

    /// Dynamic class of the object, as reported by the engine.
    pub fn class_name(&self) -> String {
        class_name_of(self.obj)
    }

    fn drop_reference(&self) {
        if !is_alive(self.obj, self.id) {
            return;
        }

        if ref_counted::unreference(self.obj) {
            out!("last reference to {:?} dropped", self.id);
            destroy(self.obj, self.id);
        }
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        match self.ownership {
            Ownership::Owned => {
                if is_alive(self.obj, self.id) {
                    destroy(self.obj, self.id);
                } else {
                    log::debug!("owned object {} was already destroyed by the engine", self.id);
                }
            }
            Ownership::Borrowed { .. } => {}
            Ownership::RefCounted => self.drop_reference(),
        }
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHandle")
            .field("id", &self.id)
            .field("ownership", &self.ownership)
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Engine queries

fn live_instance_id(word: sys::GDExtensionObjectPtr) -> Result<InstanceId, BindingError> {
    if word.is_null() {
        return Err(BindingError::NullObject);
    }

    // SAFETY: non-null object pointer; the engine returns 0 for destroyed objects.
    let raw_id = unsafe { interface_fn!(object_get_instance_id)(word) };
    let id = InstanceId::try_from_u64(raw_id).ok_or(BindingError::ObjectDestroyed {
        address: word as usize,
    })?;

    if is_alive(word, id) {
        Ok(id)
    } else {
        Err(BindingError::InstanceDestroyed { id: raw_id })
    }
}

fn is_alive(word: sys::GDExtensionObjectPtr, id: InstanceId) -> bool {
    // SAFETY: looking up an ID never touches freed memory.
    let current = unsafe { interface_fn!(object_get_instance_from_id)(id.to_u64()) };
    current == word
}

fn parent_is_alive(parent: InstanceId) -> bool {
    // SAFETY: see is_alive().
    let current = unsafe { interface_fn!(object_get_instance_from_id)(parent.to_u64()) };
    !current.is_null()
}

fn destroy(word: sys::GDExtensionObjectPtr, id: InstanceId) {
    out!("destroy object {id:?}");

    // SAFETY: the object is alive (checked by callers) and this handle is responsible for it.
    unsafe { interface_fn!(object_destroy)(word) };
}

pub(crate) fn class_name_of(word: sys::GDExtensionObjectPtr) -> String {
    if word.is_null() {
        return String::new();
    }

    // SAFETY: the engine returns null or a static class name.
    unsafe { sys::read_c_str(interface_fn!(object_get_class_name)(word)) }
}

/// Tag of a class for `object_cast_to`, or null if the engine does not know the class.
pub(crate) fn class_tag(class_name: &str) -> *mut std::ffi::c_void {
    let Ok(c_name) = CString::new(class_name) else {
        return std::ptr::null_mut();
    };

    // SAFETY: valid null-terminated name.
    unsafe { interface_fn!(classdb_get_class_tag)(c_name.as_ptr()) }
}
