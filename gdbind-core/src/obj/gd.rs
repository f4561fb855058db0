/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::CString;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::meta::{panic_call_error, CallContext};
use crate::obj::handle_registry::handle_registry;
use crate::obj::raw::class_tag;
use crate::obj::{
    EngineClass, GdMut, GdRef, GodotClass, Inherits, InstanceId, Ownership, RawHandle, UserClass,
};
use crate::storage::InstanceStorage;
use crate::sys::{self, interface_fn, BindingError};

/// Smart pointer to objects owned by the engine.
///
/// `Gd<T>` is a typed [`RawHandle`]; how the object is released depends on the handle's [`Ownership`]:
/// - Owned objects are destroyed by [`free()`](Self::free), or when the last (only) `Gd` is dropped.
/// - Reference-counted objects are shared; each clone holds one reference.
/// - Borrowed objects are never released through the handle. Cloning copies the handle.
///
/// The pointer dereferences to the wrapper of the closest engine class, giving access to its methods. Extension classes
/// implemented in Rust are accessed with [`bind()`](Self::bind) and [`bind_mut()`](Self::bind_mut).
///
/// Handles are confined to the thread they were created on.
pub struct Gd<T: GodotClass> {
    raw: RawHandle,

    // Wrapper over the same object pointer; reinterpreted for dereferencing.
    target: T::EngineBase,
    _marker: PhantomData<*const T>,
}

impl<T: GodotClass> Gd<T> {
    /// Creates a new object of class `T` in the engine.
    ///
    /// Reference-counted classes start with one reference held by the returned handle; all others are owned by it and must be
    /// released with [`free()`](Self::free), or are destroyed when the handle is dropped.
    ///
    /// # Panics
    /// If the class is not registered with the engine.
    pub fn new_alloc() -> Self {
        Self::try_new_alloc().unwrap_or_else(|err| panic_call_error(&CallContext::gd::<T>("new_alloc"), &err))
    }

    /// Like [`new_alloc()`](Self::new_alloc), but returns an error instead of panicking.
    pub fn try_new_alloc() -> Result<Self, BindingError> {
        if !sys::is_initialized() {
            return Err(BindingError::NotInitialized);
        }

        let class_name =
            CString::new(T::CLASS_NAME).map_err(|_| BindingError::UnregisteredClass(T::CLASS_NAME.to_string()))?;

        // SAFETY: binding initialized; valid class name.
        let object_ptr = unsafe { interface_fn!(classdb_construct_object)(class_name.as_ptr()) };
        if object_ptr.is_null() {
            return Err(BindingError::UnregisteredClass(T::CLASS_NAME.to_string()));
        }

        // SAFETY: a freshly constructed object is not owned by anyone else.
        let raw = unsafe { RawHandle::from_new_object(object_ptr)? };
        Ok(Self::from_raw(raw))
    }

    /// Wraps an untyped handle. The caller is responsible for the object being of class `T` (or a subclass).
    #[doc(hidden)]
    pub fn from_raw(raw: RawHandle) -> Self {
        let target = <T::EngineBase as EngineClass>::__from_object_ptr(raw.get());

        Self {
            raw,
            target,
            _marker: PhantomData,
        }
    }

    /// Returns the instance ID of this object.
    ///
    /// The ID stays the same even after the object is destroyed; it is then no longer valid.
    pub fn instance_id(&self) -> InstanceId {
        self.raw.instance_id()
    }

    /// Checks whether the object is still alive and, for lifetime-bound handles, whether its parent is.
    pub fn is_instance_valid(&self) -> bool {
        self.raw.is_instance_valid()
    }

    pub fn ownership(&self) -> Ownership {
        self.raw.ownership()
    }

    /// Engine class of the object at runtime, which may be more derived than `T`.
    pub fn dynamic_class_name(&self) -> String {
        self.raw.class_name()
    }

    /// Converts to a pointer of a base class. Always succeeds.
    pub fn upcast<Base>(self) -> Gd<Base>
    where
        Base: GodotClass,
        T: Inherits<Base>,
    {
        Gd::from_raw(self.raw)
    }

    /// Tries to convert to a pointer of class `U`, which may be a subclass, a base class or an unrelated class.
    ///
    /// Asks the engine whether the object is an instance of `U`. On failure, the original pointer is returned unchanged.
    pub fn try_cast<U: GodotClass>(self) -> Result<Gd<U>, Self> {
        let tag = class_tag(U::CLASS_NAME);
        if tag.is_null() {
            return Err(self);
        }

        // SAFETY: valid object pointer and class tag.
        let cast_ptr = unsafe { interface_fn!(object_cast_to)(self.raw.get(), tag) };
        if cast_ptr.is_null() {
            return Err(self);
        }

        Ok(Gd::from_raw(self.raw))
    }

    /// Converts to a pointer of class `U`.
    ///
    /// # Panics
    /// If the object is not an instance of `U`.
    #[track_caller]
    pub fn cast<U: GodotClass>(self) -> Gd<U> {
        self.try_cast::<U>().unwrap_or_else(|from| {
            let err = BindingError::InvalidCast {
                from: from.dynamic_class_name(),
                to: U::CLASS_NAME.to_string(),
            };
            panic_call_error(&CallContext::gd::<T>("cast"), &err)
        })
    }

    /// Destroys the object.
    ///
    /// # Panics
    /// If the handle is borrowed, or the object was already destroyed by someone else.
    #[track_caller]
    pub fn free(self) {
        if let Err(err) = self.try_free() {
            panic_call_error(&CallContext::gd::<T>("free"), &err)
        }
    }

    /// Releases the object: owned objects are destroyed, reference-counted handles give back their reference.
    ///
    /// Fails with [`BindingError::ReleaseBorrowed`] for borrowed handles.
    pub fn try_free(self) -> Result<(), BindingError> {
        self.raw.release()
    }

    /// A handle that borrows the object from this one, e.g. to pass it to code that must not release it.
    ///
    /// It becomes invalid once the object is destroyed.
    pub fn to_borrowed(&self) -> Self {
        Self::from_raw(self.raw.borrow_bound())
    }

    /// Shares the handle, if its ownership allows it. Owned handles cannot be shared.
    pub fn try_clone(&self) -> Option<Self> {
        self.raw.share().map(Self::from_raw)
    }

    /// Upcasts to the closest engine class, keeping the handle.
    pub fn into_base(self) -> Gd<T::EngineBase> {
        Gd::from_raw(self.raw)
    }

    /// Raw object pointer, for passing in argument frames. Ownership stays with this handle.
    #[doc(hidden)]
    pub fn obj_sys(&self) -> sys::GDExtensionObjectPtr {
        self.raw.get()
    }

    /// Hands the object over to the engine and returns its pointer; see [`RawHandle::into_engine()`].
    pub(crate) fn into_engine(self) -> sys::GDExtensionObjectPtr {
        self.raw.into_engine()
    }

    #[track_caller]
    fn check_access(&self, function_name: &str) {
        if let Err(err) = self.raw.check_access(sys::config().safeguards) {
            panic_call_error(&CallContext::gd::<T>(function_name), &err)
        }
    }
}

impl<T: UserClass> Gd<T> {
    /// Hands out a guard for a shared borrow of the Rust instance.
    ///
    /// # Panics
    /// If the instance is currently mutably bound, or the object has been destroyed.
    #[track_caller]
    pub fn bind(&self) -> GdRef<'_, T> {
        let storage = self.storage("bind");

        match storage.borrow() {
            Ok(guard) => GdRef::from_guard(guard),
            Err(_) => panic!(
                "Gd<T>::bind() failed, already bound; T = {}.\n  Make sure there is no &mut T live at the time.",
                T::CLASS_NAME
            ),
        }
    }

    /// Hands out a guard for an exclusive borrow of the Rust instance.
    ///
    /// # Panics
    /// If the instance is currently bound, or the object has been destroyed.
    #[track_caller]
    pub fn bind_mut(&mut self) -> GdMut<'_, T> {
        let storage = self.storage("bind_mut");

        match storage.borrow_mut() {
            Ok(guard) => GdMut::from_guard(guard),
            Err(_) => panic!(
                "Gd<T>::bind_mut() failed, already bound; T = {}.\n  Make sure there is no &T or &mut T live at the time.\n  This often occurs when calling an engine method that calls back into a virtual of the same object.",
                T::CLASS_NAME
            ),
        }
    }

    #[track_caller]
    fn storage(&self, function_name: &str) -> &InstanceStorage<T> {
        self.check_access(function_name);

        let storage = handle_registry().get::<T>(self.instance_id());
        match storage {
            // SAFETY: the registry only holds storage of live instances, and the storage lives as long as the object.
            Ok(storage) => unsafe { &*storage },
            Err(err) => panic_call_error(&CallContext::gd::<T>(function_name), &err),
        }
    }
}

impl<T: GodotClass> Deref for Gd<T> {
    type Target = T::EngineBase;

    #[track_caller]
    fn deref(&self) -> &Self::Target {
        self.check_access("deref");
        &self.target
    }
}

impl<T: GodotClass> DerefMut for Gd<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.check_access("deref_mut");
        &mut self.target
    }
}

impl<T: GodotClass> Clone for Gd<T> {
    /// Acquires another reference (reference-counted) or copies the handle (borrowed).
    ///
    /// # Panics
    /// For owned handles, which cannot be shared. Use [`to_borrowed()`](Gd::to_borrowed) instead.
    #[track_caller]
    fn clone(&self) -> Self {
        match self.try_clone() {
            Some(gd) => gd,
            None => panic!(
                "Gd<{}>::clone(): owned handle {} cannot be shared; use to_borrowed()",
                T::CLASS_NAME,
                self.instance_id()
            ),
        }
    }
}

impl<T: GodotClass> PartialEq for Gd<T> {
    /// Two handles are equal if they refer to the same instance.
    fn eq(&self, other: &Self) -> bool {
        self.instance_id() == other.instance_id()
    }
}

impl<T: GodotClass> Eq for Gd<T> {}

impl<T: GodotClass> fmt::Debug for Gd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gd")
            .field("class", &T::CLASS_NAME)
            .field("id", &self.instance_id())
            .field("ownership", &self.ownership())
            .finish()
    }
}
