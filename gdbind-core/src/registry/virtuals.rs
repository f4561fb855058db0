/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Virtual dispatch: which Rust implementation the engine calls for a virtual method.
//!
//! When the engine is about to call a virtual method on an extension object, it asks the class for the implementation by name.
//! The class answers from its [`VirtualTable`]: its own override, or the one inherited from a parent extension class. If
//! neither exists, the engine runs its native implementation (for most virtuals a no-op).

use std::collections::HashMap;
use std::fmt;

use crate::obj::{EngineClass, GodotClass, UserClass};
use crate::sys::{self, PtrArgs, PtrReturn};

/// Trampoline of one virtual method: decodes the positional arguments, calls the implementation, encodes the return value.
pub type VirtualFn<T> = fn(&mut T, &PtrArgs<'_>, PtrReturn);

/// Named callback slot of a virtual method.
pub struct VirtualSlot<T> {
    name: &'static str,
    arity: usize,
    call: VirtualFn<T>,
}

impl<T> VirtualSlot<T> {
    /// Slot for the virtual method `name` (engine name, e.g. `"_ready"`), which takes `arity` arguments.
    pub fn new(name: &'static str, arity: usize, call: VirtualFn<T>) -> Self {
        Self { name, arity, call }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl<T> Clone for VirtualSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VirtualSlot<T> {}

impl<T> fmt::Debug for VirtualSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualSlot({}/{})", self.name, self.arity)
    }
}

/// Outcome of looking up a virtual method by name.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Resolved {
    /// Implemented in Rust by `class_name`, `depth` levels up the extension class chain (0 = the class itself).
    Override { class_name: &'static str, depth: usize },

    /// Not overridden; the native implementation of `class_name` runs.
    NativeDefault { class_name: &'static str },
}

/// Virtual methods of an extension class `T`.
pub struct VirtualTable<T> {
    class_name: &'static str,
    slots: HashMap<&'static str, VirtualSlot<T>>,
    native_class_name: &'static str,
    native_methods: &'static [&'static str],
    parent: Option<Box<dyn ParentTable<T>>>,
}

impl<T: 'static> VirtualTable<T> {
    /// Empty table of class `class_name`, whose native base class `native_class_name` declares `native_methods`.
    pub fn new(
        class_name: &'static str,
        native_class_name: &'static str,
        native_methods: &'static [&'static str],
    ) -> Self {
        Self {
            class_name,
            slots: HashMap::new(),
            native_class_name,
            native_methods,
            parent: None,
        }
    }

    /// Empty table of a Rust class, with the virtual methods declared by its native base.
    pub fn for_class() -> Self
    where
        T: UserClass,
    {
        Self::new(
            T::CLASS_NAME,
            <T::EngineBase as GodotClass>::CLASS_NAME,
            <T::EngineBase as EngineClass>::VIRTUAL_METHODS,
        )
    }

    /// Adds an override; a later override of the same name replaces the earlier one.
    pub fn with_override(mut self, slot: VirtualSlot<T>) -> Self {
        if !self.native_methods.contains(&slot.name) {
            log::warn!(
                "{}: virtual method `{}` is not declared by {}; it will never be called",
                self.class_name,
                slot.name,
                self.native_class_name
            );
        }

        self.slots.insert(slot.name, slot);
        self
    }

    /// Falls back to the overrides of a parent extension class `P` for all slots that `T` does not override itself.
    ///
    /// `project` gives access to the parent's state inside `T`.
    pub fn inherit<P: 'static>(mut self, parent: VirtualTable<P>, project: fn(&mut T) -> &mut P) -> Self {
        self.parent = Some(Box::new(Inherited {
            table: parent,
            project,
        }));
        self
    }

    /// Looks up the implementation of `name`: own override first, then the parent chain, then the native class.
    ///
    /// Returns `None` if no class in the hierarchy declares the method.
    pub fn resolve(&self, name: &str) -> Option<Resolved> {
        self.resolve_at(name, 0)
    }

    /// Calls the Rust implementation of `name`. Returns `false` if no class in the chain overrides it.
    ///
    /// # Safety
    /// `args` must point to as many valid arguments as the slot declares, of the types the slot decodes; `ret` must be null or
    /// large enough for the slot's return value.
    ///
    /// # Panics
    /// If the implementation panics. Callers at the FFI boundary must catch it.
    pub unsafe fn invoke(
        &self,
        instance: &mut T,
        name: &str,
        args: *const sys::GDExtensionConstTypePtr,
        ret: sys::GDExtensionTypePtr,
    ) -> bool {
        if let Some(slot) = self.slots.get(name) {
            let args = PtrArgs::new(args, slot.arity);
            (slot.call)(instance, &args, PtrReturn::new(ret));
            return true;
        }

        match &self.parent {
            Some(parent) => parent.invoke(instance, name, args, ret),
            None => false,
        }
    }

    /// Names of all overridden slots, including inherited ones, sorted.
    pub fn overridden_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn resolve_at(&self, name: &str, depth: usize) -> Option<Resolved> {
        if self.slots.contains_key(name) {
            return Some(Resolved::Override {
                class_name: self.class_name,
                depth,
            });
        }

        if let Some(resolved) = self.parent.as_ref().and_then(|p| p.resolve_at(name, depth + 1)) {
            return Some(resolved);
        }

        self.native_methods
            .contains(&name)
            .then_some(Resolved::NativeDefault {
                class_name: self.native_class_name,
            })
    }

    fn collect_names(&self, names: &mut Vec<&'static str>) {
        names.extend(self.slots.keys().copied());
        if let Some(parent) = &self.parent {
            parent.collect_names(names);
        }
    }
}

impl<T> fmt::Debug for VirtualTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTable")
            .field("class_name", &self.class_name)
            .field("slots", &self.slots.values().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Inheritance between extension classes

trait ParentTable<T> {
    fn resolve_at(&self, name: &str, depth: usize) -> Option<Resolved>;

    unsafe fn invoke(
        &self,
        instance: &mut T,
        name: &str,
        args: *const sys::GDExtensionConstTypePtr,
        ret: sys::GDExtensionTypePtr,
    ) -> bool;

    fn collect_names(&self, names: &mut Vec<&'static str>);
}

struct Inherited<T, P> {
    table: VirtualTable<P>,
    project: fn(&mut T) -> &mut P,
}

impl<T, P: 'static> ParentTable<T> for Inherited<T, P> {
    fn resolve_at(&self, name: &str, depth: usize) -> Option<Resolved> {
        self.table.resolve_at(name, depth)
    }

    unsafe fn invoke(
        &self,
        instance: &mut T,
        name: &str,
        args: *const sys::GDExtensionConstTypePtr,
        ret: sys::GDExtensionTypePtr,
    ) -> bool {
        self.table.invoke((self.project)(instance), name, args, ret)
    }

    fn collect_names(&self, names: &mut Vec<&'static str>) {
        self.table.collect_names(names);
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::CallFrame;

    const NATIVE: &[&str] = &["_ready", "_process", "_exit_tree"];

    #[derive(Default)]
    struct A {
        calls: Vec<String>,
    }

    #[derive(Default)]
    struct B {
        a: A,
        calls: Vec<String>,
    }

    fn a_table() -> VirtualTable<A> {
        VirtualTable::new("A", "Node", NATIVE)
            .with_override(VirtualSlot::new("_ready", 0, |a: &mut A, _args, _ret| a.calls.push("A::ready".to_string())))
            .with_override(VirtualSlot::new("_process", 1, |a, args, _ret| {
                let delta = unsafe { args.get::<f64>(0) };
                a.calls.push(format!("A::process({delta})"));
            }))
    }

    fn b_table() -> VirtualTable<B> {
        VirtualTable::new("B", "Node", NATIVE)
            .with_override(VirtualSlot::new("_ready", 0, |b: &mut B, _args, _ret| b.calls.push("B::ready".to_string())))
            .inherit(a_table(), |b| &mut b.a)
    }

    fn call<T: 'static>(table: &VirtualTable<T>, instance: &mut T, name: &str, frame: CallFrame<'_>) -> bool {
        let mut called = false;
        let () = unsafe { frame.ptrcall_with(|args, ret| called = table.invoke(instance, name, args, ret)) };
        called
    }

    #[test]
    fn own_override_wins() {
        let table = b_table();
        assert_eq!(
            table.resolve("_ready"),
            Some(Resolved::Override {
                class_name: "B",
                depth: 0
            })
        );

        let mut b = B::default();
        assert!(call(&table, &mut b, "_ready", CallFrame::new()));
        assert_eq!(b.calls, ["B::ready"]);
        assert!(b.a.calls.is_empty());
    }

    #[test]
    fn falls_back_to_parent_override() {
        let table = b_table();
        assert_eq!(
            table.resolve("_process"),
            Some(Resolved::Override {
                class_name: "A",
                depth: 1
            })
        );

        let mut b = B::default();
        let mut frame = CallFrame::new();
        frame.arg(&0.5_f64);
        assert!(call(&table, &mut b, "_process", frame));

        assert!(b.calls.is_empty());
        assert_eq!(b.a.calls, ["A::process(0.5)"]);
    }

    #[test]
    fn falls_back_to_native_default() {
        let table = b_table();
        assert_eq!(
            table.resolve("_exit_tree"),
            Some(Resolved::NativeDefault { class_name: "Node" })
        );
        assert_eq!(table.resolve("_unknown"), None);

        let mut b = B::default();
        assert!(!call(&table, &mut b, "_exit_tree", CallFrame::new()));
    }

    #[test]
    fn later_override_replaces_earlier() {
        let table = VirtualTable::<A>::new("A", "Node", NATIVE)
            .with_override(VirtualSlot::new("_ready", 0, |a, _args, _ret| a.calls.push("first".to_string())))
            .with_override(VirtualSlot::new("_ready", 0, |a, _args, _ret| a.calls.push("second".to_string())));

        let mut a = A::default();
        assert!(call(&table, &mut a, "_ready", CallFrame::new()));
        assert_eq!(a.calls, ["second"]);
    }

    #[test]
    fn overridden_names_include_inherited() {
        assert_eq!(b_table().overridden_names(), ["_process", "_ready"]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn reading_past_declared_arity_panics() {
        let table = VirtualTable::<A>::new("A", "Node", NATIVE).with_override(VirtualSlot::new("_ready", 0, |_a, args, _ret| {
            let _: f64 = unsafe { args.get(0) };
        }));

        let mut a = A::default();
        let mut frame = CallFrame::new();
        frame.arg(&1.0_f64);
        call(&table, &mut a, "_ready", frame);
    }
}
