/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Method-bind tables.
//!
//! Every engine method is called through an opaque bind obtained from `classdb_get_method_bind(class, method, hash)`. The hash is
//! the version contract: if the engine does not know the triple, the extension was built against an incompatible API and loading
//! fails at startup rather than at the first call.

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate as sys;
use crate::{out, BindingError, ExtensionApi, InitLevel};

/// Opaque token identifying one engine method. Immutable once resolved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ClassMethodBind(pub sys::GDExtensionMethodBindPtr);

// SAFETY: binds are immutable engine-owned tokens, valid for the whole process and usable from any thread.
unsafe impl Send for ClassMethodBind {}
unsafe impl Sync for ClassMethodBind {}

impl ClassMethodBind {
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Name and hash of one method in a per-class table.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub hash: i64,
}

impl MethodDescriptor {
    pub const fn new(name: &'static str, hash: i64) -> Self {
        Self { name, hash }
    }
}

/// Resolution progress of a [`ClassMethodTable`].
///
/// Transitions only forward, except that a failed resolution returns to `Uninitialized`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum ResolveState {
    Uninitialized = 0,
    Resolving = 1,
    Resolved = 2,
}

/// Lookup of a method bind by class, method and hash; injected into table resolution.
pub type BindResolver<'r> = dyn FnMut(&str, &str, i64) -> ClassMethodBind + 'r;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Static per-class tables

/// Method binds of one engine class, declared statically and resolved once.
///
/// Wrappers index into the table with constants matching the order of `methods`.
pub struct ClassMethodTable {
    pub class_name: &'static str,
    pub methods: &'static [MethodDescriptor],
    pub level: InitLevel,
    state: AtomicU8,
    binds: OnceLock<Box<[ClassMethodBind]>>,
}

impl ClassMethodTable {
    pub const fn new(
        class_name: &'static str,
        level: InitLevel,
        methods: &'static [MethodDescriptor],
    ) -> Self {
        Self {
            class_name,
            methods,
            level,
            state: AtomicU8::new(ResolveState::Uninitialized as u8),
            binds: OnceLock::new(),
        }
    }

    pub fn state(&self) -> ResolveState {
        match self.state.load(Ordering::Acquire) {
            0 => ResolveState::Uninitialized,
            1 => ResolveState::Resolving,
            _ => ResolveState::Resolved,
        }
    }

    /// Resolves all binds with `resolver`, unless already resolved. Concurrent callers block until the first one finishes.
    ///
    /// # Panics
    /// If the resolver returns a null bind for any method. An incompatible engine is not recoverable.
    pub fn resolve_with(&self, resolver: &mut BindResolver<'_>) {
        self.binds.get_or_init(|| {
            self.state
                .store(ResolveState::Resolving as u8, Ordering::Release);

            // Resets the state if a missing bind unwinds out of resolution.
            let reset = ResetOnUnwind(&self.state);

            let binds: Box<[ClassMethodBind]> = self
                .methods
                .iter()
                .map(|m| {
                    let bind = resolver(self.class_name, m.name, m.hash);
                    if bind.is_null() {
                        panic_missing_bind(self.class_name, m);
                    }
                    bind
                })
                .collect();

            out!(
                "resolved {} method bind(s) of class {}",
                binds.len(),
                self.class_name
            );
            std::mem::forget(reset);
            self.state
                .store(ResolveState::Resolved as u8, Ordering::Release);
            binds
        });
    }

    /// Resolves through the loaded engine interface.
    ///
    /// # Safety
    /// The binding must be initialized.
    pub unsafe fn resolve(&self) {
        let mut resolver = |class: &str, method: &str, hash: i64| {
            // SAFETY: caller guarantees an initialized binding.
            unsafe { engine_method_bind(class, method, hash) }
        };
        self.resolve_with(&mut resolver);
    }

    /// Returns the bind at `index`, resolving the whole table on first access.
    ///
    /// # Panics
    /// If `index` is out of range (bug in the wrapper), or if resolution fails.
    #[track_caller]
    pub fn bind(&self, index: usize) -> ClassMethodBind {
        let binds = match self.binds.get() {
            Some(binds) => binds,
            None => {
                assert!(
                    sys::is_initialized(),
                    "{}::{} called before the engine binding was initialized",
                    self.class_name,
                    self.method_name(index)
                );

                // SAFETY: checked above.
                unsafe { self.resolve() };
                self.binds
                    .get()
                    .unwrap_or_else(|| unreachable!("resolve() initializes the table"))
            }
        };

        binds[index]
    }

    /// Position of `method` in this table.
    pub fn index_of(&self, method: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name == method)
    }

    fn method_name(&self, index: usize) -> &'static str {
        self.methods.get(index).map_or("<invalid>", |m| m.name)
    }

    fn resolved_binds(&self) -> Option<&[ClassMethodBind]> {
        self.binds.get().map(|b| &b[..])
    }
}

struct ResetOnUnwind<'a>(&'a AtomicU8);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        self.0
            .store(ResolveState::Uninitialized as u8, Ordering::Release);
    }
}

#[track_caller]
fn panic_missing_bind(class_name: &str, method: &MethodDescriptor) -> ! {
    let err = BindingError::MethodBindNotFound {
        class: class_name.to_string(),
        method: method.name.to_string(),
        hash: method.hash,
    };

    panic!("failed to load engine method table: {err}; the extension is incompatible with this engine version");
}

/// Queries the engine for a method bind. Returns a null bind if the engine does not know the triple.
///
/// # Safety
/// The binding must be initialized.
pub(crate) unsafe fn engine_method_bind(class: &str, method: &str, hash: i64) -> ClassMethodBind {
    let (Ok(c_class), Ok(c_method)) = (CString::new(class), CString::new(method)) else {
        return ClassMethodBind(std::ptr::null());
    };

    let get_method_bind = sys::interface_fn!(classdb_get_method_bind);
    let bind = get_method_bind(c_class.as_ptr(), c_method.as_ptr(), hash);

    ClassMethodBind(bind)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Dynamic lookup

/// Name-keyed lookup over resolved method binds.
///
/// Built from the static class tables of an init level, or from an extension API document.
#[derive(Default, Debug)]
pub struct MethodTable {
    by_name: HashMap<(String, String), ClassMethodBind>,
    class_count: usize,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the given class tables eagerly and indexes their binds.
    ///
    /// # Panics
    /// If any method is missing in the engine (see [`ClassMethodTable::resolve_with`]).
    pub fn load(tables: &[&'static ClassMethodTable], resolver: &mut BindResolver<'_>) -> Self {
        let mut result = Self::new();
        for table in tables {
            table.resolve_with(resolver);
            result.add_class(table);
        }
        result
    }

    /// Indexes an already resolved class table.
    pub fn add_class(&mut self, table: &ClassMethodTable) {
        let Some(binds) = table.resolved_binds() else {
            log::warn!(
                "class table {} added before resolution; skipped",
                table.class_name
            );
            return;
        };

        for (descriptor, bind) in table.methods.iter().zip(binds) {
            self.by_name.insert(
                (table.class_name.to_string(), descriptor.name.to_string()),
                *bind,
            );
        }
        self.class_count += 1;
    }

    /// Resolves all bindable methods of the listed classes of an API document.
    ///
    /// Unlike the static tables, a missing bind is reported as error, since the document may come from a different engine build.
    pub fn from_api(
        api: &ExtensionApi,
        classes: &[&str],
        resolver: &mut BindResolver<'_>,
    ) -> Result<Self, BindingError> {
        let mut result = Self::new();

        for &class_name in classes {
            let class = api
                .class(class_name)
                .ok_or_else(|| BindingError::UnregisteredClass(class_name.to_string()))?;

            for (method, hash) in class.bindable_methods() {
                let bind = resolver(class_name, method, hash);
                if bind.is_null() {
                    return Err(BindingError::MethodBindNotFound {
                        class: class_name.to_string(),
                        method: method.to_string(),
                        hash,
                    });
                }

                result
                    .by_name
                    .insert((class_name.to_string(), method.to_string()), bind);
            }
            result.class_count += 1;
        }

        Ok(result)
    }

    /// O(1) lookup by class and method name.
    pub fn resolve(&self, class: &str, method: &str) -> Result<ClassMethodBind, BindingError> {
        // Allocates the key; name lookups are not on the ptrcall path.
        self.by_name
            .get(&(class.to_string(), method.to_string()))
            .copied()
            .ok_or_else(|| BindingError::MethodBindNotFound {
                class: class.to_string(),
                method: method.to_string(),
                hash: 0,
            })
    }

    pub fn method_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    static NODE_METHODS: &[MethodDescriptor] = &[
        MethodDescriptor::new("add_child", 3863233950),
        MethodDescriptor::new("get_child_count", 894402480),
    ];

    /// Fake engine: each known (class, method, hash) maps to a distinct non-null token.
    fn fake_bind(class: &str, method: &str, hash: i64) -> ClassMethodBind {
        let token: usize = match (class, method, hash) {
            ("Node", "add_child", 3863233950) => 0x10,
            ("Node", "get_child_count", 894402480) => 0x20,
            ("Control", "set_size", 2436320129) => 0x30,
            _ => 0,
        };
        ClassMethodBind(token as sys::GDExtensionMethodBindPtr)
    }

    #[test]
    fn table_resolves_once() {
        static TABLE: ClassMethodTable =
            ClassMethodTable::new("Node", InitLevel::Scene, NODE_METHODS);

        assert_eq!(TABLE.state(), ResolveState::Uninitialized);

        let mut calls = 0;
        let mut resolver = |c: &str, m: &str, h: i64| {
            calls += 1;
            fake_bind(c, m, h)
        };
        TABLE.resolve_with(&mut resolver);
        TABLE.resolve_with(&mut resolver);

        assert_eq!(calls, 2); // one per method, only in the first resolution
        assert_eq!(TABLE.state(), ResolveState::Resolved);
        assert_eq!(TABLE.bind(1), fake_bind("Node", "get_child_count", 894402480));
        assert_eq!(TABLE.index_of("add_child"), Some(0));
    }

    #[test]
    #[should_panic(expected = "Node::add_child (hash 1)")]
    fn missing_bind_is_fatal() {
        static BAD_METHODS: &[MethodDescriptor] = &[MethodDescriptor::new("add_child", 1)];
        static TABLE: ClassMethodTable = ClassMethodTable::new("Node", InitLevel::Scene, BAD_METHODS);

        TABLE.resolve_with(&mut fake_bind);
    }

    #[test]
    fn failed_resolution_resets_state() {
        static BAD_METHODS: &[MethodDescriptor] = &[MethodDescriptor::new("get_child_count", 7)];
        static TABLE: ClassMethodTable = ClassMethodTable::new("Node", InitLevel::Scene, BAD_METHODS);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| TABLE.resolve_with(&mut fake_bind)));
        assert!(result.is_err());
        assert_eq!(TABLE.state(), ResolveState::Uninitialized);
        assert!(TABLE.resolved_binds().is_none());
    }

    #[test]
    fn concurrent_first_resolution_runs_once() {
        static TABLE: ClassMethodTable =
            ClassMethodTable::new("Node", InitLevel::Scene, NODE_METHODS);

        let lookups = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let lookups = Arc::clone(&lookups);
                std::thread::spawn(move || {
                    let mut resolver = |c: &str, m: &str, h: i64| {
                        lookups.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        fake_bind(c, m, h)
                    };
                    TABLE.resolve_with(&mut resolver);
                    TABLE.bind(0)
                })
            })
            .collect();

        for thread in threads {
            let bind = thread.join().expect("resolver thread panicked");
            assert_eq!(bind, fake_bind("Node", "add_child", 3863233950));
        }

        assert_eq!(lookups.load(Ordering::SeqCst), NODE_METHODS.len());
        assert_eq!(TABLE.state(), ResolveState::Resolved);
    }

    #[test]
    fn name_lookup_over_loaded_tables() {
        static TABLE: ClassMethodTable =
            ClassMethodTable::new("Node", InitLevel::Scene, NODE_METHODS);

        let table = MethodTable::load(&[&TABLE], &mut fake_bind);
        assert_eq!(table.class_count(), 1);
        assert_eq!(table.method_count(), 2);

        let bind = table.resolve("Node", "add_child").expect("known method");
        assert_eq!(bind, fake_bind("Node", "add_child", 3863233950));

        let err = table.resolve("Node", "queue_free").unwrap_err();
        assert!(matches!(err, BindingError::MethodBindNotFound { method, .. } if method == "queue_free"));
    }

    #[test]
    fn api_document_lookup() {
        let api = ExtensionApi::from_json(
            r#"{ "classes": [
                { "name": "Control", "methods": [ { "name": "set_size", "hash": 2436320129 } ] },
                { "name": "Broken", "methods": [ { "name": "gone", "hash": 5 } ] }
            ] }"#,
        )
        .expect("valid document");

        let table = MethodTable::from_api(&api, &["Control"], &mut fake_bind).expect("resolvable");
        assert!(table.resolve("Control", "set_size").is_ok());

        let err = MethodTable::from_api(&api, &["Broken"], &mut fake_bind).unwrap_err();
        assert_eq!(
            err,
            BindingError::MethodBindNotFound {
                class: "Broken".to_string(),
                method: "gone".to_string(),
                hash: 5
            }
        );

        let err = MethodTable::from_api(&api, &["Missing"], &mut fake_bind).unwrap_err();
        assert_eq!(err, BindingError::UnregisteredClass("Missing".to_string()));
    }
}
