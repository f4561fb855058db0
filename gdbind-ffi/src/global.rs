/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard};

/// Lazily initialized global with mutable access.
///
/// A `static` holding a `Global<T>` runs its initializer exactly once, on first [`lock()`](Self::lock); racing first accesses block
/// until initialization has finished and all observe the same value. Unlike `OnceLock`, the value can be mutated through the guard.
pub struct Global<T> {
    value: Mutex<InitState<T>>,
}

impl<T> Global<T> {
    /// Create `Global<T>`, providing a lazy initialization function.
    pub const fn new(init_fn: fn() -> T) -> Self {
        Self {
            value: Mutex::new(InitState::Pending(init_fn)),
        }
    }

    /// Create `Global<T>` with `T::default()` as initialization function.
    ///
    /// Inherent rather than `Default`, because the trait method is not `const`.
    pub const fn default() -> Self
    where
        T: Default,
    {
        Self::new(T::default)
    }

    /// Returns a guard that gives shared or mutable access to the value.
    ///
    /// # Panics
    /// If the initialization function panics. The global stays poisoned afterwards and all future calls panic as well.
    pub fn lock(&self) -> GlobalGuard<'_, T> {
        let mut guard = self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match &*guard {
            InitState::Initialized(_) => {}
            InitState::Failed => panic!("previous Global<T> initialization failed due to panic"),
            InitState::Pending(init_fn) => {
                let init_fn = *init_fn;
                *guard = InitState::Failed;

                // On panic, the state remains `Failed`.
                *guard = InitState::Initialized(init_fn());
            }
        }

        GlobalGuard { guard }
    }

    /// Whether the initializer has already run successfully.
    pub fn is_initialized(&self) -> bool {
        let guard = self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        matches!(*guard, InitState::Initialized(_))
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Guards

/// Guard that temporarily gives access to a `Global<T>`'s inner value.
pub struct GlobalGuard<'a, T> {
    guard: MutexGuard<'a, InitState<T>>,
}

impl<T> Deref for GlobalGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match &*self.guard {
            InitState::Initialized(value) => value,
            _ => unreachable!("GlobalGuard exists only for initialized globals"),
        }
    }
}

impl<T> DerefMut for GlobalGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut *self.guard {
            InitState::Initialized(value) => value,
            _ => unreachable!("GlobalGuard exists only for initialized globals"),
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Internals

enum InitState<T> {
    Initialized(T),
    Pending(fn() -> T),
    Failed,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static MAP: Global<HashMap<i32, &'static str>> = Global::default();
    static VEC: Global<Vec<i32>> = Global::new(|| vec![1, 2, 3]);
    static FAILED: Global<()> = Global::new(|| panic!("failed"));

    #[test]
    fn test_global_map() {
        {
            let mut map = MAP.lock();
            map.insert(2, "two");
            map.insert(3, "three");
        }

        {
            let mut map = MAP.lock();
            map.insert(1, "one");
        }

        let map = MAP.lock();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&1), Some(&"one"));
    }

    #[test]
    fn test_global_vec() {
        VEC.lock().push(4);
        assert_eq!(*VEC.lock(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_global_poison() {
        let result = std::panic::catch_unwind(|| {
            let _guard = FAILED.lock();
        });
        assert!(result.is_err());

        let result = std::panic::catch_unwind(|| {
            let _guard = FAILED.lock();
        });
        assert!(result.is_err());
        assert!(!FAILED.is_initialized());
    }

    static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
    static RACED: Global<usize> = Global::new(|| {
        INIT_CALLS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(10));
        42
    });

    #[test]
    fn concurrent_first_access_initializes_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| *RACED.lock()))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("thread panicked"), 42);
        }

        assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);
    }
}
