/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Call-scoped argument frames for ptrcalls.
//!
//! Outbound calls encode every argument into a fixed-width slot of a [`CallFrame`], pass an array of slot pointers to the engine,
//! and decode the result from a [`Ret`] slot. The frame lives on the stack of the calling function and is released when it goes
//! out of scope, on both the success and the unwinding path.
//!
//! Inbound callbacks (virtual methods) use [`PtrArgs`] and [`PtrReturn`] to read the engine's argument array and write the result.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::{align_of, size_of, MaybeUninit};
use std::ptr;

use crate as sys;
use crate::{out, BindingError, ClassMethodBind, GodotFfi};

/// Maximum number of arguments a single frame can hold.
pub const MAX_ARGS: usize = 16;

/// Size in bytes of one argument slot; the largest supported native representation.
pub const SLOT_SIZE: usize = 64;

const SLOT_ALIGN: usize = 16;

#[repr(C, align(16))]
#[derive(Copy, Clone)]
struct Slot(MaybeUninit<[u8; SLOT_SIZE]>);

sys::static_assert!(align_of::<Slot>() == SLOT_ALIGN);

impl Slot {
    const ZEROED: Slot = Slot(MaybeUninit::zeroed());

    fn as_ptr(&self) -> *const c_void {
        (self as *const Slot).cast()
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        (self as *mut Slot).cast()
    }
}

/// Post-monomorphization check that a representation fits into one slot.
struct SlotFit<R>(PhantomData<R>);

impl<R> SlotFit<R> {
    const OK: () = assert!(
        size_of::<R>() <= SLOT_SIZE && align_of::<R>() <= SLOT_ALIGN,
        "native representation does not fit into a call frame slot"
    );
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Outbound

/// Ordered argument slots for exactly one native call.
///
/// Arguments passed by reference are borrowed for the lifetime `'a`, so the frame cannot outlive them. Arguments passed by value
/// are owned by the frame and dropped together with it.
///
/// ```no_run
/// # use gdbind_ffi::{CallFrame, ClassMethodBind};
/// # fn call(bind: ClassMethodBind, object: gdbind_ffi::GDExtensionObjectPtr) {
/// let index: i64 = 3;
/// let mut frame = CallFrame::new();
/// frame.arg(&index).arg(&true);
///
/// let child: gdbind_ffi::GDExtensionObjectPtr = unsafe { frame.ptrcall(bind, object) };
/// # }
/// ```
pub struct CallFrame<'a> {
    slots: [Slot; MAX_ARGS],
    drops: [Option<unsafe fn(*mut c_void)>; MAX_ARGS],
    len: usize,
    _borrowed: PhantomData<&'a ()>,

    // Frames are built and consumed on one thread.
    _not_send: PhantomData<*const ()>,
}

impl<'a> CallFrame<'a> {
    pub fn new() -> Self {
        Self {
            slots: [Slot::ZEROED; MAX_ARGS],
            drops: [None; MAX_ARGS],
            len: 0,
            _borrowed: PhantomData,
            _not_send: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a borrowed argument.
    ///
    /// # Panics
    /// If the frame already holds [`MAX_ARGS`] arguments.
    #[track_caller]
    pub fn arg<T: GodotFfi>(&mut self, value: &'a T) -> &mut Self {
        if let Err(err) = self.try_arg(value) {
            panic!("{err}");
        }
        self
    }

    /// Appends a borrowed argument, or returns [`BindingError::FrameOverflow`] when the frame is full.
    pub fn try_arg<T: GodotFfi>(&mut self, value: &'a T) -> Result<&mut Self, BindingError> {
        self.push_repr(value.to_repr(), None)?;
        Ok(self)
    }

    /// Appends an argument whose ownership moves into the frame.
    ///
    /// Resources owned by `value` are released when the frame is dropped.
    ///
    /// # Panics
    /// If the frame already holds [`MAX_ARGS`] arguments.
    #[track_caller]
    pub fn arg_owned<T: GodotFfi>(&mut self, value: T) -> &mut Self {
        if self.len == MAX_ARGS {
            panic!("{}", BindingError::FrameOverflow { max: MAX_ARGS });
        }

        let repr = value.into_repr();
        let pushed = self.push_repr(repr, Some(drop_slot::<T> as unsafe fn(*mut c_void)));
        debug_assert!(pushed.is_ok());
        self
    }

    fn push_repr<R: Copy + 'static>(
        &mut self,
        repr: R,
        drop_fn: Option<unsafe fn(*mut c_void)>,
    ) -> Result<(), BindingError> {
        let () = SlotFit::<R>::OK;

        if self.len == MAX_ARGS {
            return Err(BindingError::FrameOverflow { max: MAX_ARGS });
        }

        let slot = &mut self.slots[self.len];

        // SAFETY: R fits into a slot (checked above); slots are 16-aligned.
        unsafe { ptr::write(slot.as_mut_ptr().cast::<R>(), repr) };
        self.drops[self.len] = drop_fn;
        self.len += 1;

        Ok(())
    }

    /// Calls an engine method through `object_method_bind_ptrcall` and decodes its return value.
    ///
    /// # Safety
    /// The binding must be initialized. `bind` must belong to the class of `object` (or a base class), and the frame's arguments
    /// and `R` must match the method's signature.
    pub unsafe fn ptrcall<R: GodotFfi>(
        self,
        bind: ClassMethodBind,
        object: sys::GDExtensionObjectPtr,
    ) -> R {
        let ptrcall_fn = sys::interface_fn!(object_method_bind_ptrcall);

        self.ptrcall_with(|args, ret| unsafe { ptrcall_fn(bind.0, object, args, ret) })
    }

    /// Calls a static engine method (no receiver object).
    ///
    /// # Safety
    /// See [`ptrcall()`](Self::ptrcall).
    pub unsafe fn ptrcall_static<R: GodotFfi>(self, bind: ClassMethodBind) -> R {
        self.ptrcall(bind, ptr::null_mut())
    }

    /// Calls `f` with the argument pointer array and the return slot, then decodes the return value.
    ///
    /// # Safety
    /// `f` must either leave the return slot untouched or write a valid representation of `R` into it.
    pub unsafe fn ptrcall_with<R, F>(mut self, f: F) -> R
    where
        R: GodotFfi,
        F: FnOnce(*const sys::GDExtensionConstTypePtr, sys::GDExtensionTypePtr),
    {
        let mut arg_ptrs: [sys::GDExtensionConstTypePtr; MAX_ARGS] = [ptr::null(); MAX_ARGS];
        for (arg_ptr, slot) in arg_ptrs.iter_mut().zip(&self.slots[..self.len]) {
            *arg_ptr = slot.as_ptr();
        }

        out!("ptrcall with {} argument(s)", self.len);

        let mut ret = Ret::<R>::new();
        f(arg_ptrs.as_ptr(), ret.as_mut_ptr());

        // Owned arguments are released when `self` goes out of scope, after the engine has returned.
        self.free_owned();
        ret.into_value()
    }

    fn free_owned(&mut self) {
        for i in 0..self.len {
            if let Some(drop_fn) = self.drops[i].take() {
                // SAFETY: the slot was written by `arg_owned::<T>` with the matching drop function, and is consumed once (take()).
                unsafe { drop_fn(self.slots[i].as_mut_ptr()) };
            }
        }
    }
}

impl Default for CallFrame<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        self.free_owned();
    }
}

unsafe fn drop_slot<T: GodotFfi>(slot: *mut c_void) {
    let repr = ptr::read(slot.cast::<T::Repr>());
    drop(T::from_repr(repr));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Typed return slot of a native call.
pub struct Ret<T: GodotFfi> {
    slot: Slot,
    _marker: PhantomData<T>,
}

/// Return slot for calls without a return value.
pub type Nil = Ret<()>;

impl<T: GodotFfi> Ret<T> {
    pub fn new() -> Self {
        let () = SlotFit::<T::Repr>::OK;

        Self {
            slot: Slot::ZEROED,
            _marker: PhantomData,
        }
    }

    pub fn as_mut_ptr(&mut self) -> sys::GDExtensionTypePtr {
        self.slot.as_mut_ptr()
    }

    /// Decodes the value written by the engine.
    ///
    /// # Safety
    /// The slot must hold a valid representation of `T`: either written by the engine, or the zero-initialized default for
    /// types where all-zero bytes are a valid representation.
    pub unsafe fn into_value(self) -> T {
        let repr = ptr::read(self.slot.as_ptr().cast::<T::Repr>());
        T::from_repr(repr)
    }
}

impl<T: GodotFfi> Default for Ret<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Inbound

/// Positional arguments passed by the engine into a callback.
pub struct PtrArgs<'a> {
    args: *const sys::GDExtensionConstTypePtr,
    len: usize,
    _borrowed: PhantomData<&'a ()>,
}

impl PtrArgs<'_> {
    /// # Safety
    /// `args` must point to `len` valid argument pointers that stay alive for the lifetime of this object.
    pub unsafe fn new(args: *const sys::GDExtensionConstTypePtr, len: usize) -> Self {
        debug_assert!(len == 0 || !args.is_null(), "non-empty argument array is null");

        Self {
            args,
            len,
            _borrowed: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decodes the argument at `index`.
    ///
    /// # Panics
    /// If `index` is not less than the declared argument count. This always indicates a bug in the binding layer.
    ///
    /// # Safety
    /// The argument at `index` must be a valid representation of `T`.
    #[track_caller]
    pub unsafe fn get<T: GodotFfi>(&self, index: usize) -> T {
        if index >= self.len {
            panic!(
                "{}",
                BindingError::ArgumentIndex {
                    index,
                    len: self.len
                }
            );
        }

        let arg_ptr = *self.args.add(index);
        let repr = ptr::read_unaligned(arg_ptr.cast::<T::Repr>());
        T::from_arg_repr(&repr)
    }
}

/// Return slot passed by the engine into a callback.
pub struct PtrReturn {
    ret: sys::GDExtensionTypePtr,
}

impl PtrReturn {
    /// # Safety
    /// `ret` must be null or point to writable memory large enough for the callback's return type.
    pub unsafe fn new(ret: sys::GDExtensionTypePtr) -> Self {
        Self { ret }
    }

    /// Moves `value` into the engine's return slot. If the engine passed no slot, the value is dropped.
    pub fn set<T: GodotFfi>(self, value: T) {
        if self.ret.is_null() || size_of::<T::Repr>() == 0 {
            return;
        }

        // SAFETY: constructor contract; the slot is valid for T::Repr.
        unsafe { ptr::write_unaligned(self.ret.cast::<T::Repr>(), value.into_repr()) };
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Engine stand-in that returns its first argument.
    fn echo<T: GodotFfi>(value: T) -> T {
        let mut frame = CallFrame::new();
        frame.arg(&value);

        unsafe {
            frame.ptrcall_with(|args, ret| {
                let args = PtrArgs::new(args, 1);
                PtrReturn::new(ret).set(args.get::<T>(0));
            })
        }
    }

    #[test]
    fn frame_preserves_argument_order() {
        let a: i64 = -5;
        let b: f32 = 2.5;
        let c = true;

        let mut frame = CallFrame::new();
        frame.arg(&a).arg(&b).arg(&c);
        assert_eq!(frame.len(), 3);

        let sum: f64 = unsafe {
            frame.ptrcall_with(|args, ret| {
                let args = PtrArgs::new(args, 3);
                let a: i64 = args.get(0);
                let b: f32 = args.get(1);
                let c: bool = args.get(2);

                let result = a as f64 + b as f64 + if c { 100.0 } else { 0.0 };
                PtrReturn::new(ret).set(result);
            })
        };

        assert_eq!(sum, 97.5);
    }

    #[test]
    fn nil_return_slot_is_untouched() {
        let frame = CallFrame::new();
        let mut called = false;

        let () = unsafe { frame.ptrcall_with(|_args, _ret| called = true) };
        assert!(called);
    }

    #[test]
    #[should_panic(expected = "argument frame overflow")]
    fn frame_overflow_panics() {
        let value: i64 = 1;
        let mut frame = CallFrame::new();
        for _ in 0..=MAX_ARGS {
            frame.arg(&value);
        }
    }

    #[test]
    fn try_arg_reports_overflow() {
        let value: i64 = 1;
        let mut frame = CallFrame::new();
        for _ in 0..MAX_ARGS {
            frame.try_arg(&value).expect("within capacity");
        }

        let err = frame.try_arg(&value).map(|_| ()).unwrap_err();
        assert_eq!(err, BindingError::FrameOverflow { max: MAX_ARGS });
    }

    #[test]
    #[should_panic(expected = "argument index 1 out of range")]
    fn reading_past_declared_arguments_panics() {
        let value: i64 = 1;
        let mut frame = CallFrame::new();
        frame.arg(&value);

        let () = unsafe {
            frame.ptrcall_with(|args, _ret| {
                let args = PtrArgs::new(args, 1);
                let _: i64 = args.get(1);
            })
        };
    }

    static TRACKED_DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Tracked(u32);

    impl Drop for Tracked {
        fn drop(&mut self) {
            TRACKED_DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    unsafe impl GodotFfi for Tracked {
        type Repr = u32;

        fn to_repr(&self) -> u32 {
            self.0
        }

        fn into_repr(self) -> u32 {
            let repr = self.0;
            std::mem::forget(self);
            repr
        }

        unsafe fn from_repr(repr: u32) -> Self {
            Tracked(repr)
        }
    }

    #[test]
    fn owned_arguments_are_released_with_frame() {
        let before = TRACKED_DROPS.load(Ordering::SeqCst);

        let mut frame = CallFrame::new();
        frame.arg_owned(Tracked(1)).arg_owned(Tracked(2));
        assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), before);

        let () = unsafe { frame.ptrcall_with(|_args, _ret| {}) };
        assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), before + 2);

        // Unused frame.
        let mut frame = CallFrame::new();
        frame.arg_owned(Tracked(3));
        drop(frame);
        assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), before + 3);
    }

    #[test]
    fn echo_handle_word() {
        let word = 0xdead_beef_usize as *mut c_void;
        assert_eq!(echo(word), word);
        assert!(echo(ptr::null_mut::<c_void>()).is_null());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::echo;

        proptest! {
            #[test]
            fn decode_encode_is_identity(
                i in any::<i64>(),
                i32_val in any::<i32>(),
                u in any::<u64>(),
                byte in any::<u8>(),
                f in any::<f64>().prop_filter("NaN is not equal to itself", |f| !f.is_nan()),
                f32_val in any::<f32>().prop_filter("NaN is not equal to itself", |f| !f.is_nan()),
                b in any::<bool>(),
            ) {
                prop_assert_eq!(echo(i), i);
                prop_assert_eq!(echo(i32_val), i32_val);
                prop_assert_eq!(echo(u), u);
                prop_assert_eq!(echo(byte), byte);
                prop_assert_eq!(echo(f), f);
                prop_assert_eq!(echo(f32_val), f32_val);
                prop_assert_eq!(echo(b), b);
            }
        }
    }
}
