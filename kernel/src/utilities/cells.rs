// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Cell types used by chips and capsules to hold clients and buffers behind
//! shared references.
//!
//! Drivers are shared as `&'static` references between the interrupt path
//! and their clients, so every piece of mutable state sits in a cell.

use core::cell::{Cell, UnsafeCell};

/// `OptionalCell` is a `Cell` that wraps an `Option`, which is the usual way
/// of storing a client reference that is set after construction.
pub struct OptionalCell<T> {
    value: Cell<Option<T>>,
}

impl<T: Copy> OptionalCell<T> {
    pub const fn empty() -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    pub fn set(&self, val: T) {
        self.value.set(Some(val));
    }

    pub fn clear(&self) {
        self.value.set(None);
    }

    pub fn is_some(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.get().is_none()
    }

    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    /// Call `closure` with the contained value, if any.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(closure)
    }
}

/// A cell that hands out `&mut T` to a closure.
///
/// The value is marked absent while it is mapped, so a re-entrant `map`
/// (for example a client calling back into the capsule from within a
/// callback) gets `None` instead of a second mutable reference.
pub struct MapCell<T> {
    val: UnsafeCell<T>,
    occupied: Cell<bool>,
}

impl<T> MapCell<T> {
    pub const fn new(value: T) -> MapCell<T> {
        MapCell {
            val: UnsafeCell::new(value),
            occupied: Cell::new(true),
        }
    }

    /// Whether the value is available, that is, not currently mapped.
    pub fn is_some(&self) -> bool {
        self.occupied.get()
    }

    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        if self.is_some() {
            self.occupied.set(false);
            // SAFETY: `occupied` was true, so no other reference to the
            // value is live, and it stays false until the closure returns.
            let valref = unsafe { &mut *self.val.get() };
            let res = closure(valref);
            self.occupied.set(true);
            Some(res)
        } else {
            None
        }
    }
}
