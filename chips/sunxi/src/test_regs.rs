// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Zeroed memory standing in for a peripheral's register window in unit
//! tests. Raw `poke`/`peek` go around the register types so tests can
//! preset read-only registers and inspect write-only ones.

extern crate std;

use kernel::utilities::StaticRef;
use std::boxed::Box;
use std::vec;

pub struct FakeRegs {
    base: *mut u32,
    words: usize,
}

impl FakeRegs {
    /// Allocate `bytes` of zeroed register space. The memory is leaked so
    /// the returned `StaticRef` stays valid for the rest of the test.
    pub fn new(bytes: usize) -> FakeRegs {
        let words = bytes.div_ceil(4);
        let mem: &'static mut [u32] = Box::leak(vec![0u32; words].into_boxed_slice());
        FakeRegs {
            base: mem.as_mut_ptr(),
            words,
        }
    }

    pub fn static_ref<T>(&self) -> StaticRef<T> {
        unsafe { StaticRef::new(self.base as *const T) }
    }

    fn slot(&self, offset: usize) -> *mut u32 {
        assert!(offset % 4 == 0 && offset / 4 < self.words);
        unsafe { self.base.add(offset / 4) }
    }

    pub fn poke(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.slot(offset), value) }
    }

    pub fn peek(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile(self.slot(offset)) }
    }
}
