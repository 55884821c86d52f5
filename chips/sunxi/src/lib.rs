// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral implementations for the Allwinner (sunxi) consumer infrared
//! controller: the CIR receiver and the CIR transmitter.
//!
//! The register drivers (`irrx`, `irtx`) only move bytes between the
//! hardware and the protocol engines (`irrx_state`, `irtx_encode`), which
//! are plain data structures and can be exercised without hardware.

#![no_std]

pub mod irrx;
pub mod irrx_state;
pub mod irtx;
pub mod irtx_encode;

#[cfg(test)]
mod test_regs;
