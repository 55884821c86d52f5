// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Core kernel support for the sunxi infrared drivers.
//!
//! The kernel crate holds the code that chips and capsules share: the
//! Hardware Interface Layer (HIL) definitions, the standard error type,
//! debug output, compile-time configuration and small utilities such as the
//! register interface re-export and the Tock cell types.

#![no_std]

pub mod collections;
pub mod config;
pub mod debug;
pub mod hil;
pub mod utilities;

mod errorcode;

pub use crate::errorcode::ErrorCode;
