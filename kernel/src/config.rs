// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options in the kernel.
//!
//! Configuration lives in a typed `const` object rather than in scattered
//! `#[cfg(feature = ...)]` attributes. Every code path stays type-checked by
//! the compiler, even the disabled ones, and constant folding removes the
//! disabled paths from the final binary just as a cargo feature would.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching cargo feature on the
/// kernel crate from the board crate.
pub struct Config {
    /// Whether the infrared receiver should trace every FIFO sample and every
    /// finalized run to the debug output.
    ///
    /// This is very chatty: a single NEC frame produces well over a hundred
    /// lines. Only useful when bringing up a new board or remote.
    pub trace_ir_rx: bool,

    /// Whether the infrared transmitter should trace the encoded FIFO bytes
    /// and the register state around each transmission.
    pub trace_ir_tx: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined. This is the only location in the kernel where we permit
/// `#[cfg(x)]` to be used to configure code based on Cargo features.
pub const CONFIG: Config = Config {
    trace_ir_rx: cfg!(feature = "trace_ir_rx"),
    trace_ir_tx: cfg!(feature = "trace_ir_tx"),
};
