// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Fixed-capacity collections that work without an allocator.

pub mod queue;
pub mod ring_buffer;
