// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for in-kernel debugging.
//!
//! For printing, this module uses an `IoWrite` sink that a board installs
//! once during setup with [`set_debug_writer`]. Until a sink is installed,
//! debug output is discarded. Output is line oriented: every call to
//! [`debug!`](crate::debug!) produces one line terminated with `\r\n`.
//!
//! ```ignore
//! debug!("Yes the code gets here with value {}", i);
//! debug_verbose!("got here"); // includes file and line number
//! ```
//!
//! A board that has no console yet can capture output in memory by
//! installing a [`RingBuffer<u8>`](crate::collections::ring_buffer::RingBuffer)
//! as the writer and draining it later.

use core::fmt::{write, Arguments, Result, Write};
use core::ptr::addr_of_mut;

use crate::collections::queue::Queue;
use crate::collections::ring_buffer::RingBuffer;

/// Byte sink for debug output.
pub trait IoWrite {
    /// Write `buf`, returning how many bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> usize;
}

impl IoWrite for RingBuffer<'_, u8> {
    fn write(&mut self, buf: &[u8]) -> usize {
        let mut accepted = 0;
        for &byte in buf {
            if !self.enqueue(byte) {
                break;
            }
            accepted += 1;
        }
        accepted
    }
}

static mut DEBUG_WRITER: Option<&'static mut dyn IoWrite> = None;

/// Install the sink used by `debug!` and `debug_verbose!`.
///
/// # Safety
///
/// Must be called from the single kernel thread before interrupts that
/// produce debug output are enabled, and not concurrently with any debug
/// output.
pub unsafe fn set_debug_writer(writer: &'static mut dyn IoWrite) {
    *addr_of_mut!(DEBUG_WRITER) = Some(writer);
}

struct WriteCounter<'a> {
    sink: &'a mut dyn IoWrite,
    written: usize,
}

impl Write for WriteCounter<'_> {
    fn write_str(&mut self, s: &str) -> Result {
        self.written += self.sink.write(s.as_bytes());
        Ok(())
    }
}

/// Format one debug line into `sink`, optionally prefixed with the source
/// location. Returns the number of bytes the sink accepted.
pub fn write_debug_line(
    sink: &mut dyn IoWrite,
    args: Arguments,
    file_line: Option<&(&'static str, u32)>,
) -> usize {
    let mut writer = WriteCounter { sink, written: 0 };
    if let Some((file, line)) = file_line {
        let _ = writer.write_fmt(format_args!("TOCK_DEBUG: {}:{}: ", file, line));
    }
    let _ = write(&mut writer, args);
    let _ = writer.write_str("\r\n");
    writer.written
}

fn with_debug_writer<F: FnOnce(&mut dyn IoWrite)>(f: F) {
    // Safety: debug output is produced from the kernel thread or from
    // interrupt handlers that the chip serializes, so there is never more
    // than one live reference to the writer.
    let writer = unsafe { (*addr_of_mut!(DEBUG_WRITER)).as_deref_mut() };
    if let Some(writer) = writer {
        f(writer);
    }
}

pub fn debug_println(args: Arguments) {
    with_debug_writer(|writer| {
        write_debug_line(writer, args, None);
    });
}

pub fn debug_verbose_println(args: Arguments, file_line: &(&'static str, u32)) {
    with_debug_writer(|writer| {
        write_debug_line(writer, args, Some(file_line));
    });
}

/// In-kernel `println()` debugging.
#[macro_export]
macro_rules! debug {
    () => ({
        // Allow an empty debug!() to print the location when hit
        $crate::debug!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::debug_println(format_args!($msg));
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::debug_println(format_args!($fmt, $($arg)+));
    });
}

/// In-kernel `println()` debugging that includes the calling file and line.
#[macro_export]
macro_rules! debug_verbose {
    () => ({
        // Allow an empty debug_verbose!() to print the location when hit
        $crate::debug_verbose!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::debug_verbose_println(format_args!($msg), {
            static _FILE_LINE: (&'static str, u32) = (file!(), line!());
            &_FILE_LINE
        })
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::debug_verbose_println(format_args!($fmt, $($arg)+), {
            static _FILE_LINE: (&'static str, u32) = (file!(), line!());
            &_FILE_LINE
        })
    });
}
