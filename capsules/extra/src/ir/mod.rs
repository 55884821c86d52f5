// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Consumer infrared protocol support on top of `hil::ir`.
//!
//! - [`raw_decoder::IrRawDecoder`] queues raw events from a receiver and
//!   runs them through the protocol decoders when a burst ends.
//! - [`nec::NecDecoder`] and [`rc5::Rc5Decoder`] are the per-protocol
//!   state machines.
//! - [`nec_tx::NecTransmitter`] builds NEC frames for a transmitter.
//!
//! Usage
//! -----
//!
//! The event buffer keeps one slot free, so 128 entries queue up to 127
//! events: a full 67-event NEC frame plus repeat codes.
//!
//! ```rust,ignore
//! let events = static_init!([RawIrEvent; 128], [RawIrEvent::default(); 128]);
//! let decoder = static_init!(IrRawDecoder<'static>, IrRawDecoder::new(events));
//! decoder.set_client(remote_keys);
//! irrx.set_raw_client(decoder);
//! irrx.enable()?;
//! ```

pub mod nec;
pub mod nec_tx;
pub mod raw_decoder;
pub mod rc5;

/// Output of a protocol decoder for one raw event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeEvent {
    Scancode { scancode: u32, toggle: bool },
    Repeat,
}

/// `duration` is within `margin` of `target`, bounds excluded.
pub(crate) fn eq_margin(duration: u32, target: u32, margin: u32) -> bool {
    duration > target.saturating_sub(margin) && duration < target.saturating_add(margin)
}

/// `duration` is longer than `target - margin`.
pub(crate) fn geq_margin(duration: u32, target: u32, margin: u32) -> bool {
    duration > target.saturating_sub(margin)
}
