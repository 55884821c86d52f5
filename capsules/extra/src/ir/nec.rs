// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! NEC protocol decoder.
//!
//! ```text
//!  9 ms pulse, 4.5 ms space, 32 x (562.5 us pulse, 562.5 us or 1.6875 ms space),
//!  562.5 us trailer pulse
//! ```
//!
//! Bits are sent LSB first: address, inverted address (or the high address
//! byte for extended NEC), command, inverted command. A repeat code is a
//! 9 ms pulse, a 2.25 ms space and a trailer pulse.
//!
//! The frame is reported when the trailer pulse arrives. The receiver ends
//! the burst on the idle gap that follows it, so the trailing space is never
//! seen.

use kernel::hil::ir::RawIrEvent;

use super::{eq_margin, DecodeEvent};

pub const NEC_UNIT_NS: u32 = 562_500;
const HEADER_PULSE: u32 = 16 * NEC_UNIT_NS;
const HEADER_SPACE: u32 = 8 * NEC_UNIT_NS;
const REPEAT_SPACE: u32 = 4 * NEC_UNIT_NS;
const BIT_PULSE: u32 = NEC_UNIT_NS;
const BIT_0_SPACE: u32 = NEC_UNIT_NS;
const BIT_1_SPACE: u32 = 3 * NEC_UNIT_NS;
const TRAILER_PULSE: u32 = NEC_UNIT_NS;
const NBITS: u8 = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Inactive,
    HeaderSpace,
    BitPulse,
    BitSpace,
    TrailerPulse { repeat: bool },
}

/// Scancode for a received 32-bit frame, or `None` if the command check
/// byte is wrong.
///
/// Standard NEC packs `address << 8 | command`. If the address check byte is
/// not the inverse of the address the frame is extended NEC and the scancode
/// is `address << 16 | address_high << 8 | command`.
pub fn nec_scancode(bits: u32) -> Option<u32> {
    let address = bits & 0xFF;
    let not_address = (bits >> 8) & 0xFF;
    let command = (bits >> 16) & 0xFF;
    let not_command = (bits >> 24) & 0xFF;

    if command ^ not_command != 0xFF {
        return None;
    }
    if address ^ not_address != 0xFF {
        Some((address << 16) | (not_address << 8) | command)
    } else {
        Some((address << 8) | command)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct NecDecoder {
    state: State,
    count: u8,
    bits: u32,
}

impl NecDecoder {
    pub const fn new() -> NecDecoder {
        NecDecoder {
            state: State::Inactive,
            count: 0,
            bits: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = NecDecoder::new();
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Inactive
    }

    /// Feed one raw event. An event that does not fit the frame resets the
    /// decoder.
    pub fn feed(&mut self, event: RawIrEvent) -> Option<DecodeEvent> {
        let d = event.duration_ns;
        match self.state {
            State::Inactive => {
                if event.pulse && eq_margin(d, HEADER_PULSE, 2 * NEC_UNIT_NS) {
                    self.count = 0;
                    self.bits = 0;
                    self.state = State::HeaderSpace;
                }
                None
            }
            State::HeaderSpace if !event.pulse => {
                if eq_margin(d, HEADER_SPACE, NEC_UNIT_NS) {
                    self.state = State::BitPulse;
                } else if eq_margin(d, REPEAT_SPACE, NEC_UNIT_NS / 2) {
                    self.state = State::TrailerPulse { repeat: true };
                } else {
                    self.reset();
                }
                None
            }
            State::BitPulse if event.pulse && eq_margin(d, BIT_PULSE, NEC_UNIT_NS / 2) => {
                self.state = State::BitSpace;
                None
            }
            State::BitSpace if !event.pulse => {
                if eq_margin(d, BIT_1_SPACE, NEC_UNIT_NS / 2) {
                    self.bits |= 1 << self.count;
                } else if !eq_margin(d, BIT_0_SPACE, NEC_UNIT_NS / 2) {
                    self.reset();
                    return None;
                }
                self.count += 1;
                self.state = if self.count == NBITS {
                    State::TrailerPulse { repeat: false }
                } else {
                    State::BitPulse
                };
                None
            }
            State::TrailerPulse { repeat }
                if event.pulse && eq_margin(d, TRAILER_PULSE, NEC_UNIT_NS / 2) =>
            {
                let bits = self.bits;
                self.reset();
                if repeat {
                    Some(DecodeEvent::Repeat)
                } else {
                    nec_scancode(bits).map(|scancode| DecodeEvent::Scancode {
                        scancode,
                        toggle: false,
                    })
                }
            }
            State::HeaderSpace
            | State::BitPulse
            | State::BitSpace
            | State::TrailerPulse { .. } => {
                self.reset();
                None
            }
        }
    }
}

impl Default for NecDecoder {
    fn default() -> Self {
        NecDecoder::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    /// Demodulated NEC frame for `bits`, as a receiver reports it.
    fn frame(bits: u32) -> Vec<RawIrEvent> {
        let mut events = std::vec![RawIrEvent::pulse(9_000_000), RawIrEvent::space(4_500_000)];
        for i in 0..32 {
            events.push(RawIrEvent::pulse(560_000));
            let space = if bits & (1 << i) != 0 { 1_690_000 } else { 560_000 };
            events.push(RawIrEvent::space(space));
        }
        events.push(RawIrEvent::pulse(560_000));
        events
    }

    fn run(decoder: &mut NecDecoder, events: &[RawIrEvent]) -> Vec<DecodeEvent> {
        events.iter().filter_map(|&e| decoder.feed(e)).collect()
    }

    #[test]
    fn standard_frame() {
        let mut decoder = NecDecoder::new();
        // address 0x04, command 0x08
        let out = run(&mut decoder, &frame(0xF708_FB04));
        assert_eq!(
            out,
            [DecodeEvent::Scancode {
                scancode: 0x0408,
                toggle: false
            }]
        );
        assert!(decoder.is_idle());
    }

    #[test]
    fn extended_frame() {
        let mut decoder = NecDecoder::new();
        let out = run(&mut decoder, &frame(0xEE11_3412));
        assert_eq!(
            out,
            [DecodeEvent::Scancode {
                scancode: 0x12_3411,
                toggle: false
            }]
        );
    }

    #[test]
    fn bad_command_check_is_dropped() {
        let mut decoder = NecDecoder::new();
        assert!(run(&mut decoder, &frame(0x0008_FB04)).is_empty());
        assert!(decoder.is_idle());
    }

    #[test]
    fn repeat_code() {
        let mut decoder = NecDecoder::new();
        let out = run(
            &mut decoder,
            &[
                RawIrEvent::pulse(9_000_000),
                RawIrEvent::space(2_250_000),
                RawIrEvent::pulse(560_000),
            ],
        );
        assert_eq!(out, [DecodeEvent::Repeat]);
    }

    #[test]
    fn header_margins_are_strict() {
        let mut decoder = NecDecoder::new();
        // 9 ms +/- 1.125 ms, bounds excluded.
        decoder.feed(RawIrEvent::pulse(10_125_000));
        assert!(decoder.is_idle());
        decoder.feed(RawIrEvent::pulse(7_875_000));
        assert!(decoder.is_idle());
        decoder.feed(RawIrEvent::pulse(7_875_001));
        assert!(!decoder.is_idle());
    }

    #[test]
    fn glitch_resets_mid_frame() {
        let mut decoder = NecDecoder::new();
        let mut events = frame(0xF708_FB04);
        events[10] = RawIrEvent::pulse(3_000_000);
        assert!(run(&mut decoder, &events[..11]).is_empty());
        assert!(decoder.is_idle());

        // A clean frame afterwards still decodes.
        assert_eq!(run(&mut decoder, &frame(0xF708_FB04)).len(), 1);
    }

    #[test]
    fn scancode_packing() {
        assert_eq!(nec_scancode(0xBF40_FF00), Some(0x0040));
        assert_eq!(nec_scancode(0xBF40_0000), Some(0x00_0040));
        assert_eq!(nec_scancode(0xBF41_FF00), None);
    }
}
