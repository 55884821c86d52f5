// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Philips RC5 decoder.
//!
//! RC5 is Manchester coded with an 889 us half-bit. A one is a space
//! followed by a pulse, a zero a pulse followed by a space, so adjacent
//! half-bits of the same level merge into runs of two units. A frame is
//! 14 bits, MSB first: two start bits (the second one, inverted, extends
//! the command to 7 bits), the toggle bit, a 5-bit system address and a
//! 6-bit command.
//!
//! The leading space of the first start bit is indistinguishable from idle,
//! so decoding starts on the first pulse.

use kernel::hil::ir::RawIrEvent;

use super::{eq_margin, geq_margin, DecodeEvent};

pub const RC5_UNIT_NS: u32 = 889_000;
const NBITS: u8 = 14;
const TRAILER: u32 = 6 * RC5_UNIT_NS;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Inactive,
    /// Expecting the first half of a bit.
    BitStart,
    /// Expecting the second half of a bit.
    BitEnd,
    /// A frame was reported; wait for the inter-frame gap.
    Finished,
}

/// Scancode and toggle bit for the 13 bits after the first start bit.
fn rc5_scancode(bits: u32) -> DecodeEvent {
    let mut command = bits & 0x3F;
    let system = (bits & 0x7C0) >> 6;
    let toggle = bits & 0x800 != 0;
    if bits & 0x1000 == 0 {
        command += 0x40;
    }
    DecodeEvent::Scancode {
        scancode: (system << 8) | command,
        toggle,
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Rc5Decoder {
    state: State,
    count: u8,
    bits: u32,
}

impl Rc5Decoder {
    pub const fn new() -> Rc5Decoder {
        Rc5Decoder {
            state: State::Inactive,
            count: 0,
            bits: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Rc5Decoder::new();
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Inactive
    }

    pub fn feed(&mut self, event: RawIrEvent) -> Option<DecodeEvent> {
        let mut duration = event.duration_ns;

        if !geq_margin(duration, RC5_UNIT_NS, RC5_UNIT_NS / 2) {
            self.reset();
            return None;
        }

        // One event covers one or two half-bits; consume a unit at a time.
        while geq_margin(duration, RC5_UNIT_NS, RC5_UNIT_NS / 2) {
            match self.state {
                State::Inactive => {
                    if !event.pulse {
                        return None;
                    }
                    self.state = State::BitStart;
                    self.count = 1;
                    self.bits = 0;
                    duration -= RC5_UNIT_NS.min(duration);
                }
                State::BitStart => {
                    if !eq_margin(duration, RC5_UNIT_NS, RC5_UNIT_NS / 2) {
                        self.reset();
                        return None;
                    }
                    self.bits <<= 1;
                    if !event.pulse {
                        self.bits |= 1;
                    }
                    self.count += 1;
                    if self.count == NBITS {
                        self.state = State::Finished;
                        return Some(rc5_scancode(self.bits));
                    }
                    self.state = State::BitEnd;
                    return None;
                }
                State::BitEnd => {
                    self.state = State::BitStart;
                    duration -= RC5_UNIT_NS.min(duration);
                }
                State::Finished => {
                    if !event.pulse && geq_margin(duration, TRAILER, RC5_UNIT_NS / 2) {
                        self.reset();
                    }
                    return None;
                }
            }
        }
        None
    }
}

impl Default for Rc5Decoder {
    fn default() -> Self {
        Rc5Decoder::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    /// Manchester-code a 14-bit RC5 word into demodulated runs, dropping
    /// the leading space of the first start bit.
    fn frame(word: u16) -> Vec<RawIrEvent> {
        let mut halves = Vec::new();
        for i in (0..14).rev() {
            let one = word & (1 << i) != 0;
            halves.push(!one);
            halves.push(one);
        }
        halves.remove(0);

        let mut events: Vec<RawIrEvent> = Vec::new();
        for pulse in halves {
            let len = events.len();
            if len > 0 && events[len - 1].pulse == pulse {
                events[len - 1].duration_ns += RC5_UNIT_NS;
            } else {
                events.push(RawIrEvent {
                    pulse,
                    duration_ns: RC5_UNIT_NS,
                });
            }
        }
        events
    }

    fn word(start2: bool, toggle: bool, system: u16, command: u16) -> u16 {
        (1 << 13) | ((start2 as u16) << 12) | ((toggle as u16) << 11) | (system << 6) | command
    }

    fn run(decoder: &mut Rc5Decoder, events: &[RawIrEvent]) -> Vec<DecodeEvent> {
        events.iter().filter_map(|&e| decoder.feed(e)).collect()
    }

    #[test]
    fn decodes_frame() {
        let mut decoder = Rc5Decoder::new();
        let out = run(&mut decoder, &frame(word(true, false, 0x05, 0x35)));
        assert_eq!(
            out,
            [DecodeEvent::Scancode {
                scancode: 0x0535,
                toggle: false
            }]
        );
    }

    #[test]
    fn toggle_and_extended_command() {
        let mut decoder = Rc5Decoder::new();
        let out = run(&mut decoder, &frame(word(false, true, 0x1F, 0x00)));
        assert_eq!(
            out,
            [DecodeEvent::Scancode {
                scancode: 0x1F40,
                toggle: true
            }]
        );
    }

    #[test]
    fn all_zero_and_all_one_fields() {
        for (system, command) in [(0x00, 0x00), (0x1F, 0x3F), (0x0A, 0x15)] {
            let mut decoder = Rc5Decoder::new();
            let out = run(&mut decoder, &frame(word(true, true, system, command)));
            assert_eq!(
                out,
                [DecodeEvent::Scancode {
                    scancode: ((system as u32) << 8) | command as u32,
                    toggle: true
                }]
            );
        }
    }

    #[test]
    fn waits_for_gap_between_frames() {
        let mut decoder = Rc5Decoder::new();
        let first = frame(word(true, false, 0x05, 0x35));
        assert_eq!(run(&mut decoder, &first).len(), 1);

        // Anything before the gap is ignored.
        assert_eq!(decoder.feed(RawIrEvent::pulse(RC5_UNIT_NS)), None);
        assert!(!decoder.is_idle());
        decoder.feed(RawIrEvent::space(100 * RC5_UNIT_NS));
        assert!(decoder.is_idle());
        assert_eq!(run(&mut decoder, &first).len(), 1);
    }

    #[test]
    fn short_run_resets() {
        let mut decoder = Rc5Decoder::new();
        decoder.feed(RawIrEvent::pulse(RC5_UNIT_NS));
        assert!(!decoder.is_idle());
        decoder.feed(RawIrEvent::space(RC5_UNIT_NS / 3));
        assert!(decoder.is_idle());
    }
}
