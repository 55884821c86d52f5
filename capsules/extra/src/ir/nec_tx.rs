// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Send NEC frames through an IR transmitter.
//!
//! Durations are in transmit cycles, which are microseconds with the
//! default transmit clock. The 67-entry frame is laid out as the
//! transmitter expects: the header pulse and space, 63 alternating bit
//! entries, then the last bit space and the stop pulse as the trailer.

use kernel::hil::ir::{IrError, Transmitter, TxEntry};

pub const NEC_CARRIER_HZ: u32 = 38_000;
pub const NEC_DUTY_PERCENT: u32 = 33;
pub const NEC_FRAME_ENTRIES: usize = 2 + 2 * 32 + 1;

const HEADER_PULSE_US: u32 = 9000;
const HEADER_SPACE_US: u32 = 4500;
const BIT_PULSE_US: u32 = 560;
const BIT_0_SPACE_US: u32 = 560;
const BIT_1_SPACE_US: u32 = 1690;

/// Build the frame for a raw 32-bit NEC word, sent LSB first.
pub fn nec_frame(bits: u32) -> [TxEntry; NEC_FRAME_ENTRIES] {
    let mut frame = [TxEntry::low(0); NEC_FRAME_ENTRIES];
    frame[0] = TxEntry::high(HEADER_PULSE_US);
    frame[1] = TxEntry::low(HEADER_SPACE_US);
    for bit in 0..32 {
        let space = if bits & (1 << bit) != 0 {
            BIT_1_SPACE_US
        } else {
            BIT_0_SPACE_US
        };
        frame[2 + 2 * bit] = TxEntry::high(BIT_PULSE_US);
        frame[3 + 2 * bit] = TxEntry::low(space);
    }
    frame[NEC_FRAME_ENTRIES - 1] = TxEntry::high(BIT_PULSE_US);
    frame
}

pub struct NecTransmitter<'a, T: Transmitter> {
    tx: &'a T,
}

impl<'a, T: Transmitter> NecTransmitter<'a, T> {
    pub fn new(tx: &'a T) -> NecTransmitter<'a, T> {
        NecTransmitter { tx }
    }

    /// Set the transmitter up for NEC: 38 kHz carrier at a third duty.
    pub fn configure(&self) -> Result<(), IrError> {
        self.tx.set_duty_cycle(NEC_DUTY_PERCENT)?;
        self.tx.set_carrier(NEC_CARRIER_HZ)
    }

    /// Standard NEC: 8-bit address and command, each followed by its
    /// inverse.
    pub fn send(&self, address: u8, command: u8) -> Result<(), IrError> {
        let address = address as u32;
        let command = command as u32;
        self.send_raw(address | ((!address & 0xFF) << 8) | (command << 16) | ((!command & 0xFF) << 24))
    }

    /// Extended NEC with a 16-bit address.
    pub fn send_extended(&self, address: u16, command: u8) -> Result<(), IrError> {
        let command = command as u32;
        self.send_raw(address as u32 | (command << 16) | ((!command & 0xFF) << 24))
    }

    pub fn send_raw(&self, bits: u32) -> Result<(), IrError> {
        self.tx.transmit(&nec_frame(bits)).map(|_| ())
    }
}
