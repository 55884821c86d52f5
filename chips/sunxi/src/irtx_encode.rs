// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Transmit FIFO encoding for the CIR TX block.
//!
//! Every FIFO byte is one run: bit 7 is the output level and bits 0..6 the
//! run length in units of three carrier-referenced cycles over 32. A caller
//! entry longer than 127 units is split into several full-length bytes of
//! the same level followed by the remainder.
//!
//! A frame is laid out as two header entries, the payload and two trailer
//! entries. The encoder normalizes levels at the frame boundaries: the lead
//! pulse and the stop pulse are always high, payload entries alternate
//! starting high, and a zero-length low byte closes the frame so the line
//! is not left high.

use kernel::hil::ir::{IrError, TxEntry, TX_DURATION_MASK};

/// Three output cycles expressed in reference units. One cycle is not an
/// integer number of units, three are.
pub const THREE_PULSE_CYCLE: u32 = 32;
/// Depth of the hardware transmit FIFO, in bytes.
pub const TX_FIFO_SIZE: usize = 128;
/// Size of the staging buffer, and the maximum number of entries per frame.
pub const TX_RAW_BUF_SIZE: usize = 256;
/// Two header entries and two trailer entries. The payload may be empty.
pub const MIN_FRAME_ENTRIES: usize = 4;
/// Transmit module reference clock.
pub const TX_REFERENCE_CLOCK_HZ: u32 = 12_000_000;
pub const MIN_CARRIER_HZ: u32 = 15_000;
pub const MAX_CARRIER_HZ: u32 = 6_000_000;

const MAX_RUN_UNITS: u32 = 0x7F;
const LEVEL_BIT: u8 = 1 << 7;

/// Length of an entry in FIFO run units.
pub const fn run_length_units(duration: u32) -> u32 {
    (duration & TX_DURATION_MASK) * 3 / THREE_PULSE_CYCLE
}

/// The FIFO bytes encoding one entry, in order.
#[derive(Clone, Debug)]
pub struct RunLength {
    level: u8,
    remaining: u32,
    done: bool,
}

impl RunLength {
    pub fn new(entry: TxEntry) -> RunLength {
        RunLength {
            level: if entry.level { LEVEL_BIT } else { 0 },
            remaining: run_length_units(entry.duration),
            done: false,
        }
    }
}

impl Iterator for RunLength {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        if self.remaining > MAX_RUN_UNITS {
            self.remaining -= MAX_RUN_UNITS;
            Some(self.level | MAX_RUN_UNITS as u8)
        } else {
            self.done = true;
            Some(self.level | self.remaining as u8)
        }
    }
}

/// Staging buffer for one encoded frame.
pub struct TxRawBuffer {
    buf: [u8; TX_RAW_BUF_SIZE],
    len: usize,
}

impl TxRawBuffer {
    pub const fn new() -> TxRawBuffer {
        TxRawBuffer {
            buf: [0; TX_RAW_BUF_SIZE],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buf = [0; TX_RAW_BUF_SIZE];
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn push(&mut self, byte: u8) -> Result<(), IrError> {
        let slot = self.buf.get_mut(self.len).ok_or(IrError::TooLarge)?;
        *slot = byte;
        self.len += 1;
        Ok(())
    }

    /// Append the run-length bytes of one entry.
    pub fn run_length_encode(&mut self, entry: TxEntry) -> Result<(), IrError> {
        RunLength::new(entry).try_for_each(|byte| self.push(byte))
    }

    /// Encode a whole frame, replacing the current contents. Returns the
    /// number of bytes to load into the FIFO.
    ///
    /// On error the buffer is left empty.
    pub fn encode_frame(&mut self, entries: &[TxEntry]) -> Result<usize, IrError> {
        self.clear();
        let result = self.encode_entries(entries);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn encode_entries(&mut self, entries: &[TxEntry]) -> Result<usize, IrError> {
        if entries.len() > TX_RAW_BUF_SIZE {
            return Err(IrError::TooLarge);
        }
        if entries.len() < MIN_FRAME_ENTRIES {
            return Err(IrError::InvalidFrame);
        }

        let (header, rest) = entries.split_at(2);
        let (payload, trailer) = rest.split_at(rest.len() - 2);

        self.run_length_encode(TxEntry::high(header[0].duration))?;
        self.run_length_encode(header[1])?;

        let mut mark = false;
        for entry in payload {
            mark = !mark;
            self.run_length_encode(TxEntry::new(entry.level | mark, entry.duration))?;
        }

        self.run_length_encode(trailer[0])?;
        self.run_length_encode(TxEntry::high(trailer[1].duration))?;
        self.push(0x00)?;

        if self.len > TX_FIFO_SIZE {
            return Err(IrError::TooLarge);
        }
        Ok(self.len)
    }
}

impl Default for TxRawBuffer {
    fn default() -> Self {
        TxRawBuffer::new()
    }
}

/// Carrier duty cycle, as the hardware DRMC selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DutyCycle {
    Half = 0,
    Third = 1,
    Quarter = 2,
}

impl DutyCycle {
    /// Quantize a percentage onto the three supported ratios.
    pub fn from_percent(percent: u32) -> Result<DutyCycle, IrError> {
        match percent {
            0..=29 => Ok(DutyCycle::Quarter),
            30..=39 => Ok(DutyCycle::Third),
            40..=100 => Ok(DutyCycle::Half),
            _ => Err(IrError::InvalidDutyCycle),
        }
    }

    pub fn from_selector(selector: u32) -> Option<DutyCycle> {
        match selector {
            0 => Some(DutyCycle::Half),
            1 => Some(DutyCycle::Third),
            2 => Some(DutyCycle::Quarter),
            _ => None,
        }
    }

    pub const fn selector(self) -> u32 {
        self as u32
    }

    /// Carrier period in reference clocks per divider step.
    pub const fn denominator(self) -> u32 {
        2 + self as u32
    }
}

/// Value of the modulation frequency divider for `frequency_hz`, rounded to
/// the nearest step.
pub fn carrier_divider(
    reference_hz: u32,
    duty: DutyCycle,
    frequency_hz: u32,
) -> Result<u8, IrError> {
    if !(MIN_CARRIER_HZ..=MAX_CARRIER_HZ).contains(&frequency_hz) {
        return Err(IrError::InvalidCarrierFrequency);
    }
    let step = duty.denominator() as u64 * frequency_hz as u64;
    let divider = (reference_hz as u64 + step / 2) / step;
    Ok((divider.saturating_sub(1) & 0xFF) as u8)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    fn nec_like_frame() -> [TxEntry; 7] {
        [
            TxEntry::high(9000),
            TxEntry::low(4500),
            TxEntry::high(560),
            TxEntry::low(560),
            TxEntry::high(560),
            TxEntry::low(1690),
            TxEntry::high(560),
        ]
    }

    #[test]
    fn encodes_minimal_nec_frame() {
        let mut raw = TxRawBuffer::new();
        assert_eq!(raw.encode_frame(&nec_like_frame()), Ok(18));
        assert_eq!(
            raw.as_slice(),
            [
                0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xD1, // 9000 high
                0x7F, 0x7F, 0x7F, 0x28, // 4500 low
                0xB4, 0x34, 0xB4, // payload
                0x7F, 0x1F, // 1690 low
                0xB4, // stop
                0x00,
            ]
        );
    }

    #[test]
    fn boundary_levels_are_forced() {
        let frame = [
            TxEntry::low(320),
            TxEntry::low(320),
            TxEntry::low(320),
            TxEntry::low(320),
            TxEntry::low(320),
            TxEntry::high(320),
            TxEntry::low(320),
        ];
        let mut raw = TxRawBuffer::new();
        assert_eq!(raw.encode_frame(&frame), Ok(8));
        // 320 cycles are 30 units.
        assert_eq!(
            raw.as_slice(),
            [0x9E, 0x1E, 0x9E, 0x1E, 0x9E, 0x9E, 0x9E, 0x00]
        );
    }

    #[test]
    fn splits_long_runs() {
        for units in [128u32, 254, 255, 1000, 12_345] {
            let duration = units * THREE_PULSE_CYCLE / 3 + 1;
            assert_eq!(run_length_units(duration), units);
            for level in [false, true] {
                let bytes: Vec<u8> = RunLength::new(TxEntry::new(level, duration)).collect();
                assert_eq!(bytes.len() as u32, units.div_ceil(127));
                assert!(bytes.iter().all(|b| (b & 0x80 != 0) == level));
                let sum: u32 = bytes.iter().map(|b| (b & 0x7F) as u32).sum();
                assert_eq!(sum, units);
            }
        }
    }

    #[test]
    fn run_length_reconstructs_duration() {
        let mut duration = 1;
        while duration <= 10_000_000 {
            let units: u32 = RunLength::new(TxEntry::low(duration))
                .map(|b| (b & 0x7F) as u32)
                .sum();
            let decoded = units * THREE_PULSE_CYCLE / 3;
            assert!(decoded <= duration);
            assert!(duration - decoded <= THREE_PULSE_CYCLE / 3 + 1);
            duration += 9_973;
        }
    }

    #[test]
    fn short_frames_are_rejected() {
        let mut raw = TxRawBuffer::new();
        assert_eq!(
            raw.encode_frame(&nec_like_frame()[..3]),
            Err(IrError::InvalidFrame)
        );
        assert!(raw.is_empty());
        assert_eq!(raw.encode_frame(&nec_like_frame()[..4]), Ok(14));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut raw = TxRawBuffer::new();
        let too_many = [TxEntry::high(10); TX_RAW_BUF_SIZE + 1];
        assert_eq!(raw.encode_frame(&too_many), Err(IrError::TooLarge));

        // Fits the staging buffer but not the FIFO.
        let wide = [TxEntry::high(10); 200];
        assert_eq!(raw.encode_frame(&wide), Err(IrError::TooLarge));
        assert!(raw.is_empty());

        // Overflows the staging buffer while encoding.
        let long = [TxEntry::high(TX_DURATION_MASK); 4];
        assert_eq!(raw.encode_frame(&long), Err(IrError::TooLarge));
        assert_eq!(raw.len(), 0);
    }

    #[test]
    fn duty_cycle_buckets() {
        assert_eq!(DutyCycle::from_percent(0), Ok(DutyCycle::Quarter));
        assert_eq!(DutyCycle::from_percent(29), Ok(DutyCycle::Quarter));
        assert_eq!(DutyCycle::from_percent(30), Ok(DutyCycle::Third));
        assert_eq!(DutyCycle::from_percent(39), Ok(DutyCycle::Third));
        assert_eq!(DutyCycle::from_percent(40), Ok(DutyCycle::Half));
        assert_eq!(DutyCycle::from_percent(100), Ok(DutyCycle::Half));
        assert_eq!(DutyCycle::from_percent(101), Err(IrError::InvalidDutyCycle));
        assert_eq!(DutyCycle::from_selector(2), Some(DutyCycle::Quarter));
        assert_eq!(DutyCycle::from_selector(3), None);
    }

    #[test]
    fn carrier_divider_values() {
        let clk = TX_REFERENCE_CLOCK_HZ;
        assert_eq!(carrier_divider(clk, DutyCycle::Half, 38_000), Ok(157));
        assert_eq!(carrier_divider(clk, DutyCycle::Third, 38_000), Ok(104));
        assert_eq!(carrier_divider(clk, DutyCycle::Quarter, 38_000), Ok(78));
        // 399 does not fit the 8-bit divider.
        assert_eq!(carrier_divider(clk, DutyCycle::Half, 15_000), Ok(143));
        assert_eq!(carrier_divider(clk, DutyCycle::Quarter, 6_000_000), Ok(0));
        assert_eq!(
            carrier_divider(clk, DutyCycle::Half, 14_999),
            Err(IrError::InvalidCarrierFrequency)
        );
        assert_eq!(
            carrier_divider(clk, DutyCycle::Half, 6_000_001),
            Err(IrError::InvalidCarrierFrequency)
        );
    }
}
