// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interfaces for consumer infrared receivers and transmitters.
//!
//! A receiver demodulates the carrier in hardware and reports the resulting
//! waveform as a stream of [`RawIrEvent`]s: alternating pulses (carrier
//! present) and spaces (carrier absent) with their durations. Protocol
//! decoding (NEC, RC5) happens above the HIL, in a [`RawClient`].
//!
//! A transmitter takes one framed packet as a sequence of [`TxEntry`]
//! levels and durations and emits it modulated on the configured carrier.
//!
//! ```text
//!  Receiver ──raw_event()──> RawClient ──scancode()──> ScancodeClient
//!           ──decode()────>
//!
//!  caller ──transmit(&[TxEntry])──> Transmitter
//! ```

use core::fmt;

use crate::ErrorCode;

/// One demodulated run of the received waveform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawIrEvent {
    /// `true` for a pulse (carrier present), `false` for a space.
    pub pulse: bool,
    pub duration_ns: u32,
}

impl RawIrEvent {
    pub const fn pulse(duration_ns: u32) -> RawIrEvent {
        RawIrEvent {
            pulse: true,
            duration_ns,
        }
    }

    pub const fn space(duration_ns: u32) -> RawIrEvent {
        RawIrEvent {
            pulse: false,
            duration_ns,
        }
    }
}

impl fmt::Display for RawIrEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.pulse { "pulse" } else { "space" };
        write!(f, "{} {} ns", kind, self.duration_ns)
    }
}

/// Mask of the duration bits in a packed transmit word.
pub const TX_DURATION_MASK: u32 = 0x00FF_FFFF;
/// Level bit in a packed transmit word.
pub const TX_LEVEL_BIT: u32 = 1 << 24;

/// One entry of a transmit frame.
///
/// `duration` counts carrier-referenced cycles; only the low 24 bits are
/// used. With the default 12 MHz transmit clock one cycle is one
/// microsecond of output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TxEntry {
    pub level: bool,
    pub duration: u32,
}

impl TxEntry {
    pub const fn new(level: bool, duration: u32) -> TxEntry {
        TxEntry {
            level,
            duration: duration & TX_DURATION_MASK,
        }
    }

    pub const fn high(duration: u32) -> TxEntry {
        TxEntry::new(true, duration)
    }

    pub const fn low(duration: u32) -> TxEntry {
        TxEntry::new(false, duration)
    }

    /// Parse the packed form: bit 24 is the level, bits 0..23 the duration.
    pub const fn from_raw(raw: u32) -> TxEntry {
        TxEntry::new(raw & TX_LEVEL_BIT != 0, raw)
    }

    pub const fn into_raw(self) -> u32 {
        let level = if self.level { TX_LEVEL_BIT } else { 0 };
        level | (self.duration & TX_DURATION_MASK)
    }
}

/// Protocol classification of a received burst.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Unknown,
    Nec,
    Rc5,
}

/// Set of protocols a decoder accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolSet {
    pub nec: bool,
    pub rc5: bool,
}

impl ProtocolSet {
    pub const NEC: ProtocolSet = ProtocolSet {
        nec: true,
        rc5: false,
    };
    pub const RC5: ProtocolSet = ProtocolSet {
        nec: false,
        rc5: true,
    };
    pub const RC5_AND_NEC: ProtocolSet = ProtocolSet {
        nec: true,
        rc5: true,
    };

    pub fn contains(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Nec => self.nec,
            Protocol::Rc5 => self.rc5,
            Protocol::Unknown => false,
        }
    }
}

/// Errors returned by infrared operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrError {
    /// The frame does not fit the raw buffer or the hardware FIFO.
    TooLarge,
    /// The frame is too short to carry a header, payload and trailer.
    InvalidFrame,
    /// The hardware did not reach the expected state within the spin limit.
    HardwareTimeout,
    /// A transmission is already in progress on this transmitter.
    Busy,
    /// Carrier frequency outside 15 kHz ..= 6 MHz.
    InvalidCarrierFrequency,
    /// Duty cycle above 100 percent.
    InvalidDutyCycle,
}

impl From<IrError> for ErrorCode {
    fn from(err: IrError) -> ErrorCode {
        match err {
            IrError::TooLarge => ErrorCode::SIZE,
            IrError::InvalidFrame => ErrorCode::INVAL,
            IrError::HardwareTimeout => ErrorCode::BUSY,
            IrError::Busy => ErrorCode::BUSY,
            IrError::InvalidCarrierFrequency => ErrorCode::INVAL,
            IrError::InvalidDutyCycle => ErrorCode::INVAL,
        }
    }
}

/// Consumer of raw receive events.
pub trait RawClient {
    /// A run has been finalized. Called in interrupt order.
    fn raw_event(&self, event: RawIrEvent);

    /// The burst ended; decode everything queued so far.
    fn decode(&self);
}

/// Consumer of decoded scancodes.
pub trait ScancodeClient {
    /// A frame was decoded. `toggle` is the RC5 toggle bit, and is always
    /// `false` for NEC.
    fn scancode(&self, protocol: Protocol, scancode: u32, toggle: bool);

    /// An NEC repeat code was received for the last scancode.
    fn repeat(&self, _protocol: Protocol) {}
}

/// Infrared receiver.
pub trait Receiver<'a> {
    fn set_raw_client(&self, client: &'a dyn RawClient);

    /// Enable the receiver and its interrupts.
    fn enable(&self) -> Result<(), ErrorCode>;

    /// Disable the receiver. Any partially received burst is dropped.
    fn disable(&self) -> Result<(), ErrorCode>;
}

/// Infrared transmitter.
pub trait Transmitter {
    /// Transmit one frame: two header entries, at least one payload entry
    /// and two trailer entries.
    ///
    /// Returns the number of entries sent once the hardware has gone idle.
    fn transmit(&self, entries: &[TxEntry]) -> Result<usize, IrError>;

    /// Set the carrier frequency in Hz.
    fn set_carrier(&self, frequency_hz: u32) -> Result<(), IrError>;

    /// Set the carrier duty cycle in percent. The hardware only supports
    /// 25, 33 and 50 percent; other values are quantized.
    fn set_duty_cycle(&self, percent: u32) -> Result<(), IrError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::queue::Queue;
    use crate::collections::ring_buffer::RingBuffer;
    use crate::debug::write_debug_line;

    #[test]
    fn raw_event_trace_line() {
        let mut backing = [0u8; 64];
        let mut ring = RingBuffer::new(&mut backing);
        let event = RawIrEvent::space(1_687_500);
        write_debug_line(&mut ring, format_args!("irrx: {}", event), None);

        let mut out = [0u8; 64];
        let mut n = 0;
        while let Some(b) = ring.dequeue() {
            out[n] = b;
            n += 1;
        }
        assert_eq!(&out[..n], b"irrx: space 1687500 ns\r\n");
    }

    #[test]
    fn packed_tx_entry() {
        let entry = TxEntry::from_raw(0x0100_2328);
        assert!(entry.level);
        assert_eq!(entry.duration, 9000);
        assert_eq!(entry.into_raw(), 0x0100_2328);

        let low = TxEntry::from_raw(0x0000_1194);
        assert!(!low.level);
        assert_eq!(low.duration, 4500);

        // Bits above the level bit are ignored.
        assert_eq!(TxEntry::from_raw(0xFE00_0010), TxEntry::low(0x10));
        assert_eq!(TxEntry::high(0x0FFF_FFFF).duration, TX_DURATION_MASK);
    }

    #[test]
    fn protocol_sets() {
        assert!(ProtocolSet::NEC.contains(Protocol::Nec));
        assert!(!ProtocolSet::NEC.contains(Protocol::Rc5));
        assert!(ProtocolSet::RC5_AND_NEC.contains(Protocol::Rc5));
        assert!(!ProtocolSet::RC5_AND_NEC.contains(Protocol::Unknown));
    }

    #[test]
    fn error_codes() {
        assert_eq!(ErrorCode::from(IrError::TooLarge), ErrorCode::SIZE);
        assert_eq!(ErrorCode::from(IrError::HardwareTimeout), ErrorCode::BUSY);
        assert_eq!(ErrorCode::from(IrError::Busy), ErrorCode::BUSY);
        assert_eq!(ErrorCode::from(IrError::InvalidDutyCycle), ErrorCode::INVAL);
    }
}
