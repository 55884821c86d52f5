// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Consumer IR transmitter (CIR TX).
//!
//! Frames are run-length encoded into a staging buffer (see
//! [`crate::irtx_encode`]), loaded into the 128-byte FIFO and sent on the
//! internally generated carrier. Transmission is synchronous: `transmit`
//! busy-waits for the FIFO to drain and for the trailing idle gap, with
//! both waits bounded by [`IrTxParams::spin_limit`].
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let irtx = static_init!(IrTx, IrTx::new(sunxi::irtx::CIR_TX_BASE));
//! irtx.configure(IrTxParams::DEFAULT)?;
//! irtx.transmit(&frame)?;
//! ```

use core::cell::Cell;

use kernel::config;
use kernel::debug;
use kernel::hil::ir::{IrError, Transmitter, TxEntry};
use kernel::utilities::cells::MapCell;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, ReadOnly, ReadWrite, WriteOnly,
};
use kernel::utilities::StaticRef;

use crate::irtx_encode::{
    carrier_divider, DutyCycle, TxRawBuffer, TX_FIFO_SIZE, TX_REFERENCE_CLOCK_HZ,
};

register_structs! {
    pub IrTxRegisters {
        /// Global control
        (0x00 => glr: ReadWrite<u32, GLR::Register>),
        /// Modulation carrier frequency divider
        (0x04 => mcr: ReadWrite<u32, MCR::Register>),
        /// Transmit control
        (0x08 => cr: ReadWrite<u32, CR::Register>),
        /// Idle duration threshold, bits 11..8
        (0x0C => idc_h: ReadWrite<u32, IDC_H::Register>),
        /// Idle duration threshold, bits 7..0
        (0x10 => idc_l: ReadWrite<u32, IDC_L::Register>),
        /// Idle duration counter, bits 15..8
        (0x14 => icr_h: ReadOnly<u32, ICR::Register>),
        /// Idle duration counter, bits 7..0
        (0x18 => icr_l: ReadOnly<u32, ICR::Register>),
        (0x1C => _reserved0),
        /// Cyclical pulse count
        (0x20 => telr: ReadWrite<u32>),
        /// Interrupt enable
        (0x24 => intc: ReadWrite<u32, INTC::Register>),
        /// FIFO available space, 128 when empty
        (0x28 => tacr: ReadOnly<u32, TACR::Register>),
        /// Interrupt status, write one to clear
        (0x2C => star: ReadWrite<u32, STAR::Register>),
        /// FIFO trigger level
        (0x30 => tr: ReadWrite<u32, TR::Register>),
        /// DMA control
        (0x34 => dmac: ReadWrite<u32>),
        (0x38 => _reserved1),
        /// FIFO data, one run per write
        (0x80 => fifo: WriteOnly<u32, FIFO::Register>),
        (0x84 => @END),
    }
}

register_bitfields![u32,
    GLR [
        /// Transmitter enable
        TXEN OFFSET(0) NUMBITS(1) [],
        /// Reset the transmitter and flush the FIFO
        RST OFFSET(1) NUMBITS(1) [],
        /// Invert the output
        TPPI OFFSET(2) NUMBITS(1) [],
        /// Carrier duty cycle: 0 is 50%, 1 is 33%, 2 is 25%
        DRMC OFFSET(5) NUMBITS(2) [],
        /// Internal modulation select
        IMS OFFSET(7) NUMBITS(1) []
    ],
    MCR [
        RFMC OFFSET(0) NUMBITS(8) []
    ],
    CR [
        /// Cyclical mode select
        CSS OFFSET(0) NUMBITS(1) [],
        /// Reference clock divider
        TSCS OFFSET(1) NUMBITS(3) [],
        /// Start a cyclical transmission
        TS OFFSET(7) NUMBITS(1) []
    ],
    IDC_H [
        IDC OFFSET(0) NUMBITS(4) []
    ],
    IDC_L [
        IDC OFFSET(0) NUMBITS(8) []
    ],
    ICR [
        ICR OFFSET(0) NUMBITS(8) []
    ],
    INTC [
        /// Packet end
        TPEI_EN OFFSET(0) NUMBITS(1) [],
        /// FIFO under-run
        TUEI_EN OFFSET(1) NUMBITS(1) [],
        /// FIFO available
        TAI_EN OFFSET(2) NUMBITS(1) []
    ],
    TACR [
        TAC OFFSET(0) NUMBITS(8) []
    ],
    STAR [
        TPE OFFSET(0) NUMBITS(1) [],
        TUR OFFSET(1) NUMBITS(1) [],
        TAI OFFSET(2) NUMBITS(1) [],
        /// Transmitter busy
        STS OFFSET(3) NUMBITS(1) []
    ],
    TR [
        TRIGGER OFFSET(0) NUMBITS(8) []
    ],
    FIFO [
        DATA OFFSET(0) NUMBITS(8) []
    ]
];

const STAR_CLEAR_ALL: u32 = 0x0F;
const IDLE_THRESHOLD_MASK: u16 = 0x0FFF;

pub const CIR_TX_BASE: StaticRef<IrTxRegisters> =
    unsafe { StaticRef::new(0x0200_3000 as *const IrTxRegisters) };

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrTxParams {
    pub carrier_hz: u32,
    pub duty_percent: u32,
    /// Idle gap after a frame, in reference clocks. Only the low 12 bits
    /// are used.
    pub idle_threshold: u16,
    /// Repeat the FIFO contents under hardware control.
    pub cyclical: bool,
    pub invert: bool,
    /// Register polls before a busy-wait gives up. Zero makes every
    /// non-cyclical transmit time out.
    pub spin_limit: u32,
}

impl IrTxParams {
    pub const DEFAULT: IrTxParams = IrTxParams {
        carrier_hz: 38_000,
        duty_percent: 33,
        idle_threshold: 100,
        cyclical: false,
        invert: false,
        spin_limit: 1_000_000,
    };
}

impl Default for IrTxParams {
    fn default() -> Self {
        IrTxParams::DEFAULT
    }
}

pub struct IrTx {
    registers: StaticRef<IrTxRegisters>,
    params: Cell<IrTxParams>,
    raw: MapCell<TxRawBuffer>,
}

impl IrTx {
    pub const fn new(base: StaticRef<IrTxRegisters>) -> IrTx {
        IrTx {
            registers: base,
            params: Cell::new(IrTxParams::DEFAULT),
            raw: MapCell::new(TxRawBuffer::new()),
        }
    }

    pub fn params(&self) -> IrTxParams {
        self.params.get()
    }

    /// Program the block and enable the transmitter. Nothing is written if
    /// the carrier or duty cycle is out of range.
    pub fn configure(&self, params: IrTxParams) -> Result<(), IrError> {
        let duty = DutyCycle::from_percent(params.duty_percent)?;
        let divider = carrier_divider(TX_REFERENCE_CLOCK_HZ, duty, params.carrier_hz)?;
        let params = IrTxParams {
            idle_threshold: params.idle_threshold & IDLE_THRESHOLD_MASK,
            ..params
        };
        self.params.set(params);

        let regs = &*self.registers;
        regs.glr.set(0);
        regs.mcr.write(MCR::RFMC.val(divider as u32));
        regs.cr.write(CR::CSS.val(params.cyclical as u32));
        regs.idc_h
            .write(IDC_H::IDC.val((params.idle_threshold >> 8) as u32));
        regs.idc_l
            .write(IDC_L::IDC.val((params.idle_threshold & 0xFF) as u32));
        regs.star.set(STAR_CLEAR_ALL);
        if params.cyclical {
            regs.intc.write(INTC::TPEI_EN::SET);
        } else {
            regs.intc.write(INTC::TUEI_EN::SET);
        }
        regs.glr.write(
            GLR::TXEN::SET
                + GLR::TPPI.val(params.invert as u32)
                + GLR::DRMC.val(duty.selector())
                + GLR::IMS::SET,
        );
        Ok(())
    }

    fn spin_until<F: Fn() -> bool>(&self, done: F) -> Result<(), IrError> {
        for _ in 0..self.params.get().spin_limit {
            if done() {
                return Ok(());
            }
        }
        Err(IrError::HardwareTimeout)
    }

    fn idle_count(&self) -> u32 {
        let regs = &*self.registers;
        (regs.icr_h.read(ICR::ICR) << 8) | regs.icr_l.read(ICR::ICR)
    }

    /// Load an encoded frame into the FIFO and wait for it to go out.
    fn send(&self, bytes: &[u8]) -> Result<(), IrError> {
        let regs = &*self.registers;

        regs.glr.modify(GLR::RST::SET);
        let idle_threshold = (regs.idc_h.read(IDC_H::IDC) << 8) | regs.idc_l.read(IDC_L::IDC);
        regs.tr
            .write(TR::TRIGGER.val(bytes.len().saturating_sub(1) as u32));
        for &byte in bytes {
            regs.fifo.write(FIFO::DATA.val(byte as u32));
        }

        if config::CONFIG.trace_ir_tx {
            debug!("irtx: fifo {:02x?}", bytes);
            debug!(
                "irtx: {} bytes queued, {} free",
                bytes.len(),
                regs.tacr.read(TACR::TAC)
            );
        }

        if self.params.get().cyclical {
            regs.cr.modify(CR::TS::SET);
            return Ok(());
        }

        self.spin_until(|| regs.tacr.read(TACR::TAC) == TX_FIFO_SIZE as u32)?;
        self.spin_until(|| self.idle_count() >= idle_threshold)
    }

    pub fn handle_interrupt(&self) {
        let status = self.registers.star.extract();
        self.registers.star.set(status.get());
        if config::CONFIG.trace_ir_tx {
            debug!(
                "irtx: status {:#x}{}",
                status.get(),
                if status.is_set(STAR::TUR) {
                    " (under-run)"
                } else {
                    ""
                }
            );
        }
    }
}

impl Transmitter for IrTx {
    fn transmit(&self, entries: &[TxEntry]) -> Result<usize, IrError> {
        // The staging buffer is only unavailable while a transmit is running.
        self.raw
            .map(|raw| {
                raw.encode_frame(entries)?;
                self.send(raw.as_slice())
            })
            .unwrap_or(Err(IrError::Busy))?;
        Ok(entries.len())
    }

    fn set_carrier(&self, frequency_hz: u32) -> Result<(), IrError> {
        let regs = &*self.registers;
        let duty =
            DutyCycle::from_selector(regs.glr.read(GLR::DRMC)).ok_or(IrError::InvalidDutyCycle)?;
        let divider = carrier_divider(TX_REFERENCE_CLOCK_HZ, duty, frequency_hz)?;
        regs.mcr.write(MCR::RFMC.val(divider as u32));

        let mut params = self.params.get();
        params.carrier_hz = frequency_hz;
        self.params.set(params);
        Ok(())
    }

    fn set_duty_cycle(&self, percent: u32) -> Result<(), IrError> {
        let duty = DutyCycle::from_percent(percent)?;
        // The carrier divider depends on the duty cycle; callers follow up
        // with `set_carrier`.
        self.registers.glr.modify(GLR::DRMC.val(duty.selector()));

        let mut params = self.params.get();
        params.duty_percent = percent;
        self.params.set(params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::test_regs::FakeRegs;
    use std::boxed::Box;

    const GLR_OFF: usize = 0x00;
    const MCR_OFF: usize = 0x04;
    const CR_OFF: usize = 0x08;
    const IDC_H_OFF: usize = 0x0C;
    const IDC_L_OFF: usize = 0x10;
    const ICR_L_OFF: usize = 0x18;
    const INTC_OFF: usize = 0x24;
    const TACR_OFF: usize = 0x28;
    const TR_OFF: usize = 0x30;
    const FIFO_OFF: usize = 0x80;

    fn setup(params: IrTxParams) -> (FakeRegs, &'static IrTx) {
        let regs = FakeRegs::new(0x84);
        let tx: &'static IrTx = Box::leak(Box::new(IrTx::new(regs.static_ref())));
        tx.configure(params).unwrap();
        (regs, tx)
    }

    fn quick() -> IrTxParams {
        IrTxParams {
            spin_limit: 16,
            ..IrTxParams::DEFAULT
        }
    }

    fn frame() -> [TxEntry; 7] {
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
    fn default_programming() {
        let (regs, _tx) = setup(IrTxParams::DEFAULT);
        assert_eq!(regs.peek(MCR_OFF), 104);
        assert_eq!(regs.peek(CR_OFF), 0);
        assert_eq!(regs.peek(IDC_H_OFF), 0);
        assert_eq!(regs.peek(IDC_L_OFF), 100);
        assert_eq!(regs.peek(INTC_OFF), 0x2);
        // TXEN | 33% duty | internal modulation
        assert_eq!(regs.peek(GLR_OFF), 0xA1);
    }

    #[test]
    fn invalid_params_write_nothing() {
        let regs = FakeRegs::new(0x84);
        let tx = IrTx::new(regs.static_ref());
        let params = IrTxParams {
            carrier_hz: 10_000,
            ..IrTxParams::DEFAULT
        };
        assert_eq!(tx.configure(params), Err(IrError::InvalidCarrierFrequency));
        let params = IrTxParams {
            duty_percent: 120,
            ..IrTxParams::DEFAULT
        };
        assert_eq!(tx.configure(params), Err(IrError::InvalidDutyCycle));
        assert_eq!(regs.peek(GLR_OFF), 0);
        assert_eq!(regs.peek(MCR_OFF), 0);
    }

    #[test]
    fn transmit_loads_fifo_and_waits_for_idle() {
        let (regs, tx) = setup(quick());
        regs.poke(TACR_OFF, 128);
        regs.poke(ICR_L_OFF, 100);

        assert_eq!(tx.transmit(&frame()), Ok(7));
        assert_eq!(regs.peek(TR_OFF), 17);
        // Reset and flush requested before loading.
        assert_eq!(regs.peek(GLR_OFF) & 0x2, 0x2);
        // Last byte loaded is the closing low run.
        assert_eq!(regs.peek(FIFO_OFF), 0);
    }

    #[test]
    fn oversized_frame_touches_no_registers() {
        let (regs, tx) = setup(quick());
        let wide = [TxEntry::high(10); 200];
        assert_eq!(tx.transmit(&wide), Err(IrError::TooLarge));
        assert_eq!(regs.peek(TR_OFF), 0);
        assert_eq!(regs.peek(GLR_OFF) & 0x2, 0);

        assert_eq!(tx.transmit(&frame()[..2]), Err(IrError::InvalidFrame));
        assert_eq!(regs.peek(TR_OFF), 0);
    }

    #[test]
    fn stuck_fifo_times_out() {
        let (regs, tx) = setup(quick());
        regs.poke(TACR_OFF, 0);
        regs.poke(ICR_L_OFF, 100);
        assert_eq!(tx.transmit(&frame()), Err(IrError::HardwareTimeout));
    }

    #[test]
    fn missing_idle_gap_times_out() {
        let (regs, tx) = setup(quick());
        regs.poke(TACR_OFF, 128);
        assert_eq!(tx.transmit(&frame()), Err(IrError::HardwareTimeout));

        // A new transmit works once the line goes idle.
        regs.poke(ICR_L_OFF, 0xFF);
        assert_eq!(tx.transmit(&frame()), Ok(7));
    }

    #[test]
    fn transmit_while_staging_buffer_is_held_is_busy() {
        let (regs, tx) = setup(quick());
        let glr = regs.peek(GLR_OFF);
        let nested = tx.raw.map(|_| tx.transmit(&frame()));
        assert_eq!(nested, Some(Err(IrError::Busy)));
        assert_eq!(regs.peek(GLR_OFF), glr);
        assert_eq!(regs.peek(TR_OFF), 0);
    }

    #[test]
    fn cyclical_mode_starts_and_returns() {
        let (regs, tx) = setup(IrTxParams {
            cyclical: true,
            ..quick()
        });
        assert_eq!(regs.peek(INTC_OFF), 0x1);
        assert_eq!(tx.transmit(&frame()), Ok(7));
        assert_eq!(regs.peek(CR_OFF), 0x81);
    }

    #[test]
    fn carrier_follows_duty_cycle() {
        let (regs, tx) = setup(quick());

        assert_eq!(tx.set_duty_cycle(50), Ok(()));
        assert_eq!((regs.peek(GLR_OFF) >> 5) & 0x3, 0);
        // The divider keeps its old value until the carrier is set again.
        assert_eq!(regs.peek(MCR_OFF), 104);
        assert_eq!(tx.set_carrier(38_000), Ok(()));
        assert_eq!(regs.peek(MCR_OFF), 157);

        assert_eq!(tx.set_duty_cycle(25), Ok(()));
        assert_eq!((regs.peek(GLR_OFF) >> 5) & 0x3, 2);
        assert_eq!(tx.set_carrier(38_000), Ok(()));
        assert_eq!(regs.peek(MCR_OFF), 78);
        assert_eq!(tx.params().duty_percent, 25);
    }

    #[test]
    fn invalid_carrier_or_duty_leaves_registers() {
        let (regs, tx) = setup(quick());
        assert_eq!(
            tx.set_carrier(6_000_001),
            Err(IrError::InvalidCarrierFrequency)
        );
        assert_eq!(regs.peek(MCR_OFF), 104);
        assert_eq!(tx.set_duty_cycle(101), Err(IrError::InvalidDutyCycle));
        assert_eq!(regs.peek(GLR_OFF), 0xA1);
        assert_eq!(tx.params(), quick());
    }
}
