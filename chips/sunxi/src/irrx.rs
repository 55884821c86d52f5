// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Consumer IR receiver (CIR RX).
//!
//! The block samples the demodulated input at a divided 24 MHz clock and
//! pushes one byte per run into a 64-entry FIFO. The interrupt fires when
//! the FIFO reaches its trigger level, when the line has been idle for the
//! idle threshold (packet end) and on FIFO overrun. Run accumulation and
//! protocol classification live in [`crate::irrx_state`].

use core::cell::Cell;

use kernel::config;
use kernel::debug;
use kernel::hil::ir::{RawClient, Receiver};
use kernel::utilities::cells::OptionalCell;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use kernel::utilities::StaticRef;
use kernel::ErrorCode;

use crate::irrx_state::{BurstOutcome, BurstStatus, RawIrSample, ReceiverState, RxTiming};

register_structs! {
    pub IrRxRegisters {
        /// Global control
        (0x00 => ctrl: ReadWrite<u32, CTRL::Register>),
        (0x04 => _reserved0),
        /// Receiver input configuration
        (0x10 => rxcfg: ReadWrite<u32, RXCFG::Register>),
        (0x14 => _reserved1),
        /// Receiver FIFO data, one run per read
        (0x20 => rxdat: ReadOnly<u32, RXDAT::Register>),
        (0x24 => _reserved2),
        /// Receiver interrupt enable
        (0x2C => rxinte: ReadWrite<u32, RXINTE::Register>),
        /// Receiver interrupt status, write one to clear
        (0x30 => rxints: ReadWrite<u32, RXINTS::Register>),
        /// Sample clock and thresholds
        (0x34 => cir: ReadWrite<u32, CIR::Register>),
        (0x38 => @END),
    }
}

register_bitfields![u32,
    CTRL [
        /// Global enable
        GEN OFFSET(0) NUMBITS(1) [],
        /// Receiver enable
        RXEN OFFSET(1) NUMBITS(1) [],
        MODE OFFSET(4) NUMBITS(2) [
            Cir = 0b11
        ],
        /// Which input levels are sampled into the FIFO
        PULSE OFFSET(6) NUMBITS(2) [
            Both = 1,
            Low = 2,
            High = 3
        ]
    ],
    RXCFG [
        /// Receiver pulse polarity invert
        RPPI OFFSET(2) NUMBITS(1) []
    ],
    RXDAT [
        DURATION OFFSET(0) NUMBITS(7) [],
        POLARITY OFFSET(7) NUMBITS(1) []
    ],
    RXINTE [
        /// FIFO overrun interrupt enable
        ROI_EN OFFSET(0) NUMBITS(1) [],
        /// Packet end interrupt enable
        RPEI_EN OFFSET(1) NUMBITS(1) [],
        /// FIFO available interrupt enable
        RAI_EN OFFSET(4) NUMBITS(1) [],
        /// FIFO available trigger level, minus one
        RAL OFFSET(8) NUMBITS(6) []
    ],
    RXINTS [
        /// FIFO overrun
        ROI OFFSET(0) NUMBITS(1) [],
        /// Packet end
        RPE OFFSET(1) NUMBITS(1) [],
        /// FIFO available
        RA OFFSET(4) NUMBITS(1) [],
        /// Number of runs waiting in the FIFO
        RAC OFFSET(8) NUMBITS(7) []
    ],
    CIR [
        /// Sample clock select
        SCS OFFSET(0) NUMBITS(2) [
            Div64 = 0,
            Div128 = 1,
            Div256 = 2,
            Div512 = 3
        ],
        /// Noise threshold: runs shorter than this many samples are dropped
        NTHR OFFSET(2) NUMBITS(6) [],
        /// Idle threshold, in units of 128 samples
        ITHR OFFSET(8) NUMBITS(8) [],
        /// Active threshold
        ATHR OFFSET(16) NUMBITS(7) [],
        /// Active threshold unit: 0 counts samples, 1 counts 128 samples
        ATHC OFFSET(23) NUMBITS(1) []
    ]
];

/// Status bits cleared while programming the block.
const RXINTS_CLEAR_ALL: u32 = 0xEF;

pub const S_CIR_RX_BASE: StaticRef<IrRxRegisters> =
    unsafe { StaticRef::new(0x0704_0000 as *const IrRxRegisters) };

/// Divider applied to the 24 MHz module clock to get the sample clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleClock {
    Div64,
    Div128,
    Div256,
    Div512,
}

/// Input levels captured into the FIFO.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PulseMode {
    Both,
    Low,
    High,
}

/// Hardware setup for one receiver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrRxParams {
    pub sample_clock: SampleClock,
    /// Noise filter, in samples, 0..=63.
    pub noise_threshold: u8,
    /// Idle time that ends a packet, in units of 128 samples.
    pub idle_threshold: u8,
    /// Active threshold, 0..=127.
    pub active_threshold: u8,
    /// Count the active threshold in single samples instead of 128s.
    pub active_threshold_in_samples: bool,
    pub invert: bool,
    /// FIFO level that raises the available interrupt, 1..=64.
    pub fifo_trigger: u8,
    pub pulse_mode: PulseMode,
    pub timing: RxTiming,
}

impl IrRxParams {
    pub const DEFAULT: IrRxParams = IrRxParams {
        sample_clock: SampleClock::Div512,
        noise_threshold: 8,
        idle_threshold: 2,
        active_threshold: 16,
        active_threshold_in_samples: true,
        invert: true,
        fifo_trigger: 20,
        pulse_mode: PulseMode::Both,
        timing: RxTiming::DEFAULT,
    };

    /// RC5 remotes need a wider noise filter. Runs are reported unhalved,
    /// as Manchester decoders split merged half-bits themselves.
    pub const RC5: IrRxParams = IrRxParams {
        noise_threshold: 16,
        timing: RxTiming::UNCORRECTED,
        ..IrRxParams::DEFAULT
    };

    fn validate(&self) -> Result<(), ErrorCode> {
        if self.noise_threshold > 63
            || self.active_threshold > 127
            || self.fifo_trigger == 0
            || self.fifo_trigger > 64
            || self.timing.tick_ns == 0
        {
            return Err(ErrorCode::INVAL);
        }
        Ok(())
    }
}

impl Default for IrRxParams {
    fn default() -> Self {
        IrRxParams::DEFAULT
    }
}

pub struct IrRx<'a> {
    registers: StaticRef<IrRxRegisters>,
    state: Cell<ReceiverState>,
    params: Cell<IrRxParams>,
    client: OptionalCell<&'a dyn RawClient>,
    overflows: Cell<u32>,
}

impl<'a> IrRx<'a> {
    pub const fn new(base: StaticRef<IrRxRegisters>) -> IrRx<'a> {
        IrRx {
            registers: base,
            state: Cell::new(ReceiverState::new(RxTiming::DEFAULT)),
            params: Cell::new(IrRxParams::DEFAULT),
            client: OptionalCell::empty(),
            overflows: Cell::new(0),
        }
    }

    /// Program the block and enable it. Invalid parameters are rejected
    /// before any register is touched.
    pub fn configure(&self, params: IrRxParams) -> Result<(), ErrorCode> {
        params.validate()?;
        self.params.set(params);
        self.state.set(ReceiverState::new(params.timing));

        let regs = &*self.registers;

        regs.ctrl.modify(CTRL::MODE::Cir);

        let scs = match params.sample_clock {
            SampleClock::Div64 => CIR::SCS::Div64,
            SampleClock::Div128 => CIR::SCS::Div128,
            SampleClock::Div256 => CIR::SCS::Div256,
            SampleClock::Div512 => CIR::SCS::Div512,
        };
        let athc = if params.active_threshold_in_samples {
            CIR::ATHC::CLEAR
        } else {
            CIR::ATHC::SET
        };
        regs.cir.set(0);
        regs.cir.write(
            scs + CIR::ITHR.val(params.idle_threshold as u32)
                + CIR::ATHR.val(params.active_threshold as u32)
                + athc
                + CIR::NTHR.val(params.noise_threshold as u32),
        );

        if params.invert {
            regs.rxcfg.modify(RXCFG::RPPI::SET);
        } else {
            regs.rxcfg.modify(RXCFG::RPPI::CLEAR);
        }

        regs.rxints.set(RXINTS_CLEAR_ALL);
        regs.rxinte
            .modify(RXINTE::ROI_EN::SET + RXINTE::RPEI_EN::SET + RXINTE::RAI_EN::SET);
        regs.rxinte
            .modify(RXINTE::RAL.val(params.fifo_trigger as u32 - 1));

        let pulse = match params.pulse_mode {
            PulseMode::Both => CTRL::PULSE::Both,
            PulseMode::Low => CTRL::PULSE::Low,
            PulseMode::High => CTRL::PULSE::High,
        };
        regs.ctrl.modify(pulse);
        regs.ctrl.modify(CTRL::GEN::SET + CTRL::RXEN::SET);
        Ok(())
    }

    pub fn params(&self) -> IrRxParams {
        self.params.get()
    }

    /// Number of bursts lost to FIFO overrun since boot.
    pub fn overflow_count(&self) -> u32 {
        self.overflows.get()
    }

    pub fn is_receiving(&self) -> bool {
        self.state.get().is_receiving()
    }

    pub fn handle_interrupt(&self) {
        let regs = &*self.registers;
        let status = regs.rxints.extract();
        regs.rxints.set(status.get());

        let count = status.read(RXINTS::RAC);
        if config::CONFIG.trace_ir_rx {
            debug!("irrx: status {:#x}, {} runs", status.get(), count);
        }

        let samples = (0..count).map(|_| {
            let word = regs.rxdat.get();
            if config::CONFIG.trace_ir_rx {
                debug!("irrx: data {:#04x}", word);
            }
            RawIrSample::from_fifo(word)
        });
        let burst = BurstStatus {
            end_of_burst: status.is_set(RXINTS::RPE),
            overflow: status.is_set(RXINTS::ROI),
        };

        let mut state = self.state.get();
        let outcome = state.process_fifo_burst(samples, burst, self.client.get());
        self.state.set(state);

        if outcome == BurstOutcome::Overflow {
            self.overflows.set(self.overflows.get().wrapping_add(1));
            debug!("irrx: fifo overrun, burst dropped");
        }
    }
}

impl<'a> Receiver<'a> for IrRx<'a> {
    fn set_raw_client(&self, client: &'a dyn RawClient) {
        self.client.set(client);
    }

    fn enable(&self) -> Result<(), ErrorCode> {
        let regs = &*self.registers;
        regs.rxints.set(RXINTS_CLEAR_ALL);
        regs.rxinte
            .modify(RXINTE::ROI_EN::SET + RXINTE::RPEI_EN::SET + RXINTE::RAI_EN::SET);
        regs.ctrl.modify(CTRL::GEN::SET + CTRL::RXEN::SET);
        Ok(())
    }

    fn disable(&self) -> Result<(), ErrorCode> {
        let regs = &*self.registers;
        regs.ctrl.modify(CTRL::RXEN::CLEAR + CTRL::GEN::CLEAR);
        regs.rxinte
            .modify(RXINTE::ROI_EN::CLEAR + RXINTE::RPEI_EN::CLEAR + RXINTE::RAI_EN::CLEAR);
        let mut state = self.state.get();
        state.reset();
        self.state.set(state);
        Ok(())
    }
}
