// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Receive-side run accumulator for the CIR block.
//!
//! The receiver FIFO delivers one byte per sample run, `YXXXXXXX`: `Y` is the
//! line polarity and `XXXXXXX` the number of sample clocks it was held. A
//! long pulse overflows the 7-bit count and arrives as several bytes of the
//! same polarity, so consecutive same-polarity samples are summed into a
//! single [`PulseRun`]. A run is finalized when the polarity flips, or when
//! the hardware reports the end of a burst.
//!
//! The first run of every burst classifies the burst: a run matching the NEC
//! 9 ms lead pulse marks it as NEC, anything else as RC5. In an RC5 burst,
//! runs between 1.5 and 2.5 RC5 units are two merged half-bits and are
//! reported at half length.
//!
//! ```text
//!   IDLE ──sample──> ACCUMULATING ──flip: emit──> ACCUMULATING
//!    ^                    │
//!    └──end-of-burst: emit pending, decode──┘
//!    └──overflow: drop pending─────────────┘
//! ```

use kernel::config;
use kernel::debug;
use kernel::hil::ir::{Protocol, RawClient, RawIrEvent};

/// Duration of one receiver sample clock, in nanoseconds.
pub const SAMPLE_UNIT_NS: u32 = 21_000;
/// NEC timing unit, in nanoseconds.
pub const NEC_UNIT_NS: u32 = 562_500;
/// NEC lead pulse ("boot code"), 9 ms.
pub const NEC_BOOT_CODE_NS: u32 = 16 * NEC_UNIT_NS;
/// RC5 half-bit duration, in nanoseconds.
pub const RC5_UNIT_NS: u32 = 889_000;

/// One receiver FIFO entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawIrSample {
    pub polarity: bool,
    /// Sample clocks, 0..=127.
    pub duration: u8,
}

impl RawIrSample {
    pub const fn new(polarity: bool, duration: u8) -> RawIrSample {
        RawIrSample {
            polarity,
            duration: duration & 0x7F,
        }
    }

    /// Split a raw FIFO word into polarity and duration.
    pub const fn from_fifo(word: u32) -> RawIrSample {
        RawIrSample::new((word >> 7) & 0x1 == 1, (word & 0x7F) as u8)
    }
}

/// A run of samples of one polarity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PulseRun {
    pub polarity: bool,
    pub duration_ticks: u32,
}

/// Conversion and classification constants for one receiver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RxTiming {
    pub tick_ns: u32,
    /// Runs strictly between `rc5_low_ns` and `rc5_high_ns` are halved in an
    /// RC5 burst.
    pub rc5_low_ns: u32,
    pub rc5_high_ns: u32,
}

impl RxTiming {
    pub const DEFAULT: RxTiming = RxTiming {
        tick_ns: SAMPLE_UNIT_NS,
        rc5_low_ns: RC5_UNIT_NS + RC5_UNIT_NS / 2,
        rc5_high_ns: 2 * RC5_UNIT_NS + RC5_UNIT_NS / 2,
    };

    /// Report every run at its measured length, for decoders that split
    /// merged half-bits themselves.
    pub const UNCORRECTED: RxTiming = RxTiming {
        rc5_low_ns: 0,
        rc5_high_ns: 0,
        ..RxTiming::DEFAULT
    };
}

/// Flags from the interrupt status register that end a burst.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BurstStatus {
    /// Packet end: the line has been idle for the idle threshold.
    pub end_of_burst: bool,
    /// The FIFO overran and samples were lost.
    pub overflow: bool,
}

/// What `finish_burst` did with the burst.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BurstOutcome {
    /// Neither flag was set; the burst continues in the next interrupt.
    Continue,
    /// The burst ended. Carries the final run if one was pending.
    Complete(Option<RawIrEvent>),
    /// The FIFO overflowed. The pending run was discarded.
    Overflow,
}

fn eq_margin(duration: u32, target: u32, margin: u32) -> bool {
    duration > target.saturating_sub(margin) && duration < target.saturating_add(margin)
}

fn trace_run(event: RawIrEvent) {
    if config::CONFIG.trace_ir_rx {
        debug!("irrx: {}", event);
    }
}

/// Per-receiver decode state. Owned by the interrupt handler of one device.
#[derive(Copy, Clone, Debug)]
pub struct ReceiverState {
    pulse_pre: bool,
    receiving: bool,
    boot_code_seen: bool,
    protocol: Protocol,
    run: PulseRun,
    timing: RxTiming,
}

impl ReceiverState {
    pub const fn new(timing: RxTiming) -> ReceiverState {
        ReceiverState {
            pulse_pre: false,
            receiving: false,
            boot_code_seen: false,
            protocol: Protocol::Unknown,
            run: PulseRun {
                polarity: false,
                duration_ticks: 0,
            },
            timing,
        }
    }

    pub fn timing(&self) -> RxTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: RxTiming) {
        self.timing = timing;
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The run currently being accumulated, in sample ticks.
    pub fn current_run(&self) -> PulseRun {
        self.run
    }

    /// Return to idle, forgetting any pending run and classification.
    pub fn reset(&mut self) {
        self.receiving = false;
        self.boot_code_seen = false;
        self.pulse_pre = false;
        self.protocol = Protocol::Unknown;
        self.run = PulseRun::default();
    }

    fn start_run(&mut self, sample: RawIrSample) {
        self.pulse_pre = sample.polarity;
        self.run = PulseRun {
            polarity: sample.polarity,
            duration_ticks: sample.duration as u32,
        };
    }

    fn run_ns(&self) -> u32 {
        self.run.duration_ticks.saturating_mul(self.timing.tick_ns)
    }

    /// Finalize the current run on a polarity flip, classifying the burst
    /// on its first run and applying the RC5 half-bit correction after.
    fn finalize_on_flip(&mut self) -> RawIrEvent {
        let mut duration_ns = self.run_ns();

        if !self.boot_code_seen {
            self.boot_code_seen = true;
            self.protocol = if eq_margin(duration_ns, NEC_BOOT_CODE_NS, 2 * NEC_UNIT_NS) {
                Protocol::Nec
            } else {
                Protocol::Rc5
            };
        } else {
            match self.protocol {
                Protocol::Rc5
                    if duration_ns > self.timing.rc5_low_ns
                        && duration_ns < self.timing.rc5_high_ns =>
                {
                    duration_ns /= 2;
                }
                Protocol::Rc5 | Protocol::Nec | Protocol::Unknown => {}
            }
        }

        RawIrEvent {
            pulse: self.pulse_pre,
            duration_ns,
        }
    }

    /// Feed one FIFO sample. Returns the run that a polarity flip finalized.
    pub fn push_sample(&mut self, sample: RawIrSample) -> Option<RawIrEvent> {
        if !self.receiving {
            // First sample after idle: open a run, nothing to report yet.
            self.start_run(sample);
            self.receiving = true;
            return None;
        }

        if sample.polarity == self.pulse_pre {
            self.run.duration_ticks = self
                .run
                .duration_ticks
                .saturating_add(sample.duration as u32);
            return None;
        }

        let event = self.finalize_on_flip();
        self.start_run(sample);
        Some(event)
    }

    /// Apply the burst-ending flags after the FIFO has been drained.
    ///
    /// On end-of-burst the pending run is converted directly, without the
    /// classification or RC5 correction a flip would apply. Overflow takes
    /// precedence over end-of-burst: the pending run is dropped.
    pub fn finish_burst(&mut self, status: BurstStatus) -> BurstOutcome {
        if status.overflow {
            self.reset();
            return BurstOutcome::Overflow;
        }

        if !status.end_of_burst {
            return BurstOutcome::Continue;
        }

        let last = if self.run.duration_ticks != 0 {
            Some(RawIrEvent {
                pulse: self.run.polarity,
                duration_ns: self.run_ns(),
            })
        } else {
            None
        };
        self.reset();
        BurstOutcome::Complete(last)
    }

    /// Run one interrupt's worth of samples through the state machine and
    /// forward the results to `client`.
    ///
    /// Events are reported in order; on end-of-burst the client is asked to
    /// decode once the final run has been delivered.
    pub fn process_fifo_burst<I>(
        &mut self,
        samples: I,
        status: BurstStatus,
        client: Option<&dyn RawClient>,
    ) -> BurstOutcome
    where
        I: IntoIterator<Item = RawIrSample>,
    {
        for sample in samples {
            if let Some(event) = self.push_sample(sample) {
                trace_run(event);
                if let Some(client) = client {
                    client.raw_event(event);
                }
            }
        }

        let outcome = self.finish_burst(status);
        if let BurstOutcome::Complete(last) = outcome {
            if let Some(event) = last {
                trace_run(event);
            }
            if let Some(client) = client {
                if let Some(event) = last {
                    client.raw_event(event);
                }
                client.decode();
            }
        }
        outcome
    }
}
