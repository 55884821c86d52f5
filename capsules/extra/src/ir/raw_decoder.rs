// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Raw event queue and protocol dispatch for an IR receiver.
//!
//! Raw events arrive from the receiver's interrupt handler and are queued
//! in a caller-provided ring buffer. When the receiver signals the end of a
//! burst the queue is drained through every enabled protocol decoder and
//! the results are passed to the scancode client. Events that do not fit
//! the queue are dropped and counted; the burst they belonged to will most
//! likely fail to decode.

use core::cell::Cell;

use kernel::collections::queue::Queue;
use kernel::collections::ring_buffer::RingBuffer;
use kernel::debug_verbose;
use kernel::hil::ir::{Protocol, ProtocolSet, RawClient, RawIrEvent, ScancodeClient};
use kernel::utilities::cells::{MapCell, OptionalCell};

use super::nec::NecDecoder;
use super::rc5::Rc5Decoder;
use super::DecodeEvent;

/// Raw events are held in a `RingBuffer`, which keeps one slot free: a
/// buffer of `n` events queues at most `n - 1`.
pub struct IrRawDecoder<'a> {
    queue: MapCell<RingBuffer<'a, RawIrEvent>>,
    nec: Cell<NecDecoder>,
    rc5: Cell<Rc5Decoder>,
    protocols: Cell<ProtocolSet>,
    client: OptionalCell<&'a dyn ScancodeClient>,
    dropped: Cell<u32>,
}

impl<'a> IrRawDecoder<'a> {
    pub fn new(buffer: &'a mut [RawIrEvent]) -> IrRawDecoder<'a> {
        IrRawDecoder {
            queue: MapCell::new(RingBuffer::new(buffer)),
            nec: Cell::new(NecDecoder::new()),
            rc5: Cell::new(Rc5Decoder::new()),
            protocols: Cell::new(ProtocolSet::RC5_AND_NEC),
            client: OptionalCell::empty(),
            dropped: Cell::new(0),
        }
    }

    pub fn set_client(&self, client: &'a dyn ScancodeClient) {
        self.client.set(client);
    }

    pub fn set_protocols(&self, protocols: ProtocolSet) {
        self.protocols.set(protocols);
        self.reset_decoders();
    }

    pub fn protocols(&self) -> ProtocolSet {
        self.protocols.get()
    }

    /// Raw events lost to a full queue.
    pub fn dropped_count(&self) -> u32 {
        self.dropped.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.map(|queue| queue.len()).unwrap_or(0)
    }

    fn reset_decoders(&self) {
        self.nec.set(NecDecoder::new());
        self.rc5.set(Rc5Decoder::new());
    }

    fn report(&self, protocol: Protocol, event: DecodeEvent) {
        self.client.map(|client| match event {
            DecodeEvent::Scancode { scancode, toggle } => {
                client.scancode(protocol, scancode, toggle)
            }
            DecodeEvent::Repeat => client.repeat(protocol),
        });
    }

    fn dispatch(&self, event: RawIrEvent) {
        let protocols = self.protocols.get();

        if protocols.nec {
            let mut nec = self.nec.get();
            let result = nec.feed(event);
            self.nec.set(nec);
            if let Some(result) = result {
                self.report(Protocol::Nec, result);
            }
        }

        if protocols.rc5 {
            let mut rc5 = self.rc5.get();
            let result = rc5.feed(event);
            self.rc5.set(rc5);
            if let Some(result) = result {
                self.report(Protocol::Rc5, result);
            }
        }
    }
}

impl RawClient for IrRawDecoder<'_> {
    fn raw_event(&self, event: RawIrEvent) {
        let queued = self
            .queue
            .map(|queue| queue.enqueue(event))
            .unwrap_or(false);
        if !queued {
            let dropped = self.dropped.get().wrapping_add(1);
            self.dropped.set(dropped);
            debug_verbose!("ir: raw queue full, {} events dropped", dropped);
        }
    }

    fn decode(&self) {
        // Dequeue one event at a time so that a client callback may queue
        // new events without finding the queue borrowed.
        while let Some(event) = self.queue.map(|queue| queue.dequeue()).flatten() {
            self.dispatch(event);
        }
        // Every burst is decoded on its own.
        self.reset_decoders();
    }
}
