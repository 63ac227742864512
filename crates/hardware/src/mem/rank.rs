//! Rank model: command sink, read-return source.
//!
//! A rank receives command and data packets from the controller's buses,
//! serves reads out of its backing store after the device read latency, and
//! commits write bursts when their DATA packets arrive. The controller keeps
//! the authoritative bank-state table; the rank only models what comes back.

use std::collections::VecDeque;

use log::trace;

use crate::config::{Config, DerivedTiming};
use crate::mem::bus_packet::{BusPacket, BusPacketKind};
use crate::mem::storage::DataStore;

/// One DRAM rank.
pub struct Rank {
    /// Rank index within the channel.
    pub id: usize,
    /// Set by the controller when a refresh is due; cleared when the REFRESH
    /// command arrives.
    pub refresh_waiting: bool,
    powered_down: bool,
    read_return: VecDeque<(BusPacket, u64)>,
    store: Box<dyn DataStore + Send>,
    burst_bytes: usize,
    return_latency: u64,
}

impl Rank {
    /// Creates a rank backed by `store`.
    ///
    /// Read data is returned `RL + BL/2` cycles after the READ command
    /// arrives (column access plus the burst on the data bus).
    pub fn new(id: usize, store: Box<dyn DataStore + Send>, config: &Config) -> Self {
        let timing = DerivedTiming::new(&config.timing);
        Self {
            id,
            refresh_waiting: false,
            powered_down: false,
            read_return: VecDeque::new(),
            store,
            burst_bytes: config.transaction_bytes(),
            return_latency: timing.rl + config.timing.bl / 2,
        }
    }

    /// Accepts a packet delivered on the command or data bus.
    pub fn receive_from_bus(&mut self, packet: BusPacket) {
        trace!("rank {} <- {}", self.id, packet);
        match packet.kind {
            BusPacketKind::Read | BusPacketKind::ReadP => {
                let data = self.store.read_burst(packet.address, self.burst_bytes);
                let response = BusPacket::data(
                    packet.address,
                    packet.rank,
                    packet.bank,
                    packet.row,
                    packet.column,
                    data,
                );
                self.read_return.push_back((response, self.return_latency));
            }
            BusPacketKind::Data => {
                self.store.write_burst(packet.address, &packet.data);
            }
            BusPacketKind::Refresh => {
                self.refresh_waiting = false;
            }
            BusPacketKind::Activate
            | BusPacketKind::Write
            | BusPacketKind::WriteP
            | BusPacketKind::Precharge => {}
        }
    }

    /// Advances the rank one cycle; returns a DATA packet whose latency has
    /// elapsed, in strict arrival order.
    pub fn update(&mut self) -> Option<BusPacket> {
        for entry in self.read_return.iter_mut() {
            entry.1 = entry.1.saturating_sub(1);
        }
        if matches!(self.read_return.front(), Some((_, 0))) {
            return self.read_return.pop_front().map(|(p, _)| p);
        }
        None
    }

    /// Enters power-down mode.
    pub fn power_down(&mut self) {
        trace!("rank {} powering down", self.id);
        self.powered_down = true;
    }

    /// Exits power-down mode.
    pub fn power_up(&mut self) {
        trace!("rank {} powering up", self.id);
        self.powered_down = false;
    }

    /// Whether the rank is currently powered down.
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Read access to the backing store (tests inspect round-trip data
    /// through this).
    pub fn store(&self) -> &(dyn DataStore + Send) {
        self.store.as_ref()
    }
}
