//! Per-bank command FIFOs with issuability checks.
//!
//! The dispatcher enqueues ACTIVATE + column-command pairs; this queue
//! decides which enqueued command is legal to put on the command bus each
//! cycle, consulting the controller's bank-state table. It provides:
//! 1. **Bounded FIFOs:** one queue per (rank, bank), `cmd_queue_depth` deep.
//! 2. **Refresh priority:** a rank with a pending refresh drains or closes
//!    its open rows, then issues REFRESH before anything else activates.
//! 3. **Round-robin pop:** a persistent cursor walks the (rank, bank) grid
//!    so no bank starves.

use std::collections::VecDeque;

use log::debug;

use crate::common::error::MemError;
use crate::config::Config;
use crate::mem::bank_state::{BankState, BankStatus};
use crate::mem::bus_packet::{BusPacket, BusPacketKind};

/// Per-(rank,bank) command queue.
pub struct CommandQueue {
    queues: Vec<Vec<VecDeque<BusPacket>>>,
    depth: usize,
    refresh_waiting: Vec<bool>,
    next_rank: usize,
    next_bank: usize,
    num_ranks: usize,
    num_banks: usize,
    clock: u64,
}

impl CommandQueue {
    /// Creates empty queues for the configured geometry.
    pub fn new(config: &Config) -> Self {
        let num_ranks = config.system.num_ranks;
        let num_banks = config.system.num_banks;
        let depth = config.system.cmd_queue_depth;
        let queues = (0..num_ranks)
            .map(|_| (0..num_banks).map(|_| VecDeque::with_capacity(depth)).collect())
            .collect();
        Self {
            queues,
            depth,
            refresh_waiting: vec![false; num_ranks],
            next_rank: 0,
            next_bank: 0,
            num_ranks,
            num_banks,
            clock: 0,
        }
    }

    /// Appends a command to its bank's queue.
    pub fn enqueue(&mut self, packet: BusPacket) -> Result<(), MemError> {
        let (rank, bank) = (packet.rank, packet.bank);
        let queue = &mut self.queues[rank][bank];
        if queue.len() >= self.depth {
            return Err(MemError::CommandQueueOverflow { rank, bank });
        }
        queue.push_back(packet);
        Ok(())
    }

    /// Whether the queue at (rank, bank) can take `n` more commands.
    pub fn has_room_for(&self, n: usize, rank: usize, bank: usize) -> bool {
        self.queues[rank][bank].len() + n <= self.depth
    }

    /// Whether every bank queue of `rank` is empty.
    pub fn is_empty(&self, rank: usize) -> bool {
        self.queues[rank].iter().all(|q| q.is_empty())
    }

    /// Marks `rank` as due for a refresh; the next pops for that rank close
    /// its rows and issue REFRESH.
    pub fn need_refresh(&mut self, rank: usize) {
        self.refresh_waiting[rank] = true;
    }

    /// Yields the next command legal to issue this cycle, if any.
    ///
    /// Refresh-pending ranks take priority: column commands to still-open
    /// rows drain first, then open banks are precharged, then the REFRESH
    /// itself goes out once every bank is idle. Otherwise the (rank, bank)
    /// grid is scanned round-robin from the cursor and the first issuable
    /// queue head is popped.
    pub fn pop(&mut self, bank_states: &[Vec<BankState>]) -> Option<BusPacket> {
        for rank in 0..self.num_ranks {
            if !self.refresh_waiting[rank] {
                continue;
            }
            if self.refresh_issuable(rank, bank_states) {
                self.refresh_waiting[rank] = false;
                return Some(BusPacket::refresh(rank));
            }
            for bank in 0..self.num_banks {
                let state = &bank_states[rank][bank];
                if state.status != BankStatus::RowActive {
                    continue;
                }
                // Drain a column command aimed at the open row before
                // closing it out from under the queue.
                if let Some(head) = self.queues[rank][bank].front() {
                    let column_cmd = matches!(
                        head.kind,
                        BusPacketKind::Read
                            | BusPacketKind::ReadP
                            | BusPacketKind::Write
                            | BusPacketKind::WriteP
                    );
                    if column_cmd && self.is_issuable(head, bank_states) {
                        return self.queues[rank][bank].pop_front();
                    }
                }
                if self.clock >= state.next_precharge {
                    return Some(BusPacket::command(
                        BusPacketKind::Precharge,
                        0,
                        rank,
                        bank,
                        state.open_row,
                        0,
                    ));
                }
            }
        }

        let cells = self.num_ranks * self.num_banks;
        for i in 0..cells {
            let cell = (self.next_rank * self.num_banks + self.next_bank + i) % cells;
            let rank = cell / self.num_banks;
            let bank = cell % self.num_banks;
            let Some(head) = self.queues[rank][bank].front() else {
                continue;
            };
            // No new rows open while the rank is waiting to refresh.
            if self.refresh_waiting[rank] && head.kind == BusPacketKind::Activate {
                continue;
            }

            let state = &bank_states[rank][bank];
            if head.kind == BusPacketKind::Activate && state.status == BankStatus::RowActive {
                if state.open_row == head.row {
                    // The row is already open; the activate is redundant and
                    // the paired column command can go directly.
                    self.queues[rank][bank].pop_front();
                } else if self.clock >= state.next_precharge {
                    // Row conflict: close the open row so the activate can
                    // issue once tRP elapses.
                    let open_row = state.open_row;
                    let after = (cell + 1) % cells;
                    self.next_rank = after / self.num_banks;
                    self.next_bank = after % self.num_banks;
                    return Some(BusPacket::command(
                        BusPacketKind::Precharge,
                        0,
                        rank,
                        bank,
                        open_row,
                        0,
                    ));
                } else {
                    continue;
                }
            }

            let Some(head) = self.queues[rank][bank].front() else {
                continue;
            };
            if self.is_issuable(head, bank_states) {
                let packet = self.queues[rank][bank].pop_front();
                let after = (cell + 1) % cells;
                self.next_rank = after / self.num_banks;
                self.next_bank = after % self.num_banks;
                return packet;
            }
        }
        None
    }

    /// Advances the queue's clock; call exactly once per controller cycle.
    pub fn step(&mut self) {
        self.clock += 1;
    }

    /// Logs every non-empty queue at debug level.
    pub fn print(&self) {
        for (r, banks) in self.queues.iter().enumerate() {
            for (b, queue) in banks.iter().enumerate() {
                if !queue.is_empty() {
                    debug!("cmdq[{}][{}]: {} entries", r, b, queue.len());
                }
            }
        }
    }

    fn refresh_issuable(&self, rank: usize, bank_states: &[Vec<BankState>]) -> bool {
        bank_states[rank]
            .iter()
            .all(|b| b.status == BankStatus::Idle && self.clock >= b.next_activate)
    }

    fn is_issuable(&self, packet: &BusPacket, bank_states: &[Vec<BankState>]) -> bool {
        let state = &bank_states[packet.rank][packet.bank];
        match packet.kind {
            BusPacketKind::Activate => {
                state.status == BankStatus::Idle && self.clock >= state.next_activate
            }
            BusPacketKind::Read | BusPacketKind::ReadP => {
                state.status == BankStatus::RowActive
                    && state.open_row == packet.row
                    && self.clock >= state.next_read
            }
            BusPacketKind::Write | BusPacketKind::WriteP => {
                state.status == BankStatus::RowActive
                    && state.open_row == packet.row
                    && self.clock >= state.next_write
            }
            BusPacketKind::Precharge => {
                state.status == BankStatus::RowActive && self.clock >= state.next_precharge
            }
            BusPacketKind::Refresh => self.refresh_issuable(packet.rank, bank_states),
            BusPacketKind::Data => false,
        }
    }
}
