//! The memory controller and its scheduling engines.
//!
//! One controller owns one channel. Each call to [`MemoryController::update`]
//! advances the channel by exactly one clock cycle, performing in fixed
//! order: bank countdowns, bus drains, the write-data FIFO, refresh
//! insertion, command pop plus the timing updater, epoch schedule
//! construction, slot dispatch, power accounting, read return, refresh
//! counter decrement, and the command-queue step. That ordering is part of
//! the timing contract; reordering changes observed latencies.
//!
//! The scheduling engines live in sibling files: `timing` applies the
//! per-command deadline table, `schedule` builds the per-epoch
//! non-interference schedule and dispatches slots, `power` governs
//! low-power entry/exit.

mod power;
mod schedule;
mod timing;

pub use schedule::{BANK_SLOTS, RANK_SLOTS, SCH_COLS};

use std::collections::VecDeque;

use log::{debug, trace};

use crate::common::addr::AddressMapper;
use crate::common::error::MemError;
use crate::config::{Config, DerivedTiming};
use crate::mem::bank_state::BankState;
use crate::mem::bus_packet::{BusPacket, BusPacketKind};
use crate::mem::command_queue::CommandQueue;
use crate::mem::rank::Rank;
use crate::mem::transaction::{Transaction, TransactionKind};
use crate::stats::MemStats;

/// Callback-worthy events produced by one controller cycle.
///
/// At most one read completion and one write completion can occur per cycle
/// (one packet per bus); the system driver turns these into user callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleEvents {
    /// `(address, cycle)` of a read whose data was returned this cycle.
    pub read_done: Option<(u64, u64)>,
    /// `(address, cycle)` of a write whose last data beat left the
    /// controller this cycle.
    pub write_done: Option<(u64, u64)>,
}

/// Cycle-accurate memory controller with a non-interference scheduler.
pub struct MemoryController {
    pub(crate) config: Config,
    pub(crate) timing: DerivedTiming,
    pub(crate) mapper: AddressMapper,

    /// Authoritative per-(rank,bank) state and deadlines.
    pub bank_states: Vec<Vec<BankState>>,
    /// Per-bank command FIFOs.
    pub command_queue: CommandQueue,
    /// Global input queue; bounded by `trans_queue_depth`.
    pub transaction_queue: VecDeque<Transaction>,

    /// Command packet currently occupying the command bus.
    pub outgoing_cmd_packet: Option<BusPacket>,
    /// Data packet currently occupying the data bus.
    pub outgoing_data_packet: Option<BusPacket>,
    /// Cycles until the command bus frees.
    pub cmd_cycles_left: u64,
    /// Cycles until the data bus frees.
    pub data_cycles_left: u64,
    write_data_to_send: VecDeque<BusPacket>,
    write_data_countdown: VecDeque<u64>,

    refresh_countdown: Vec<u64>,
    refresh_rank: usize,
    pub(crate) powered_down: Vec<bool>,

    /// Current epoch's schedule: column 0 holds the rank of each row,
    /// columns 1..=3 the banks dispatched in that row.
    pub sch: [[u64; SCH_COLS]; RANK_SLOTS],
    /// Previous epoch's schedule, consulted by the bank-violation check.
    pub prev_sch: [[u64; SCH_COLS]; RANK_SLOTS],
    /// First cycle of the next epoch.
    pub epoch_start: u64,
    /// Cycle of the next dispatch slot.
    pub dispatch_tick: u64,
    /// Row of the current dispatch slot.
    pub rank_indx: usize,
    /// Bank column (1..=3) of the current dispatch slot.
    pub bank_indx: usize,
    /// Core owning the current epoch.
    pub turn: usize,
    /// Per-core per-rank demand queues, filled at epoch start for the owner.
    pub rank_q: Vec<Vec<VecDeque<Transaction>>>,
    pub(crate) rb_max: u64,

    /// Reads dispatched and awaiting data, oldest first.
    pub pending_read_transactions: VecDeque<Transaction>,
    return_transaction: VecDeque<Transaction>,

    /// Cycles elapsed; advanced by the system driver after each update.
    pub current_clock_cycle: u64,
    /// Accumulated statistics.
    pub stats: MemStats,
}

impl MemoryController {
    /// Creates a controller for the given configuration.
    ///
    /// Rank refresh counters are staggered so rank `i`'s first refresh lands
    /// at `(REFRESH_PERIOD/tCK/NUM_RANKS)*(i+1)`. The turn counter is seeded
    /// so core 0 owns the epoch that starts at cycle 0.
    pub fn new(config: &Config) -> Self {
        let num_ranks = config.system.num_ranks;
        let num_banks = config.system.num_banks;
        let num_cpu = config.system.num_cpu;
        let timing = DerivedTiming::new(&config.timing);

        let stagger = timing.refresh_period_cycles / num_ranks as u64;
        let refresh_countdown = (0..num_ranks as u64).map(|i| stagger * (i + 1)).collect();

        let rank_q = (0..num_cpu)
            .map(|_| {
                (0..num_ranks)
                    .map(|_| VecDeque::with_capacity(config.system.trans_queue_depth))
                    .collect()
            })
            .collect();

        let rb_max = num_ranks.max(num_banks) as u64 + 1;

        Self {
            timing,
            mapper: AddressMapper::new(config),
            bank_states: vec![vec![BankState::new(); num_banks]; num_ranks],
            command_queue: CommandQueue::new(config),
            transaction_queue: VecDeque::with_capacity(config.system.trans_queue_depth),
            outgoing_cmd_packet: None,
            outgoing_data_packet: None,
            cmd_cycles_left: 0,
            data_cycles_left: 0,
            write_data_to_send: VecDeque::new(),
            write_data_countdown: VecDeque::new(),
            refresh_countdown,
            refresh_rank: 0,
            powered_down: vec![false; num_ranks],
            sch: [[rb_max; SCH_COLS]; RANK_SLOTS],
            prev_sch: [[rb_max; SCH_COLS]; RANK_SLOTS],
            epoch_start: 0,
            dispatch_tick: 0,
            rank_indx: 0,
            bank_indx: 1,
            turn: num_cpu - 1,
            rank_q,
            rb_max,
            pending_read_transactions: VecDeque::new(),
            return_transaction: VecDeque::new(),
            current_clock_cycle: 0,
            stats: MemStats::new(num_cpu, num_ranks, config.stats.histogram_bin_size),
            config: config.clone(),
        }
    }

    /// Whether the input queue has room for another transaction.
    pub fn will_accept_transaction(&self) -> bool {
        self.transaction_queue.len() < self.config.system.trans_queue_depth
    }

    /// Accepts a transaction, stamping its arrival cycle.
    ///
    /// Returns `false` without mutating anything when the queue is full;
    /// backpressure, not an error.
    pub fn add_transaction(&mut self, mut transaction: Transaction) -> bool {
        if !self.will_accept_transaction() {
            return false;
        }
        transaction.time_added = self.current_clock_cycle;
        self.transaction_queue.push_back(transaction);
        true
    }

    /// Accepts a DATA packet from a rank's return path.
    ///
    /// Anything other than DATA on this path is a protocol violation.
    pub fn receive_from_bus(&mut self, packet: BusPacket) -> Result<(), MemError> {
        if packet.kind != BusPacketKind::Data {
            return Err(MemError::UnexpectedPacket(packet.address));
        }
        trace!("MC receiving from data bus: {}", packet);
        self.return_transaction
            .push_back(Transaction::return_data(packet.address, packet.data));
        Ok(())
    }

    /// Advances the controller one clock cycle.
    ///
    /// `ranks` is the channel's rank array, injected by the driver each
    /// cycle instead of held as a back-reference.
    pub fn update(&mut self, ranks: &mut [Rank]) -> Result<CycleEvents, MemError> {
        let mut events = CycleEvents::default();
        let clock = self.current_clock_cycle;
        let half_burst = self.config.timing.bl / 2;

        // (a) bank countdowns and implicit state transitions
        let t_rp = self.config.timing.trp;
        for rank_banks in self.bank_states.iter_mut() {
            for bank in rank_banks.iter_mut() {
                bank.tick(t_rp);
            }
        }

        // (b) drain the command bus, then the data bus
        if self.outgoing_cmd_packet.is_some() {
            self.cmd_cycles_left -= 1;
            if self.cmd_cycles_left == 0 {
                if let Some(packet) = self.outgoing_cmd_packet.take() {
                    ranks[packet.rank].receive_from_bus(packet);
                }
            }
        }
        if self.outgoing_data_packet.is_some() {
            self.data_cycles_left -= 1;
            if self.data_cycles_left == 0 {
                if let Some(packet) = self.outgoing_data_packet.take() {
                    events.write_done = Some((packet.address, clock));
                    ranks[packet.rank].receive_from_bus(packet);
                }
            }
        }

        // (c) write-data FIFO: WL countdown, then claim the data bus
        if !self.write_data_countdown.is_empty() {
            for countdown in self.write_data_countdown.iter_mut() {
                *countdown = countdown.saturating_sub(1);
            }
            if self.write_data_countdown[0] == 0 {
                if self.outgoing_data_packet.is_some() {
                    return Err(MemError::DataBusCollision);
                }
                self.write_data_countdown.pop_front();
                if let Some(packet) = self.write_data_to_send.pop_front() {
                    debug!("MC issuing on data bus: {}", packet);
                    self.outgoing_data_packet = Some(packet);
                    self.data_cycles_left = half_burst;
                    self.stats.total_transactions += 1;
                }
            }
        }

        // (d) refresh insertion, one rank per cycle round-robin
        if self.refresh_countdown[self.refresh_rank] == 0 {
            self.command_queue.need_refresh(self.refresh_rank);
            ranks[self.refresh_rank].refresh_waiting = true;
            self.refresh_countdown[self.refresh_rank] = self.timing.refresh_period_cycles;
            self.refresh_rank = (self.refresh_rank + 1) % self.config.system.num_ranks;
        } else if self.powered_down[self.refresh_rank]
            && self.refresh_countdown[self.refresh_rank] <= self.config.timing.txp
        {
            // Arm the wake-up early so the power-up completes before the
            // refresh deadline.
            ranks[self.refresh_rank].refresh_waiting = true;
        }

        // (e) pop from the command queue and run the timing updater
        if let Some(packet) = self.command_queue.pop(&self.bank_states) {
            if packet.is_write() {
                self.write_data_to_send.push_back(BusPacket::data(
                    packet.address,
                    packet.rank,
                    packet.bank,
                    packet.row,
                    packet.column,
                    packet.data.clone(),
                ));
                self.write_data_countdown.push_back(self.timing.wl);
            }
            self.apply_command_timing(&packet)?;

            debug!("MC issuing on command bus: {}", packet);
            if self.outgoing_cmd_packet.is_some() {
                return Err(MemError::CommandBusCollision);
            }
            self.cmd_cycles_left = self.config.timing.tcmd;
            self.outgoing_cmd_packet = Some(packet);
        }

        // (f) epoch schedule construction (no-op off the epoch boundary)
        self.construct_schedule(clock);

        // (g) slot dispatch (no-op off the dispatch tick)
        self.dispatch_req(clock)?;

        // (h) low-power governance and background energy
        self.update_power(ranks);

        // (i) return read data to the requestor
        if let Some(returned) = self.return_transaction.front() {
            let address = returned.address;
            let position = self
                .pending_read_transactions
                .iter()
                .position(|t| t.address == address);
            let Some(position) = position else {
                return Err(MemError::OrphanReturn(address));
            };
            if let Some(pending) = self.pending_read_transactions.remove(position) {
                let mapped = self.mapper.map(address);
                trace!(
                    "read return addr={:#x} rank={} bank={} core={}",
                    address,
                    mapped.rank,
                    mapped.bank,
                    pending.core
                );
                self.stats.insert_histogram(
                    clock - pending.time_added,
                    pending.core,
                    pending.is_prefetch,
                );
                events.read_done = Some((address, clock));
            }
            self.return_transaction.pop_front();
            self.stats.total_transactions += 1;
        }

        // (j) refresh counters tick down
        for countdown in self.refresh_countdown.iter_mut() {
            *countdown = countdown.saturating_sub(1);
        }

        // (k) the command queue's own clock
        self.command_queue.step();

        Ok(events)
    }

    /// Whether nothing is in flight: every queue, bus slot, and pending list
    /// is empty.
    pub fn is_idle(&self) -> bool {
        self.transaction_queue.is_empty()
            && self.pending_read_transactions.is_empty()
            && self.return_transaction.is_empty()
            && self.write_data_to_send.is_empty()
            && self.outgoing_cmd_packet.is_none()
            && self.outgoing_data_packet.is_none()
            && self.rank_q.iter().flatten().all(|q| q.is_empty())
            && (0..self.config.system.num_ranks).all(|r| self.command_queue.is_empty(r))
    }

    /// Enqueues the ACTIVATE + column command pair for a transaction and
    /// retires it (reads park in the pending queue; writes are done once
    /// converted).
    pub(crate) fn enqueue_command_pair(
        &mut self,
        transaction: Transaction,
        rank: usize,
        bank: usize,
        row: u64,
        column: u64,
    ) -> Result<(), MemError> {
        let activate = BusPacket::command(
            BusPacketKind::Activate,
            transaction.address,
            rank,
            bank,
            row,
            column,
        );
        let kind = match transaction.kind {
            TransactionKind::Read => BusPacketKind::Read,
            TransactionKind::Write => BusPacketKind::Write,
            TransactionKind::ReturnData => return Ok(()),
        };
        let mut command =
            BusPacket::command(kind, transaction.address, rank, bank, row, column);
        command.data = transaction.data.clone();

        self.command_queue.enqueue(activate)?;
        self.command_queue.enqueue(command)?;

        if transaction.kind == TransactionKind::Read {
            self.pending_read_transactions.push_back(transaction);
        }
        Ok(())
    }
}
