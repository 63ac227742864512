//! Per-epoch schedule construction and slot dispatch.
//!
//! Service time is cut into fixed-length epochs. At each epoch boundary one
//! core becomes the owner, its pending demand is drained into per-rank
//! queues, and a 3x4 schedule table is built: one row per rank slot, column
//! 0 holding the rank, columns 1..=3 recording the banks dispatched in that
//! row. Bank choice is constrained against the current row, and against the
//! tail of the previous schedule when the row kept its rank from the
//! previous epoch, so the command pattern the owner produces does not depend
//! on any other core's traffic.

use log::debug;

use crate::common::error::MemError;
use crate::mem::controller::MemoryController;
use crate::mem::transaction::TransactionKind;

/// Rank rows per epoch schedule.
pub const RANK_SLOTS: usize = 3;
/// Bank dispatch rounds per rank row.
pub const BANK_SLOTS: usize = 3;
/// Schedule table columns: the rank plus one column per bank round.
pub const SCH_COLS: usize = BANK_SLOTS + 1;

impl MemoryController {
    /// Builds the epoch schedule; no-op unless `clock` is the epoch start.
    ///
    /// Rotates ownership to the next core, drains that core's demand from
    /// the global queue into its per-rank queues, then fills the schedule's
    /// rank column: the three ranks with the most pending requests, keeping
    /// a rank in the same row it occupied last epoch (stickiness) and
    /// filling the remaining rows in priority order.
    pub fn construct_schedule(&mut self, clock: u64) {
        if clock != self.epoch_start {
            return;
        }
        self.epoch_start = clock + self.config.scheduler.cycle_length;

        self.prev_sch = self.sch;
        self.sch = [[self.rb_max; SCH_COLS]; RANK_SLOTS];

        self.turn = (self.turn + 1) % self.config.system.num_cpu;
        debug!("epoch @{}: turn -> core {}", clock, self.turn);

        // Drain the owner's new demand into its per-rank queues. Prefetches
        // stay behind: they only ever backfill empty slots.
        let mut i = 0;
        while i < self.transaction_queue.len() {
            let t = &self.transaction_queue[i];
            if t.core == self.turn && !t.is_prefetch {
                if let Some(t) = self.transaction_queue.remove(i) {
                    let rank = self.mapper.map(t.address).rank;
                    self.rank_q[self.turn][rank].push_back(t);
                }
            } else {
                i += 1;
            }
        }

        // Top three ranks by pending count, ties to the higher rank index.
        let num_ranks = self.config.system.num_ranks;
        let counts: Vec<usize> = (0..num_ranks)
            .map(|r| self.rank_q[self.turn][r].len())
            .collect();
        let mut order: Vec<usize> = (0..num_ranks).collect();
        order.sort_by(|&a, &b| (counts[b], b).cmp(&(counts[a], a)));
        let mut top_three: Vec<u64> = order.iter().take(RANK_SLOTS).map(|&r| r as u64).collect();

        // Stickiness: a still-hot rank keeps its row from the previous epoch.
        for row in 0..RANK_SLOTS {
            if let Some(pos) = top_three.iter().position(|&r| r == self.prev_sch[row][0]) {
                self.sch[row][0] = top_three.remove(pos);
            }
        }

        // Remaining ranks fill the unset rows in priority order.
        let mut rest = top_three.into_iter();
        for row in 0..RANK_SLOTS {
            if self.sch[row][0] == self.rb_max {
                if let Some(rank) = rest.next() {
                    self.sch[row][0] = rank;
                }
            }
        }

        debug!(
            "epoch @{}: rank order [{}, {}, {}]",
            clock, self.sch[0][0], self.sch[1][0], self.sch[2][0]
        );
    }

    /// Dispatches at most one transaction for the current slot; no-op unless
    /// `clock` is the dispatch tick.
    ///
    /// Walks the owner's queue for the slot's rank and accepts the first
    /// transaction whose bank passes the non-interference check and whose
    /// command-pair fits the command queue. An empty slot is backfilled with
    /// prefetch traffic from the global queue; prefetch banks are *not*
    /// recorded in the schedule, so the table keeps describing only the
    /// deterministic, core-owned traffic.
    pub fn dispatch_req(&mut self, clock: u64) -> Result<(), MemError> {
        if clock != self.dispatch_tick {
            return Ok(());
        }

        let mut empty_slot = true;
        let sched_rank = self.sch[self.rank_indx][0];
        if sched_rank != self.rb_max {
            let sr = sched_rank as usize;
            let mut chosen = None;
            for (i, t) in self.rank_q[self.turn][sr].iter().enumerate() {
                let mapped = self.mapper.map(t.address);
                if self.no_bank_violation(mapped.bank as u64)
                    && self.command_queue.has_room_for(2, mapped.rank, mapped.bank)
                {
                    chosen = Some((i, mapped));
                    break;
                }
            }
            if let Some((i, mapped)) = chosen {
                if let Some(transaction) = self.rank_q[self.turn][sr].remove(i) {
                    empty_slot = false;
                    debug_assert!(!transaction.is_prefetch);
                    self.sch[self.rank_indx][self.bank_indx] = mapped.bank as u64;

                    match transaction.kind {
                        TransactionKind::Read => self.stats.total_reads[transaction.core] += 1,
                        TransactionKind::Write => self.stats.total_writes[transaction.core] += 1,
                        TransactionKind::ReturnData => {}
                    }
                    self.enqueue_command_pair(
                        transaction,
                        mapped.rank,
                        mapped.bank,
                        mapped.row,
                        mapped.column,
                    )?;
                }
            }
        }

        if empty_slot {
            let mut chosen = None;
            for (i, t) in self.transaction_queue.iter().enumerate() {
                if !t.is_prefetch {
                    continue;
                }
                let mapped = self.mapper.map(t.address);
                if self.command_queue.has_room_for(2, mapped.rank, mapped.bank) {
                    chosen = Some((i, mapped));
                    break;
                }
            }
            if let Some((i, mapped)) = chosen {
                if let Some(transaction) = self.transaction_queue.remove(i) {
                    self.stats.total_pref_reads[transaction.core] += 1;
                    self.enqueue_command_pair(
                        transaction,
                        mapped.rank,
                        mapped.bank,
                        mapped.row,
                        mapped.column,
                    )?;
                }
            }
        }

        // Advance the slot: ranks cycle fastest, the bank column steps when
        // the rank row wraps.
        if self.rank_indx == RANK_SLOTS - 1 {
            self.rank_indx = 0;
            self.bank_indx = if self.bank_indx == BANK_SLOTS { 1 } else { self.bank_indx + 1 };
        } else {
            self.rank_indx += 1;
        }
        self.dispatch_tick += self.config.scheduler.t_rank;

        Ok(())
    }

    /// The non-interference bank constraint for the current slot.
    ///
    /// A bank may not repeat within the current row's already-placed
    /// columns; and when the row kept its rank from the previous epoch, it
    /// may not collide with the previous epoch's not-yet-expired tail
    /// (columns after the current one).
    pub fn no_bank_violation(&self, bank: u64) -> bool {
        for i in (1..self.bank_indx).rev() {
            if bank == self.sch[self.rank_indx][i] {
                return false;
            }
        }

        if self.sch[self.rank_indx][0] != self.prev_sch[self.rank_indx][0] {
            return true;
        }
        for i in self.bank_indx + 1..=BANK_SLOTS {
            if bank == self.prev_sch[self.rank_indx][i] {
                return false;
            }
        }
        true
    }
}
