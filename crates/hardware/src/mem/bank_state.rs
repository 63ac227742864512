//! Per-(rank,bank) state machine and timing deadlines.
//!
//! Each bank tracks its protocol state, the open row, and the earliest clock
//! at which each command class may next be issued. A command X is legal only
//! when the bank is in X's precondition state and `cycle >= next_x`; the
//! command queue checks both against this table before popping anything.

use crate::mem::bus_packet::BusPacketKind;

/// Protocol state of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankStatus {
    /// No row open; ready for ACTIVATE.
    Idle,
    /// A row is open; column commands allowed.
    RowActive,
    /// Row being closed; implicit transition to Idle after tRP.
    Precharging,
    /// Rank-wide refresh in progress; Idle after tRFC.
    Refreshing,
    /// Rank is powered down.
    PowerDown,
}

/// State and deadlines for one (rank, bank).
#[derive(Debug, Clone)]
pub struct BankState {
    /// Current protocol state.
    pub status: BankStatus,
    /// Open row address; meaningful only while `RowActive`.
    pub open_row: u64,
    /// Most recent command whose implicit transition may still be pending.
    pub last_command: BusPacketKind,
    /// Cycles until `last_command`'s implicit transition applies; zero means
    /// it already has.
    pub state_change_countdown: u64,
    /// Earliest cycle a READ may issue.
    pub next_read: u64,
    /// Earliest cycle a WRITE may issue.
    pub next_write: u64,
    /// Earliest cycle an ACTIVATE may issue.
    pub next_activate: u64,
    /// Earliest cycle a PRECHARGE may issue.
    pub next_precharge: u64,
    /// Earliest cycle a power-down exit may complete.
    pub next_power_up: u64,
}

impl BankState {
    /// Creates an idle bank with all deadlines at cycle zero.
    pub fn new() -> Self {
        Self {
            status: BankStatus::Idle,
            open_row: 0,
            last_command: BusPacketKind::Precharge,
            state_change_countdown: 0,
            next_read: 0,
            next_write: 0,
            next_activate: 0,
            next_precharge: 0,
            next_power_up: 0,
        }
    }

    /// Per-cycle countdown update.
    ///
    /// Decrements the state-change countdown; when it reaches zero the
    /// implicit transition of `last_command` applies: an auto-precharge
    /// command chains into Precharging for `t_rp` more cycles, and a
    /// completed PRECHARGE or REFRESH leaves the bank Idle.
    pub fn tick(&mut self, t_rp: u64) {
        if self.state_change_countdown == 0 {
            return;
        }
        self.state_change_countdown -= 1;
        if self.state_change_countdown > 0 {
            return;
        }
        match self.last_command {
            BusPacketKind::ReadP | BusPacketKind::WriteP => {
                self.status = BankStatus::Precharging;
                self.last_command = BusPacketKind::Precharge;
                self.state_change_countdown = t_rp;
            }
            BusPacketKind::Refresh | BusPacketKind::Precharge => {
                self.status = BankStatus::Idle;
            }
            _ => {}
        }
    }
}

impl Default for BankState {
    fn default() -> Self {
        Self::new()
    }
}
