//! Power-state governor and background energy accounting.
//!
//! With low-power mode enabled, a rank whose command queues are empty, with
//! no refresh pending and every bank idle, is powered down; it powers back
//! up once work or a refresh shows up and the CKE pulse width has elapsed.
//! Background energy accrues every cycle per rank at the current matching
//! its state: IDD3N with any bank open, IDD2P powered down, IDD2N otherwise.

use crate::mem::bank_state::BankStatus;
use crate::mem::controller::MemoryController;
use crate::mem::rank::Rank;

impl MemoryController {
    /// Per-cycle power governance and energy accumulation for every rank.
    pub(crate) fn update_power(&mut self, ranks: &mut [Rank]) {
        let clock = self.current_clock_cycle;
        let num_banks = self.config.system.num_banks;
        let tcke = self.config.timing.tcke;
        let txp = self.config.timing.txp;
        let devices = self.config.system.num_devices;
        let pw = self.config.power.clone();

        for i in 0..self.config.system.num_ranks {
            if pw.use_low_power {
                if self.command_queue.is_empty(i) && !ranks[i].refresh_waiting {
                    let all_idle = self.bank_states[i]
                        .iter()
                        .all(|b| b.status == BankStatus::Idle);
                    if all_idle {
                        self.powered_down[i] = true;
                        ranks[i].power_down();
                        for b in 0..num_banks {
                            self.bank_states[i][b].status = BankStatus::PowerDown;
                            self.bank_states[i][b].next_power_up = clock + tcke;
                        }
                    }
                } else if self.powered_down[i] && clock >= self.bank_states[i][0].next_power_up {
                    self.powered_down[i] = false;
                    ranks[i].power_up();
                    for b in 0..num_banks {
                        self.bank_states[i][b].status = BankStatus::Idle;
                        self.bank_states[i][b].next_activate = clock + txp;
                    }
                }
            }

            let bank_open = self.bank_states[i].iter().any(|b| {
                matches!(b.status, BankStatus::Refreshing | BankStatus::RowActive)
            });
            if bank_open {
                self.stats.background_energy[i] += pw.idd3n * devices;
            } else if self.powered_down[i] {
                self.stats.background_energy[i] += pw.idd2p * devices;
            } else {
                self.stats.background_energy[i] += pw.idd2n * devices;
            }
        }
    }
}
