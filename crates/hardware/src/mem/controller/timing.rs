//! Command-pop timing updater.
//!
//! When the command queue yields a packet, every affected bank's deadlines
//! move forward. All updates are monotone: a deadline only ever becomes
//! `max(deadline, now + latency)`, except REFRESH which owns the whole rank
//! outright. Energy for the command is accumulated inline, since the IDD
//! current to charge depends on the command kind.

use crate::common::error::MemError;
use crate::mem::bank_state::BankStatus;
use crate::mem::bus_packet::{BusPacket, BusPacketKind};
use crate::mem::controller::MemoryController;

impl MemoryController {
    /// Applies the deadline table for one popped command.
    pub fn apply_command_timing(&mut self, packet: &BusPacket) -> Result<(), MemError> {
        let clock = self.current_clock_cycle;
        let t = self.timing;
        let tm = self.config.timing.clone();
        let pw = self.config.power.clone();
        let devices = self.config.system.num_devices;
        let half_burst = tm.bl / 2;
        let (rank, bank) = (packet.rank, packet.bank);

        match packet.kind {
            BusPacketKind::Read | BusPacketKind::ReadP => {
                self.stats.burst_energy[rank] +=
                    (pw.idd4r - pw.idd3n) * half_burst * devices;

                if packet.kind == BusPacketKind::ReadP {
                    let state = &mut self.bank_states[rank][bank];
                    state.next_activate = state.next_activate.max(clock + t.read_autopre_delay);
                    state.last_command = BusPacketKind::ReadP;
                    state.state_change_countdown = t.read_to_pre_delay;
                } else {
                    let state = &mut self.bank_states[rank][bank];
                    state.next_precharge = state.next_precharge.max(clock + t.read_to_pre_delay);
                    state.last_command = BusPacketKind::Read;
                }

                for (r, rank_banks) in self.bank_states.iter_mut().enumerate() {
                    for state in rank_banks.iter_mut() {
                        if r != rank {
                            if state.status == BankStatus::RowActive {
                                state.next_read =
                                    state.next_read.max(clock + half_burst + tm.trtrs);
                                state.next_write =
                                    state.next_write.max(clock + t.read_to_write_delay);
                            }
                        } else {
                            state.next_read =
                                state.next_read.max(clock + tm.tccd.max(half_burst));
                            state.next_write =
                                state.next_write.max(clock + t.read_to_write_delay);
                        }
                    }
                }

                if packet.kind == BusPacketKind::ReadP {
                    // Forbid further column commands until the auto-precharge
                    // resolves.
                    let state = &mut self.bank_states[rank][bank];
                    state.next_read = state.next_activate;
                    state.next_write = state.next_activate;
                }
            }

            BusPacketKind::Write | BusPacketKind::WriteP => {
                self.stats.burst_energy[rank] +=
                    (pw.idd4w - pw.idd3n) * half_burst * devices;

                if packet.kind == BusPacketKind::WriteP {
                    let state = &mut self.bank_states[rank][bank];
                    state.next_activate = state.next_activate.max(clock + t.write_autopre_delay);
                    state.last_command = BusPacketKind::WriteP;
                    state.state_change_countdown = t.write_to_pre_delay;
                } else {
                    let state = &mut self.bank_states[rank][bank];
                    state.next_precharge =
                        state.next_precharge.max(clock + t.write_to_pre_delay);
                    state.last_command = BusPacketKind::Write;
                }

                for (r, rank_banks) in self.bank_states.iter_mut().enumerate() {
                    for state in rank_banks.iter_mut() {
                        if r != rank {
                            if state.status == BankStatus::RowActive {
                                state.next_write =
                                    state.next_write.max(clock + half_burst + tm.trtrs);
                                state.next_read =
                                    state.next_read.max(clock + t.write_to_read_delay_r);
                            }
                        } else {
                            state.next_write =
                                state.next_write.max(clock + half_burst.max(tm.tccd));
                            state.next_read =
                                state.next_read.max(clock + t.write_to_read_delay_b);
                        }
                    }
                }

                if packet.kind == BusPacketKind::WriteP {
                    let state = &mut self.bank_states[rank][bank];
                    state.next_read = state.next_activate;
                    state.next_write = state.next_activate;
                }
            }

            BusPacketKind::Activate => {
                self.stats.actpre_energy[rank] += (pw.idd0 * tm.trc)
                    .saturating_sub(pw.idd3n * tm.tras + pw.idd2n * (tm.trc - tm.tras))
                    * devices;

                let column_delay = tm.trcd.saturating_sub(tm.tal);
                let state = &mut self.bank_states[rank][bank];
                state.status = BankStatus::RowActive;
                state.last_command = BusPacketKind::Activate;
                state.open_row = packet.row;
                state.next_activate = state.next_activate.max(clock + tm.trc);
                state.next_precharge = state.next_precharge.max(clock + tm.tras);
                state.next_read = state.next_read.max(clock + column_delay);
                state.next_write = state.next_write.max(clock + column_delay);

                for (b, state) in self.bank_states[rank].iter_mut().enumerate() {
                    if b != bank {
                        state.next_activate = state.next_activate.max(clock + tm.trrd);
                    }
                }
            }

            BusPacketKind::Precharge => {
                let state = &mut self.bank_states[rank][bank];
                state.status = BankStatus::Precharging;
                state.last_command = BusPacketKind::Precharge;
                state.state_change_countdown = tm.trp;
                state.next_activate = state.next_activate.max(clock + tm.trp);
            }

            BusPacketKind::Refresh => {
                self.stats.refresh_energy[rank] +=
                    (pw.idd5 - pw.idd3n) * tm.trfc * devices;

                for state in self.bank_states[rank].iter_mut() {
                    state.status = BankStatus::Refreshing;
                    state.last_command = BusPacketKind::Refresh;
                    state.state_change_countdown = tm.trfc;
                    state.next_activate = clock + tm.trfc;
                }
            }

            BusPacketKind::Data => return Err(MemError::UnknownCommand(packet.address)),
        }

        Ok(())
    }
}
