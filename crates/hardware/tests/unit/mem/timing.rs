//! Timing Updater Unit Tests.
//!
//! Verifies the deadline table applied on each command pop: same-bank,
//! same-rank, and cross-rank effects, the auto-precharge clamp, and the
//! rank-wide refresh takeover.

use memsim_core::common::error::MemError;
use memsim_core::mem::bank_state::BankStatus;
use memsim_core::mem::bus_packet::{BusPacket, BusPacketKind};
use memsim_core::MemoryController;

use crate::common::harness::test_config;

const CLOCK: u64 = 100;

fn controller_at_clock() -> MemoryController {
    let mut ctrl = MemoryController::new(&test_config());
    ctrl.current_clock_cycle = CLOCK;
    ctrl
}

fn cmd(kind: BusPacketKind, rank: usize, bank: usize, row: u64) -> BusPacket {
    BusPacket::command(kind, 0x40, rank, bank, row, 0)
}

// ══════════════════════════════════════════════════════════
// 1. READ
// ══════════════════════════════════════════════════════════

#[test]
fn read_pushes_same_bank_precharge_deadline() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Read, 1, 2, 0)).unwrap();
    // READ_TO_PRE_DELAY = 5 with the default DDR3 parameters.
    assert!(ctrl.bank_states[1][2].next_precharge >= CLOCK + 5);
    assert_eq!(ctrl.bank_states[1][2].last_command, BusPacketKind::Read);
}

#[test]
fn read_delays_column_commands_across_own_rank() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Read, 1, 2, 0)).unwrap();
    for bank in 0..8 {
        // max(tCCD, BL/2) = 4; READ_TO_WRITE_DELAY = 6.
        assert_eq!(ctrl.bank_states[1][bank].next_read, CLOCK + 4);
        assert_eq!(ctrl.bank_states[1][bank].next_write, CLOCK + 6);
    }
}

#[test]
fn read_touches_other_ranks_only_when_row_active() {
    let mut ctrl = controller_at_clock();
    ctrl.bank_states[2][0].status = BankStatus::RowActive;
    ctrl.apply_command_timing(&cmd(BusPacketKind::Read, 1, 2, 0)).unwrap();
    // BL/2 + tRTRS = 5 on the active bank of the other rank.
    assert_eq!(ctrl.bank_states[2][0].next_read, CLOCK + 5);
    assert_eq!(ctrl.bank_states[2][0].next_write, CLOCK + 6);
    // Idle banks of other ranks keep their deadlines.
    assert_eq!(ctrl.bank_states[2][1].next_read, 0);
    assert_eq!(ctrl.bank_states[3][0].next_write, 0);
}

#[test]
fn read_p_clamps_column_commands_to_next_activate() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::ReadP, 1, 2, 0)).unwrap();
    let bank = &ctrl.bank_states[1][2];
    // READ_AUTOPRE_DELAY = 15.
    assert_eq!(bank.next_activate, CLOCK + 15);
    assert_eq!(bank.next_read, bank.next_activate);
    assert_eq!(bank.next_write, bank.next_activate);
    assert_eq!(bank.last_command, BusPacketKind::ReadP);
    // Implicit precharge armed with READ_TO_PRE_DELAY.
    assert_eq!(bank.state_change_countdown, 5);
}

// ══════════════════════════════════════════════════════════
// 2. WRITE
// ══════════════════════════════════════════════════════════

#[test]
fn write_pushes_same_bank_precharge_deadline() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Write, 0, 0, 0)).unwrap();
    // WRITE_TO_PRE_DELAY = 23.
    assert!(ctrl.bank_states[0][0].next_precharge >= CLOCK + 23);
    // Same rank: WRITE_TO_READ_DELAY_B = 18, max(BL/2, tCCD) = 4.
    assert_eq!(ctrl.bank_states[0][5].next_read, CLOCK + 18);
    assert_eq!(ctrl.bank_states[0][5].next_write, CLOCK + 4);
}

#[test]
fn write_p_clamps_like_read_p() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::WriteP, 0, 1, 0)).unwrap();
    let bank = &ctrl.bank_states[0][1];
    // WRITE_AUTOPRE_DELAY = 33.
    assert_eq!(bank.next_activate, CLOCK + 33);
    assert_eq!(bank.next_read, bank.next_activate);
    assert_eq!(bank.next_write, bank.next_activate);
    assert_eq!(bank.state_change_countdown, 23);
}

// ══════════════════════════════════════════════════════════
// 3. ACTIVATE / PRECHARGE
// ══════════════════════════════════════════════════════════

#[test]
fn activate_opens_the_row() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Activate, 2, 3, 77)).unwrap();
    let bank = &ctrl.bank_states[2][3];
    assert_eq!(bank.status, BankStatus::RowActive);
    assert_eq!(bank.open_row, 77);
    assert_eq!(bank.next_activate, CLOCK + 34); // tRC
    assert_eq!(bank.next_precharge, CLOCK + 24); // tRAS
    assert_eq!(bank.next_read, CLOCK + 10); // tRCD - AL
    assert_eq!(bank.next_write, CLOCK + 10);
    // Sibling banks only see tRRD.
    assert_eq!(ctrl.bank_states[2][0].next_activate, CLOCK + 4);
    assert_eq!(ctrl.bank_states[2][0].status, BankStatus::Idle);
}

#[test]
fn precharge_closes_the_bank() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Activate, 2, 3, 77)).unwrap();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Precharge, 2, 3, 77)).unwrap();
    let bank = &ctrl.bank_states[2][3];
    assert_eq!(bank.status, BankStatus::Precharging);
    assert_eq!(bank.state_change_countdown, 10); // tRP
}

// ══════════════════════════════════════════════════════════
// 4. REFRESH
// ══════════════════════════════════════════════════════════

#[test]
fn refresh_takes_over_the_whole_rank() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&BusPacket::refresh(3)).unwrap();
    for bank in &ctrl.bank_states[3] {
        assert_eq!(bank.status, BankStatus::Refreshing);
        assert_eq!(bank.state_change_countdown, 107); // tRFC
        assert_eq!(bank.next_activate, CLOCK + 107);
    }
    // Other ranks untouched.
    assert_eq!(ctrl.bank_states[0][0].status, BankStatus::Idle);
}

// ══════════════════════════════════════════════════════════
// 5. Energy and protocol errors
// ══════════════════════════════════════════════════════════

#[test]
fn commands_accumulate_energy() {
    let mut ctrl = controller_at_clock();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Read, 1, 0, 0)).unwrap();
    ctrl.apply_command_timing(&cmd(BusPacketKind::Activate, 1, 1, 0)).unwrap();
    ctrl.apply_command_timing(&BusPacket::refresh(1)).unwrap();
    assert!(ctrl.stats.burst_energy[1] > 0);
    assert!(ctrl.stats.actpre_energy[1] > 0);
    assert!(ctrl.stats.refresh_energy[1] > 0);
    assert_eq!(ctrl.stats.burst_energy[0], 0);
}

#[test]
fn data_packet_in_command_stream_is_fatal() {
    let mut ctrl = controller_at_clock();
    let packet = BusPacket::data(0x80, 0, 0, 0, 0, vec![0; 64]);
    assert_eq!(
        ctrl.apply_command_timing(&packet),
        Err(MemError::UnknownCommand(0x80))
    );
}
