//! Command Queue Unit Tests.
//!
//! Verifies capacity accounting, issuability gating against the bank-state
//! table, and refresh priority (drain open-row work, precharge, refresh,
//! and suppression of new activates meanwhile).

use memsim_core::mem::bank_state::{BankState, BankStatus};
use memsim_core::mem::bus_packet::{BusPacket, BusPacketKind};
use memsim_core::mem::command_queue::CommandQueue;
use memsim_core::common::error::MemError;

use crate::common::harness::test_config;

fn fresh() -> (CommandQueue, Vec<Vec<BankState>>) {
    let config = test_config();
    let banks = vec![vec![BankState::new(); config.system.num_banks]; config.system.num_ranks];
    (CommandQueue::new(&config), banks)
}

fn activate(rank: usize, bank: usize, row: u64) -> BusPacket {
    BusPacket::command(BusPacketKind::Activate, 0x40, rank, bank, row, 0)
}

fn read(rank: usize, bank: usize, row: u64) -> BusPacket {
    BusPacket::command(BusPacketKind::Read, 0x40, rank, bank, row, 0)
}

// ══════════════════════════════════════════════════════════
// 1. Capacity
// ══════════════════════════════════════════════════════════

#[test]
fn has_room_for_tracks_depth() {
    let (mut cq, _) = fresh();
    assert!(cq.has_room_for(2, 0, 0));
    for _ in 0..31 {
        cq.enqueue(activate(0, 0, 1)).unwrap();
    }
    assert!(cq.has_room_for(1, 0, 0));
    assert!(!cq.has_room_for(2, 0, 0));
    assert!(cq.has_room_for(2, 0, 1)); // other banks unaffected
}

#[test]
fn overflow_is_an_error() {
    let (mut cq, _) = fresh();
    for _ in 0..32 {
        cq.enqueue(activate(1, 2, 1)).unwrap();
    }
    assert_eq!(
        cq.enqueue(activate(1, 2, 1)),
        Err(MemError::CommandQueueOverflow { rank: 1, bank: 2 })
    );
}

#[test]
fn is_empty_per_rank() {
    let (mut cq, _) = fresh();
    assert!(cq.is_empty(0));
    cq.enqueue(activate(0, 5, 1)).unwrap();
    assert!(!cq.is_empty(0));
    assert!(cq.is_empty(1));
}

// ══════════════════════════════════════════════════════════
// 2. Issuability gating
// ══════════════════════════════════════════════════════════

#[test]
fn activate_pops_when_bank_idle() {
    let (mut cq, banks) = fresh();
    cq.enqueue(activate(0, 0, 7)).unwrap();
    let popped = cq.pop(&banks).expect("activate should issue");
    assert_eq!(popped.kind, BusPacketKind::Activate);
    assert_eq!(popped.row, 7);
}

#[test]
fn activate_waits_for_next_activate() {
    let (mut cq, mut banks) = fresh();
    banks[0][0].next_activate = 3;
    cq.enqueue(activate(0, 0, 7)).unwrap();
    assert!(cq.pop(&banks).is_none());
    cq.step();
    cq.step();
    assert!(cq.pop(&banks).is_none()); // clock 2, still early
    cq.step();
    assert!(cq.pop(&banks).is_some()); // clock 3
}

#[test]
fn read_needs_matching_open_row() {
    let (mut cq, mut banks) = fresh();
    cq.enqueue(read(0, 0, 5)).unwrap();
    assert!(cq.pop(&banks).is_none()); // bank idle

    banks[0][0].status = BankStatus::RowActive;
    banks[0][0].open_row = 6;
    assert!(cq.pop(&banks).is_none()); // wrong row

    banks[0][0].open_row = 5;
    let popped = cq.pop(&banks).expect("read to open row");
    assert_eq!(popped.kind, BusPacketKind::Read);
}

#[test]
fn round_robin_serves_both_banks() {
    let (mut cq, banks) = fresh();
    cq.enqueue(activate(0, 0, 1)).unwrap();
    cq.enqueue(activate(0, 1, 2)).unwrap();
    let first = cq.pop(&banks).unwrap();
    let second = cq.pop(&banks).unwrap();
    assert_ne!(first.bank, second.bank);
}

#[test]
fn redundant_activate_is_dropped_for_the_open_row() {
    let (mut cq, mut banks) = fresh();
    banks[0][0].status = BankStatus::RowActive;
    banks[0][0].open_row = 7;
    // A pair targeting the already-open row: the activate is redundant.
    cq.enqueue(activate(0, 0, 7)).unwrap();
    cq.enqueue(read(0, 0, 7)).unwrap();

    let popped = cq.pop(&banks).expect("column command should issue");
    assert_eq!(popped.kind, BusPacketKind::Read);
    assert!(cq.is_empty(0));
}

#[test]
fn row_conflict_precharges_before_activating() {
    let (mut cq, mut banks) = fresh();
    banks[0][0].status = BankStatus::RowActive;
    banks[0][0].open_row = 3;
    cq.enqueue(activate(0, 0, 7)).unwrap(); // wants a different row

    let popped = cq.pop(&banks).expect("precharge to close the conflict");
    assert_eq!(popped.kind, BusPacketKind::Precharge);
    assert_eq!(popped.row, 3);
    // The activate itself stays queued for after tRP.
    assert!(!cq.is_empty(0));
}

// ══════════════════════════════════════════════════════════
// 3. Refresh priority
// ══════════════════════════════════════════════════════════

#[test]
fn refresh_issues_when_rank_idle() {
    let (mut cq, banks) = fresh();
    cq.need_refresh(1);
    let popped = cq.pop(&banks).expect("refresh for idle rank");
    assert_eq!(popped.kind, BusPacketKind::Refresh);
    assert_eq!(popped.rank, 1);
    // Flag is consumed; nothing else queued.
    assert!(cq.pop(&banks).is_none());
}

#[test]
fn refresh_precharges_open_banks_first() {
    let (mut cq, mut banks) = fresh();
    cq.need_refresh(1);
    banks[1][3].status = BankStatus::RowActive;
    banks[1][3].open_row = 42;
    let popped = cq.pop(&banks).expect("precharge before refresh");
    assert_eq!(popped.kind, BusPacketKind::Precharge);
    assert_eq!(popped.rank, 1);
    assert_eq!(popped.bank, 3);
    assert_eq!(popped.row, 42);
}

#[test]
fn refresh_drains_open_row_column_command_first() {
    let (mut cq, mut banks) = fresh();
    cq.need_refresh(1);
    banks[1][3].status = BankStatus::RowActive;
    banks[1][3].open_row = 5;
    cq.enqueue(read(1, 3, 5)).unwrap();
    let popped = cq.pop(&banks).expect("drain the row hit");
    assert_eq!(popped.kind, BusPacketKind::Read);
}

#[test]
fn refresh_blocks_new_activates_to_that_rank() {
    let (mut cq, mut banks) = fresh();
    cq.need_refresh(1);
    // Rank not refresh-ready (a bank is mid-precharge), nothing to close.
    banks[1][0].status = BankStatus::Precharging;
    cq.enqueue(activate(1, 2, 9)).unwrap();
    assert!(cq.pop(&banks).is_none());

    // Other ranks are unaffected.
    cq.enqueue(activate(0, 2, 9)).unwrap();
    assert_eq!(cq.pop(&banks).unwrap().rank, 0);
}
