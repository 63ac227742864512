//! Epoch Schedule Unit Tests.
//!
//! Verifies turn rotation, top-three rank selection with stickiness, the
//! bank-violation constraint, and the non-interference property itself:
//! the schedule one core produces is independent of other cores' traffic.

use memsim_core::common::addr::AddressMapper;
use memsim_core::mem::transaction::Transaction;
use memsim_core::MemoryController;

use crate::common::harness::{test_config, TestContext};

// ══════════════════════════════════════════════════════════
// 1. Turn rotation
// ══════════════════════════════════════════════════════════

#[test]
fn turn_rotates_one_two_zero() {
    let mut config = test_config();
    config.scheduler.cycle_length = 100;
    let mut ctrl = MemoryController::new(&config);

    ctrl.construct_schedule(0);
    assert_eq!(ctrl.turn, 0); // core 0 owns the first epoch

    ctrl.current_clock_cycle = 100;
    ctrl.construct_schedule(100);
    assert_eq!(ctrl.turn, 1);

    ctrl.current_clock_cycle = 200;
    ctrl.construct_schedule(200);
    assert_eq!(ctrl.turn, 2);

    ctrl.current_clock_cycle = 300;
    ctrl.construct_schedule(300);
    assert_eq!(ctrl.turn, 0);
}

#[test]
fn off_boundary_call_is_a_no_op() {
    let mut ctrl = MemoryController::new(&test_config());
    ctrl.construct_schedule(0);
    let sch = ctrl.sch;
    let turn = ctrl.turn;
    ctrl.construct_schedule(50); // not an epoch boundary
    assert_eq!(ctrl.sch, sch);
    assert_eq!(ctrl.turn, turn);
}

// ══════════════════════════════════════════════════════════
// 2. Rank selection
// ══════════════════════════════════════════════════════════

#[test]
fn ties_go_to_the_higher_rank_index() {
    let mut config = test_config();
    config.system.num_ranks = 8;
    let mut ctrl = MemoryController::new(&config);

    // No demand at all: every count is zero, so the max-heap order is by
    // rank index descending.
    ctrl.construct_schedule(0);
    assert_eq!(ctrl.sch[0][0], 7);
    assert_eq!(ctrl.sch[1][0], 6);
    assert_eq!(ctrl.sch[2][0], 5);
}

#[test]
fn sticky_rank_keeps_its_row() {
    let mut config = test_config();
    config.system.num_ranks = 8;
    let mut ctrl = MemoryController::new(&config);
    let mapper = AddressMapper::new(&config);

    // Previous epoch's table (copied into prev_sch at the boundary): row 0
    // served rank 2; rows 1 and 2 served ranks that won't be hot again.
    ctrl.sch[0][0] = 2;
    ctrl.sch[1][0] = 6;
    ctrl.sch[2][0] = 7;

    // Demand for the next owner (core 1): rank 2 hottest, then 5, then 1.
    ctrl.turn = 0;
    for i in 0..3 {
        ctrl.add_transaction(Transaction::read(mapper.compose(0, 2, 0, i, 0), 1));
    }
    for i in 0..2 {
        ctrl.add_transaction(Transaction::read(mapper.compose(0, 5, 0, i, 0), 1));
    }
    ctrl.add_transaction(Transaction::read(mapper.compose(0, 1, 0, 0, 0), 1));

    ctrl.construct_schedule(0);
    assert_eq!(ctrl.turn, 1);
    // Rank 2 sticks to row 0; 5 and 1 fill the remaining rows in priority
    // order.
    assert_eq!(ctrl.sch[0][0], 2);
    assert_eq!(ctrl.sch[1][0], 5);
    assert_eq!(ctrl.sch[2][0], 1);
}

#[test]
fn epoch_drain_moves_only_the_owner_demand() {
    let config = test_config();
    let mut ctrl = MemoryController::new(&config);
    let mapper = AddressMapper::new(&config);

    ctrl.add_transaction(Transaction::read(mapper.compose(0, 0, 0, 1, 0), 0));
    ctrl.add_transaction(Transaction::read(mapper.compose(0, 0, 0, 2, 0), 1));
    ctrl.add_transaction(Transaction::prefetch_read(mapper.compose(0, 0, 0, 3, 0), 0));

    ctrl.construct_schedule(0); // owner: core 0
    assert_eq!(ctrl.rank_q[0][0].len(), 1); // only core 0's demand moved
    assert_eq!(ctrl.transaction_queue.len(), 2); // core 1 demand + prefetch stay
}

// ══════════════════════════════════════════════════════════
// 3. Bank violation constraint
// ══════════════════════════════════════════════════════════

#[test]
fn bank_may_not_repeat_within_the_row() {
    let mut ctrl = MemoryController::new(&test_config());
    ctrl.rank_indx = 0;
    ctrl.bank_indx = 2;
    ctrl.sch[0][0] = 3;
    ctrl.sch[0][1] = 5; // bank 5 already placed this row

    assert!(!ctrl.no_bank_violation(5));
    assert!(ctrl.no_bank_violation(4));
}

#[test]
fn sticky_rank_also_checks_previous_epoch_tail() {
    let mut ctrl = MemoryController::new(&test_config());
    ctrl.rank_indx = 0;
    ctrl.bank_indx = 2;
    ctrl.sch[0][0] = 3;
    ctrl.prev_sch[0][0] = 3; // same rank as last epoch
    ctrl.prev_sch[0][3] = 6; // tail of the previous epoch's row

    assert!(!ctrl.no_bank_violation(6));
    assert!(ctrl.no_bank_violation(4));
    // The already-resolved head of the previous row does not constrain.
    ctrl.prev_sch[0][1] = 7;
    assert!(ctrl.no_bank_violation(7));
}

#[test]
fn rank_change_clears_previous_epoch_constraint() {
    let mut ctrl = MemoryController::new(&test_config());
    ctrl.rank_indx = 0;
    ctrl.bank_indx = 2;
    ctrl.sch[0][0] = 3;
    ctrl.prev_sch[0][0] = 1; // different rank in this row last epoch
    ctrl.prev_sch[0][3] = 6;

    assert!(ctrl.no_bank_violation(6));
}

// ══════════════════════════════════════════════════════════
// 4. Non-interference
// ══════════════════════════════════════════════════════════

#[test]
fn schedule_ignores_other_cores_traffic() {
    // Two identical systems with identical core-0 demand; the second also
    // carries core-1 demand and a core-2 prefetch.
    let mut quiet = TestContext::new();
    let mut noisy = TestContext::new();

    let demand: Vec<u64> = (0..6)
        .map(|i| quiet.addr((i % 4) as usize, (i % 8) as usize, i))
        .collect();
    for &addr in &demand {
        quiet.read(addr, 0);
        noisy.read(addr, 0);
    }
    noisy.read(noisy.addr(1, 1, 40), 1);
    noisy.read(noisy.addr(2, 2, 41), 1);
    noisy
        .system
        .add_transaction(Transaction::prefetch_read(noisy.addr(3, 3, 42), 2));

    // One full epoch owned by core 0.
    let epoch = quiet.system.config.scheduler.cycle_length;
    quiet.run_cycles(epoch);
    noisy.run_cycles(epoch);

    assert_eq!(quiet.system.controller.sch, noisy.system.controller.sch);
}
