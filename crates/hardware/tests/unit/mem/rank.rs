//! Rank Model Unit Tests.
//!
//! Verifies the read-return latency, data round-trips through the backing
//! store, refresh-flag clearing, and the store call pattern via a mock.

use memsim_core::mem::bus_packet::{BusPacket, BusPacketKind};
use memsim_core::mem::rank::Rank;

use crate::common::harness::test_config;
use crate::common::mocks::store::{MockStore, VecStore};

fn read_cmd(address: u64) -> BusPacket {
    BusPacket::command(BusPacketKind::Read, address, 1, 2, 3, 4)
}

// ══════════════════════════════════════════════════════════
// 1. Read return latency
// ══════════════════════════════════════════════════════════

#[test]
fn read_returns_after_rl_plus_half_burst() {
    let config = test_config();
    let mut rank = Rank::new(1, Box::new(VecStore::new()), &config);
    rank.receive_from_bus(read_cmd(0x1000));

    // RL + BL/2 = 10 + 4 = 14 with the default timing.
    for cycle in 1..=13 {
        assert!(rank.update().is_none(), "returned early at cycle {}", cycle);
    }
    let packet = rank.update().expect("data due at cycle 14");
    assert_eq!(packet.kind, BusPacketKind::Data);
    assert_eq!(packet.address, 0x1000);
}

#[test]
fn returns_preserve_fifo_order() {
    let config = test_config();
    let mut rank = Rank::new(1, Box::new(VecStore::new()), &config);
    rank.receive_from_bus(read_cmd(0x1000));
    rank.receive_from_bus(read_cmd(0x2000));

    let mut returned = Vec::new();
    for _ in 0..40 {
        if let Some(packet) = rank.update() {
            returned.push(packet.address);
        }
    }
    assert_eq!(returned, vec![0x1000, 0x2000]);
}

// ══════════════════════════════════════════════════════════
// 2. Data round trip
// ══════════════════════════════════════════════════════════

#[test]
fn write_then_read_returns_written_bytes() {
    let config = test_config();
    let burst = config.transaction_bytes();
    let payload: Vec<u8> = (0..burst as u8).collect();
    let mut rank = Rank::new(1, Box::new(VecStore::new()), &config);

    rank.receive_from_bus(BusPacket::data(0x1000, 1, 2, 3, 4, payload.clone()));
    rank.receive_from_bus(read_cmd(0x1000));

    let packet = loop {
        if let Some(p) = rank.update() {
            break p;
        }
    };
    assert_eq!(packet.data, payload);
}

// ══════════════════════════════════════════════════════════
// 3. Refresh and power flags
// ══════════════════════════════════════════════════════════

#[test]
fn refresh_packet_clears_waiting_flag() {
    let config = test_config();
    let mut rank = Rank::new(2, Box::new(VecStore::new()), &config);
    rank.refresh_waiting = true;
    rank.receive_from_bus(BusPacket::refresh(2));
    assert!(!rank.refresh_waiting);
}

#[test]
fn power_state_toggles() {
    let config = test_config();
    let mut rank = Rank::new(0, Box::new(VecStore::new()), &config);
    assert!(!rank.is_powered_down());
    rank.power_down();
    assert!(rank.is_powered_down());
    rank.power_up();
    assert!(!rank.is_powered_down());
}

// ══════════════════════════════════════════════════════════
// 4. Store interaction (mocked)
// ══════════════════════════════════════════════════════════

#[test]
fn read_fetches_one_full_burst_from_store() {
    let config = test_config();
    let burst = config.transaction_bytes();

    let mut store = MockStore::new();
    store
        .expect_read_burst()
        .withf(move |&addr, &len| addr == 0x1000 && len == burst)
        .times(1)
        .returning(|_, len| vec![0xAB; len]);

    let mut rank = Rank::new(1, Box::new(store), &config);
    rank.receive_from_bus(read_cmd(0x1000));
}
