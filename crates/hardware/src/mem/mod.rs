//! DRAM memory subsystem.
//!
//! This module groups the data model and the engines of the memory channel:
//! 1. **Data model:** [`transaction`] and [`bus_packet`] records that move
//!    through the pipeline, each owned by exactly one container at a time.
//! 2. **Device state:** [`bank_state`] deadlines and [`storage`] payload
//!    bytes.
//! 3. **Engines:** the [`command_queue`], the [`rank`] model, and the
//!    [`controller`] that drives everything one clock cycle at a time.

/// Per-(rank,bank) state machine and timing deadlines.
pub mod bank_state;
/// Bus-level command and data packets.
pub mod bus_packet;
/// Per-bank command FIFOs with issuability checks.
pub mod command_queue;
/// The memory controller and its scheduling engines.
pub mod controller;
/// Rank model: command sink, read-return source.
pub mod rank;
/// Byte-addressable backing store for data payloads.
pub mod storage;
/// Memory request records.
pub mod transaction;

pub use bank_state::{BankState, BankStatus};
pub use bus_packet::{BusPacket, BusPacketKind};
pub use command_queue::CommandQueue;
pub use rank::Rank;
pub use storage::{DataStore, DramStore};
pub use transaction::{Transaction, TransactionKind};
