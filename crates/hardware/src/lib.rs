//! Cycle-accurate DRAM memory system simulator library.
//!
//! This crate implements a multi-core DRAM memory controller that enforces a
//! non-interference scheduling discipline, with the following:
//! 1. **Memory:** Bank state machines, command queue, ranks, and a DDR-style
//!    timing model driven one command at a time.
//! 2. **Scheduling:** Per-epoch schedule construction and slot dispatch so
//!    that command issue for one core's epoch does not depend on the traffic
//!    of other cores.
//! 3. **Power:** Per-rank low-power entry/exit and energy accounting.
//! 4. **Simulation:** System driver, trace-file front end, configuration, and
//!    statistics collection.

/// Common types (address decomposition, error taxonomy).
pub mod common;
/// Simulator configuration (defaults, hierarchical config structures).
pub mod config;
/// DRAM memory subsystem (transactions, bus packets, banks, queues, ranks,
/// controller).
pub mod mem;
/// Simulation driver and trace front end.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The memory controller; usually driven through a [`sim::MemorySystem`].
pub use crate::mem::controller::MemoryController;
/// Top-level system (controller + ranks + clock); construct with
/// `MemorySystem::new`.
pub use crate::sim::MemorySystem;
