//! Simulation driver and trace front end.

/// Top-level memory system: controller, ranks, clock, callbacks.
pub mod system;

/// Trace-file parsing and trace-driven simulation.
pub mod trace;

pub use system::MemorySystem;
pub use trace::{load_trace, run_trace, TraceEntry};
