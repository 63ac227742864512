//! Fatal error taxonomy for the memory controller.
//!
//! Every variant here is a protocol or plumbing failure the simulation
//! cannot recover from; `update()` surfaces them as `Err` and the driver
//! aborts the run with the diagnostic. Backpressure is not an error: a full
//! transaction queue is reported by `add_transaction` returning `false`.

use std::fmt;

/// Unrecoverable memory-subsystem failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    /// A second packet was driven onto the occupied command bus.
    CommandBusCollision,

    /// A second packet was driven onto the occupied data bus.
    DataBusCollision,

    /// A non-DATA packet arrived on the rank-to-controller return path.
    ///
    /// The associated value is the packet's physical address.
    UnexpectedPacket(u64),

    /// The command queue yielded a packet kind the timing updater cannot
    /// apply (a DATA packet in the command stream).
    UnknownCommand(u64),

    /// A returned DATA packet matched no pending read.
    ///
    /// The associated value is the orphan address.
    OrphanReturn(u64),

    /// A command was enqueued past the per-bank queue depth.
    CommandQueueOverflow {
        /// Rank of the overflowing queue.
        rank: usize,
        /// Bank of the overflowing queue.
        bank: usize,
    },
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemError::CommandBusCollision => write!(f, "Command Bus Collision"),
            MemError::DataBusCollision => write!(f, "Data Bus Collision"),
            MemError::UnexpectedPacket(addr) => {
                write!(f, "non-DATA packet on return path ({:#x})", addr)
            }
            MemError::UnknownCommand(addr) => {
                write!(f, "popped a command we shouldn't have ({:#x})", addr)
            }
            MemError::OrphanReturn(addr) => {
                write!(f, "no matching pending read for returned data ({:#x})", addr)
            }
            MemError::CommandQueueOverflow { rank, bank } => {
                write!(f, "command queue overflow at rank {} bank {}", rank, bank)
            }
        }
    }
}

impl std::error::Error for MemError {}
