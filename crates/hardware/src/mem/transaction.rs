//! Memory request records.
//!
//! A [`Transaction`] is a single request from a core. It is owned uniquely
//! and moves across exactly one container at a time: the global transaction
//! queue, then (for demand traffic) a per-core per-rank queue, and for reads
//! the pending-read queue until data comes back.

use std::fmt;

/// The kind of a memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Data read request.
    Read,
    /// Data write request; the payload travels with the transaction.
    Write,
    /// Data returning from a rank toward the requestor.
    ReturnData,
}

/// A single memory request.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Request kind.
    pub kind: TransactionKind,
    /// Physical byte address.
    pub address: u64,
    /// Opaque payload; empty for reads until data returns.
    pub data: Vec<u8>,
    /// Originating core index.
    pub core: usize,
    /// Whether this is prefetch traffic (backfill only, never scheduled as
    /// demand).
    pub is_prefetch: bool,
    /// Cycle the controller accepted the request; stamped by
    /// `add_transaction`.
    pub time_added: u64,
}

impl Transaction {
    /// Creates a demand read request.
    pub fn read(address: u64, core: usize) -> Self {
        Self {
            kind: TransactionKind::Read,
            address,
            data: Vec::new(),
            core,
            is_prefetch: false,
            time_added: 0,
        }
    }

    /// Creates a demand write request carrying `data`.
    pub fn write(address: u64, data: Vec<u8>, core: usize) -> Self {
        Self {
            kind: TransactionKind::Write,
            address,
            data,
            core,
            is_prefetch: false,
            time_added: 0,
        }
    }

    /// Creates a prefetch read request.
    pub fn prefetch_read(address: u64, core: usize) -> Self {
        Self {
            is_prefetch: true,
            ..Self::read(address, core)
        }
    }

    /// Creates a data-return record from a rank's DATA packet.
    pub fn return_data(address: u64, data: Vec<u8>) -> Self {
        Self {
            kind: TransactionKind::ReturnData,
            address,
            data,
            core: 0,
            is_prefetch: false,
            time_added: 0,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TransactionKind::Read => "READ",
            TransactionKind::Write => "WRITE",
            TransactionKind::ReturnData => "RETURN",
        };
        write!(
            f,
            "T [{}] [{:#x}] [core {}]{}",
            kind,
            self.address,
            self.core,
            if self.is_prefetch { " [pref]" } else { "" }
        )
    }
}
