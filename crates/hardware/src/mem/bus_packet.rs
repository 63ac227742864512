//! Bus-level command and data packets.
//!
//! One [`BusPacket`] is one event on the command or data bus. Ownership
//! transfers along the pipeline: dispatcher to command queue, command queue
//! to the bus slot, bus slot to the rank; DATA packets travel the other way.

use std::fmt;

/// Command or data packet kind with standard JEDEC semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusPacketKind {
    /// Open a row.
    Activate,
    /// Column read.
    Read,
    /// Column read with auto-precharge.
    ReadP,
    /// Column write.
    Write,
    /// Column write with auto-precharge.
    WriteP,
    /// Close the open row.
    Precharge,
    /// Rank-wide refresh.
    Refresh,
    /// Data burst (either direction).
    Data,
}

/// One bus-level event.
#[derive(Debug, Clone)]
pub struct BusPacket {
    /// Packet kind.
    pub kind: BusPacketKind,
    /// Physical address the packet belongs to.
    pub address: u64,
    /// Destination rank.
    pub rank: usize,
    /// Destination bank.
    pub bank: usize,
    /// Row (meaningful for ACTIVATE; carried for logging elsewhere).
    pub row: u64,
    /// Column (meaningful for column commands).
    pub column: u64,
    /// Payload bytes; empty for pure commands.
    pub data: Vec<u8>,
}

impl BusPacket {
    /// Creates a command packet without payload.
    pub fn command(
        kind: BusPacketKind,
        address: u64,
        rank: usize,
        bank: usize,
        row: u64,
        column: u64,
    ) -> Self {
        Self {
            kind,
            address,
            rank,
            bank,
            row,
            column,
            data: Vec::new(),
        }
    }

    /// Creates a DATA packet carrying `data`.
    pub fn data(address: u64, rank: usize, bank: usize, row: u64, column: u64, data: Vec<u8>) -> Self {
        Self {
            kind: BusPacketKind::Data,
            address,
            rank,
            bank,
            row,
            column,
            data,
        }
    }

    /// Creates a rank-wide REFRESH packet.
    pub fn refresh(rank: usize) -> Self {
        Self::command(BusPacketKind::Refresh, 0, rank, 0, 0, 0)
    }

    /// Whether this packet is a write column command (plain or
    /// auto-precharge).
    pub fn is_write(&self) -> bool {
        matches!(self.kind, BusPacketKind::Write | BusPacketKind::WriteP)
    }
}

impl fmt::Display for BusPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BusPacketKind::Activate => "ACT",
            BusPacketKind::Read => "READ",
            BusPacketKind::ReadP => "READ_P",
            BusPacketKind::Write => "WRITE",
            BusPacketKind::WriteP => "WRITE_P",
            BusPacketKind::Precharge => "PRE",
            BusPacketKind::Refresh => "REF",
            BusPacketKind::Data => "DATA",
        };
        write!(
            f,
            "BP [{}] addr={:#x} r={} b={} row={:#x} col={:#x}",
            kind, self.address, self.rank, self.bank, self.row, self.column
        )
    }
}
