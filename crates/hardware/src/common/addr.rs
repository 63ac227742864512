//! Physical address decomposition.
//!
//! Maps a physical byte address onto the channel/rank/bank/row/column
//! coordinates of the device geometry. The mapping is a pure bit-slicing
//! scheme, so the same address always lands on the same location: the
//! scheduler and the dispatcher both rely on that determinism.

use crate::config::Config;

/// Decomposed physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedAddress {
    /// Channel index.
    pub channel: usize,
    /// Rank index within the channel.
    pub rank: usize,
    /// Bank index within the rank.
    pub bank: usize,
    /// Row index within the bank.
    pub row: u64,
    /// Column index within the row.
    pub column: u64,
}

/// Pure address-to-geometry mapper.
///
/// Field widths are fixed at construction from the configured geometry
/// (all counts must be powers of two). Bit layout from the LSB upward:
/// burst byte offset, channel, bank, rank, column, row.
#[derive(Debug, Clone, Copy)]
pub struct AddressMapper {
    offset_bits: u32,
    chan_bits: u32,
    bank_bits: u32,
    rank_bits: u32,
    col_bits: u32,
    row_bits: u32,
}

impl AddressMapper {
    /// Builds a mapper for the configured geometry.
    ///
    /// The geometry must already have passed [`Config::validate`]; a
    /// non-power-of-two count would silently alias here.
    pub fn new(config: &Config) -> Self {
        let burst_bytes = config.transaction_bytes() as u64;
        Self {
            offset_bits: burst_bytes.trailing_zeros(),
            chan_bits: (config.system.num_chans as u64).trailing_zeros(),
            bank_bits: (config.system.num_banks as u64).trailing_zeros(),
            rank_bits: (config.system.num_ranks as u64).trailing_zeros(),
            col_bits: (config.system.num_cols as u64).trailing_zeros(),
            row_bits: (config.system.num_rows as u64).trailing_zeros(),
        }
    }

    /// Decomposes a physical address.
    pub fn map(&self, address: u64) -> MappedAddress {
        let mut addr = address >> self.offset_bits;
        let take = |addr: &mut u64, bits: u32| -> u64 {
            if bits == 0 {
                return 0;
            }
            let field = *addr & ((1u64 << bits) - 1);
            *addr >>= bits;
            field
        };
        let channel = take(&mut addr, self.chan_bits) as usize;
        let bank = take(&mut addr, self.bank_bits) as usize;
        let rank = take(&mut addr, self.rank_bits) as usize;
        let column = take(&mut addr, self.col_bits);
        let row = take(&mut addr, self.row_bits);
        MappedAddress {
            channel,
            rank,
            bank,
            row,
            column,
        }
    }

    /// Composes a physical address from geometry coordinates.
    ///
    /// Inverse of [`map`](Self::map); used by tests and trace generators to
    /// aim a request at a specific (rank, bank, row).
    pub fn compose(&self, channel: usize, rank: usize, bank: usize, row: u64, column: u64) -> u64 {
        let mut addr = row;
        addr = (addr << self.col_bits) | column;
        addr = (addr << self.rank_bits) | rank as u64;
        addr = (addr << self.bank_bits) | bank as u64;
        addr = (addr << self.chan_bits) | channel as u64;
        addr << self.offset_bits
    }
}
