//! Common types shared across the memory subsystem.

/// Physical address decomposition into channel/rank/bank/row/column.
pub mod addr;

/// Fatal error taxonomy for the controller and its queues.
pub mod error;

pub use addr::{AddressMapper, MappedAddress};
pub use error::MemError;
