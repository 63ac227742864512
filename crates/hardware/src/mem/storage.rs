//! Byte-addressable backing store for data payloads.
//!
//! The simulator carries write data opaquely, but it does carry it: a read
//! that follows a write to the same address returns the written bytes. Each
//! rank owns one [`DramStore`] sized to its full addressable span (rows x
//! columns x burst bytes). Capacities that large would be wasteful to touch
//! eagerly, so on Unix the store asks the OS for an overcommitted anonymous
//! mapping and pays for pages only as bursts land in them; elsewhere (or if
//! the kernel refuses the mapping) it degrades to a zeroed heap buffer.

use std::slice;

use crate::config::Config;

/// Burst-granular byte store.
///
/// Implementors must be addressable by physical byte address; bursts are
/// aligned down to their own size.
pub trait DataStore {
    /// Reads `len` bytes at the burst containing `address`.
    fn read_burst(&self, address: u64, len: usize) -> Vec<u8>;

    /// Writes `data` at the burst containing `address`.
    fn write_burst(&mut self, address: u64, data: &[u8]);
}

/// One rank's worth of payload bytes.
///
/// The capacity comes from the validated geometry, so it is a power of two
/// by construction and the address mask needs no runtime check.
pub struct DramStore {
    backing: Backing,
    mask: u64,
}

enum Backing {
    /// Demand-paged anonymous mapping (Unix only).
    #[cfg(unix)]
    Mapped { base: *mut u8, len: usize },
    /// Plain heap buffer.
    Heap(Vec<u8>),
}

unsafe impl Send for DramStore {}
unsafe impl Sync for DramStore {}

impl DramStore {
    /// Creates the store for one rank of the configured device.
    ///
    /// Capacity is the rank's addressable span: `num_rows * num_cols` bursts
    /// of `transaction_bytes` each. With the geometry validated as powers of
    /// two, every mapped (row, column) lands on a distinct burst slot.
    pub fn for_rank(config: &Config) -> Self {
        let capacity =
            config.transaction_bytes() * config.system.num_cols * config.system.num_rows;
        Self {
            backing: Backing::allocate(capacity),
            mask: capacity as u64 - 1,
        }
    }

    /// Returns the capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.backing.len()
    }

    fn offset(&self, address: u64, len: usize) -> usize {
        let aligned = if len.is_power_of_two() {
            address & !(len as u64 - 1)
        } else {
            address
        };
        (aligned & self.mask) as usize
    }
}

impl DataStore for DramStore {
    fn read_burst(&self, address: u64, len: usize) -> Vec<u8> {
        let start = self.offset(address, len);
        let end = (start + len).min(self.backing.len());
        self.backing.bytes()[start..end].to_vec()
    }

    fn write_burst(&mut self, address: u64, data: &[u8]) {
        let start = self.offset(address, data.len());
        let end = (start + data.len()).min(self.backing.len());
        self.backing.bytes_mut()[start..end].copy_from_slice(&data[..end - start]);
    }
}

impl Backing {
    fn allocate(len: usize) -> Self {
        #[cfg(unix)]
        {
            let base = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                    -1,
                    0,
                )
            };
            if base != libc::MAP_FAILED {
                return Backing::Mapped {
                    base: base.cast(),
                    len,
                };
            }
            // Mapping refused (ulimit, exotic platform): fall back to the
            // heap rather than abort a simulation over storage strategy.
        }
        Backing::Heap(vec![0; len])
    }

    fn len(&self) -> usize {
        match self {
            #[cfg(unix)]
            Backing::Mapped { len, .. } => *len,
            Backing::Heap(buf) => buf.len(),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            Backing::Mapped { base, len } => unsafe { slice::from_raw_parts(*base, *len) },
            Backing::Heap(buf) => buf,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            #[cfg(unix)]
            Backing::Mapped { base, len } => unsafe { slice::from_raw_parts_mut(*base, *len) },
            Backing::Heap(buf) => buf,
        }
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        // The heap variant frees itself; only the mapping needs help.
        #[cfg(unix)]
        if let Backing::Mapped { base, len } = self {
            unsafe {
                libc::munmap(base.cast::<libc::c_void>(), *len);
            }
        }
    }
}
