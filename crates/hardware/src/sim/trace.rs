//! Trace-file parsing and trace-driven simulation.
//!
//! A trace is a text file with one request per line:
//!
//! ```text
//! <hex-address> <READ|WRITE|P_READ> <cycle> [core]
//! ```
//!
//! `P_READ` marks a prefetch read. The core index defaults to 0 when
//! omitted. Lines starting with `#` and blank lines are skipped; anything
//! else malformed is an error naming the line. Entries must be sorted by
//! cycle.

use std::fs;
use std::path::Path;

use crate::mem::transaction::{Transaction, TransactionKind};
use crate::sim::system::MemorySystem;

/// One parsed trace request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    /// Physical byte address.
    pub address: u64,
    /// Read or write.
    pub kind: TransactionKind,
    /// Earliest cycle the request may be injected.
    pub cycle: u64,
    /// Originating core.
    pub core: usize,
    /// Whether the request is prefetch traffic.
    pub is_prefetch: bool,
}

/// Loads and parses a trace file.
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceEntry>, String> {
    let text = fs::read_to_string(path.as_ref())
        .map_err(|e| format!("cannot read {}: {}", path.as_ref().display(), e))?;
    parse_trace(&text)
}

/// Parses trace text; exposed separately so tests can feed strings.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>, String> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(parse_line(line, lineno + 1)?);
    }
    if !entries.windows(2).all(|w| w[0].cycle <= w[1].cycle) {
        return Err("trace entries must be sorted by cycle".into());
    }
    Ok(entries)
}

fn parse_line(line: &str, lineno: usize) -> Result<TraceEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 || fields.len() > 4 {
        return Err(format!("line {}: expected 'ADDR OP CYCLE [CORE]'", lineno));
    }

    let addr_text = fields[0].trim_start_matches("0x").trim_start_matches("0X");
    let address = u64::from_str_radix(addr_text, 16)
        .map_err(|e| format!("line {}: bad address {:?}: {}", lineno, fields[0], e))?;

    let (kind, is_prefetch) = match fields[1] {
        "READ" => (TransactionKind::Read, false),
        "WRITE" => (TransactionKind::Write, false),
        "P_READ" => (TransactionKind::Read, true),
        other => return Err(format!("line {}: unknown op {:?}", lineno, other)),
    };

    let cycle = fields[2]
        .parse::<u64>()
        .map_err(|e| format!("line {}: bad cycle {:?}: {}", lineno, fields[2], e))?;

    let core = if fields.len() == 4 {
        fields[3]
            .parse::<usize>()
            .map_err(|e| format!("line {}: bad core {:?}: {}", lineno, fields[3], e))?
    } else {
        0
    };

    Ok(TraceEntry {
        address,
        kind,
        cycle,
        core,
        is_prefetch,
    })
}

/// Drives `system` through the trace, then until the channel drains.
///
/// Requests are injected no earlier than their trace cycle; when the
/// controller pushes back, injection stalls and retries every cycle. Write
/// payloads are synthesized from the address so a later read of the same
/// location returns recognizable bytes.
///
/// # Arguments
///
/// * `system` - The system to drive.
/// * `entries` - Parsed trace, sorted by cycle.
/// * `deadline` - Hard cycle cap; the run stops there even if traffic is
///   still in flight.
///
/// # Returns
///
/// The final cycle count, or the formatted fatal error.
pub fn run_trace(
    system: &mut MemorySystem,
    entries: &[TraceEntry],
    deadline: u64,
) -> Result<u64, String> {
    let burst = system.config.transaction_bytes();
    let mut next = 0;

    while system.current_clock_cycle < deadline {
        while next < entries.len() && entries[next].cycle <= system.current_clock_cycle {
            let e = &entries[next];
            if e.core >= system.config.system.num_cpu {
                return Err(format!(
                    "trace request at cycle {} names core {} (only {} configured)",
                    e.cycle, e.core, system.config.system.num_cpu
                ));
            }
            let transaction = match (e.kind, e.is_prefetch) {
                (TransactionKind::Read, false) => Transaction::read(e.address, e.core),
                (TransactionKind::Read, true) => Transaction::prefetch_read(e.address, e.core),
                (TransactionKind::Write, _) => {
                    Transaction::write(e.address, payload_for(e.address, burst), e.core)
                }
                (TransactionKind::ReturnData, _) => break,
            };
            if !system.add_transaction(transaction) {
                break; // backpressure: retry next cycle
            }
            next += 1;
        }

        if next == entries.len() && system.is_idle() {
            break;
        }
        system.update().map_err(|e| e.to_string())?;
    }

    Ok(system.current_clock_cycle)
}

fn payload_for(address: u64, burst: usize) -> Vec<u8> {
    address.to_le_bytes().iter().copied().cycle().take(burst).collect()
}
