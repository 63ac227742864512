//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the memory system. It provides:
//! 1. **Per-core traffic:** demand reads/writes and prefetch reads, with
//!    summed read latencies for average-latency reporting.
//! 2. **Latency histogram:** read round-trip times binned by a configurable
//!    bin width.
//! 3. **Energy:** per-rank background, burst, activate-precharge, and
//!    refresh energy accumulated by the controller, reported as average
//!    power.
//! 4. **Output:** an aligned text report and CSV export through any writer.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::config::Config;

/// Memory-system statistics, accumulated by the controller.
#[derive(Debug, Clone)]
pub struct MemStats {
    /// Bus transactions completed (data bursts moved in either direction).
    pub total_transactions: u64,
    /// Demand reads dispatched, per core.
    pub total_reads: Vec<u64>,
    /// Demand writes dispatched, per core.
    pub total_writes: Vec<u64>,
    /// Prefetch reads dispatched, per core.
    pub total_pref_reads: Vec<u64>,
    /// Summed demand read latency in cycles, per core.
    pub total_latency: Vec<u64>,
    /// Summed prefetch read latency in cycles, per core.
    pub total_latency_pref: Vec<u64>,
    /// Read latency histogram: bin lower bound -> count.
    pub latencies: BTreeMap<u64, u64>,
    /// Background energy per rank (IDD current units x cycles).
    pub background_energy: Vec<u64>,
    /// Read/write burst energy per rank.
    pub burst_energy: Vec<u64>,
    /// Activate-precharge energy per rank.
    pub actpre_energy: Vec<u64>,
    /// Refresh energy per rank.
    pub refresh_energy: Vec<u64>,
    bin_size: u64,
}

impl MemStats {
    /// Creates zeroed statistics for `num_cpu` cores and `num_ranks` ranks.
    pub fn new(num_cpu: usize, num_ranks: usize, histogram_bin_size: u64) -> Self {
        Self {
            total_transactions: 0,
            total_reads: vec![0; num_cpu],
            total_writes: vec![0; num_cpu],
            total_pref_reads: vec![0; num_cpu],
            total_latency: vec![0; num_cpu],
            total_latency_pref: vec![0; num_cpu],
            latencies: BTreeMap::new(),
            background_energy: vec![0; num_ranks],
            burst_energy: vec![0; num_ranks],
            actpre_energy: vec![0; num_ranks],
            refresh_energy: vec![0; num_ranks],
            bin_size: histogram_bin_size.max(1),
        }
    }

    /// Records one completed read's round-trip latency.
    pub fn insert_histogram(&mut self, latency: u64, core: usize, is_prefetch: bool) {
        if is_prefetch {
            self.total_latency_pref[core] += latency;
        } else {
            self.total_latency[core] += latency;
        }
        *self
            .latencies
            .entry((latency / self.bin_size) * self.bin_size)
            .or_insert(0) += 1;
    }

    /// Prints the statistics report to stdout.
    ///
    /// Intermediate calls (`final_stats == false`) print nothing, matching
    /// the reference behavior of reporting only at end of simulation.
    pub fn print(&self, config: &Config, cycle: u64, system_id: u64, final_stats: bool) {
        if !final_stats {
            return;
        }
        let num_cpu = config.system.num_cpu;
        let bytes_per_transaction = config.transaction_bytes() as u64;
        let total_bytes = self.total_transactions * bytes_per_transaction;
        let seconds = cycle as f64 * config.timing.tck * 1e-9;
        let seconds = if seconds > 0.0 { seconds } else { 1.0 };

        let mut aggregate_bandwidth = 0.0;
        println!("=======================================================");
        println!("============ DRAM Statistics [id:{}] ============", system_id);
        println!("total_return_transactions {}", self.total_transactions);
        for core in 0..num_cpu {
            let reads = self.total_reads[core].max(1);
            let pref_reads = self.total_pref_reads[core].max(1);
            let demand_bytes = (self.total_reads[core] + self.total_writes[core]) * bytes_per_transaction;
            let pref_bytes = self.total_pref_reads[core] * bytes_per_transaction;
            let bw_demand = demand_bytes as f64 / (1024.0 * 1024.0 * 1024.0) / seconds;
            let bw_pref = pref_bytes as f64 / (1024.0 * 1024.0 * 1024.0) / seconds;
            let lat_demand = self.total_latency[core] as f64 / reads as f64 * config.timing.tck;
            let lat_pref =
                self.total_latency_pref[core] as f64 / pref_reads as f64 * config.timing.tck;
            aggregate_bandwidth += bw_demand + bw_pref;
            println!(
                "core {} demand   bandwidth: {:.4} GB/s  avg_latency: {:.2} ns",
                core, bw_demand, lat_demand
            );
            println!(
                "core {} prefetch bandwidth: {:.4} GB/s  avg_latency: {:.2} ns",
                core, bw_pref, lat_pref
            );
        }
        println!(
            "aggregate ({} bytes) average bandwidth {:.4} GB/s",
            total_bytes, aggregate_bandwidth
        );

        println!("-------------------------------------------------------");
        println!("POWER (average, per rank)");
        let cyc = cycle.max(1) as f64;
        for rank in 0..self.background_energy.len() {
            println!(
                "  rank {}  background: {:.3} W  burst: {:.3} W  act/pre: {:.3} W  refresh: {:.3} W",
                rank,
                self.background_energy[rank] as f64 / cyc * config.power.vdd / 1000.0,
                self.burst_energy[rank] as f64 / cyc * config.power.vdd / 1000.0,
                self.actpre_energy[rank] as f64 / cyc * config.power.vdd / 1000.0,
                self.refresh_energy[rank] as f64 / cyc * config.power.vdd / 1000.0,
            );
        }
        println!("=======================================================");
    }

    /// Appends the final statistics as CSV rows.
    ///
    /// One `core` row per CPU and one `rank` row per rank; the writer is
    /// whatever sink was injected at system construction.
    pub fn write_csv<W: Write>(&self, w: &mut W, config: &Config, cycle: u64) -> io::Result<()> {
        let seconds = (cycle as f64 * config.timing.tck * 1e-9).max(1e-12);
        let bytes_per_transaction = config.transaction_bytes() as u64;
        writeln!(
            w,
            "kind,index,reads,writes,pref_reads,avg_latency_ns,bandwidth_gbps"
        )?;
        for core in 0..config.system.num_cpu {
            let lat = self.total_latency[core] as f64 / self.total_reads[core].max(1) as f64
                * config.timing.tck;
            let bytes = (self.total_reads[core] + self.total_writes[core] + self.total_pref_reads[core])
                * bytes_per_transaction;
            writeln!(
                w,
                "core,{},{},{},{},{:.3},{:.6}",
                core,
                self.total_reads[core],
                self.total_writes[core],
                self.total_pref_reads[core],
                lat,
                bytes as f64 / (1024.0 * 1024.0 * 1024.0) / seconds
            )?;
        }
        writeln!(w, "kind,index,background,burst,actpre,refresh")?;
        for rank in 0..self.background_energy.len() {
            writeln!(
                w,
                "rank,{},{},{},{},{}",
                rank,
                self.background_energy[rank],
                self.burst_energy[rank],
                self.actpre_energy[rank],
                self.refresh_energy[rank]
            )?;
        }
        Ok(())
    }
}
