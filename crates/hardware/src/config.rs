//! Configuration system for the DRAM simulator.
//!
//! This module defines all configuration structures used to parameterize the
//! simulator. It provides:
//! 1. **Defaults:** Baseline device constants (DDR3-1333-class timing and
//!    currents, 4 ranks x 8 banks, 3 cores).
//! 2. **Structures:** Hierarchical config for system geometry, device timing,
//!    the epoch scheduler, power, and statistics.
//! 3. **Derived timing:** Composite command-to-command delays computed from
//!    the JEDEC base parameters.
//!
//! Configuration is supplied as JSON (see [`Config::from_file`]) or via
//! `Config::default()`.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default configuration constants for the simulator.
///
/// Timing and current values follow a DDR3-1333 x8 part; geometry and
/// scheduler values match the reference platform (one channel, four ranks,
/// eight banks, three cores).
mod defaults {
    /// Number of independent channels (this controller owns exactly one).
    pub const NUM_CHANS: usize = 1;
    /// Ranks per channel.
    pub const NUM_RANKS: usize = 4;
    /// Banks per rank.
    pub const NUM_BANKS: usize = 8;
    /// Rows per bank.
    pub const NUM_ROWS: usize = 16384;
    /// Columns per row.
    pub const NUM_COLS: usize = 1024;
    /// Width of the JEDEC data bus in bits.
    pub const JEDEC_DATA_BUS_BITS: u64 = 64;
    /// Devices (DRAM chips) ganged per rank.
    pub const NUM_DEVICES: u64 = 8;
    /// Depth of the controller's input transaction queue.
    pub const TRANS_QUEUE_DEPTH: usize = 32;
    /// Depth of each per-bank command queue.
    pub const CMD_QUEUE_DEPTH: usize = 32;
    /// Number of requestor cores sharing the channel.
    pub const NUM_CPU: usize = 3;

    /// Clock period in nanoseconds.
    pub const TCK: f64 = 1.5;
    /// Average refresh interval per rank in nanoseconds.
    pub const REFRESH_PERIOD: f64 = 7800.0;
    /// Burst length in beats.
    pub const BL: u64 = 8;
    /// CAS latency.
    pub const TCL: u64 = 10;
    /// Posted-CAS additive latency.
    pub const TAL: u64 = 0;
    /// Cycles a command occupies the command bus.
    pub const TCMD: u64 = 1;
    /// Activate-to-activate, same bank.
    pub const TRC: u64 = 34;
    /// Activate-to-precharge, same bank.
    pub const TRAS: u64 = 24;
    /// Activate-to-column command.
    pub const TRCD: u64 = 10;
    /// Precharge period.
    pub const TRP: u64 = 10;
    /// Refresh cycle time.
    pub const TRFC: u64 = 107;
    /// Activate-to-activate, different banks of one rank.
    pub const TRRD: u64 = 4;
    /// Column-command to column-command.
    pub const TCCD: u64 = 4;
    /// Rank-to-rank data-bus turnaround.
    pub const TRTRS: u64 = 1;
    /// Read-to-precharge.
    pub const TRTP: u64 = 5;
    /// Write recovery.
    pub const TWR: u64 = 10;
    /// Write-to-read turnaround.
    pub const TWTR: u64 = 5;
    /// Power-down exit latency.
    pub const TXP: u64 = 4;
    /// Minimum CKE low/high pulse width.
    pub const TCKE: u64 = 4;

    /// Cycles per scheduling epoch.
    pub const CYCLE_LENGTH: u64 = 108;
    /// Cycles between dispatch slots (9 slots per epoch).
    pub const T_RANK: u64 = 12;

    /// Activate-precharge current (mA).
    pub const IDD0: u64 = 100;
    /// Precharge power-down current.
    pub const IDD2P: u64 = 10;
    /// Precharge standby current.
    pub const IDD2N: u64 = 35;
    /// Active standby current.
    pub const IDD3N: u64 = 45;
    /// Read burst current.
    pub const IDD4R: u64 = 230;
    /// Write burst current.
    pub const IDD4W: u64 = 255;
    /// Refresh current.
    pub const IDD5: u64 = 305;
    /// Supply voltage (V).
    pub const VDD: f64 = 1.5;

    /// Width of a latency histogram bin in cycles.
    pub const HISTOGRAM_BIN_SIZE: u64 = 10;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use memsim_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.system.num_ranks, 4);
/// assert_eq!(config.timing.bl, 8);
/// ```
///
/// Deserializing from JSON (any omitted field keeps its default):
///
/// ```
/// use memsim_core::Config;
///
/// let json = r#"{
///     "system": { "num_ranks": 4, "num_banks": 8, "num_cpu": 3 },
///     "timing": { "tck": 1.0, "refresh_period": 7800.0 },
///     "scheduler": { "cycle_length": 100, "t_rank": 11 },
///     "power": { "use_low_power": false }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.scheduler.cycle_length, 100);
/// assert!(!config.power.use_low_power);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Channel geometry and queue depths.
    #[serde(default)]
    pub system: SystemConfig,
    /// JEDEC device timing parameters (all in cycles unless noted).
    #[serde(default)]
    pub timing: TimingConfig,
    /// Epoch scheduler parameters.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Low-power mode and IDD currents.
    #[serde(default)]
    pub power: PowerConfig,
    /// Statistics collection parameters.
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON config file.
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or a description of what is
    /// wrong with it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("cannot read {}: {}", path.as_ref().display(), e))?;
        Self::from_json_str(&text)
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Config = serde_json::from_str(json).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency of the configuration.
    ///
    /// Geometry counts must be powers of two so addresses decompose into bit
    /// fields; the NI schedule needs at least three ranks to fill its three
    /// rank rows.
    pub fn validate(&self) -> Result<(), String> {
        let pow2 = |name: &str, v: usize| -> Result<(), String> {
            if v == 0 || !v.is_power_of_two() {
                return Err(format!("{} must be a nonzero power of two (got {})", name, v));
            }
            Ok(())
        };
        pow2("system.num_chans", self.system.num_chans)?;
        pow2("system.num_ranks", self.system.num_ranks)?;
        pow2("system.num_banks", self.system.num_banks)?;
        pow2("system.num_rows", self.system.num_rows)?;
        pow2("system.num_cols", self.system.num_cols)?;
        if self.system.num_ranks < 3 {
            return Err(format!(
                "system.num_ranks must be at least 3 for the epoch schedule (got {})",
                self.system.num_ranks
            ));
        }
        if self.system.num_cpu == 0 {
            return Err("system.num_cpu must be nonzero".into());
        }
        if self.system.trans_queue_depth == 0 {
            return Err("system.trans_queue_depth must be nonzero".into());
        }
        if self.system.cmd_queue_depth < 2 {
            return Err("system.cmd_queue_depth must hold an activate/column pair".into());
        }
        if self.timing.tck <= 0.0 || self.timing.refresh_period <= 0.0 {
            return Err("timing.tck and timing.refresh_period must be positive".into());
        }
        if self.timing.bl < 2 || self.timing.bl % 2 != 0 {
            return Err(format!("timing.bl must be an even burst length (got {})", self.timing.bl));
        }
        if self.timing.tcmd == 0 {
            return Err("timing.tcmd must be at least one cycle".into());
        }
        if self.timing.refresh_period_cycles() < self.system.num_ranks as u64 {
            return Err("timing.refresh_period too short to stagger across ranks".into());
        }
        if self.scheduler.cycle_length == 0 || self.scheduler.t_rank == 0 {
            return Err("scheduler.cycle_length and scheduler.t_rank must be nonzero".into());
        }
        Ok(())
    }

    /// Bytes moved by one transaction: one full burst across the data bus.
    pub fn transaction_bytes(&self) -> usize {
        (self.system.jedec_data_bus_bits * self.timing.bl / 8) as usize
    }
}

/// Channel geometry and controller queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of channels (address mapping only; one controller per channel)
    #[serde(default = "SystemConfig::default_num_chans")]
    pub num_chans: usize,

    /// Ranks per channel
    #[serde(default = "SystemConfig::default_num_ranks")]
    pub num_ranks: usize,

    /// Banks per rank
    #[serde(default = "SystemConfig::default_num_banks")]
    pub num_banks: usize,

    /// Rows per bank
    #[serde(default = "SystemConfig::default_num_rows")]
    pub num_rows: usize,

    /// Columns per row
    #[serde(default = "SystemConfig::default_num_cols")]
    pub num_cols: usize,

    /// Data bus width in bits
    #[serde(default = "SystemConfig::default_bus_bits")]
    pub jedec_data_bus_bits: u64,

    /// DRAM devices ganged per rank
    #[serde(default = "SystemConfig::default_num_devices")]
    pub num_devices: u64,

    /// Input transaction queue depth (backpressure threshold)
    #[serde(default = "SystemConfig::default_trans_queue_depth")]
    pub trans_queue_depth: usize,

    /// Per-bank command queue depth
    #[serde(default = "SystemConfig::default_cmd_queue_depth")]
    pub cmd_queue_depth: usize,

    /// Requestor cores sharing this channel
    #[serde(default = "SystemConfig::default_num_cpu")]
    pub num_cpu: usize,
}

impl SystemConfig {
    fn default_num_chans() -> usize {
        defaults::NUM_CHANS
    }
    fn default_num_ranks() -> usize {
        defaults::NUM_RANKS
    }
    fn default_num_banks() -> usize {
        defaults::NUM_BANKS
    }
    fn default_num_rows() -> usize {
        defaults::NUM_ROWS
    }
    fn default_num_cols() -> usize {
        defaults::NUM_COLS
    }
    fn default_bus_bits() -> u64 {
        defaults::JEDEC_DATA_BUS_BITS
    }
    fn default_num_devices() -> u64 {
        defaults::NUM_DEVICES
    }
    fn default_trans_queue_depth() -> usize {
        defaults::TRANS_QUEUE_DEPTH
    }
    fn default_cmd_queue_depth() -> usize {
        defaults::CMD_QUEUE_DEPTH
    }
    fn default_num_cpu() -> usize {
        defaults::NUM_CPU
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            num_chans: defaults::NUM_CHANS,
            num_ranks: defaults::NUM_RANKS,
            num_banks: defaults::NUM_BANKS,
            num_rows: defaults::NUM_ROWS,
            num_cols: defaults::NUM_COLS,
            jedec_data_bus_bits: defaults::JEDEC_DATA_BUS_BITS,
            num_devices: defaults::NUM_DEVICES,
            trans_queue_depth: defaults::TRANS_QUEUE_DEPTH,
            cmd_queue_depth: defaults::CMD_QUEUE_DEPTH,
            num_cpu: defaults::NUM_CPU,
        }
    }
}

/// JEDEC device timing parameters.
///
/// All values are in device clock cycles except `tck` and `refresh_period`,
/// which are in nanoseconds. Composite delays (read-to-precharge and
/// friends) are derived in [`DerivedTiming`].
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Clock period in ns
    #[serde(default = "TimingConfig::default_tck")]
    pub tck: f64,

    /// Refresh interval per rank in ns
    #[serde(default = "TimingConfig::default_refresh_period")]
    pub refresh_period: f64,

    /// Burst length in beats
    #[serde(default = "TimingConfig::default_bl")]
    pub bl: u64,

    /// CAS latency
    #[serde(default = "TimingConfig::default_tcl")]
    pub tcl: u64,

    /// Posted-CAS additive latency
    #[serde(default = "TimingConfig::default_tal")]
    pub tal: u64,

    /// Command bus occupancy
    #[serde(default = "TimingConfig::default_tcmd")]
    pub tcmd: u64,

    /// Activate-to-activate, same bank
    #[serde(default = "TimingConfig::default_trc")]
    pub trc: u64,

    /// Activate-to-precharge
    #[serde(default = "TimingConfig::default_tras")]
    pub tras: u64,

    /// Activate-to-column command
    #[serde(default = "TimingConfig::default_trcd")]
    pub trcd: u64,

    /// Precharge period
    #[serde(default = "TimingConfig::default_trp")]
    pub trp: u64,

    /// Refresh cycle time
    #[serde(default = "TimingConfig::default_trfc")]
    pub trfc: u64,

    /// Activate-to-activate, different banks
    #[serde(default = "TimingConfig::default_trrd")]
    pub trrd: u64,

    /// Column-to-column command
    #[serde(default = "TimingConfig::default_tccd")]
    pub tccd: u64,

    /// Rank-to-rank turnaround
    #[serde(default = "TimingConfig::default_trtrs")]
    pub trtrs: u64,

    /// Internal read-to-precharge
    #[serde(default = "TimingConfig::default_trtp")]
    pub trtp: u64,

    /// Write recovery
    #[serde(default = "TimingConfig::default_twr")]
    pub twr: u64,

    /// Internal write-to-read turnaround
    #[serde(default = "TimingConfig::default_twtr")]
    pub twtr: u64,

    /// Power-down exit latency
    #[serde(default = "TimingConfig::default_txp")]
    pub txp: u64,

    /// CKE minimum pulse width
    #[serde(default = "TimingConfig::default_tcke")]
    pub tcke: u64,
}

impl TimingConfig {
    fn default_tck() -> f64 {
        defaults::TCK
    }
    fn default_refresh_period() -> f64 {
        defaults::REFRESH_PERIOD
    }
    fn default_bl() -> u64 {
        defaults::BL
    }
    fn default_tcl() -> u64 {
        defaults::TCL
    }
    fn default_tal() -> u64 {
        defaults::TAL
    }
    fn default_tcmd() -> u64 {
        defaults::TCMD
    }
    fn default_trc() -> u64 {
        defaults::TRC
    }
    fn default_tras() -> u64 {
        defaults::TRAS
    }
    fn default_trcd() -> u64 {
        defaults::TRCD
    }
    fn default_trp() -> u64 {
        defaults::TRP
    }
    fn default_trfc() -> u64 {
        defaults::TRFC
    }
    fn default_trrd() -> u64 {
        defaults::TRRD
    }
    fn default_tccd() -> u64 {
        defaults::TCCD
    }
    fn default_trtrs() -> u64 {
        defaults::TRTRS
    }
    fn default_trtp() -> u64 {
        defaults::TRTP
    }
    fn default_twr() -> u64 {
        defaults::TWR
    }
    fn default_twtr() -> u64 {
        defaults::TWTR
    }
    fn default_txp() -> u64 {
        defaults::TXP
    }
    fn default_tcke() -> u64 {
        defaults::TCKE
    }

    /// Read latency: CAS latency plus additive latency.
    pub fn rl(&self) -> u64 {
        self.tcl + self.tal
    }

    /// Write latency, one cycle under the read latency (DDR3 convention).
    pub fn wl(&self) -> u64 {
        self.rl().saturating_sub(1)
    }

    /// Refresh interval converted to device cycles.
    pub fn refresh_period_cycles(&self) -> u64 {
        (self.refresh_period / self.tck) as u64
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tck: defaults::TCK,
            refresh_period: defaults::REFRESH_PERIOD,
            bl: defaults::BL,
            tcl: defaults::TCL,
            tal: defaults::TAL,
            tcmd: defaults::TCMD,
            trc: defaults::TRC,
            tras: defaults::TRAS,
            trcd: defaults::TRCD,
            trp: defaults::TRP,
            trfc: defaults::TRFC,
            trrd: defaults::TRRD,
            tccd: defaults::TCCD,
            trtrs: defaults::TRTRS,
            trtp: defaults::TRTP,
            twr: defaults::TWR,
            twtr: defaults::TWTR,
            txp: defaults::TXP,
            tcke: defaults::TCKE,
        }
    }
}

/// Epoch scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Cycles per epoch (one core owns each epoch)
    #[serde(default = "SchedulerConfig::default_cycle_length")]
    pub cycle_length: u64,

    /// Cycles between dispatch slots
    #[serde(default = "SchedulerConfig::default_t_rank")]
    pub t_rank: u64,
}

impl SchedulerConfig {
    fn default_cycle_length() -> u64 {
        defaults::CYCLE_LENGTH
    }
    fn default_t_rank() -> u64 {
        defaults::T_RANK
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_length: defaults::CYCLE_LENGTH,
            t_rank: defaults::T_RANK,
        }
    }
}

/// Low-power mode switch and IDD current values (mA) for energy accounting.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerConfig {
    /// Enable per-rank power-down when idle
    #[serde(default = "PowerConfig::default_use_low_power")]
    pub use_low_power: bool,

    /// Activate-precharge current
    #[serde(default = "PowerConfig::default_idd0")]
    pub idd0: u64,

    /// Precharge power-down current
    #[serde(default = "PowerConfig::default_idd2p")]
    pub idd2p: u64,

    /// Precharge standby current
    #[serde(default = "PowerConfig::default_idd2n")]
    pub idd2n: u64,

    /// Active standby current
    #[serde(default = "PowerConfig::default_idd3n")]
    pub idd3n: u64,

    /// Read burst current
    #[serde(default = "PowerConfig::default_idd4r")]
    pub idd4r: u64,

    /// Write burst current
    #[serde(default = "PowerConfig::default_idd4w")]
    pub idd4w: u64,

    /// Refresh current
    #[serde(default = "PowerConfig::default_idd5")]
    pub idd5: u64,

    /// Supply voltage in volts
    #[serde(default = "PowerConfig::default_vdd")]
    pub vdd: f64,
}

impl PowerConfig {
    fn default_use_low_power() -> bool {
        true
    }
    fn default_idd0() -> u64 {
        defaults::IDD0
    }
    fn default_idd2p() -> u64 {
        defaults::IDD2P
    }
    fn default_idd2n() -> u64 {
        defaults::IDD2N
    }
    fn default_idd3n() -> u64 {
        defaults::IDD3N
    }
    fn default_idd4r() -> u64 {
        defaults::IDD4R
    }
    fn default_idd4w() -> u64 {
        defaults::IDD4W
    }
    fn default_idd5() -> u64 {
        defaults::IDD5
    }
    fn default_vdd() -> f64 {
        defaults::VDD
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            use_low_power: true,
            idd0: defaults::IDD0,
            idd2p: defaults::IDD2P,
            idd2n: defaults::IDD2N,
            idd3n: defaults::IDD3N,
            idd4r: defaults::IDD4R,
            idd4w: defaults::IDD4W,
            idd5: defaults::IDD5,
            vdd: defaults::VDD,
        }
    }
}

/// Statistics collection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Latency histogram bin width in cycles
    #[serde(default = "StatsConfig::default_histogram_bin_size")]
    pub histogram_bin_size: u64,
}

impl StatsConfig {
    fn default_histogram_bin_size() -> u64 {
        defaults::HISTOGRAM_BIN_SIZE
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            histogram_bin_size: defaults::HISTOGRAM_BIN_SIZE,
        }
    }
}

/// Composite command-to-command delays derived from the base parameters.
///
/// These are fixed for a given [`TimingConfig`], so they are computed once at
/// controller construction instead of on every command pop.
#[derive(Debug, Clone, Copy)]
pub struct DerivedTiming {
    /// Read latency (tCL + tAL).
    pub rl: u64,
    /// Write latency (RL - 1).
    pub wl: u64,
    /// READ to PRECHARGE on the same bank.
    pub read_to_pre_delay: u64,
    /// READ_P to the next ACTIVATE on the same bank.
    pub read_autopre_delay: u64,
    /// WRITE to PRECHARGE on the same bank.
    pub write_to_pre_delay: u64,
    /// WRITE_P to the next ACTIVATE on the same bank.
    pub write_autopre_delay: u64,
    /// READ to WRITE anywhere on the channel.
    pub read_to_write_delay: u64,
    /// WRITE to READ within the written rank.
    pub write_to_read_delay_b: u64,
    /// WRITE to READ across ranks.
    pub write_to_read_delay_r: u64,
    /// Refresh interval in cycles.
    pub refresh_period_cycles: u64,
}

impl DerivedTiming {
    /// Computes the composite delays from the JEDEC base parameters.
    pub fn new(t: &TimingConfig) -> Self {
        let rl = t.rl();
        let wl = t.wl();
        let half_burst = t.bl / 2;
        Self {
            rl,
            wl,
            read_to_pre_delay: t.tal + half_burst + t.trtp.max(t.tccd) - t.tccd,
            read_autopre_delay: t.tal + t.trtp + t.trp,
            write_to_pre_delay: wl + half_burst + t.twr,
            write_autopre_delay: wl + half_burst + t.twr + t.trp,
            read_to_write_delay: (rl + half_burst + t.trtrs).saturating_sub(wl),
            write_to_read_delay_b: wl + half_burst + t.twtr,
            write_to_read_delay_r: (wl + half_burst + t.trtrs).saturating_sub(rl),
            refresh_period_cycles: t.refresh_period_cycles(),
        }
    }
}
