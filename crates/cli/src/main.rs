//! DRAM simulator CLI.
//!
//! This binary is the command-line front end for the memsim library. It
//! performs:
//! 1. **Trace run:** Parse a trace file, drive the memory system through it,
//!    and print the final statistics.
//! 2. **Config loading:** JSON configuration via `--config`, defaults
//!    otherwise.
//! 3. **CSV export:** Append final statistics to a CSV file via `--csv`.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::process;

use memsim_core::sim::{load_trace, run_trace};
use memsim_core::{Config, MemorySystem};

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-accurate DRAM simulator with a non-interference scheduler",
    long_about = "Drive the memory system with a trace file and report per-core \
bandwidth, latency, and power statistics.\n\nExamples:\n  memsim run -f traces/mixed.trc\n  \
memsim run -f traces/mixed.trc --config configs/ddr3.json --csv out.csv"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a trace file through the memory system.
    Run {
        /// Trace file: one '<hex-addr> <READ|WRITE|P_READ> <cycle> [core]' per line.
        #[arg(short, long)]
        file: String,

        /// JSON configuration file (defaults used when omitted).
        #[arg(short, long)]
        config: Option<String>,

        /// Hard cycle cap for the run.
        #[arg(long, default_value_t = 10_000_000)]
        cycles: u64,

        /// Append final statistics to this CSV file.
        #[arg(long)]
        csv: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            config,
            cycles,
            csv,
        } => cmd_run(file, config, cycles, csv),
    }
}

/// Runs the simulator over a trace and prints statistics on completion.
fn cmd_run(file: String, config: Option<String>, cycles: u64, csv: Option<String>) {
    let config = match config {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            process::exit(1);
        }),
        None => Config::default(),
    };

    let csv_out = csv.map(|path| {
        let file = File::create(&path).unwrap_or_else(|e| {
            eprintln!("Error creating {}: {}", path, e);
            process::exit(1);
        });
        Box::new(BufWriter::new(file)) as Box<dyn std::io::Write + Send>
    });

    let entries = load_trace(&file).unwrap_or_else(|e| {
        eprintln!("Error loading trace {}: {}", file, e);
        process::exit(1);
    });

    let mut system = MemorySystem::new(&config, 0, csv_out).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    println!(
        "[*] {} requests, {} ranks x {} banks, {} cores, epoch {} cycles",
        entries.len(),
        config.system.num_ranks,
        config.system.num_banks,
        config.system.num_cpu,
        config.scheduler.cycle_length
    );

    match run_trace(&mut system, &entries, cycles) {
        Ok(final_cycle) => {
            println!("[*] Drained at cycle {}", final_cycle);
            system.print_stats(true);
        }
        Err(e) => {
            eprintln!("\n[!] FATAL: {}", e);
            system.print_stats(true);
            process::exit(1);
        }
    }
}
