//! Top-level memory system.
//!
//! Owns the controller and the ranks side-by-side and drives them one clock
//! cycle at a time, so neither needs a back-reference to the other: each
//! `update` passes the rank array into the controller explicitly, then
//! ferries returned DATA packets back. Completion callbacks and the optional
//! CSV statistics sink are registered here.

use std::io::Write;

use log::warn;

use crate::common::error::MemError;
use crate::config::Config;
use crate::mem::controller::MemoryController;
use crate::mem::rank::Rank;
use crate::mem::storage::DramStore;
use crate::mem::transaction::Transaction;

/// Completion callback: `(system_id, address, cycle)`.
pub type TransactionCallback = Box<dyn FnMut(u64, u64, u64) + Send>;

/// One memory channel: controller, ranks, and the channel clock.
pub struct MemorySystem {
    /// The configuration this system was built from.
    pub config: Config,
    /// The channel's controller.
    pub controller: MemoryController,
    /// The channel's ranks.
    pub ranks: Vec<Rank>,
    /// Identifier passed to callbacks (the channel id in multi-channel
    /// setups).
    pub system_id: u64,
    /// Cycles elapsed since construction.
    pub current_clock_cycle: u64,
    return_read_data: Option<TransactionCallback>,
    write_data_done: Option<TransactionCallback>,
    csv_out: Option<Box<dyn Write + Send>>,
}

impl MemorySystem {
    /// Builds a memory system for `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before anything is constructed.
    /// * `system_id` - Passed through to completion callbacks.
    /// * `csv_out` - Optional sink; final statistics are appended to it as
    ///   CSV.
    ///
    /// # Returns
    ///
    /// The system, or a description of what is wrong with the config.
    pub fn new(
        config: &Config,
        system_id: u64,
        csv_out: Option<Box<dyn Write + Send>>,
    ) -> Result<Self, String> {
        config.validate()?;
        let ranks = (0..config.system.num_ranks)
            .map(|i| Rank::new(i, Box::new(DramStore::for_rank(config)), config))
            .collect();
        Ok(Self {
            config: config.clone(),
            controller: MemoryController::new(config),
            ranks,
            system_id,
            current_clock_cycle: 0,
            return_read_data: None,
            write_data_done: None,
            csv_out,
        })
    }

    /// Registers the read- and write-completion callbacks.
    pub fn register_callbacks(
        &mut self,
        return_read_data: Option<TransactionCallback>,
        write_data_done: Option<TransactionCallback>,
    ) {
        self.return_read_data = return_read_data;
        self.write_data_done = write_data_done;
    }

    /// Whether the controller will accept another transaction this cycle.
    pub fn will_accept_transaction(&self) -> bool {
        self.controller.will_accept_transaction()
    }

    /// Hands a transaction to the controller; `false` means backpressure.
    pub fn add_transaction(&mut self, transaction: Transaction) -> bool {
        self.controller.add_transaction(transaction)
    }

    /// Advances the whole system by one clock cycle.
    pub fn update(&mut self) -> Result<(), MemError> {
        let events = self.controller.update(&mut self.ranks)?;
        if let Some((address, cycle)) = events.read_done {
            if let Some(cb) = self.return_read_data.as_mut() {
                cb(self.system_id, address, cycle);
            }
        }
        if let Some((address, cycle)) = events.write_done {
            if let Some(cb) = self.write_data_done.as_mut() {
                cb(self.system_id, address, cycle);
            }
        }

        for rank in self.ranks.iter_mut() {
            if let Some(packet) = rank.update() {
                self.controller.receive_from_bus(packet)?;
            }
        }

        self.current_clock_cycle += 1;
        self.controller.current_clock_cycle = self.current_clock_cycle;
        Ok(())
    }

    /// Runs `cycles` update ticks.
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), MemError> {
        for _ in 0..cycles {
            self.update()?;
        }
        Ok(())
    }

    /// Whether nothing is in flight anywhere in the channel.
    pub fn is_idle(&self) -> bool {
        self.controller.is_idle()
    }

    /// Prints statistics; on final stats also appends CSV to the injected
    /// sink, if any.
    pub fn print_stats(&mut self, final_stats: bool) {
        self.controller
            .stats
            .print(&self.config, self.current_clock_cycle, self.system_id, final_stats);
        if final_stats {
            if let Some(out) = self.csv_out.as_mut() {
                if let Err(e) =
                    self.controller
                        .stats
                        .write_csv(out, &self.config, self.current_clock_cycle)
                {
                    warn!("failed to write CSV stats: {}", e);
                }
            }
        }
    }
}
