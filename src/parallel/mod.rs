//! Shared state and host-side plumbing for a portfolio of workers.
//!
//! # Architecture
//!
//! - A **coordinator** owns every producer mailbox and decides the winner and
//!   when workers stop
//! - Each **worker** drives one engine on its own thread and exchanges clauses
//!   only through the mailboxes
//! - A **channel** tells the host when workers finish and carries progress
//!   counters for logging
//!
//! # Example
//!
//! ```no_run
//! use dps::engine::{SimulatedConfig, SimulatedEngine};
//! use dps::parallel::{ExchangeConfig, run_portfolio};
//! use std::time::Duration;
//!
//! let config = ExchangeConfig::default().with_workers(4).with_margin(5);
//! let engines = (0..4)
//!     .map(|id| SimulatedEngine::new(id, SimulatedConfig::default()))
//!     .collect();
//! let result = run_portfolio(engines, &config, Duration::from_secs(1)).unwrap();
//! println!("s {}", result.result);
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod portfolio;

pub use config::{ExchangeConfig, adjust_worker_count};
pub use coordinator::{Coordinator, Winner, WinnerSignature};
pub use portfolio::run_portfolio;
