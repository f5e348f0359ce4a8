//! Period-indexed clause storage
//!
//! Each worker owns one [`ProducerMailbox`] holding the [`PeriodClauseSet`]s it
//! produced, one per logical period. Other workers read those sets with a lag
//! of `margin` periods, so what a worker sees at period P depends only on what
//! the others produced up to P - margin, never on thread timing.

pub mod clause_set;
pub mod directory;
pub mod export_buffer;
pub mod mailbox;

pub use clause_set::PeriodClauseSet;
pub use directory::MailboxDirectory;
pub use export_buffer::{DrainSummary, ExportBuffer};
pub use mailbox::ProducerMailbox;
