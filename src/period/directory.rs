//! Fixed-size collection of producer mailboxes, one per worker

use crate::error::{ExchangeError, ExchangeResult};
use crate::period::mailbox::ProducerMailbox;

#[derive(Debug)]
pub struct MailboxDirectory {
    mailboxes: Vec<ProducerMailbox>,
}

impl MailboxDirectory {
    /// Allocate one mailbox per worker.
    ///
    /// `own_window` is the number of completed periods each owner retains for
    /// its own lagged lookup (the exchange margin).
    pub fn new(num_workers: usize, own_window: u64) -> ExchangeResult<Self> {
        if num_workers == 0 {
            return Err(ExchangeError::NoWorkers);
        }

        let mut mailboxes = Vec::new();
        mailboxes
            .try_reserve_exact(num_workers)
            .map_err(|_| ExchangeError::Allocation {
                what: "mailbox directory",
                count: num_workers,
            })?;
        for owner in 0..num_workers {
            mailboxes.push(ProducerMailbox::new(owner, num_workers, own_window)?);
        }

        Ok(Self { mailboxes })
    }

    pub fn num_workers(&self) -> usize {
        self.mailboxes.len()
    }

    /// Mailbox owned by `worker`. Panics on an unknown worker id.
    pub fn get(&self, worker: usize) -> &ProducerMailbox {
        &self.mailboxes[worker]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProducerMailbox> {
        self.mailboxes.iter()
    }
}
