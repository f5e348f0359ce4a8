//! Per-producer sequence of period clause sets
//!
//! The owner appends to the tail set and advances periods; every other worker
//! reads through its own cursor. Sets are kept oldest-first with consecutive
//! period numbers and dropped from the head once every consumer acknowledged
//! them and the owner no longer needs them for its own lagged lookup.

use crate::error::{ExchangeError, ExchangeResult};
use crate::period::clause_set::PeriodClauseSet;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct ProducerMailbox {
    owner: usize,
    num_workers: usize,
    /// Periods behind the newest completed set that the owner keeps for `fetch_own`
    own_window: u64,
    sets: RwLock<VecDeque<Arc<PeriodClauseSet>>>,
    /// Next unread period, per consumer. Written only by that consumer.
    cursors: Vec<AtomicU64>,
}

impl ProducerMailbox {
    /// Create a mailbox holding one open set for period 0
    pub fn new(owner: usize, num_workers: usize, own_window: u64) -> ExchangeResult<Self> {
        let mut cursors = Vec::new();
        cursors
            .try_reserve_exact(num_workers)
            .map_err(|_| ExchangeError::Allocation {
                what: "mailbox cursors",
                count: num_workers,
            })?;
        cursors.extend((0..num_workers).map(|_| AtomicU64::new(0)));

        let mut sets = VecDeque::new();
        let initial = own_window as usize + 2;
        sets.try_reserve(initial)
            .map_err(|_| ExchangeError::Allocation {
                what: "period clause sets",
                count: initial,
            })?;
        sets.push_back(Arc::new(PeriodClauseSet::new(owner, 0)));

        Ok(Self {
            owner,
            num_workers,
            own_window,
            sets: RwLock::new(sets),
            cursors,
        })
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    /// The open set currently receiving the owner's exports
    pub fn tail(&self) -> Arc<PeriodClauseSet> {
        let sets = self.sets.read();
        Arc::clone(sets.back().expect("mailbox always holds an open set"))
    }

    /// Complete the tail set and open the next period.
    ///
    /// Returns the new open tail. Called only by the owner.
    pub fn advance_period(&self, next_length: u64) -> Arc<PeriodClauseSet> {
        let mut sets = self.sets.write();
        let last = Arc::clone(sets.back().expect("mailbox always holds an open set"));
        assert!(
            !last.is_completed(),
            "producer {} advanced a closed mailbox",
            self.owner
        );

        let next = Arc::new(PeriodClauseSet::new(self.owner, last.period() + 1));
        sets.push_back(Arc::clone(&next));
        last.complete_addition(next_length);

        let consumers = self.num_workers - 1;
        while sets.len() > 1 {
            let head = &sets[0];
            if head.consumed_count() < consumers || head.period() + self.own_window >= last.period() {
                break;
            }
            sets.pop_front();
        }

        next
    }

    /// Complete the tail set without opening another period.
    ///
    /// Called by the owner when it stops. Consumers blocked on the tail wake
    /// up, and later fetches past it return `None` instead of handing out a
    /// set that would never complete. Closing twice is a no-op.
    pub fn close(&self, next_length: u64) {
        let sets = self.sets.read();
        if let Some(last) = sets.back()
            && !last.is_completed()
        {
            last.complete_addition(next_length);
        }
    }

    /// Whether the owner stopped producing
    pub fn is_closed(&self) -> bool {
        self.sets.read().back().is_some_and(|s| s.is_completed())
    }

    /// Next unread set for `consumer`, provided it is not newer than `period`.
    ///
    /// Never blocks. The returned set may still be open; callers wait on it
    /// explicitly. Returns `None` when the consumer already read past `period`
    /// or the producer has not reached the consumer's cursor yet.
    pub fn fetch(&self, consumer: usize, period: u64) -> Option<Arc<PeriodClauseSet>> {
        assert_ne!(
            consumer, self.owner,
            "worker {} must use fetch_own on its own mailbox",
            self.owner
        );
        let next = self.cursors[consumer].load(Ordering::Acquire);
        if period < next {
            return None;
        }
        self.lookup(next)
    }

    /// Set at `period` without cursor bookkeeping, for the owner's own lookups
    pub fn fetch_own(&self, period: u64) -> Option<Arc<PeriodClauseSet>> {
        self.lookup(period)
    }

    fn lookup(&self, period: u64) -> Option<Arc<PeriodClauseSet>> {
        let sets = self.sets.read();
        let head = sets.front()?.period();
        if period < head {
            return None;
        }
        let set = sets.get((period - head) as usize)?;
        debug_assert_eq!(set.period(), period, "mailbox periods must be consecutive");
        Some(Arc::clone(set))
    }

    /// Move `consumer`'s cursor past `set` and acknowledge it
    pub fn acknowledge_fetched(&self, consumer: usize, set: &PeriodClauseSet) {
        let cursor = &self.cursors[consumer];
        let next = cursor.load(Ordering::Acquire);
        assert_eq!(
            next,
            set.period(),
            "worker {} acknowledged period {} of producer {} out of order",
            consumer,
            set.period(),
            self.owner
        );
        cursor.store(next + 1, Ordering::Release);
        set.acknowledge_consumed(consumer);
    }

    /// Next unread period for `consumer`
    pub fn cursor(&self, consumer: usize) -> u64 {
        self.cursors[consumer].load(Ordering::Acquire)
    }

    /// Periods of the retained sets, oldest first
    pub fn retained_periods(&self) -> Vec<u64> {
        self.sets.read().iter().map(|s| s.period()).collect()
    }
}
