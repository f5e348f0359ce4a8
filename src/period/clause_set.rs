//! Clauses produced by one worker during one period
//!
//! A set starts `Open`: only its producer appends to it. Completing it freezes
//! the clause list, records the producer's candidate for the next period
//! length, and wakes every consumer blocked in [`PeriodClauseSet::wait_completed`].
//! Consumers then read the frozen list without taking any lock.

use crate::clause::Clause;
use parking_lot::{Condvar, Mutex};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Contents fixed at completion time
#[derive(Debug)]
struct Frozen {
    clauses: Vec<Clause>,
    num_literals: usize,
    next_length: u64,
}

/// Clauses still being appended by the producer
#[derive(Debug, Default)]
struct Staging {
    clauses: Vec<Clause>,
    num_literals: usize,
}

#[derive(Debug)]
pub struct PeriodClauseSet {
    producer: usize,
    period: u64,
    staging: Mutex<Staging>,
    frozen: OnceLock<Frozen>,
    completed: Mutex<bool>,
    completed_cv: Condvar,
    consumed: AtomicUsize,
}

impl PeriodClauseSet {
    pub fn new(producer: usize, period: u64) -> Self {
        Self {
            producer,
            period,
            staging: Mutex::new(Staging::default()),
            frozen: OnceLock::new(),
            completed: Mutex::new(false),
            completed_cv: Condvar::new(),
            consumed: AtomicUsize::new(0),
        }
    }

    pub fn producer(&self) -> usize {
        self.producer
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Append a clause. Panics if the set is already completed.
    pub fn append(&self, clause: Clause) {
        assert!(
            !self.is_completed(),
            "append to completed clause set (producer {}, period {})",
            self.producer,
            self.period
        );
        let mut staging = self.staging.lock();
        staging.num_literals += clause.len();
        staging.clauses.push(clause);
    }

    /// Latch completion and wake all waiting consumers.
    ///
    /// `next_length` is the producer's candidate for the next period length.
    /// Panics if called twice.
    pub fn complete_addition(&self, next_length: u64) {
        let staging = std::mem::take(&mut *self.staging.lock());
        let frozen = Frozen {
            clauses: staging.clauses,
            num_literals: staging.num_literals,
            next_length,
        };
        assert!(
            self.frozen.set(frozen).is_ok(),
            "clause set completed twice (producer {}, period {})",
            self.producer,
            self.period
        );

        let mut completed = self.completed.lock();
        *completed = true;
        self.completed_cv.notify_all();
    }

    /// Block until the producer completes this set
    pub fn wait_completed(&self) {
        let mut completed = self.completed.lock();
        while !*completed {
            self.completed_cv.wait(&mut completed);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Frozen clauses, or `None` while the set is still open
    pub fn clauses(&self) -> Option<&[Clause]> {
        self.frozen.get().map(|f| f.clauses.as_slice())
    }

    /// Next-period-length candidate recorded at completion
    pub fn next_length_candidate(&self) -> Option<u64> {
        self.frozen.get().map(|f| f.next_length)
    }

    pub fn num_clauses(&self) -> usize {
        match self.frozen.get() {
            Some(f) => f.clauses.len(),
            None => self.staging.lock().clauses.len(),
        }
    }

    pub fn num_literals(&self) -> usize {
        match self.frozen.get() {
            Some(f) => f.num_literals,
            None => self.staging.lock().num_literals,
        }
    }

    /// Record that `consumer` has finished reading this set
    pub fn acknowledge_consumed(&self, consumer: usize) {
        assert_ne!(
            consumer, self.producer,
            "producer {} cannot consume its own clause set",
            self.producer
        );
        self.consumed.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of consumers that acknowledged this set
    pub fn consumed_count(&self) -> usize {
        self.consumed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_append_then_complete() {
        let set = PeriodClauseSet::new(1, 4);
        set.append(Clause::from([1, 2]));
        set.append(Clause::from([-3]));
        assert_eq!(set.num_clauses(), 2);
        assert_eq!(set.num_literals(), 3);
        assert!(set.clauses().is_none(), "open set must not expose clauses");

        set.complete_addition(5000);
        assert!(set.is_completed());
        assert_eq!(set.next_length_candidate(), Some(5000));
        assert_eq!(
            set.clauses().unwrap(),
            &[Clause::from([1, 2]), Clause::from([-3])]
        );
        assert_eq!(set.num_literals(), 3);
    }

    #[test]
    fn test_completion_is_monotonic() {
        let set = PeriodClauseSet::new(0, 0);
        assert!(!set.is_completed());
        set.complete_addition(10);
        for _ in 0..3 {
            assert!(set.is_completed());
        }
        set.wait_completed();
    }

    #[test]
    #[should_panic(expected = "append to completed clause set")]
    fn test_append_after_completion_panics() {
        let set = PeriodClauseSet::new(0, 0);
        set.complete_addition(10);
        set.append(Clause::from([1]));
    }

    #[test]
    #[should_panic(expected = "completed twice")]
    fn test_double_completion_panics() {
        let set = PeriodClauseSet::new(0, 0);
        set.complete_addition(10);
        set.complete_addition(10);
    }

    #[test]
    fn test_wait_wakes_all_consumers() {
        let set = Arc::new(PeriodClauseSet::new(0, 7));
        set.append(Clause::from([4, 5]));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    set.wait_completed();
                    set.clauses().map(|c| c.len())
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        set.complete_addition(1);

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Some(1));
        }
    }

    #[test]
    fn test_consumer_acknowledgments() {
        let set = PeriodClauseSet::new(2, 0);
        set.acknowledge_consumed(0);
        set.acknowledge_consumed(1);
        assert_eq!(set.consumed_count(), 2);
    }
}
