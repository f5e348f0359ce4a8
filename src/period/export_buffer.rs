//! Worker-local staging area for clauses awaiting export
//!
//! Clauses are grouped by quality key (lower is better, e.g. LBD). A drain
//! moves whole clauses into the worker's open period set, lowest key first and
//! oldest first within a key, until the literal budget would be exceeded.

use crate::clause::Clause;
use crate::period::clause_set::PeriodClauseSet;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Outcome of one drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainSummary {
    /// Clauses moved into the destination set
    pub clauses: usize,
    /// Literals moved into the destination set
    pub literals: usize,
    /// Clauses discarded because they alone exceed the budget
    pub oversized: usize,
}

#[derive(Debug, Default)]
pub struct ExportBuffer {
    groups: BTreeMap<u32, VecDeque<Clause>>,
    num_clauses: usize,
    num_literals: usize,
}

impl ExportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a clause under `quality`
    pub fn add(&mut self, clause: Clause, quality: u32) {
        self.num_clauses += 1;
        self.num_literals += clause.len();
        self.groups.entry(quality).or_default().push_back(clause);
    }

    /// Move staged clauses into `dest` without exceeding `literal_budget`.
    ///
    /// A budget of 0 means unlimited. A clause longer than the whole budget can
    /// never be exported and is dropped. Clauses left behind are resumed by the
    /// next drain in the same order.
    pub fn drain_into(&mut self, dest: &PeriodClauseSet, literal_budget: usize) -> DrainSummary {
        let mut summary = DrainSummary::default();

        while let Some(mut group) = self.groups.first_entry() {
            let queue = group.get_mut();
            while let Some(clause) = queue.front() {
                let len = clause.len();
                if literal_budget > 0 && len > literal_budget {
                    queue.pop_front();
                    self.num_clauses -= 1;
                    self.num_literals -= len;
                    summary.oversized += 1;
                    continue;
                }
                if literal_budget > 0 && summary.literals + len > literal_budget {
                    return summary;
                }
                if let Some(clause) = queue.pop_front() {
                    dest.append(clause);
                }
                self.num_clauses -= 1;
                self.num_literals -= len;
                summary.clauses += 1;
                summary.literals += len;
            }
            group.remove();
        }

        summary
    }

    pub fn num_clauses(&self) -> usize {
        self.num_clauses
    }

    pub fn num_literals(&self) -> usize {
        self.num_literals
    }

    pub fn is_empty(&self) -> bool {
        self.num_clauses == 0
    }

    /// Quality keys currently holding clauses, ascending
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }
}

impl fmt::Display for ExportBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, queue) in &self.groups {
            writeln!(f, "Key {}", key)?;
            for clause in queue {
                writeln!(f, "  {}", clause)?;
            }
        }
        Ok(())
    }
}
