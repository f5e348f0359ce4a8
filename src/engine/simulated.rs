//! Scripted engine with a seeded, reproducible step sequence.
//!
//! Each step costs a random amount of work and counts as one conflict. Some
//! steps learn a random clause, which is exported when its quality is within
//! the current threshold. After `conclude_after` conflicts (plus a per-worker
//! jitter) the engine returns its scripted verdict. Everything it does is a
//! function of the seed, the worker id and the clauses it imports, so a
//! deterministic exchange must reproduce the same run every time.

use super::{ApplyOutcome, EngineStatistics, SolveResult, SolvingEngine};
use crate::clause::{Clause, Literal};
use crate::worker::PeriodicWorker;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

/// Parameters of a simulated run
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub seed: u64,
    pub num_vars: u32,
    pub max_clause_len: usize,
    /// Worst quality key a learnt clause can get (keys start at 1)
    pub max_quality: u32,
    /// Chance that a conflict produces a learnt clause
    pub learn_probability: f64,
    pub min_step_work: u64,
    pub max_step_work: u64,
    /// Conflicts between restarts; imported clauses are applied at restarts
    pub restart_interval: u64,
    /// Conflicts before the verdict is returned
    pub conclude_after: u64,
    /// Extra conflicts drawn per worker from `0..=conclude_jitter`
    pub conclude_jitter: u64,
    pub verdict: SolveResult,
    pub initial_export_threshold: u32,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_vars: 200,
            max_clause_len: 8,
            max_quality: 10,
            learn_probability: 0.5,
            min_step_work: 50,
            max_step_work: 500,
            restart_interval: 100,
            conclude_after: 20_000,
            conclude_jitter: 5_000,
            verdict: SolveResult::Unsatisfiable,
            initial_export_threshold: 3,
        }
    }
}

impl SimulatedConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return `verdict` after `conflicts` conflicts plus up to `jitter` more
    pub fn with_verdict(mut self, verdict: SolveResult, conflicts: u64, jitter: u64) -> Self {
        self.verdict = verdict;
        self.conclude_after = conflicts;
        self.conclude_jitter = jitter;
        self
    }

    pub fn with_step_work(mut self, min: u64, max: u64) -> Self {
        self.min_step_work = min;
        self.max_step_work = max.max(min);
        self
    }

    pub fn with_num_vars(mut self, num_vars: u32) -> Self {
        self.num_vars = num_vars.max(1);
        self
    }
}

pub struct SimulatedEngine {
    config: SimulatedConfig,
    rng: ChaCha8Rng,
    conclude_after: u64,
    threshold: u32,
    stats: EngineStatistics,
    /// Root-level units, learnt or imported
    units: BTreeSet<Literal>,
    imported_clauses: u64,
}

impl SimulatedEngine {
    pub fn new(worker_id: usize, config: SimulatedConfig) -> Self {
        let stream = (worker_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ stream);
        let conclude_after = config
            .conclude_after
            .saturating_add(rng.random_range(0..=config.conclude_jitter));
        Self {
            threshold: config.initial_export_threshold.clamp(1, config.max_quality.max(1)),
            config,
            rng,
            conclude_after,
            stats: EngineStatistics::default(),
            units: BTreeSet::new(),
            imported_clauses: 0,
        }
    }

    /// Conflicts this engine needs before it concludes
    pub fn conclude_after(&self) -> u64 {
        self.conclude_after
    }

    /// Non-unit clauses received through `apply_imported_clauses`
    pub fn imported_clauses(&self) -> u64 {
        self.imported_clauses
    }

    fn random_literal(&mut self) -> Literal {
        let var = self.rng.random_range(1..=self.config.num_vars) as Literal;
        if self.rng.random_bool(0.5) { var } else { -var }
    }

    /// One conflict: returns the work spent and possibly a learnt clause
    fn step(&mut self) -> (u64, Option<(Clause, u32)>) {
        let work = self
            .rng
            .random_range(self.config.min_step_work..=self.config.max_step_work);
        self.stats.conflicts += 1;
        self.stats.decisions += 1 + work / 16;
        self.stats.propagations += work;

        if !self.rng.random_bool(self.config.learn_probability.clamp(0.0, 1.0)) {
            return (work, None);
        }
        let len = self.rng.random_range(1..=self.config.max_clause_len.max(1));
        let mut literals: Vec<Literal> = (0..len).map(|_| self.random_literal()).collect();
        literals.sort_unstable_by_key(|l| (l.abs(), *l));
        literals.dedup_by_key(|l| l.abs());
        let quality = self.rng.random_range(1..=self.config.max_quality.max(1));
        (work, Some((Clause::new(literals), quality)))
    }

    /// Add a root unit; `false` if its negation is already fixed
    fn fix(&mut self, literal: Literal) -> bool {
        if self.units.contains(&-literal) {
            return false;
        }
        self.units.insert(literal);
        true
    }
}

impl SolvingEngine for SimulatedEngine {
    fn solve(&mut self, worker: &mut PeriodicWorker) -> SolveResult {
        loop {
            let (work, learnt) = self.step();
            worker.add_work(work);

            if let Some((clause, quality)) = learnt {
                if clause.is_unit() {
                    let literal = clause.literals()[0];
                    if !self.fix(literal) && self.config.verdict == SolveResult::Unsatisfiable {
                        return SolveResult::Unsatisfiable;
                    }
                }
                if quality <= self.threshold {
                    worker.export_candidate(clause, quality);
                }
            }

            while worker.at_boundary() {
                if !worker.check_period(self) {
                    return SolveResult::Unknown;
                }
            }

            let restart = self.stats.conflicts % self.config.restart_interval.max(1) == 0;
            if restart {
                self.stats.restarts += 1;
            }
            if (restart || worker.should_apply())
                && worker.apply_imported(self) == ApplyOutcome::Conflict
            {
                return SolveResult::Unsatisfiable;
            }

            if self.stats.conflicts >= self.conclude_after {
                return self.config.verdict;
            }
        }
    }

    fn apply_imported_clauses(&mut self, units: &[Clause], clauses: &[Clause]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Ok;
        for unit in units {
            let literal = unit.literals()[0];
            // Contradicting units only mean something for an unsatisfiable script.
            if !self.fix(literal) && self.config.verdict == SolveResult::Unsatisfiable {
                outcome = ApplyOutcome::Conflict;
            }
        }
        self.imported_clauses += clauses.len() as u64;
        self.stats.redundant_clauses += clauses.len() as u64;
        outcome
    }

    fn statistics(&self) -> EngineStatistics {
        self.stats
    }

    fn relax_export_threshold(&mut self) {
        self.threshold = (self.threshold + 1).min(self.config.max_quality.max(1));
    }

    fn tighten_export_threshold(&mut self) {
        self.threshold = self.threshold.saturating_sub(1).max(1);
    }

    fn export_threshold(&self) -> u32 {
        self.threshold
    }

    fn model(&self) -> Option<Vec<Literal>> {
        if self.config.verdict != SolveResult::Satisfiable {
            return None;
        }
        let model = (1..=self.config.num_vars as Literal)
            .map(|var| if self.units.contains(&-var) { -var } else { var })
            .collect();
        Some(model)
    }
}
