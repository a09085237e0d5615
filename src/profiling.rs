//! Step Counters
//!
//! Deterministic per-step statistics for the world pipeline. Counters are
//! plain integers, not wall-clock timings, so two identical runs report
//! identical numbers.

use core::fmt;

/// Counters for a single `update` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs handed out by the broad phase
    pub candidate_pairs: u32,
    /// Pairs that reached the narrow phase
    pub narrowphase_tests: u32,
    /// Narrow-phase queries that found a manifold
    pub manifolds: u32,
    /// Contacts created this step
    pub contacts_created: u32,
    /// Contacts released this step (separation or removal)
    pub contacts_released: u32,
    /// Contacts queued for the solver
    pub active_constraints: u32,
    /// Gauss-Seidel sweeps performed
    pub solver_sweeps: u32,
    /// Bodies removed for leaving the bound
    pub bodies_removed: u32,
    /// Sleep events raised
    pub sleeps: u32,
    /// Wake events raised
    pub wakes: u32,
}

impl StepStats {
    /// Zero every counter
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add another step's counters into this one (saturating)
    pub fn accumulate(&mut self, other: &StepStats) {
        self.candidate_pairs = self.candidate_pairs.saturating_add(other.candidate_pairs);
        self.narrowphase_tests = self.narrowphase_tests.saturating_add(other.narrowphase_tests);
        self.manifolds = self.manifolds.saturating_add(other.manifolds);
        self.contacts_created = self.contacts_created.saturating_add(other.contacts_created);
        self.contacts_released = self.contacts_released.saturating_add(other.contacts_released);
        self.active_constraints = self.active_constraints.saturating_add(other.active_constraints);
        self.solver_sweeps = self.solver_sweeps.saturating_add(other.solver_sweeps);
        self.bodies_removed = self.bodies_removed.saturating_add(other.bodies_removed);
        self.sleeps = self.sleeps.saturating_add(other.sleeps);
        self.wakes = self.wakes.saturating_add(other.wakes);
    }
}

impl fmt::Display for StepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pairs={} tests={} manifolds={} created={} released={} constraints={} sweeps={} removed={} sleeps={} wakes={}",
            self.candidate_pairs,
            self.narrowphase_tests,
            self.manifolds,
            self.contacts_created,
            self.contacts_released,
            self.active_constraints,
            self.solver_sweeps,
            self.bodies_removed,
            self.sleeps,
            self.wakes,
        )
    }
}

/// Last-step and running totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepProfiler {
    /// Counters of the most recent step
    pub last: StepStats,
    /// Sum over every step since creation or the last reset
    pub totals: StepStats,
    /// Steps recorded
    pub frame_count: u64,
}

impl StepProfiler {
    /// Create an empty profiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished step
    pub fn record(&mut self, stats: StepStats) {
        self.last = stats;
        self.totals.accumulate(&stats);
        self.frame_count += 1;
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut profiler = StepProfiler::new();
        let step = StepStats {
            candidate_pairs: 3,
            solver_sweeps: 4,
            ..Default::default()
        };
        profiler.record(step);
        profiler.record(step);

        assert_eq!(profiler.frame_count, 2);
        assert_eq!(profiler.last, step);
        assert_eq!(profiler.totals.candidate_pairs, 6);
        assert_eq!(profiler.totals.solver_sweeps, 8);

        profiler.reset();
        assert_eq!(profiler.frame_count, 0);
        assert_eq!(profiler.totals, StepStats::default());
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut a = StepStats {
            wakes: u32::MAX,
            ..Default::default()
        };
        a.accumulate(&StepStats {
            wakes: 1,
            ..Default::default()
        });
        assert_eq!(a.wakes, u32::MAX);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_display() {
        let stats = StepStats {
            manifolds: 2,
            sleeps: 1,
            ..Default::default()
        };
        let s = format!("{}", stats);
        assert!(s.contains("manifolds=2"));
        assert!(s.contains("sleeps=1"));
    }
}
