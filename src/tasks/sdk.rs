// src/tasks/sdk.rs

//! # Task SDK
//!
//! Glue for running concrete tasks behind one surface.
//!
//! ## When to create a new task
//! A **task** is one behavioural paradigm: its epochs, its inputs, its
//! response rules. The Delay Pair Association task (`dpa`) and the spatial
//! suppression motion task (`motion`) are the two that ship. A new paradigm
//! gets its own `tasks/<name>.rs` behind a `task-<name>` feature.
//!
//! ## Steps to add a new task
//! 1. Define a `Condition` (everything a trial draws) and an `Overrides`
//!    struct of `Option`s over it.
//! 2. Implement [`TrialGenerator`](crate::systems::sdk::TrialGenerator):
//!    draw timing first, build a [`Timeline`](crate::systems::timeline::Timeline),
//!    then classify the condition.
//! 3. Implement [`ObservationSynthesizer`](crate::systems::sdk::ObservationSynthesizer)
//!    as a pure function of `(trial, t)`.
//! 4. Implement [`StepEvaluator`](crate::systems::sdk::StepEvaluator), reusing
//!    [`ChoiceRules`](crate::systems::evaluator::ChoiceRules) for choice tasks.
//! 5. Implement [`Task`](crate::systems::sdk::Task): defaults, config
//!    handling and, if it has one, a [`SolveCriterion`].
//!
//! Any `TrialEnv<T>` is an [`Environment`], so callers that pick the task at
//! run time can hold a `Box<dyn Environment>`.

use crate::error::TaskError;
use crate::systems::perf::{PerfCounters, PerfWindow};
use crate::systems::sdk::{Action, ActionSpace, Task};
use crate::systems::sequencer::{StepResult, TrialEnv};

/// Object-safe view of a running environment.
pub trait Environment {
    fn name(&self) -> &'static str;
    fn observation_size(&self) -> usize;
    fn action_space(&self) -> ActionSpace;
    fn reset(&mut self) -> Result<Vec<f64>, TaskError>;
    fn step(&mut self, action: &Action) -> Result<StepResult, TaskError>;
    fn perf(&self) -> &PerfCounters;
    fn is_solved(&self) -> bool;
}

impl<T: Task> Environment for TrialEnv<T> {
    fn name(&self) -> &'static str {
        self.task().name()
    }
    fn observation_size(&self) -> usize {
        TrialEnv::observation_size(self)
    }
    fn action_space(&self) -> ActionSpace {
        TrialEnv::action_space(self)
    }
    fn reset(&mut self) -> Result<Vec<f64>, TaskError> {
        TrialEnv::reset(self)
    }
    fn step(&mut self, action: &Action) -> Result<StepResult, TaskError> {
        TrialEnv::step(self, action)
    }
    fn perf(&self) -> &PerfCounters {
        TrialEnv::perf(self)
    }
    fn is_solved(&self) -> bool {
        TrialEnv::is_solved(self)
    }
}

/// Thresholds on a windowed performance summary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveCriterion {
    pub min_decision_rate: f64,
    pub min_accuracy: f64,
    /// Trials the window must hold before the criterion can pass.
    pub min_trials: usize,
}

impl SolveCriterion {
    /// Two-alternative choice default: almost always respond, ≥ 97% right.
    pub fn two_afc() -> Self {
        Self { min_decision_rate: 0.99, min_accuracy: 0.97, min_trials: 1 }
    }

    pub fn is_met(&self, w: &PerfWindow) -> bool {
        w.trials >= self.min_trials.max(1)
            && w.decision_rate >= self.min_decision_rate
            && w.accuracy >= self.min_accuracy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_afc_thresholds() {
        let c = SolveCriterion::two_afc();
        assert!(c.is_met(&PerfWindow { trials: 100, decision_rate: 0.99, accuracy: 0.97 }));
        assert!(!c.is_met(&PerfWindow { trials: 100, decision_rate: 0.98, accuracy: 1.0 }));
        assert!(!c.is_met(&PerfWindow { trials: 100, decision_rate: 1.0, accuracy: 0.96 }));
        assert!(!c.is_met(&PerfWindow { trials: 0, decision_rate: 0.0, accuracy: 0.0 }));
    }
}
