use std::collections::VecDeque;

use crate::systems::sdk::{Resolution, TrialState};

pub const DEFAULT_WINDOW: usize = 100;

/// Running performance totals across trials. Only the sequencer mutates
/// them, once per finished trial.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfCounters {
    pub trials: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub aborted: u32,
    pub missed: u32,
    pub no_decision: u32,
    /// Running mean of the terminal reward per trial.
    pub mean_reward: f64,
    recent: VecDeque<TrialState>,
    window: usize,
}

/// Summary over the most recent trials.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerfWindow {
    pub trials: usize,
    /// Fraction of trials that ended in a choice.
    pub decision_rate: f64,
    /// Fraction of choices that were correct.
    pub accuracy: f64,
}

impl PerfCounters {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            trials: 0,
            correct: 0,
            incorrect: 0,
            aborted: 0,
            missed: 0,
            no_decision: 0,
            mean_reward: 0.0,
            recent: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Records a finished trial. `outcome` must be terminal.
    pub fn record(&mut self, outcome: TrialState, reward: f64) {
        debug_assert!(outcome.is_terminal());
        match outcome {
            TrialState::Running => return,
            TrialState::Aborted => self.aborted += 1,
            TrialState::Resolved(Resolution::Correct) => self.correct += 1,
            TrialState::Resolved(Resolution::Incorrect) => self.incorrect += 1,
            TrialState::Resolved(Resolution::Miss) => self.missed += 1,
            TrialState::Resolved(Resolution::NoDecision) => self.no_decision += 1,
        }

        self.trials += 1;
        self.mean_reward += (reward - self.mean_reward) / self.trials as f64;

        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(outcome);
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.window);
    }

    pub fn window_len(&self) -> usize {
        self.window
    }

    /// Fraction of choices that were correct, over all trials.
    pub fn accuracy(&self) -> f64 {
        let decided = self.correct + self.incorrect;
        if decided == 0 {
            0.0
        } else {
            self.correct as f64 / decided as f64
        }
    }

    pub fn summary(&self) -> PerfWindow {
        let trials = self.recent.len();
        let decided = self.recent.iter().filter(|s| s.is_decision()).count();
        let correct = self.recent.iter().filter(|s| s.is_correct()).count();
        PerfWindow {
            trials,
            decision_rate: if trials == 0 { 0.0 } else { decided as f64 / trials as f64 },
            accuracy: if decided == 0 { 0.0 } else { correct as f64 / decided as f64 },
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_terminal_outcome_counts_as_a_trial() {
        let mut p = PerfCounters::default();
        p.record(TrialState::Aborted, -1.0);
        p.record(TrialState::Resolved(Resolution::Miss), 0.0);
        p.record(TrialState::Resolved(Resolution::Correct), 1.0);
        p.record(TrialState::Resolved(Resolution::Incorrect), 0.0);
        assert_eq!(p.trials, 4);
        assert_eq!((p.aborted, p.missed, p.correct, p.incorrect), (1, 1, 1, 1));
        assert_eq!(p.mean_reward, 0.0);
        assert_eq!(p.accuracy(), 0.5);

        let w = p.summary();
        assert_eq!(w.trials, 4);
        assert_eq!(w.decision_rate, 0.5);
        assert_eq!(w.accuracy, 0.5);
    }

    #[test]
    fn window_keeps_only_recent_trials() {
        let mut p = PerfCounters::new(3);
        p.record(TrialState::Aborted, -1.0);
        for _ in 0..3 {
            p.record(TrialState::Resolved(Resolution::Correct), 1.0);
        }
        let w = p.summary();
        assert_eq!(w.trials, 3);
        assert_eq!(w.decision_rate, 1.0);
        assert_eq!(w.accuracy, 1.0);
        assert_eq!(p.trials, 4);
    }

    #[test]
    fn clear_zeroes_everything_but_the_window() {
        let mut p = PerfCounters::new(5);
        p.record(TrialState::Resolved(Resolution::Correct), 1.0);
        p.clear();
        assert_eq!(p, PerfCounters::new(5));
        assert_eq!(p.summary().trials, 0);
    }
}
