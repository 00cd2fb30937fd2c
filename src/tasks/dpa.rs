// src/tasks/dpa.rs
#![cfg(feature = "task-dpa")]

//! Delay Pair Association (Zhang et al., bioRxiv 2018).
//!
//! Two odour-like stimuli are shown, separated by a long delay. After a
//! response delay the agent reports whether the pair *matches*.
//!
//! ```text
//! | fixation | dpa1 | delay (variable) | dpa2 | resp_delay | decision |
//! |<------------------------ hold ----------------------->|
//! ```
//!
//! - Inputs: `FIXATION` (held until the decision epoch), `S1`/`S2` during
//!   `dpa1`, `S3`/`S4` during `dpa2`.
//! - Actions: `FIXATE`, `NO_MATCH`, `MATCH`.
//! - The delay is drawn uniformly from `[delay_min, delay_max)` and snapped
//!   down to the dt grid (never below `delay_min`). `tmax` is sized for
//!   `delay_max`; whatever the delay leaves over goes to the decision epoch.

use bevy_prng::WyRand;
use tracing::debug;

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::mechanics::stoch;
use crate::systems::evaluator::{self, ChoiceRules};
use crate::systems::perf::PerfWindow;
use crate::systems::sdk::{
    Action, ActionSpace, GroundTruth, ObservationSynthesizer, Rendered, Rewards, StepEvaluator,
    Task, Trial, TrialGenerator, Verdict,
};
use crate::systems::timeline::{ActiveEpochs, Epoch, Timeline};
use crate::tasks::sdk::SolveCriterion;

// Epochs
pub const FIXATION: &str = "fixation";
pub const DPA1: &str = "dpa1";
pub const DELAY: &str = "delay";
pub const DPA2: &str = "dpa2";
pub const RESP_DELAY: &str = "resp_delay";
pub const DECISION: &str = "decision";
/// Concurrent with everything before `decision`; drives the fixation cue.
pub const HOLD: &str = "hold";

// Inputs
pub const IN_FIXATION: usize = 0;
pub const IN_S1: usize = 1;
pub const IN_S3: usize = 3;
pub const N_INPUTS: usize = 5;

// Actions
pub const FIXATE: usize = 0;
pub const NO_MATCH: usize = 1;
pub const MATCH: usize = 2;

/// Stimulus pairs; each element picks one of two stimuli.
pub const PAIRS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

const TIMING_KEYS: [&str; 8] =
    [FIXATION, DPA1, DELAY, "delay_min", "delay_max", DPA2, RESP_DELAY, DECISION];

/// Epoch durations in ms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DpaTiming {
    pub fixation: f64,
    pub dpa1: f64,
    pub delay_min: f64,
    pub delay_max: f64,
    pub dpa2: f64,
    pub resp_delay: f64,
    pub decision: f64,
}

impl Default for DpaTiming {
    fn default() -> Self {
        Self {
            fixation: 500.0,
            dpa1: 1000.0,
            delay_min: 13_000.0,
            delay_max: 13_001.0,
            dpa2: 1000.0,
            resp_delay: 1000.0,
            decision: 500.0,
        }
    }
}

impl DpaTiming {
    pub fn tmax(&self) -> f64 {
        self.fixation + self.dpa1 + self.delay_max + self.dpa2 + self.resp_delay + self.decision
    }

    fn from_config(cfg: &TaskConfig) -> Result<Self, TaskError> {
        cfg.check_timing(&TIMING_KEYS)?;
        let d = Self::default();
        let fixed_delay = cfg.timing.get(DELAY).copied();
        let timing = Self {
            fixation: cfg.timing_or(FIXATION, d.fixation),
            dpa1: cfg.timing_or(DPA1, d.dpa1),
            delay_min: fixed_delay.unwrap_or_else(|| cfg.timing_or("delay_min", d.delay_min)),
            delay_max: fixed_delay.unwrap_or_else(|| cfg.timing_or("delay_max", d.delay_max)),
            dpa2: cfg.timing_or(DPA2, d.dpa2),
            resp_delay: cfg.timing_or(RESP_DELAY, d.resp_delay),
            decision: cfg.timing_or(DECISION, d.decision),
        };
        if timing.delay_max < timing.delay_min {
            return Err(TaskError::InvalidTiming(format!(
                "delay_max {} < delay_min {}",
                timing.delay_max, timing.delay_min
            )));
        }
        Ok(timing)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Match,
    NoMatch,
}

impl Category {
    pub fn of(pair: (usize, usize)) -> Self {
        if pair.0 == pair.1 { Category::Match } else { Category::NoMatch }
    }

    pub fn action(self) -> usize {
        match self {
            Category::Match => MATCH,
            Category::NoMatch => NO_MATCH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DpaCondition {
    pub pair: (usize, usize),
    pub category: Category,
    /// Delay actually used for this trial, in ms.
    pub delay: f64,
}

impl DpaCondition {
    /// Stimuli shown in `dpa1` and `dpa2`. Non-match pairs are presented
    /// second element first.
    pub fn presented(&self) -> (usize, usize) {
        match self.category {
            Category::Match => self.pair,
            Category::NoMatch => (self.pair.1, self.pair.0),
        }
    }
}

/// Pins trial parameters; `None` samples them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DpaOverrides {
    pub pair: Option<(usize, usize)>,
    pub delay: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dpa {
    pub timing: DpaTiming,
    pub criterion: SolveCriterion,
}

impl Default for Dpa {
    fn default() -> Self {
        Self { timing: DpaTiming::default(), criterion: SolveCriterion::two_afc() }
    }
}

const RULES: ChoiceRules = ChoiceRules { fixate: FIXATE, decision_epoch: DECISION };

impl Dpa {
    fn sample_delay(&self, rng: &mut WyRand, dt: f64) -> f64 {
        let raw = stoch::uniform(rng, self.timing.delay_min, self.timing.delay_max);
        ((raw / dt).floor() * dt).max(self.timing.delay_min)
    }

    fn timeline(&self, dt: f64, delay: f64) -> Result<Timeline, TaskError> {
        let tm = &self.timing;
        let tmax = tm.tmax();
        let mut epochs = Vec::with_capacity(7);
        let mut t = 0.0;
        for (name, dur) in [
            (FIXATION, tm.fixation),
            (DPA1, tm.dpa1),
            (DELAY, delay),
            (DPA2, tm.dpa2),
            (RESP_DELAY, tm.resp_delay),
        ] {
            epochs.push(Epoch::new(name, t, t + dur));
            t += dur;
        }
        epochs.push(Epoch::new(DECISION, t, tmax));
        epochs.push(Epoch::concurrent(HOLD, 0.0, t));
        Timeline::new(dt, tmax, epochs)
    }
}

impl TrialGenerator for Dpa {
    type Condition = DpaCondition;
    type Overrides = DpaOverrides;

    fn generate(
        &self,
        rng: &mut WyRand,
        dt: f64,
        overrides: &DpaOverrides,
    ) -> Result<Trial<DpaCondition>, TaskError> {
        let delay = match overrides.delay {
            Some(d) if d.is_finite() && d >= 0.0 => d,
            Some(d) => return Err(TaskError::InvalidTiming(format!("delay must be >= 0, got {d}"))),
            None => self.sample_delay(rng, dt),
        };
        let timeline = self.timeline(dt, delay)?;

        let pair = match overrides.pair {
            Some(p) if p.0 < 2 && p.1 < 2 => p,
            Some(p) => {
                return Err(TaskError::UnsupportedCondition(format!(
                    "stimulus pair {p:?}: each element must be 0 or 1"
                )));
            }
            None => *stoch::choice(rng, &PAIRS),
        };
        let category = Category::of(pair);

        debug!(?pair, ?category, delay, "dpa trial");
        Ok(Trial {
            timeline,
            condition: DpaCondition { pair, category, delay },
            answer: category.action(),
        })
    }
}

impl ObservationSynthesizer for Dpa {
    fn observation_size(&self) -> usize {
        N_INPUTS
    }

    fn render(
        &self,
        trial: &Trial<DpaCondition>,
        _t: usize,
        active: ActiveEpochs<'_>,
    ) -> Result<Rendered, TaskError> {
        let (first, second) = trial.condition.presented();
        let mut obs = vec![0.0; N_INPUTS];
        if active.contains(HOLD) {
            obs[IN_FIXATION] = 1.0;
        }
        if active.contains(DPA1) {
            obs[IN_S1 + first] = 1.0;
        }
        if active.contains(DPA2) {
            obs[IN_S3 + second] = 1.0;
        }

        let label = if active.contains(DECISION) { trial.answer } else { FIXATE };
        Ok(Rendered { observation: obs, ground_truth: GroundTruth::Label(label) })
    }
}

impl StepEvaluator for Dpa {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(3)
    }

    fn evaluate(
        &self,
        trial: &Trial<DpaCondition>,
        previous: ActiveEpochs<'_>,
        action: &Action,
        rewards: &Rewards,
    ) -> Result<Verdict, TaskError> {
        match action {
            Action::Discrete(a) => Ok(RULES.evaluate(previous, *a, trial.answer, rewards)),
            Action::Distribution(_) => Err(TaskError::InvalidAction(
                "dpa expects a discrete choice".to_string(),
            )),
        }
    }

    fn on_elapsed(&self, _trial: &Trial<DpaCondition>, rewards: &Rewards) -> Verdict {
        evaluator::miss(rewards)
    }
}

impl Task for Dpa {
    fn name(&self) -> &'static str {
        "dpa"
    }

    fn configure(cfg: &TaskConfig) -> Result<Self, TaskError> {
        Ok(Self { timing: DpaTiming::from_config(cfg)?, ..Self::default() })
    }

    fn default_dt(&self) -> f64 {
        500.0
    }

    fn default_rewards(&self) -> Rewards {
        Rewards { abort: -1.0, correct: 1.0, fail: 0.0, miss: 0.0 }
    }

    fn is_solved(&self, perf: &PerfWindow) -> bool {
        self.criterion.is_met(perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::SeedableRng;

    #[test]
    fn default_timing_layout() {
        let tl = Dpa::default().timeline(500.0, 13_000.0).unwrap();
        assert_eq!(tl.tmax(), 17_001.0);
        assert_eq!(tl.n_steps(), 35);
        assert_eq!(tl.step_range(FIXATION), Some(0..1));
        assert_eq!(tl.step_range(DPA1), Some(1..3));
        assert_eq!(tl.step_range(DELAY), Some(3..29));
        assert_eq!(tl.step_range(DPA2), Some(29..31));
        assert_eq!(tl.step_range(RESP_DELAY), Some(31..33));
        assert_eq!(tl.step_range(DECISION), Some(33..35));
        assert_eq!(tl.step_range(HOLD), Some(0..33));
    }

    #[test]
    fn delay_snaps_to_grid() {
        let dpa = Dpa {
            timing: DpaTiming { delay_min: 1000.0, delay_max: 3000.0, ..DpaTiming::default() },
            ..Dpa::default()
        };
        let mut rng = WyRand::from_seed(5u64.to_le_bytes());
        for _ in 0..500 {
            let d = dpa.sample_delay(&mut rng, 500.0);
            assert!((1000.0..3000.0).contains(&d), "delay {d}");
            assert_eq!(d % 500.0, 0.0);
        }
    }

    #[test]
    fn configure_reads_timing_keys() {
        let cfg = TaskConfig::default().with_timing(DELAY, 2000.0).with_timing(DECISION, 1000.0);
        let dpa = Dpa::configure(&cfg).unwrap();
        assert_eq!(dpa.timing.delay_min, 2000.0);
        assert_eq!(dpa.timing.delay_max, 2000.0);
        assert_eq!(dpa.timing.decision, 1000.0);

        let cfg = TaskConfig::default()
            .with_timing("delay_min", 5.0)
            .with_timing("delay_max", 1.0);
        assert!(matches!(Dpa::configure(&cfg), Err(TaskError::InvalidTiming(_))));
    }

    #[test]
    fn category_follows_pair_identity() {
        assert_eq!(Category::of((1, 1)), Category::Match);
        assert_eq!(Category::of((0, 1)), Category::NoMatch);
        assert_eq!(Category::Match.action(), MATCH);
        assert_eq!(Category::NoMatch.action(), NO_MATCH);
    }
}
