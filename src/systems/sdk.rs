// src/systems/sdk.rs

//! # Systems SDK
//!
//! Shared vocabulary and capability traits for building **tasks** on top of
//! the trial-timing core. A task is anything that can be driven one step at a
//! time through epochs (fixation, stimulus, delay, decision, …) and scored.
//!
//! ## The three capabilities
//! A task implements three small traits; the sequencer
//! ([`crate::systems::sequencer::TrialEnv`]) wires them together:
//!
//! 1) [`TrialGenerator`]: `(rng, dt, overrides) -> Trial`
//!    - Draw trial-scoped randomness (variable delays first), build the
//!      [`Timeline`], classify the condition and fix the correct answer.
//!    - `Overrides` is a struct of `Option`s; `Some` pins a parameter,
//!      `None` falls back to the task's sampling policy.
//!
//! 2) [`ObservationSynthesizer`]: `(trial, t, active epochs) -> Rendered`
//!    - Fill the fixed-size observation and the aligned ground truth.
//!    - Must be **pure**. Input noise is added by the sequencer afterwards
//!      from the task's `sigma`, fresh on every step.
//!
//! 3) [`StepEvaluator`]: `(trial, previous epochs, action) -> Verdict`
//!    - Score the action against the epochs of the step whose observation
//!      the caller was answering (observation precedes action).
//!    - `on_elapsed` decides the outcome when the trial runs out of steps
//!      while still running (a miss for decision tasks).
//!
//! [`Task`] bundles the three with construction from a
//! [`TaskConfig`] and task defaults (dt, rewards, noise, solve criterion).
//!
//! ## Trials are values
//! A [`Trial`] is built once and never mutated. A new trial *replaces* the
//! old one wholesale, so a step index can never address epochs of a stale
//! trial.
//!
//! ## Feature flags & reuse
//! - Keep tasks under `src/tasks/*` and gate them with `feature = "task-*"`.
//! - Shared decision-epoch rules live in [`crate::systems::evaluator`]; a
//!   task should call them rather than re-implement abort/choice logic.

use bevy_prng::WyRand;
use serde::{Deserialize, Serialize};

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::systems::perf::PerfWindow;
use crate::systems::timeline::{ActiveEpochs, Timeline};

/// Reward table. `fail` pays an incorrect choice, `miss` a trial that ran
/// out without a response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    pub abort: f64,
    pub correct: f64,
    pub fail: f64,
    pub miss: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Index into a discrete action set.
    Discrete(usize),
    /// One weight per category, e.g. a reported choice distribution.
    Distribution(Vec<f64>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionSpace {
    Discrete(usize),
    /// `n` finite weights, each in [0, 1].
    Simplex(usize),
}

impl ActionSpace {
    pub fn check(&self, action: &Action) -> Result<(), TaskError> {
        match (*self, action) {
            (ActionSpace::Discrete(n), Action::Discrete(a)) if *a < n => Ok(()),
            (ActionSpace::Discrete(n), Action::Discrete(a)) => Err(TaskError::InvalidAction(
                format!("action {a} outside 0..{n}"),
            )),
            (ActionSpace::Simplex(n), Action::Distribution(w)) => {
                if w.len() != n {
                    return Err(TaskError::InvalidAction(format!(
                        "expected {n} weights, got {}",
                        w.len()
                    )));
                }
                match w.iter().find(|x| !(x.is_finite() && (0.0..=1.0).contains(*x))) {
                    Some(x) => Err(TaskError::InvalidAction(format!("weight {x} outside [0, 1]"))),
                    None => Ok(()),
                }
            }
            (space, action) => Err(TaskError::InvalidAction(format!(
                "{action:?} does not fit {space:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GroundTruth {
    Label(usize),
    Distribution(Vec<f64>),
}

/// One step's output: what the agent sees and what it should answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub observation: Vec<f64>,
    pub ground_truth: GroundTruth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Correct,
    Incorrect,
    /// The trial ran out on a task that never asks for a choice.
    NoDecision,
    /// The decision epoch elapsed without a response.
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialState {
    Running,
    Aborted,
    Resolved(Resolution),
}

impl TrialState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrialState::Running)
    }

    /// `true` if the agent committed to a choice.
    pub fn is_decision(self) -> bool {
        matches!(
            self,
            TrialState::Resolved(Resolution::Correct | Resolution::Incorrect)
        )
    }

    pub fn is_correct(self) -> bool {
        matches!(self, TrialState::Resolved(Resolution::Correct))
    }

    pub fn tag(self) -> &'static str {
        match self {
            TrialState::Running => "running",
            TrialState::Aborted => "aborted",
            TrialState::Resolved(Resolution::Correct) => "correct",
            TrialState::Resolved(Resolution::Incorrect) => "incorrect",
            TrialState::Resolved(Resolution::NoDecision) => "no_decision",
            TrialState::Resolved(Resolution::Miss) => "miss",
        }
    }
}

/// Consequence of one evaluated step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
    pub reward: f64,
    pub state: TrialState,
}

impl Verdict {
    pub fn running() -> Self {
        Self { reward: 0.0, state: TrialState::Running }
    }
}

/// Immutable trial record.
#[derive(Clone, Debug, PartialEq)]
pub struct Trial<C> {
    pub timeline: Timeline,
    /// Sampled or pinned parameters, including trial-scoped draws.
    pub condition: C,
    /// Index of the correct response category.
    pub answer: usize,
}

pub trait TrialGenerator {
    type Condition: Clone + std::fmt::Debug + PartialEq;
    type Overrides: Clone + std::fmt::Debug + Default;

    /// Consumes entropy from `rng`. Same rng state and overrides give the
    /// same trial.
    fn generate(
        &self,
        rng: &mut WyRand,
        dt: f64,
        overrides: &Self::Overrides,
    ) -> Result<Trial<Self::Condition>, TaskError>;
}

pub trait ObservationSynthesizer: TrialGenerator {
    fn observation_size(&self) -> usize;

    fn render(
        &self,
        trial: &Trial<Self::Condition>,
        t: usize,
        active: ActiveEpochs<'_>,
    ) -> Result<Rendered, TaskError>;
}

pub trait StepEvaluator: TrialGenerator {
    fn action_space(&self) -> ActionSpace;

    /// `previous` holds the epochs of the step the action responds to.
    /// An action of the wrong kind is `InvalidAction`, even if
    /// [`ActionSpace::check`] was skipped.
    fn evaluate(
        &self,
        trial: &Trial<Self::Condition>,
        previous: ActiveEpochs<'_>,
        action: &Action,
        rewards: &Rewards,
    ) -> Result<Verdict, TaskError>;

    /// Outcome when the last step was evaluated and the trial still runs.
    fn on_elapsed(&self, trial: &Trial<Self::Condition>, rewards: &Rewards) -> Verdict;
}

pub trait Task: ObservationSynthesizer + StepEvaluator {
    fn name(&self) -> &'static str;

    /// Builds the task from constructor-time config (timing overrides).
    /// Malformed timing fails here, before any trial exists.
    fn configure(cfg: &TaskConfig) -> Result<Self, TaskError>
    where
        Self: Sized;

    fn default_dt(&self) -> f64;

    fn default_rewards(&self) -> Rewards;

    fn default_sigma(&self) -> f64 {
        0.0
    }

    /// Whether a windowed performance summary counts as solved.
    fn is_solved(&self, _perf: &PerfWindow) -> bool {
        false
    }
}
