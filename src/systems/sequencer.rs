//! Trial sequencer: owns the current trial, the step index, the random
//! stream and the performance counters, and drives one [`Task`] through
//! `reset` / `step`.
//!
//! Per `step(action)`:
//! 1. check the action against the task's action space;
//! 2. evaluate it against the epochs of the current step `t` (the step
//!    whose observation the caller answered);
//! 3. if the trial is still running and `t` was its last step, ask the task
//!    how an elapsed trial ends (usually a miss);
//! 4. on a terminal state, generate a fresh trial, then record the outcome
//!    and switch to the new trial at `t = 0`; otherwise advance `t`;
//! 5. render the observation for the new `t` and add input noise.

use bevy_prng::WyRand;
use rand_core::SeedableRng;
use tracing::{debug, trace};

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::mechanics::stoch;
use crate::systems::perf::{DEFAULT_WINDOW, PerfCounters, PerfWindow};
use crate::systems::sdk::{
    Action, ActionSpace, GroundTruth, Rewards, Task, Trial, TrialState, Verdict,
};

/// What `step` reports about the step it just evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct StepInfo {
    /// Index of the evaluated step within its trial.
    pub step: usize,
    /// Epochs active during the evaluated step.
    pub epochs: Vec<&'static str>,
    pub ground_truth: GroundTruth,
    /// Set when the trial ended on this step.
    pub outcome: Option<TrialState>,
    /// A fresh trial has begun and `observation` belongs to it.
    pub new_trial: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub terminated: bool,
    pub info: StepInfo,
}

#[derive(Clone, Debug)]
pub struct TrialEnv<T: Task> {
    task: T,
    dt: f64,
    rewards: Rewards,
    sigma: f64,
    rng: WyRand,
    overrides: T::Overrides,
    trial: Trial<T::Condition>,
    t: usize,
    perf: PerfCounters,
}

impl<T: Task> TrialEnv<T> {
    /// Resolves `cfg` against the task defaults and generates the first
    /// trial. Fails if the resolved timing is malformed.
    pub fn new(task: T, cfg: &TaskConfig, seed: u64) -> Result<Self, TaskError> {
        let dt = cfg.resolve_dt(task.default_dt())?;
        let rewards = cfg.rewards.resolve(task.default_rewards());
        let sigma = cfg.resolve_sigma(task.default_sigma())?;
        let mut rng = WyRand::from_seed(seed.to_le_bytes());
        let overrides = T::Overrides::default();
        let trial = task.generate(&mut rng, dt, &overrides)?;

        debug!(task = task.name(), dt, ?rewards, sigma, "environment ready");
        Ok(Self {
            task,
            dt,
            rewards,
            sigma,
            rng,
            overrides,
            trial,
            t: 0,
            perf: PerfCounters::new(cfg.perf_window.unwrap_or(DEFAULT_WINDOW)),
        })
    }

    pub fn from_config(cfg: &TaskConfig, seed: u64) -> Result<Self, TaskError> {
        Self::new(T::configure(cfg)?, cfg, seed)
    }

    /// Zeroes the counters, starts a fresh trial and returns its first
    /// observation.
    pub fn reset(&mut self) -> Result<Vec<f64>, TaskError> {
        self.perf.clear();
        self.start_trial()?;
        self.observe()
    }

    pub fn step(&mut self, action: &Action) -> Result<StepResult, TaskError> {
        self.task.action_space().check(action)?;

        let evaluated = self.t;
        let previous = self.trial.timeline.active(evaluated);
        let epochs: Vec<&'static str> = previous.names().collect();
        let ground_truth = self
            .task
            .render(&self.trial, evaluated, previous)?
            .ground_truth;

        let mut verdict = self.task.evaluate(&self.trial, previous, action, &self.rewards)?;
        if !verdict.state.is_terminal() && evaluated + 1 >= self.trial.timeline.n_steps() {
            verdict = self.task.on_elapsed(&self.trial, &self.rewards);
        }
        trace!(step = evaluated, ?epochs, ?action, state = verdict.state.tag(), "step");

        let terminated = verdict.state.is_terminal();
        if terminated {
            self.finish_trial(verdict)?;
        } else {
            self.t += 1;
        }

        Ok(StepResult {
            observation: self.observe()?,
            reward: verdict.reward,
            terminated,
            info: StepInfo {
                step: evaluated,
                epochs,
                ground_truth,
                outcome: terminated.then_some(verdict.state),
                new_trial: terminated,
            },
        })
    }

    /// Pins trial parameters for every trial generated from now on.
    pub fn set_overrides(&mut self, overrides: T::Overrides) {
        self.overrides = overrides;
    }

    pub fn overrides(&self) -> &T::Overrides {
        &self.overrides
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn trial(&self) -> &Trial<T::Condition> {
        &self.trial
    }

    /// Index of the step whose observation was returned last.
    pub fn step_index(&self) -> usize {
        self.t
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn perf(&self) -> &PerfCounters {
        &self.perf
    }

    pub fn observation_size(&self) -> usize {
        self.task.observation_size()
    }

    pub fn action_space(&self) -> ActionSpace {
        self.task.action_space()
    }

    pub fn is_solved(&self) -> bool {
        self.task.is_solved(&self.perf.summary())
    }

    pub fn summary(&self) -> PerfWindow {
        self.perf.summary()
    }

    /// The next trial is generated before the outcome is recorded: if
    /// generation fails the finished trial is neither counted nor replaced.
    fn finish_trial(&mut self, verdict: Verdict) -> Result<(), TaskError> {
        let next = self.task.generate(&mut self.rng, self.dt, &self.overrides)?;
        self.perf.record(verdict.state, verdict.reward);
        debug!(
            task = self.task.name(),
            step = self.t,
            outcome = verdict.state.tag(),
            reward = verdict.reward,
            trials = self.perf.trials,
            "trial finished"
        );
        self.install(next);
        Ok(())
    }

    fn start_trial(&mut self) -> Result<(), TaskError> {
        let next = self.task.generate(&mut self.rng, self.dt, &self.overrides)?;
        self.install(next);
        Ok(())
    }

    fn install(&mut self, trial: Trial<T::Condition>) {
        self.trial = trial;
        self.t = 0;
        debug!(
            task = self.task.name(),
            steps = self.trial.timeline.n_steps(),
            condition = ?self.trial.condition,
            "new trial"
        );
    }

    fn observe(&mut self) -> Result<Vec<f64>, TaskError> {
        let active = self.trial.timeline.active(self.t);
        let mut obs = self.task.render(&self.trial, self.t, active)?.observation;
        stoch::add_noise(&mut obs, self.sigma, &mut self.rng);
        Ok(obs)
    }
}
