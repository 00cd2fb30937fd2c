/*!
`trial_env` — step-driven trial environments for psychophysics-style
decision tasks.

What it does
- Discretises a trial's continuous-time epochs (fixation, stimulus, delay,
  decision, …) into simulation steps of a fixed `dt`.
- Renders a fixed-size observation and an aligned ground truth for every
  step, from the epochs active at that step.
- Scores one action per step against epoch-dependent rules (premature
  response, correct / incorrect choice, miss) and sequences trials,
  keeping performance counters across them.

How to use (call surface only)
- Pick a task (`tasks::dpa::Dpa`, `tasks::motion::SpatialSuppressMotion`,
  or your own `systems::sdk::Task`).
- Build `TrialEnv::<Task>::from_config(&TaskConfig, seed)`.
- `reset()` for the first observation, then `step(&Action)` until done.
- Or hand the environment and a policy to `run_until_solved`.

What it does NOT do
- No learning, no models, no plotting. You bring the agent.
*/

pub mod config;
pub mod error;
pub mod mechanics;
pub mod systems;
pub mod tasks;

pub use config::TaskConfig;
pub use error::TaskError;
pub use systems::sdk::{Action, ActionSpace, GroundTruth, Resolution, Rewards, TrialState};
pub use systems::sequencer::{StepInfo, StepResult, TrialEnv};
pub use tasks::sdk::Environment;

/// Result of a closed-loop session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Session {
    pub steps: usize,
    pub trials: usize,
    pub solved: bool,
}

/// Closed loop: observe → act → step, until the environment reports solved
/// at the end of a trial or `max_steps` steps have run.
pub fn run_until_solved<E, P>(env: &mut E, mut policy: P, max_steps: usize) -> Result<Session, TaskError>
where
    E: Environment + ?Sized,
    P: FnMut(&[f64]) -> Action,
{
    let mut obs = env.reset()?;
    let mut trials = 0;
    for steps in 1..=max_steps {
        let action = policy(&obs);
        let out = env.step(&action)?;
        obs = out.observation;
        if out.terminated {
            trials += 1;
            if env.is_solved() {
                return Ok(Session { steps, trials, solved: true });
            }
        }
    }
    Ok(Session { steps: max_steps, trials, solved: false })
}
