//! Constructor-time configuration.
//!
//! Every field is optional. What is left unset falls back to the task's own
//! defaults ([`crate::systems::sdk::Task::default_dt`],
//! [`crate::systems::sdk::Task::default_rewards`], built-in epoch durations).
//! Values are resolved once, when the environment is built.
//!
//! ```json
//! { "dt": 500,
//!   "rewards": { "abort": -1.0, "correct": 1.0, "miss": 0.0 },
//!   "timing":  { "delay": 13000 } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::systems::sdk::Rewards;

/// Partial reward table; `None` keeps the task default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardOverrides {
    pub abort: Option<f64>,
    pub correct: Option<f64>,
    pub fail: Option<f64>,
    pub miss: Option<f64>,
}

impl RewardOverrides {
    pub fn resolve(&self, defaults: Rewards) -> Rewards {
        Rewards {
            abort: self.abort.unwrap_or(defaults.abort),
            correct: self.correct.unwrap_or(defaults.correct),
            fail: self.fail.unwrap_or(defaults.fail),
            miss: self.miss.unwrap_or(defaults.miss),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Step duration, same unit as the epoch durations (ms).
    pub dt: Option<f64>,
    pub rewards: RewardOverrides,
    /// Epoch name → duration override. Keys must name an epoch of the task.
    pub timing: BTreeMap<String, f64>,
    /// Std of the per-step Gaussian input noise.
    pub sigma: Option<f64>,
    /// Number of recent trials summarised by the performance window.
    pub perf_window: Option<usize>,
}

impl TaskConfig {
    pub fn from_json(src: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn with_timing(mut self, epoch: &str, duration: f64) -> Self {
        self.timing.insert(epoch.to_string(), duration);
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Step duration, validated.
    pub fn resolve_dt(&self, default_dt: f64) -> Result<f64, TaskError> {
        let dt = self.dt.unwrap_or(default_dt);
        if !dt.is_finite() || dt <= 0.0 {
            return Err(TaskError::InvalidTiming(format!("dt must be positive, got {dt}")));
        }
        Ok(dt)
    }

    pub fn resolve_sigma(&self, default_sigma: f64) -> Result<f64, TaskError> {
        let sigma = self.sigma.unwrap_or(default_sigma);
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(TaskError::Config(format!("sigma must be >= 0, got {sigma}")));
        }
        Ok(sigma)
    }

    /// Fails on keys outside `known` and on negative or non-finite durations.
    pub fn check_timing(&self, known: &[&str]) -> Result<(), TaskError> {
        for (name, &dur) in &self.timing {
            if !known.contains(&name.as_str()) {
                return Err(TaskError::InvalidTiming(format!(
                    "unknown epoch `{name}` (expected one of {known:?})"
                )));
            }
            if !dur.is_finite() || dur < 0.0 {
                return Err(TaskError::InvalidTiming(format!(
                    "duration for `{name}` must be >= 0, got {dur}"
                )));
            }
        }
        Ok(())
    }

    pub fn timing_or(&self, epoch: &str, default: f64) -> f64 {
        self.timing.get(epoch).copied().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json() {
        let cfg = TaskConfig::from_json(
            r#"{"dt": 100, "rewards": {"abort": -0.5}, "timing": {"delay": 2000}}"#,
        )
        .unwrap();
        assert_eq!(cfg.dt, Some(100.0));
        assert_eq!(cfg.rewards.abort, Some(-0.5));
        assert_eq!(cfg.rewards.correct, None);
        assert_eq!(cfg.timing.get("delay"), Some(&2000.0));
        assert_eq!(cfg.sigma, None);
    }

    #[test]
    fn garbage_is_a_config_error() {
        let err = TaskConfig::from_json("{\"dt\": \"fast\"}").unwrap_err();
        assert!(matches!(err, TaskError::Config(_)));
    }

    #[test]
    fn reward_overrides_keep_defaults() {
        let defaults = Rewards { abort: -1.0, correct: 1.0, fail: 0.0, miss: 0.0 };
        let r = RewardOverrides { correct: Some(2.0), ..Default::default() }.resolve(defaults);
        assert_eq!(r, Rewards { abort: -1.0, correct: 2.0, fail: 0.0, miss: 0.0 });
    }

    #[test]
    fn rejects_bad_dt_and_unknown_epochs() {
        assert!(TaskConfig::default().with_dt(0.0).resolve_dt(500.0).is_err());
        assert!(TaskConfig::default().with_dt(f64::NAN).resolve_dt(500.0).is_err());
        assert_eq!(TaskConfig::default().resolve_dt(500.0), Ok(500.0));

        let cfg = TaskConfig::default().with_timing("delya", 10.0);
        assert!(matches!(cfg.check_timing(&["delay"]), Err(TaskError::InvalidTiming(_))));
        let cfg = TaskConfig::default().with_timing("delay", -1.0);
        assert!(matches!(cfg.check_timing(&["delay"]), Err(TaskError::InvalidTiming(_))));
    }
}
