// src/tasks/motion.rs
#![cfg(feature = "task-motion")]

//! Spatial suppression motion task (Tadin et al., Nature 2003).
//!
//! A drifting stimulus is shown for a single `stimulus` epoch; there is no
//! fixation or decision epoch. The target is not a single label but, per
//! frame, the probability that an observer reports each of four directions,
//! taken from measured human psychometric curves. Larger, high-contrast
//! stimuli are *harder* to judge at short durations (centre-surround
//! suppression).
//!
//! Observation: 4 direction pools × 11 size units = 44 channels. Channel
//! `d * 11 + s` carries `(cos(θ_d − θ_stim) + 1) · contrast / 2` when
//! `s < diameter`, else 0.
//!
//! Ground truth outside the measured conditions:
//! - along the frame axis the curves are extended linearly from their
//!   boundary segment, then the four probabilities are clamped to [0, 1]
//!   and renormalised;
//! - along the condition axis there is no interpolation: a diameter /
//!   contrast pair without a measured curve is `UnsupportedCondition`.

use std::f64::consts::{FRAC_PI_2, PI};

use bevy_prng::WyRand;
use tracing::debug;

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::mechanics::interp::Curve;
use crate::mechanics::stoch;
use crate::systems::evaluator;
use crate::systems::sdk::{
    Action, ActionSpace, GroundTruth, ObservationSynthesizer, Rendered, Rewards, StepEvaluator,
    Task, Trial, TrialGenerator, Verdict,
};
use crate::systems::timeline::{ActiveEpochs, Timeline};

pub const STIMULUS: &str = "stimulus";

pub const N_DIRECTIONS: usize = 4;
pub const MAX_DIAMETER: usize = 11;
pub const N_INPUTS: usize = N_DIRECTIONS * MAX_DIAMETER;

pub const CONTRASTS: [f64; 2] = [0.05, 0.99];
pub const DIAMETERS: [usize; 2] = [1, 11];

const CONTRAST_TOL: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; N_DIRECTIONS] =
        [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn theta(self) -> f64 {
        match self {
            Direction::Left => -FRAC_PI_2,
            Direction::Right => FRAC_PI_2,
            Direction::Up => 0.0,
            Direction::Down => PI,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn orthogonal(self) -> [Self; 2] {
        match self {
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
        }
    }
}

/// Frame indices at which the curves were measured.
const FRAMES: [f64; 19] = [
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 13.0, 16.0, 19.0, 27.0, 36.0,
    37.0, 38.0,
];

/// P(report stimulus direction) and P(report the opposite one) per frame.
struct Psychometric {
    correct: [f64; 19],
    opposite: [f64; 19],
}

const SMALL_LOW: Psychometric = Psychometric {
    correct: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2889, 0.2278, 0.2944, 0.2722, 0.4611,
        0.7167, 0.9000, 0.9611, 0.9444, 0.9611, 0.99, 0.99,
    ],
    opposite: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2556, 0.2778, 0.2667, 0.2611, 0.2056,
        0.0889, 0.0500, 0.0222, 0.0500, 0.0333, 0.003, 0.003,
    ],
};

const LARGE_HIGH: Psychometric = Psychometric {
    correct: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2056, 0.2167, 0.2833, 0.2389, 0.4000,
        0.7444, 0.8833, 0.9389, 0.9333, 0.9833, 0.99, 0.99,
    ],
    opposite: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2667, 0.2444, 0.2722, 0.3611, 0.4333,
        0.2222, 0.1111, 0.0556, 0.0611, 0.0111, 0.003, 0.003,
    ],
};

// Smoothed over the first frames.
const SMALL_HIGH: Psychometric = Psychometric {
    correct: [
        0.2500, 0.2500, 0.2685, 0.2870, 0.3056, 0.3241, 0.3426, 0.3889, 0.3611, 0.4111, 0.5556,
        0.7833, 0.9056, 0.9444, 0.9889, 0.9944, 0.99, 0.99, 0.99,
    ],
    opposite: [
        0.2500, 0.2500, 0.2639, 0.2778, 0.2917, 0.3056, 0.3194, 0.3389, 0.3333, 0.3278, 0.2833,
        0.1889, 0.0833, 0.0444, 0.0111, 0.0056, 0.003, 0.003, 0.003,
    ],
};

const LARGE_LOW: Psychometric = Psychometric {
    correct: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2278, 0.2611, 0.3222, 0.3333, 0.7944,
        0.9778, 0.9778, 0.9833, 0.9889, 0.9944, 0.9944, 0.9944,
    ],
    opposite: [
        0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.249, 0.2333, 0.2333, 0.2111, 0.1611, 0.1222,
        0.0111, 0.0222, 0.0167, 0.0111, 0.0056, 0.0056, 0.0056,
    ],
};

fn is_contrast(c: f64, level: f64) -> bool {
    (c - level).abs() < CONTRAST_TOL
}

fn psychometric(diameter: usize, contrast: f64) -> Result<&'static Psychometric, TaskError> {
    let low = is_contrast(contrast, CONTRASTS[0]);
    let high = is_contrast(contrast, CONTRASTS[1]);
    match (diameter, low, high) {
        (1, true, _) => Ok(&SMALL_LOW),
        (1, _, true) => Ok(&SMALL_HIGH),
        (11, true, _) => Ok(&LARGE_LOW),
        (11, _, true) => Ok(&LARGE_HIGH),
        _ => Err(TaskError::UnsupportedCondition(format!(
            "no psychometric curve for diameter {diameter}, contrast {contrast}"
        ))),
    }
}

/// Probability of reporting each direction (indexed by
/// [`Direction::index`]) at `frame`. Pure; sums to 1.
pub fn direction_probabilities(
    diameter: usize,
    contrast: f64,
    direction: Direction,
    frame: f64,
) -> Result<[f64; N_DIRECTIONS], TaskError> {
    let table = psychometric(diameter, contrast)?;
    let correct = Curve { xs: &FRAMES, ys: &table.correct }.at(frame);
    let opposite = Curve { xs: &FRAMES, ys: &table.opposite }.at(frame);
    let ortho = (1.0 - (correct + opposite)) / 2.0;

    let mut p = [0.0; N_DIRECTIONS];
    p[direction.index()] = correct;
    p[direction.opposite().index()] = opposite;
    for d in direction.orthogonal() {
        p[d.index()] = ortho;
    }

    for x in p.iter_mut() {
        *x = x.clamp(0.0, 1.0);
    }
    let total: f64 = p.iter().sum();
    if total <= 0.0 {
        return Ok([1.0 / N_DIRECTIONS as f64; N_DIRECTIONS]);
    }
    for x in p.iter_mut() {
        *x /= total;
    }
    Ok(p)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionCondition {
    pub direction: Direction,
    pub contrast: f64,
    /// Stimulus size in units, 1..=11.
    pub diameter: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionOverrides {
    pub direction: Option<Direction>,
    pub contrast: Option<f64>,
    pub diameter: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpatialSuppressMotion {
    /// Stimulus duration in ms.
    pub stimulus: f64,
}

impl Default for SpatialSuppressMotion {
    fn default() -> Self {
        // ~36 frames on a 120 Hz display; long enough for the curves to saturate.
        Self { stimulus: 300.0 }
    }
}

impl TrialGenerator for SpatialSuppressMotion {
    type Condition = MotionCondition;
    type Overrides = MotionOverrides;

    fn generate(
        &self,
        rng: &mut WyRand,
        dt: f64,
        overrides: &MotionOverrides,
    ) -> Result<Trial<MotionCondition>, TaskError> {
        let timeline = Timeline::sequential(dt, &[(STIMULUS, self.stimulus)])?;

        let direction = match overrides.direction {
            Some(d) => d,
            None => *stoch::choice(rng, &Direction::ALL),
        };
        let contrast = match overrides.contrast {
            Some(c) => c,
            None => *stoch::choice(rng, &CONTRASTS),
        };
        let diameter = match overrides.diameter {
            Some(d) => d,
            None => *stoch::choice(rng, &DIAMETERS),
        };
        if !(1..=MAX_DIAMETER).contains(&diameter) {
            return Err(TaskError::UnsupportedCondition(format!(
                "diameter {diameter} outside 1..={MAX_DIAMETER}"
            )));
        }
        psychometric(diameter, contrast)?;

        debug!(?direction, contrast, diameter, "motion trial");
        Ok(Trial {
            timeline,
            condition: MotionCondition { direction, contrast, diameter },
            answer: direction.index(),
        })
    }
}

impl ObservationSynthesizer for SpatialSuppressMotion {
    fn observation_size(&self) -> usize {
        N_INPUTS
    }

    fn render(
        &self,
        trial: &Trial<MotionCondition>,
        t: usize,
        active: ActiveEpochs<'_>,
    ) -> Result<Rendered, TaskError> {
        let c = trial.condition;
        let mut obs = vec![0.0; N_INPUTS];
        if active.contains(STIMULUS) {
            let theta = c.direction.theta();
            for d in Direction::ALL {
                let drive = ((d.theta() - theta).cos() + 1.0) * c.contrast / 2.0;
                let pool = d.index() * MAX_DIAMETER;
                obs[pool..pool + c.diameter].fill(drive);
            }
        }

        let p = direction_probabilities(c.diameter, c.contrast, c.direction, t as f64)?;
        Ok(Rendered { observation: obs, ground_truth: GroundTruth::Distribution(p.to_vec()) })
    }
}

impl StepEvaluator for SpatialSuppressMotion {
    fn action_space(&self) -> ActionSpace {
        ActionSpace::Simplex(N_DIRECTIONS)
    }

    /// Reports are collected every frame; none of them ends the trial.
    fn evaluate(
        &self,
        _trial: &Trial<MotionCondition>,
        _previous: ActiveEpochs<'_>,
        _action: &Action,
        _rewards: &Rewards,
    ) -> Result<Verdict, TaskError> {
        Ok(Verdict::running())
    }

    fn on_elapsed(&self, _trial: &Trial<MotionCondition>, _rewards: &Rewards) -> Verdict {
        evaluator::no_decision()
    }
}

impl Task for SpatialSuppressMotion {
    fn name(&self) -> &'static str {
        "spatial_suppress_motion"
    }

    fn configure(cfg: &TaskConfig) -> Result<Self, TaskError> {
        cfg.check_timing(&[STIMULUS])?;
        Ok(Self { stimulus: cfg.timing_or(STIMULUS, Self::default().stimulus) })
    }

    fn default_dt(&self) -> f64 {
        8.3
    }

    fn default_rewards(&self) -> Rewards {
        Rewards { abort: -0.1, correct: 1.0, fail: 0.0, miss: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_frames_are_near_chance() {
        let p = direction_probabilities(1, 0.05, Direction::Up, 0.0).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[Direction::Up.index()] - 0.249).abs() < 1e-12);
        assert!((p[Direction::Down.index()] - 0.249).abs() < 1e-12);
        assert!((p[Direction::Left.index()] - 0.251).abs() < 1e-12);
    }

    #[test]
    fn interpolates_between_measured_frames() {
        // Frames 13 and 16 of the small/low curve: 0.7167 → 0.9000.
        let p = direction_probabilities(1, 0.05, Direction::Left, 14.5).unwrap();
        let expect = (0.7167 + 0.9000) / 2.0;
        assert!((p[Direction::Left.index()] - expect).abs() < 1e-9);
    }

    #[test]
    fn late_frames_extrapolate_flat() {
        let p = direction_probabilities(11, 0.99, Direction::Right, 60.0).unwrap();
        assert!((p[Direction::Right.index()] - 0.99).abs() < 1e-9);
        assert!((p[Direction::Left.index()] - 0.003).abs() < 1e-9);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unmeasured_conditions_are_rejected() {
        assert!(matches!(
            direction_probabilities(5, 0.99, Direction::Up, 3.0),
            Err(TaskError::UnsupportedCondition(_))
        ));
        assert!(matches!(
            direction_probabilities(1, 0.5, Direction::Up, 3.0),
            Err(TaskError::UnsupportedCondition(_))
        ));
    }

    #[test]
    fn directions_pair_up() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert!(!d.orthogonal().contains(&d));
            assert!(!d.orthogonal().contains(&d.opposite()));
        }
    }
}
