//! # Time discretizer
//!
//! Turns named continuous-time epochs into a run of simulation steps.
//!
//! - Step `t` covers time `t * dt`; it belongs to epoch `e` iff
//!   `e.start <= t * dt < e.end`.
//! - `n_steps = ceil(tmax / dt)`, steps are `0..n_steps` with no gaps.
//! - *Sequential* epochs tile `[0, tmax)` back to back. *Concurrent* epochs
//!   (e.g. a fixation cue held across several sequential epochs) overlay
//!   them and must be declared as such.
//! - A zero-length epoch owns no steps, but its bounds stay queryable.
//!
//! Membership is precomputed as one bitmask per step, so a timeline holds
//! at most 64 epochs.

use crate::error::TaskError;

/// Relative slack for `tmax / dt` before rounding up, so that e.g.
/// 300 / 100 does not become 4 steps through float noise.
const STEP_EPS: f64 = 1e-9;

const MAX_EPOCHS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Epoch {
    pub name: &'static str,
    pub start: f64,
    pub end: f64,
    pub concurrent: bool,
}

impl Epoch {
    pub fn new(name: &'static str, start: f64, end: f64) -> Self {
        Self { name, start, end, concurrent: false }
    }

    /// An epoch that overlaps the sequential ones.
    pub fn concurrent(name: &'static str, start: f64, end: f64) -> Self {
        Self { name, start, end, concurrent: true }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains_time(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    dt: f64,
    tmax: f64,
    epochs: Vec<Epoch>,
    membership: Vec<u64>,
}

impl Timeline {
    pub fn new(dt: f64, tmax: f64, epochs: Vec<Epoch>) -> Result<Self, TaskError> {
        validate(dt, tmax, &epochs)?;

        let n = step_count(tmax, dt);
        let membership = (0..n)
            .map(|t| {
                let time = t as f64 * dt;
                epochs
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.contains_time(time))
                    .fold(0u64, |mask, (i, _)| mask | (1u64 << i))
            })
            .collect();

        Ok(Self { dt, tmax, epochs, membership })
    }

    /// Back-to-back epochs from `(name, duration)` pairs; `tmax` is their sum.
    pub fn sequential(dt: f64, durations: &[(&'static str, f64)]) -> Result<Self, TaskError> {
        let mut epochs = Vec::with_capacity(durations.len());
        let mut t = 0.0;
        for &(name, dur) in durations {
            epochs.push(Epoch::new(name, t, t + dur));
            t += dur;
        }
        Self::new(dt, t, epochs)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn tmax(&self) -> f64 {
        self.tmax
    }

    pub fn n_steps(&self) -> usize {
        self.membership.len()
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn epoch(&self, name: &str) -> Option<&Epoch> {
        self.epochs.iter().find(|e| e.name == name)
    }

    /// `(start, end)` of an epoch, including zero-length ones.
    pub fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.epoch(name).map(|e| (e.start, e.end))
    }

    /// Epochs active at step `t`. Past the last step nothing is active.
    pub fn active(&self, t: usize) -> ActiveEpochs<'_> {
        ActiveEpochs {
            epochs: &self.epochs,
            mask: self.membership.get(t).copied().unwrap_or(0),
        }
    }

    pub fn contains(&self, t: usize, name: &str) -> bool {
        self.active(t).contains(name)
    }

    /// Steps belonging to `name`, as a half-open index range.
    pub fn step_range(&self, name: &str) -> Option<std::ops::Range<usize>> {
        let bit = 1u64 << self.index_of(name)?;
        let first = self.membership.iter().position(|m| m & bit != 0);
        Some(match first {
            Some(first) => {
                let len = self.membership[first..].iter().take_while(|m| *m & bit != 0).count();
                first..first + len
            }
            None => 0..0,
        })
    }

    pub fn steps_in(&self, name: &str) -> usize {
        self.step_range(name).map_or(0, |r| r.len())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.epochs.iter().position(|e| e.name == name)
    }
}

/// Epoch membership of a single step.
#[derive(Clone, Copy, Debug)]
pub struct ActiveEpochs<'a> {
    epochs: &'a [Epoch],
    mask: u64,
}

impl<'a> ActiveEpochs<'a> {
    pub fn contains(&self, name: &str) -> bool {
        self.epochs
            .iter()
            .position(|e| e.name == name)
            .is_some_and(|i| self.mask & (1u64 << i) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + 'a {
        let mask = self.mask;
        self.epochs
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask & (1u64 << i) != 0)
            .map(|(_, e)| e.name)
    }
}

fn step_count(tmax: f64, dt: f64) -> usize {
    let raw = tmax / dt;
    (raw - raw.abs() * STEP_EPS).ceil().max(0.0) as usize
}

fn validate(dt: f64, tmax: f64, epochs: &[Epoch]) -> Result<(), TaskError> {
    let bad = |msg: String| Err(TaskError::InvalidTiming(msg));

    if !dt.is_finite() || dt <= 0.0 {
        return bad(format!("dt must be positive, got {dt}"));
    }
    if !tmax.is_finite() || tmax < 0.0 {
        return bad(format!("tmax must be >= 0, got {tmax}"));
    }
    if epochs.len() > MAX_EPOCHS {
        return bad(format!("at most {MAX_EPOCHS} epochs, got {}", epochs.len()));
    }

    for (i, e) in epochs.iter().enumerate() {
        if !e.start.is_finite() || !e.end.is_finite() || e.start < 0.0 {
            return bad(format!("epoch `{}` has bounds [{}, {})", e.name, e.start, e.end));
        }
        if e.end < e.start {
            return bad(format!("epoch `{}` ends before it starts ({} < {})", e.name, e.end, e.start));
        }
        if e.end > tmax {
            return bad(format!("epoch `{}` ends after tmax ({} > {tmax})", e.name, e.end));
        }
        if epochs[..i].iter().any(|o| o.name == e.name) {
            return bad(format!("epoch `{}` declared twice", e.name));
        }
    }

    // Sequential epochs must tile [0, tmax) in their stated order.
    let mut cursor = 0.0;
    for e in epochs.iter().filter(|e| !e.concurrent) {
        if e.start != cursor {
            return bad(format!(
                "epoch `{}` starts at {} but the previous epoch ends at {cursor}",
                e.name, e.start
            ));
        }
        cursor = e.end;
    }
    if epochs.iter().any(|e| !e.concurrent) && cursor != tmax {
        return bad(format!("epochs end at {cursor}, short of tmax {tmax}"));
    }
    Ok(())
}
