// tests/motion.rs
#![cfg(feature = "task-motion")]

use trial_env::tasks::motion::*;
use trial_env::{
    Action, ActionSpace, GroundTruth, Resolution, TaskConfig, TaskError, TrialEnv, TrialState,
};

fn env(seed: u64) -> TrialEnv<SpatialSuppressMotion> {
    TrialEnv::<SpatialSuppressMotion>::from_config(&TaskConfig::default(), seed).unwrap()
}

fn uniform() -> Action {
    Action::Distribution(vec![0.25; N_DIRECTIONS])
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn trial_runs_every_frame_then_ends_without_decision() {
    let mut env = env(1);
    env.reset().unwrap();
    assert_eq!(env.trial().timeline.n_steps(), 37);
    assert_eq!(env.action_space(), ActionSpace::Simplex(4));

    for t in 0..36 {
        let out = env.step(&uniform()).unwrap();
        assert!(!out.terminated, "ended early at {t}");
        assert_eq!(out.reward, 0.0);
        assert_eq!(out.info.epochs, vec![STIMULUS]);
    }
    let last = env.step(&uniform()).unwrap();
    assert!(last.terminated);
    assert_eq!(last.info.step, 36);
    assert_eq!(last.reward, 0.0);
    assert_eq!(last.info.outcome, Some(TrialState::Resolved(Resolution::NoDecision)));
    assert_eq!(env.perf().no_decision, 1);
    assert_eq!(env.step_index(), 0);
}

#[test]
fn ground_truth_is_a_distribution_every_frame() {
    let mut env = env(2);
    env.reset().unwrap();
    for _ in 0..37 {
        let out = env.step(&uniform()).unwrap();
        let GroundTruth::Distribution(p) = &out.info.ground_truth else {
            panic!("expected a distribution, got {:?}", out.info.ground_truth);
        };
        assert_eq!(p.len(), N_DIRECTIONS);
        assert!(p.iter().all(|x| (0.0..=1.0).contains(x)));
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn ground_truth_tracks_the_frame_index() {
    let mut env = env(3);
    env.set_overrides(MotionOverrides {
        direction: Some(Direction::Down),
        contrast: Some(0.05),
        diameter: Some(1),
    });
    env.reset().unwrap();
    let run: Vec<_> = (0..37).map(|_| env.step(&uniform()).unwrap()).collect();
    for (t, out) in run.iter().enumerate() {
        let expect = direction_probabilities(1, 0.05, Direction::Down, t as f64).unwrap();
        assert_eq!(out.info.ground_truth, GroundTruth::Distribution(expect.to_vec()));
    }
    // Near chance at onset, near certain by the end.
    let GroundTruth::Distribution(first) = &run[0].info.ground_truth else { unreachable!() };
    let GroundTruth::Distribution(last) = &run[36].info.ground_truth else { unreachable!() };
    assert!(first[Direction::Down.index()] < 0.3);
    assert!(last[Direction::Down.index()] > 0.9);
}

#[test]
fn observation_encodes_direction_contrast_and_size() {
    let mut env = env(4);
    env.set_overrides(MotionOverrides {
        direction: Some(Direction::Right),
        contrast: Some(0.99),
        diameter: Some(1),
    });
    let obs = env.reset().unwrap();
    assert_eq!(obs.len(), N_INPUTS);

    let pool = |d: Direction| d.index() * MAX_DIAMETER;
    assert!(close(obs[pool(Direction::Right)], 0.99));
    assert!(close(obs[pool(Direction::Left)], 0.0));
    assert!(close(obs[pool(Direction::Up)], 0.495));
    assert!(close(obs[pool(Direction::Down)], 0.495));
    // Only the first size unit of each pool is driven.
    for d in Direction::ALL {
        assert!(obs[pool(d) + 1..pool(d) + MAX_DIAMETER].iter().all(|&x| x == 0.0));
    }
}

#[test]
fn large_stimulus_fills_every_size_unit() {
    let mut env = env(5);
    env.set_overrides(MotionOverrides {
        direction: Some(Direction::Up),
        contrast: Some(0.05),
        diameter: Some(11),
    });
    let obs = env.reset().unwrap();
    let up = Direction::Up.index() * MAX_DIAMETER;
    assert!(obs[up..up + MAX_DIAMETER].iter().all(|&x| close(x, 0.05)));
}

#[test]
fn unmeasured_conditions_are_rejected() {
    let cases = [
        MotionOverrides { diameter: Some(5), contrast: Some(0.99), ..Default::default() },
        MotionOverrides { diameter: Some(12), contrast: Some(0.99), ..Default::default() },
        MotionOverrides { diameter: Some(0), ..Default::default() },
        MotionOverrides { diameter: Some(1), contrast: Some(0.5), ..Default::default() },
    ];
    for overrides in cases {
        let mut env = env(6);
        env.set_overrides(overrides);
        assert!(
            matches!(env.reset(), Err(TaskError::UnsupportedCondition(_))),
            "{overrides:?} accepted"
        );
    }
}

#[test]
fn reports_must_be_four_weights_in_range() {
    let mut env = env(7);
    env.reset().unwrap();
    env.step(&uniform()).unwrap();

    for bad in [
        Action::Discrete(0),
        Action::Distribution(vec![0.5, 0.5]),
        Action::Distribution(vec![1.5, 0.0, 0.0, 0.0]),
        Action::Distribution(vec![f64::NAN, 0.0, 0.0, 0.0]),
    ] {
        assert!(matches!(env.step(&bad), Err(TaskError::InvalidAction(_))), "{bad:?}");
    }
    assert_eq!(env.step_index(), 1);
}

#[test]
fn never_reports_solved() {
    let mut env = env(8);
    env.reset().unwrap();
    for _ in 0..37 * 5 {
        env.step(&Action::Distribution(vec![0.0, 0.0, 1.0, 0.0])).unwrap();
    }
    assert_eq!(env.perf().trials, 5);
    assert!(!env.is_solved());
}

#[test]
fn stimulus_duration_is_configurable() {
    let cfg = TaskConfig::from_json(r#"{"dt": 10, "timing": {"stimulus": 100}}"#).unwrap();
    let mut env = TrialEnv::<SpatialSuppressMotion>::from_config(&cfg, 9).unwrap();
    env.reset().unwrap();
    assert_eq!(env.trial().timeline.n_steps(), 10);

    let bad = TaskConfig::default().with_timing("decision", 100.0);
    assert!(matches!(
        TrialEnv::<SpatialSuppressMotion>::from_config(&bad, 9),
        Err(TaskError::InvalidTiming(_))
    ));
}
