// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests: every strategy driven through a simulated projector and
// camera with a constant colour drift.

use chromaloop_bridge::{
    DisplaySink, FeedbackSession, FrameOutcome, FrameSource, ScriptedSelector, SimulatedCamera,
    SimulatedDisplay, SimulatedRig,
};
use chromaloop_core::config::{CornerConfig, FilterMode, StrategyConfig};
use chromaloop_core::error::{ChromaloopError, Result};
use chromaloop_core::{LoopConfig, Point2D};
use chromaloop_correction::Strategy;
use image::{Rgb, RgbImage};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;
const DRIFT: [i16; 3] = [-20, -10, 15];
/// Distance of an uncorrected frame under `DRIFT`: (20 + 10 + 15) / (3 * 255).
const DRIFT_DISTANCE: f64 = 45.0 / 765.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn rig() -> SimulatedRig {
    SimulatedRig::new(96, 72, (20, 16)).with_drift(DRIFT)
}

fn grey() -> RgbImage {
    RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([128, 128, 128]))
}

fn manual_config(strategy: StrategyConfig) -> LoopConfig {
    LoopConfig {
        strategy,
        corners: CornerConfig::Manual {
            points: rig().region(WIDTH, HEIGHT).points().to_vec(),
        },
        ..LoopConfig::default()
    }
}

fn session(config: &LoopConfig) -> FeedbackSession<SimulatedCamera, SimulatedDisplay> {
    let (display, camera) = rig().split();
    FeedbackSession::new(config, WIDTH, HEIGHT, camera, display).expect("valid session")
}

/// Camera that drops exactly one frame, on its `fail_on`-th read.
struct FlakyCamera {
    inner: SimulatedCamera,
    reads: usize,
    fail_on: usize,
}

impl FrameSource for FlakyCamera {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.reads += 1;
        if self.reads == self.fail_on {
            return Err(ChromaloopError::Capture("camera dropped a frame".into()));
        }
        self.inner.next_frame()
    }
}

fn final_distances(outcomes: &[FrameOutcome]) -> Vec<f64> {
    outcomes
        .iter()
        .map(|o| o.record.final_distance().expect("at least one cycle").value())
        .collect()
}

fn assert_near(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} within {tol}, got {actual}"
    );
}

#[test]
fn baseline_sees_constant_drift() {
    init_tracing();
    let mut session = session(&manual_config(StrategyConfig::Baseline));
    let frames = vec![grey(); 3];
    let outcomes = session.run_frames(&frames).expect("run");

    assert_eq!(outcomes.len(), 3);
    for d in final_distances(&outcomes) {
        assert_near(d, DRIFT_DISTANCE, 0.005);
    }
    let centre = outcomes[2].rectified.get_pixel(WIDTH / 2, HEIGHT / 2).0;
    for (got, want) in centre.iter().zip([108u8, 118, 143]) {
        assert!(got.abs_diff(want) <= 1, "centre {centre:?}");
    }
}

#[test]
fn static_once_cancels_constant_drift() {
    init_tracing();
    let mut session = session(&manual_config(StrategyConfig::StaticOnce));
    let frames = vec![grey(); 4];
    let distances = final_distances(&session.run_frames(&frames).expect("run"));

    assert_near(distances[0], DRIFT_DISTANCE, 0.005);
    for d in &distances[1..] {
        assert!(*d < 0.005, "corrected frame still at {d}");
    }
}

#[test]
fn trailing_mean_stays_below_baseline() {
    init_tracing();
    let mut session = session(&manual_config(StrategyConfig::TrailingMean { capacity: 5 }));
    let frames = vec![grey(); 6];
    let distances = final_distances(&session.run_frames(&frames).expect("run"));

    assert_near(distances[0], DRIFT_DISTANCE, 0.005);
    for d in &distances[1..] {
        assert!(*d < 0.75 * DRIFT_DISTANCE, "frame distance {d} too close to baseline");
    }
}

/// With a single slot the trailing mean and median are the same controller.
#[test]
fn capacity_one_mean_and_median_runs_agree() {
    init_tracing();
    let frames: Vec<RgbImage> = (0..5)
        .map(|i| RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([100 + 10 * i, 140, 90])))
        .collect();

    let mut mean = session(&manual_config(StrategyConfig::TrailingMean { capacity: 1 }));
    let mut median = session(&manual_config(StrategyConfig::TrailingMedian { capacity: 1 }));
    let mean_runs = mean.run_frames(&frames).expect("mean run");
    let median_runs = median.run_frames(&frames).expect("median run");

    assert_eq!(final_distances(&mean_runs), final_distances(&median_runs));
    for (a, b) in mean_runs.iter().zip(&median_runs) {
        assert_eq!(a.rectified, b.rectified);
    }
}

#[test]
fn iterative_feedback_scores_every_cycle() {
    init_tracing();
    let config = manual_config(StrategyConfig::iterative(3, FilterMode::EveryCycle));
    let mut session = session(&config);
    let frames = vec![grey(); 2];
    let outcomes = session.run_frames(&frames).expect("run");

    assert_eq!(session.sink().shown(), 6);
    for outcome in &outcomes {
        let cycles = &outcome.record.cycle_distances;
        assert_eq!(cycles.len(), 3);
        // Each frame starts uncorrected, then the first correction lands.
        assert_near(cycles[0].value(), DRIFT_DISTANCE, 0.005);
        assert!(
            cycles[1].value() < cycles[0].value() / 2.0,
            "second cycle {} did not improve on {}",
            cycles[1].value(),
            cycles[0].value()
        );
    }
    assert_eq!(outcomes[1].record.frame_index, 1);
    assert_eq!(outcomes[0].record.run_id, outcomes[1].record.run_id);
}

#[test]
fn retried_frame_after_capture_failure_starts_fresh() {
    init_tracing();
    let config = manual_config(StrategyConfig::iterative(3, FilterMode::EveryCycle));
    let (display, camera) = rig().split();
    let camera = FlakyCamera {
        inner: camera,
        reads: 0,
        fail_on: 2,
    };
    let mut session =
        FeedbackSession::new(&config, WIDTH, HEIGHT, camera, display).expect("valid session");

    let err = session.run_frame(&grey()).expect_err("second capture fails");
    assert!(matches!(err, ChromaloopError::Capture(_)));
    assert!(err.is_frame_local());

    let outcome = session.run_frame(&grey()).expect("retry");
    let cycles = &outcome.record.cycle_distances;
    assert_eq!(cycles.len(), 3);
    assert_near(cycles[0].value(), DRIFT_DISTANCE, 0.005);
    assert!(
        cycles[1].value() < cycles[0].value() / 2.0,
        "second cycle {} did not improve on {}",
        cycles[1].value(),
        cycles[0].value()
    );
    match session.strategy() {
        Strategy::IterativeSpatial(fb) => assert_eq!(fb.cycles_completed(), 3),
        other => panic!("unexpected strategy {other:?}"),
    }
    assert_eq!(session.sink().shown(), 5);
}

#[test]
fn first_cycle_only_filtering_runs_the_same_cycle_count() {
    init_tracing();
    let config = manual_config(StrategyConfig::iterative(4, FilterMode::FirstCycleOnly));
    let mut session = session(&config);
    let outcome = session.run_frame(&grey()).expect("frame");
    assert_eq!(outcome.record.cycle_distances.len(), 4);
    assert!(outcome.record.cycle_distances[1].value() < DRIFT_DISTANCE);
}

#[test]
fn auto_detected_corners_rectify_the_projection() {
    init_tracing();
    let config = LoopConfig {
        strategy: StrategyConfig::Baseline,
        corners: CornerConfig::AutoDetect,
        ..LoopConfig::default()
    };
    let mut session = session(&config);
    let outcome = session.run_frame(&grey()).expect("projection found");

    assert_eq!(outcome.rectified.dimensions(), (WIDTH, HEIGHT));
    let centre = outcome.rectified.get_pixel(WIDTH / 2, HEIGHT / 2).0;
    for (got, want) in centre.iter().zip([108u8, 118, 143]) {
        assert!(got.abs_diff(want) <= 2, "centre {centre:?}");
    }
}

#[test]
fn interactive_corners_come_from_one_calibration_frame() {
    init_tracing();
    let config = LoopConfig {
        strategy: StrategyConfig::StaticOnce,
        corners: CornerConfig::Interactive,
        ..LoopConfig::default()
    };
    let mut session = session(&config);

    let region = rig().region(WIDTH, HEIGHT);
    let [a, b, c, d] = *region.points();
    let mut selector = ScriptedSelector::new([c, d, a, b]);
    let picked = session.calibrate(&grey(), &mut selector).expect("calibrated");
    assert_eq!(picked, region);

    let frames = vec![grey(); 3];
    let distances = final_distances(&session.run_frames(&frames).expect("run"));
    assert_eq!(selector.calls(), 1);
    assert!(distances[2] < 0.005, "final distance {}", distances[2]);
}

#[test]
fn json_config_drives_a_session() {
    init_tracing();
    let json = r#"{
        "strategy": { "kind": "trailing_median", "capacity": 3 },
        "corners": {
            "source": "manual",
            "points": [
                { "x": 68.0, "y": 48.0 },
                { "x": 20.0, "y": 48.0 },
                { "x": 20.0, "y": 16.0 },
                { "x": 68.0, "y": 16.0 }
            ]
        }
    }"#;
    let config = LoopConfig::from_json(json).expect("valid json");
    let mut session = session(&config);
    let outcomes = session.run_frames(&vec![grey(); 2]).expect("run");
    assert_eq!(outcomes.len(), 2);
    assert!(final_distances(&outcomes)[1] < 0.005);
}

#[test]
fn display_failures_end_the_run() {
    init_tracing();
    let (display, camera) = SimulatedRig::new(40, 30, (0, 0)).split();
    let mut session = FeedbackSession::new(
        &LoopConfig {
            corners: CornerConfig::Manual {
                points: vec![Point2D::new(0.0, 0.0); 4],
            },
            ..LoopConfig::default()
        },
        WIDTH,
        HEIGHT,
        camera,
        display,
    )
    .expect("valid session");
    let frames = vec![grey(); 2];
    let err = session.run_frames(&frames).expect_err("frame does not fit");
    assert!(!err.is_frame_local());
}

#[test]
fn sink_counts_frames_shown_outside_the_session() {
    init_tracing();
    let (mut display, camera) = rig().split();
    display.show(&grey()).expect("fits");
    let mut session = FeedbackSession::new(
        &manual_config(StrategyConfig::Baseline),
        WIDTH,
        HEIGHT,
        camera,
        display,
    )
    .expect("valid session");
    let outcome = session.run_frame(&grey()).expect("frame");
    assert_eq!(outcome.record.frame_index, 0);
    assert_eq!(session.sink().shown(), 2);
}
