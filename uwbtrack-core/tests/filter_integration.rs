//! Integration tests for the state filter policies
//!
//! Drives both update policies with scripted fix sequences: Unknown gaps,
//! single outliers, persistent jumps and duplicate timestamps.

#![cfg(test)]

mod common;

use uwbtrack_core::{
    filter::{AdaptiveConfig, GateConfig},
    FilterConfig, FilterState, FrameSource, Point2, PositionFilter, StateFilter, UpdateOutcome, UpdatePolicy,
};

const STEP_S: f64 = 0.02;

fn line(i: usize) -> Point2 {
    Point2::new(i as f64 * STEP_S, 10.0)
}

/// Run `filter` over `fixes`, returning every step
fn run(filter: &PositionFilter, fixes: &[Option<Point2>]) -> Vec<uwbtrack_core::FilterStep> {
    let mut state = FilterState::new();
    let mut steps = Vec::with_capacity(fixes.len());
    for (i, fix) in fixes.iter().enumerate() {
        let dt = if i == 0 { 0.0 } else { STEP_S };
        let step = filter.advance(&state, *fix, dt);
        state = step.state;
        steps.push(step);
    }
    steps
}

fn policies() -> [(&'static str, PositionFilter); 2] {
    [
        ("adaptive", FilterConfig::adaptive().build()),
        ("gated", FilterConfig::gated().build()),
    ]
}

#[test]
fn unknown_gaps_are_predicted_not_unknown() {
    let fixes: Vec<_> = (0..50)
        .map(|i| if (10..=12).contains(&i) { None } else { Some(line(i)) })
        .collect();

    for (name, filter) in policies() {
        let steps = run(&filter, &fixes);
        for (i, step) in steps.iter().enumerate() {
            assert!(step.state.position.is_finite(), "{name}: NaN at {i}");
            let expected = if (10..=12).contains(&i) {
                FrameSource::Predicted
            } else {
                FrameSource::Measured
            };
            assert_eq!(step.source, expected, "{name}: wrong source at {i}");
        }
        assert_point_near!(steps[11].state.position, line(11), 0.5);
    }
}

#[test]
fn single_outlier_is_contained() {
    let outlier = line(25) + Point2::new(0.0, 5.0);
    let fixes: Vec<_> = (0..50)
        .map(|i| Some(if i == 25 { outlier } else { line(i) }))
        .collect();

    let [(_, adaptive), (_, gated)] = policies();

    let adaptive_steps = run(&adaptive, &fixes);
    let before = adaptive_steps[24].state.position;
    let after = adaptive_steps[25].state.position;
    assert!(matches!(adaptive_steps[25].outcome, UpdateOutcome::Downweighted { .. }));
    let pulled = after.distance_to(&before);
    assert!(pulled < 0.1 * outlier.distance_to(&before), "moved {pulled} m toward outlier");

    let gated_steps = run(&gated, &fixes);
    assert!(matches!(gated_steps[25].outcome, UpdateOutcome::Rejected { .. }));
    assert_eq!(gated_steps[25].source, FrameSource::Predicted);
    assert_point_near!(gated_steps[25].state.position, line(25), 0.01);

    // both recover once the outlier has passed
    assert_point_near!(adaptive_steps[49].state.position, line(49), 0.05);
    assert_point_near!(gated_steps[49].state.position, line(49), 0.05);
}

#[test]
fn gated_filter_follows_a_real_jump() {
    let jumped = Point2::new(6.0, 4.0);
    let fixes: Vec<_> = (0..40)
        .map(|i| Some(if i < 10 { line(i) } else { jumped }))
        .collect();
    let config = FilterConfig::gated().with_policy(UpdatePolicy::Gated(GateConfig::default().with_max_rejections(3)));
    let steps = run(&config.build(), &fixes);

    let rejected = steps
        .iter()
        .filter(|s| matches!(s.outcome, UpdateOutcome::Rejected { .. }))
        .count();
    assert_eq!(rejected, 3);
    assert_eq!(steps[13].outcome, UpdateOutcome::Seeded);
    assert_point_near!(steps[39].state.position, jumped, 0.01);
}

#[test]
fn adaptive_threshold_is_configurable() {
    let outlier = line(25) + Point2::new(0.0, 0.6);
    let fixes: Vec<_> = (0..30)
        .map(|i| Some(if i == 25 { outlier } else { line(i) }))
        .collect();

    let loose = run(&FilterConfig::adaptive().build(), &fixes);
    assert_eq!(loose[25].outcome, UpdateOutcome::Accepted);

    let tight = FilterConfig::adaptive()
        .with_policy(UpdatePolicy::Adaptive(AdaptiveConfig::default().with_threshold(0.2)))
        .build();
    let tight = run(&tight, &fixes);
    assert!(matches!(tight[25].outcome, UpdateOutcome::Downweighted { .. }));
}

#[test]
fn duplicate_timestamps_only_update() {
    let filter = FilterConfig::adaptive().build();
    let mut state = filter.seed(Point2::new(1.0, 1.0));
    for _ in 0..5 {
        state = filter.advance(&state, Some(Point2::new(1.0, 1.0)), 0.0).state;
    }
    assert_eq!(state.velocity, Point2::ZERO);
    assert!(state.position_sigma() < 0.5);
}

#[test]
fn covariance_stays_positive() {
    let fixes: Vec<_> = (0..200)
        .map(|i| match i % 17 {
            0 => None,
            5 => Some(line(i) + Point2::new(3.0, -2.0)),
            _ => Some(line(i)),
        })
        .collect();
    for (name, filter) in policies() {
        for step in run(&filter, &fixes) {
            let p = step.state.covariance;
            for i in 0..4 {
                assert!(p[i][i] >= 0.0, "{name}: negative variance");
                for j in 0..4 {
                    assert_within_tolerance!(p[i][j], p[j][i], 1e-9);
                }
            }
        }
    }
}
