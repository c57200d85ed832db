//! Property tests for the localization pipeline
//!
//! Randomised checks of the invariants every stage must keep, whatever the
//! input: exact ranging is recovered, timelines are evenly spaced, filter
//! covariance stays positive semidefinite and gap filling never implies an
//! impossible speed.

#![cfg(test)]

mod common;

use proptest::prelude::*;
use uwbtrack_core::{
    matrix::is_positive_semidefinite,
    resample::{resample_all, SmoothingConfig, StepPolicy},
    solver::{RangeWindower, WindowConfig},
    FilterConfig, FilterState, FilteredSample, FrameSource, MotionLimits, Multilaterator, NoModel, Point2,
    ResampleConfig, SolverConfig, StateFilter, TrackState,
};

use common::{exact_ranges, square_bounds, square_field};

fn interior_point() -> impl Strategy<Value = Point2> {
    (0.5f64..9.5, 0.5f64..9.5).prop_map(|(x, y)| Point2::new(x, y))
}

fn walking_samples(intervals: &[u64], speed: f64) -> Vec<FilteredSample> {
    let mut ts = 0u64;
    let mut samples = Vec::with_capacity(intervals.len());
    for interval in intervals {
        let x = 1.0 + speed * ts as f64 / 1000.0;
        samples.push(FilteredSample {
            timestamp_ms: ts,
            position: Point2::new(x.min(9.0), 5.0),
            velocity: Point2::new(speed, 0.0),
            source: FrameSource::Measured,
            track_state: TrackState::Tracking,
        });
        ts += interval;
    }
    samples
}

proptest! {
    /// Exact ranges from the four corners pin down any interior point
    #[test]
    fn solver_recovers_interior_points(truth in interior_point()) {
        let anchors = square_field();
        let mut windower = RangeWindower::new(WindowConfig::default());
        let mut batches: Vec<_> = exact_ranges(1, 0, truth, &anchors)
            .into_iter()
            .filter_map(|r| windower.push(r))
            .collect();
        batches.extend(windower.flush());
        prop_assert_eq!(batches.len(), 1);

        let solver = Multilaterator::new(SolverConfig::default().with_bounds(square_bounds()));
        let estimate = solver.estimate(&batches[0], &anchors, None);
        let position = estimate.position.unwrap();
        prop_assert!(position.distance_to(&truth) < 0.01, "{:?} vs {:?}", position, truth);
    }

    /// Two anchors never produce a position
    #[test]
    fn two_anchors_are_unknown(truth in interior_point(), skip in 0usize..3) {
        let anchors = square_field();
        let mut records = exact_ranges(1, 0, truth, &anchors);
        records.drain(skip..skip + 2);

        let mut windower = RangeWindower::new(WindowConfig::default());
        let mut batches: Vec<_> = records.into_iter().filter_map(|r| windower.push(r)).collect();
        batches.extend(windower.flush());

        let solver = Multilaterator::new(SolverConfig::default().with_bounds(square_bounds()));
        let estimate = solver.estimate(&batches[0], &anchors, Some(truth));
        prop_assert!(estimate.is_unknown());
        prop_assert_eq!(estimate.contributing_anchor_count, 2);
    }

    /// Output timestamps are strictly increasing at exactly one step apart
    #[test]
    fn resampled_spacing_is_exact(
        intervals in prop::collection::vec(5u64..90, 20..120),
        step in prop::sample::select(vec![10.0f64, 16.67, 20.0, 33.33, 40.0]),
    ) {
        let samples = walking_samples(&intervals, 1.0);
        let config = ResampleConfig::default()
            .with_step(StepPolicy::Fixed(step))
            .with_limits(MotionLimits::default().with_bounds(square_bounds()));
        let trajectory = resample_all(&samples, config, NoModel);

        let frames = trajectory.frames();
        prop_assert!(!frames.is_empty());
        for pair in frames.windows(2) {
            let gap = pair[1].timestamp_ms - pair[0].timestamp_ms;
            prop_assert!(gap > 0.0);
            prop_assert!((gap - step).abs() < 1e-6, "gap {} for step {}", gap, step);
        }
    }

    /// Covariance stays symmetric PSD and positions stay finite
    #[test]
    fn filter_covariance_stays_psd(
        fixes in prop::collection::vec(prop::option::weighted(0.85, (0.0f64..20.0, 0.0f64..20.0)), 5..150),
        gated in any::<bool>(),
    ) {
        let filter = if gated { FilterConfig::gated() } else { FilterConfig::adaptive() }.build();
        let mut state = FilterState::new();
        for (i, fix) in fixes.iter().enumerate() {
            let dt = if i == 0 { 0.0 } else { 0.02 };
            let fix = fix.map(|(x, y)| Point2::new(x, y));
            state = filter.advance(&state, fix, dt).state;

            prop_assert!(state.position.is_finite());
            prop_assert!(state.velocity.is_finite());
            prop_assert!(is_positive_semidefinite(&state.covariance, 1e-9));
        }
    }

    /// Predicted frames never move faster than the configured limit
    #[test]
    fn gap_fill_respects_max_speed(
        speed in 0.2f64..3.0,
        gap_start in 300u64..800,
        gap_len in 150u64..900,
        max_speed in 2.0f64..8.0,
    ) {
        let intervals: Vec<u64> = (0..100).map(|_| 20).collect();
        let samples: Vec<_> = walking_samples(&intervals, speed)
            .into_iter()
            .filter(|s| s.timestamp_ms < gap_start || s.timestamp_ms >= gap_start + gap_len)
            .collect();

        let limits = MotionLimits::default().with_bounds(square_bounds()).with_max_speed(max_speed);
        let config = ResampleConfig::default()
            .with_step(StepPolicy::Fixed(20.0))
            .with_limits(limits)
            .with_smoothing(SmoothingConfig::default().with_window(1).with_jitter(None));
        let trajectory = resample_all(&samples, config, NoModel);

        for pair in trajectory.frames().windows(2) {
            if pair[1].source != FrameSource::Predicted {
                continue;
            }
            let dt_s = (pair[1].timestamp_ms - pair[0].timestamp_ms) / 1000.0;
            let speed = pair[1].position.distance_to(&pair[0].position) / dt_s;
            prop_assert!(speed <= max_speed + 1e-6, "{} m/s at {} ms", speed, pair[1].timestamp_ms);
            prop_assert!(square_bounds().contains(&pair[1].position));
        }
    }
}
