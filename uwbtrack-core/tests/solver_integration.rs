//! Integration tests for windowing and multilateration
//!
//! Covers the path from raw ranging records to position estimates: window
//! grouping, anchor lookup, failure handling and fix accuracy.

#![cfg(test)]

mod common;

use uwbtrack_core::{
    solver::{AnchorRange, RangeWindower, WindowConfig},
    AnchorConfig, AnchorMap, AnchorStatus, Bounds, Multilaterator, Point2, RangeMeasurement, SolverConfig,
    TrackError,
};

use common::{
    exact_ranges,
    generators::{RangeNoise, RangingGenerator},
    square_bounds, square_field,
};

fn solver() -> Multilaterator {
    Multilaterator::new(SolverConfig::default().with_bounds(square_bounds()))
}

fn windows(records: Vec<RangeMeasurement>) -> Vec<uwbtrack_core::solver::RangeBatch> {
    let mut windower = RangeWindower::new(WindowConfig::default());
    let mut batches: Vec<_> = records.into_iter().filter_map(|r| windower.push(r)).collect();
    batches.extend(windower.flush());
    batches
}

#[test]
fn three_anchor_reference_point() {
    let ranges = [
        AnchorRange::new(1, Point2::new(0.0, 0.0), 5.0),
        AnchorRange::new(2, Point2::new(10.0, 0.0), 65f64.sqrt()),
        AnchorRange::new(3, Point2::new(0.0, 10.0), 45f64.sqrt()),
    ];
    let report = solver().solve(&ranges, None).unwrap();
    assert_point_near!(report.position, Point2::new(3.0, 4.0), 0.01);
    assert_eq!(report.anchors_used, 3);
    assert!(report.rms_residual_m < 1e-3);
}

#[test]
fn overdetermined_fix_from_windows() {
    let anchors = square_field();
    let truth = Point2::new(7.5, 2.25);
    let mut records = Vec::new();
    for cycle in 0..5u64 {
        records.extend(exact_ranges(1, cycle * 50, truth, &anchors));
    }

    let solver = solver();
    let batches = windows(records);
    assert_eq!(batches.len(), 5);
    for batch in &batches {
        let estimate = solver.estimate(batch, &anchors, None);
        assert_eq!(estimate.contributing_anchor_count, 4);
        assert_point_near!(estimate.position.unwrap(), truth, 0.01);
    }
}

#[test]
fn noisy_ranges_stay_close() {
    let anchors = square_field();
    let truth = Point2::new(4.0, 6.0);
    let mut generator = RangingGenerator::new(1, anchors.clone(), 50).with_noise(RangeNoise {
        dropout: 0.0,
        ..RangeNoise::typical()
    });
    let records = generator.along(|_| truth, 0, 2000);

    let solver = solver();
    let mut warm = None;
    for batch in windows(records) {
        let estimate = solver.estimate(&batch, &anchors, warm);
        let position = estimate.position.unwrap();
        assert_point_near!(position, truth, 0.25);
        warm = Some(position);
    }
}

#[test]
fn too_few_anchors_is_unknown() {
    let anchors = square_field();
    let truth = Point2::new(5.0, 5.0);
    let mut records = exact_ranges(1, 0, truth, &anchors);
    records.truncate(2);

    let batches = windows(records);
    let estimate = solver().estimate(&batches[0], &anchors, Some(truth));
    assert!(estimate.is_unknown());
    assert_eq!(estimate.contributing_anchor_count, 2);
}

#[test]
fn failed_anchors_do_not_count() {
    let anchors = square_field();
    let truth = Point2::new(5.0, 5.0);
    let mut records = exact_ranges(1, 0, truth, &anchors);
    records[0] = records[0].with_status(AnchorStatus::Fail);
    records[1] = records[1].with_status(AnchorStatus::Fail);

    let batches = windows(records);
    assert_eq!(batches[0].valid_count(), 2);
    assert_eq!(batches[0].invalid, 2);
    assert!(solver().estimate(&batches[0], &anchors, None).is_unknown());
}

#[test]
fn unknown_anchor_ids_are_ignored() {
    let anchors = square_field();
    let truth = Point2::new(2.0, 8.0);
    let mut records = exact_ranges(1, 0, truth, &anchors);
    records.push(RangeMeasurement::new(1, 4, 99, 1.0));

    let batches = windows(records);
    let estimate = solver().estimate(&batches[0], &anchors, None);
    assert_eq!(estimate.contributing_anchor_count, 4);
    assert_point_near!(estimate.position.unwrap(), truth, 0.01);
}

#[test]
fn collinear_anchors_diverge() {
    let ranges = [
        AnchorRange::new(1, Point2::new(0.0, 0.0), 3.0),
        AnchorRange::new(2, Point2::new(5.0, 0.0), 3.0),
        AnchorRange::new(3, Point2::new(10.0, 0.0), 7.0),
    ];
    assert!(matches!(
        solver().solve(&ranges, None),
        Err(TrackError::SolverDivergence { .. })
    ));
}

#[test]
fn inconsistent_ranges_diverge() {
    // no point is 1 m from every corner of a 10 m square
    let ranges = [
        AnchorRange::new(1, Point2::new(0.0, 0.0), 1.0),
        AnchorRange::new(2, Point2::new(10.0, 0.0), 1.0),
        AnchorRange::new(3, Point2::new(0.0, 10.0), 1.0),
        AnchorRange::new(4, Point2::new(10.0, 10.0), 1.0),
    ];
    assert!(matches!(
        solver().solve(&ranges, None),
        Err(TrackError::SolverDivergence { .. })
    ));
}

#[test]
fn slant_ranges_are_projected() {
    let anchors: AnchorMap = [
        AnchorConfig::new(1, 0.0, 0.0).with_height(2.5),
        AnchorConfig::new(2, 10.0, 0.0).with_height(2.5),
        AnchorConfig::new(3, 0.0, 10.0).with_height(2.5),
        AnchorConfig::new(4, 10.0, 10.0).with_height(2.5),
    ]
    .into_iter()
    .collect();
    let truth = Point2::new(6.0, 3.0);
    let dz: f64 = 2.5 - 1.0;
    let records: Vec<_> = anchors
        .iter()
        .map(|a| {
            let horizontal = a.position.distance_to(&truth);
            RangeMeasurement::new(1, 0, a.anchor_id, (horizontal * horizontal + dz * dz).sqrt())
        })
        .collect();

    let solver = Multilaterator::new(
        SolverConfig::default()
            .with_bounds(Bounds::from_size(10.0, 10.0))
            .with_tag_height(1.0),
    );
    let batches = windows(records);
    let estimate = solver.estimate(&batches[0], &anchors, None);
    assert_point_near!(estimate.position.unwrap(), truth, 0.01);
}
