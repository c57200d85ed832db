//! Benchmarks for the per-tag localization pipeline
//!
//! Run with: cargo bench -p uwbtrack-core --bench pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uwbtrack_core::{
    resample::resample_all,
    solver::AnchorRange,
    AnchorMap, FilterConfig, FilteredSample, FrameSource, Multilaterator, NoModel, Point2, RangeMeasurement,
    ResampleConfig, SessionConfig, SolverConfig, StateFilter, TagSession, TrackState,
};

const CYCLE_MS: u64 = 50;

fn court() -> AnchorMap {
    AnchorMap::test_court()
}

/// Exact ranging along a slow diagonal walk
fn recording(anchors: &AnchorMap, seconds: u64) -> Vec<RangeMeasurement> {
    let mut records = Vec::new();
    let mut ts = 0;
    while ts < seconds * 1000 {
        let t = ts as f64 / 1000.0;
        let truth = Point2::new(0.5 + 0.1 * t, 0.5 + 0.08 * t);
        for (i, anchor) in anchors.iter().enumerate() {
            let distance = anchor.position.distance_to(&truth);
            records.push(RangeMeasurement::new(1, ts + i as u64, anchor.anchor_id, distance));
        }
        ts += CYCLE_MS;
    }
    records
}

// ============================================================================
// Solver
// ============================================================================

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("multilateration");
    let anchors = court();
    let truth = Point2::new(3.0, 2.5);
    let solver = Multilaterator::new(SolverConfig::default());

    for count in [3usize, 4, 6] {
        let ranges: Vec<AnchorRange> = anchors
            .iter()
            .cycle()
            .take(count)
            .enumerate()
            .map(|(i, a)| {
                let offset = if i >= anchors.len() { 0.01 } else { 0.0 };
                AnchorRange::new(a.anchor_id, a.position, a.position.distance_to(&truth) + offset)
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("solve", count), &ranges, |b, ranges| {
            b.iter(|| solver.solve(black_box(ranges), None))
        });
        group.bench_with_input(BenchmarkId::new("solve_warm", count), &ranges, |b, ranges| {
            b.iter(|| solver.solve(black_box(ranges), Some(truth)))
        });
    }

    group.finish();
}

// ============================================================================
// Filter
// ============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let fixes: Vec<Option<Point2>> = (0..1000)
        .map(|i| if i % 25 == 0 { None } else { Some(Point2::new(i as f64 * 0.02, 3.0)) })
        .collect();
    group.throughput(Throughput::Elements(fixes.len() as u64));

    for (name, config) in [("adaptive", FilterConfig::adaptive()), ("gated", FilterConfig::gated())] {
        let filter = config.build();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut state = filter.seed(Point2::new(0.0, 3.0));
                for fix in &fixes {
                    state = filter.advance(&state, black_box(*fix), 0.02).state;
                }
                state
            })
        });
    }

    group.finish();
}

// ============================================================================
// Resampler
// ============================================================================

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    let samples: Vec<FilteredSample> = (0..3000u64)
        .filter(|i| i % 100 < 80)
        .map(|i| FilteredSample {
            timestamp_ms: i * 20,
            position: Point2::new(1.0 + (i as f64 * 0.002) % 4.0, 2.0),
            velocity: Point2::new(0.1, 0.0),
            source: FrameSource::Measured,
            track_state: TrackState::Tracking,
        })
        .collect();
    group.throughput(Throughput::Elements(samples.len() as u64));

    group.bench_function("resample_all", |b| {
        b.iter(|| resample_all(black_box(&samples), ResampleConfig::default(), NoModel))
    });

    group.finish();
}

// ============================================================================
// Full session
// ============================================================================

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(20);
    let anchors = court();

    for seconds in [10u64, 60] {
        let records = recording(&anchors, seconds);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::new("replay", seconds), &records, |b, records| {
            b.iter(|| {
                let session = TagSession::new(1, SessionConfig::default(), NoModel);
                session.replay(black_box(records.iter().copied()), &anchors)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solver, bench_filter, bench_resample, bench_session);
criterion_main!(benches);
