//! Gap Prediction Example
//!
//! Compares linear extrapolation with the Gaussian-process predictor on a
//! player curving through a 600 ms ranging blackout.
//!
//! ## What You'll Learn
//!
//! - Configuring the predictor for a sport
//! - Plugging it into the resampler as gap filler
//! - How the motion context caps predicted speed
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 04_gap_prediction
//! ```

use uwbtrack_core::{
    resample::{resample_all, StepPolicy},
    Bounds, FilteredSample, FrameSource, MotionLimits, NoModel, Point2, ResampleConfig, TrackState, Trajectory,
};
use uwbtrack_ml::{KernelConfig, PredictorConfig, TrajectoryPredictor};

fn truth(ts: u64) -> Point2 {
    let t = ts as f64 / 1000.0;
    Point2::new(3.0 + 3.0 * (0.6 * t).sin(), 3.3 + 2.0 * (0.6 * t).cos())
}

fn report(name: &str, trajectory: &Trajectory) {
    let predicted: Vec<_> = trajectory
        .frames()
        .iter()
        .filter(|f| f.source == FrameSource::Predicted)
        .collect();
    let worst = predicted
        .iter()
        .map(|f| f.position.distance_to(&truth(f.timestamp_ms as u64)))
        .fold(0.0, f64::max);
    println!(
        "{:<12} {:>3} predicted frames, worst error {:.3} m, distance {:.2} m",
        name,
        predicted.len(),
        worst,
        trajectory.total_distance()
    );
}

fn main() {
    println!("uwbtrack Gap Prediction Example");
    println!("===============================\n");

    let limits = MotionLimits::default()
        .with_bounds(Bounds::from_size(6.26, 6.6))
        .with_max_speed(7.0);
    let samples: Vec<FilteredSample> = (0..200u64)
        .map(|i| i * 20)
        .filter(|ts| !(2000..2600).contains(ts))
        .map(|ts| FilteredSample {
            timestamp_ms: ts,
            position: truth(ts),
            velocity: (truth(ts + 1) - truth(ts)) * 1000.0,
            source: FrameSource::Measured,
            track_state: TrackState::Tracking,
        })
        .collect();
    let config = ResampleConfig::default()
        .with_step(StepPolicy::Fixed(20.0))
        .with_limits(limits);

    report("linear", &resample_all(&samples, config, NoModel));

    for (name, kernel) in [("matern 3/2", KernelConfig::matern()), ("rbf", KernelConfig::rbf())] {
        let predictor = TrajectoryPredictor::new(PredictorConfig::default().with_limits(limits).with_kernel(kernel));
        report(name, &resample_all(&samples, config, predictor));
    }
}
