//! Filter Policies Example
//!
//! Compares the two outlier policies of the position filter on the same
//! fix sequence: a tag walking in a straight line, one fix displaced by 5 m
//! (multipath) and a short run of Unknown windows.
//!
//! ## What You'll Learn
//!
//! - Configuring the adaptive and gated policies
//! - Reading the outcome of each filter step
//! - How Unknown windows turn into predicted samples
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_filter_policies
//! ```

use uwbtrack_core::{
    filter::GateConfig, FilterConfig, FilterState, Point2, StateFilter, UpdateOutcome, UpdatePolicy,
};

const STEP_S: f64 = 0.05;

fn main() {
    println!("uwbtrack Filter Policies Example");
    println!("================================\n");

    let truth = |i: usize| Point2::new(1.0 + i as f64 * STEP_S, 4.0);
    let fixes: Vec<Option<Point2>> = (0..30)
        .map(|i| match i {
            12 => Some(truth(i) + Point2::new(0.0, 5.0)),
            20..=22 => None,
            _ => Some(truth(i)),
        })
        .collect();

    let policies = [
        ("adaptive", FilterConfig::adaptive()),
        ("gated", FilterConfig::gated()),
        (
            "gated (3 rejections)",
            FilterConfig::gated().with_policy(UpdatePolicy::Gated(GateConfig::default().with_max_rejections(3))),
        ),
    ];

    for (name, config) in policies {
        println!("{}", name);
        println!("{}", "-".repeat(name.len()));
        let filter = config.build();
        let mut state = FilterState::new();
        let mut worst: f64 = 0.0;

        for (i, fix) in fixes.iter().enumerate() {
            let dt = if i == 0 { 0.0 } else { STEP_S };
            let step = filter.advance(&state, *fix, dt);
            state = step.state;
            let error = state.position.distance_to(&truth(i));
            worst = worst.max(error);

            let note = match step.outcome {
                UpdateOutcome::Accepted => continue,
                UpdateOutcome::Downweighted { factor } => format!("downweighted, R x {:.1}", factor),
                UpdateOutcome::Rejected { mahalanobis_sq } => format!("rejected, d2 = {:.1}", mahalanobis_sq),
                UpdateOutcome::Seeded => "seeded".to_string(),
                UpdateOutcome::NoMeasurement => "no fix".to_string(),
            };
            println!(
                "  step {:>2}: {:<24} {:?} ({:.2}, {:.2}) err {:.3} m",
                i,
                note,
                step.source,
                state.position.x,
                state.position.y,
                error
            );
        }
        println!("  worst error {:.3} m, final sigma {:.3} m\n", worst, state.position_sigma());
    }
}
