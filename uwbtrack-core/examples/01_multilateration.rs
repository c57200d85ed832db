//! Multilateration Example
//!
//! Shows how raw ranging records become position fixes: records are grouped
//! into short windows per tag, resolved against the anchor map and solved
//! with damped Gauss-Newton.
//!
//! ## What You'll Learn
//!
//! - Building an anchor map
//! - Windowing ranging records
//! - Reading a solve report
//! - What happens with too few anchors
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_multilateration
//! ```

use uwbtrack_core::{
    solver::{AnchorRange, RangeWindower, WindowConfig},
    AnchorConfig, AnchorMap, Bounds, Multilaterator, Point2, RangeMeasurement, SolverConfig,
};

fn main() {
    println!("uwbtrack Multilateration Example");
    println!("================================\n");

    // Three anchors, tag at (3, 4)
    let solver = Multilaterator::new(SolverConfig::default().with_bounds(Bounds::from_size(10.0, 10.0)));
    let ranges = [
        AnchorRange::new(1, Point2::new(0.0, 0.0), 5.0),
        AnchorRange::new(2, Point2::new(10.0, 0.0), 65f64.sqrt()),
        AnchorRange::new(3, Point2::new(0.0, 10.0), 45f64.sqrt()),
    ];
    match solver.solve(&ranges, None) {
        Ok(report) => println!(
            "Three anchors: ({:.3}, {:.3}) after {} iterations, rms residual {:.2e} m",
            report.position.x, report.position.y, report.iterations, report.rms_residual_m
        ),
        Err(err) => println!("Three anchors: {}", err),
    }

    // Full path: records -> windows -> estimates
    println!("\nWindowed records");
    println!("----------------");
    let anchors: AnchorMap = [
        AnchorConfig::new(1, 0.0, 0.0),
        AnchorConfig::new(2, 10.0, 0.0),
        AnchorConfig::new(3, 0.0, 10.0),
        AnchorConfig::new(4, 10.0, 10.0),
    ]
    .into_iter()
    .collect();

    let mut windower = RangeWindower::new(WindowConfig::default());
    let mut warm_start = None;
    for cycle in 0..6u64 {
        let truth = Point2::new(2.0 + cycle as f64 * 0.5, 5.0);
        // the third cycle loses two anchors
        let answering = if cycle == 2 { 2 } else { 4 };
        for anchor in anchors.iter().take(answering) {
            let record = RangeMeasurement::new(
                1,
                cycle * 50 + anchor.anchor_id as u64,
                anchor.anchor_id,
                anchor.position.distance_to(&truth) + 0.02,
            );
            if let Some(batch) = windower.push(record) {
                let estimate = solver.estimate(&batch, &anchors, warm_start);
                match estimate.position {
                    Some(position) => {
                        println!(
                            "t={:>4} ms  ({:.2}, {:.2})  {} anchors",
                            estimate.timestamp_ms, position.x, position.y, estimate.contributing_anchor_count
                        );
                        warm_start = Some(position);
                    }
                    None => println!(
                        "t={:>4} ms  Unknown      {} anchors",
                        estimate.timestamp_ms, estimate.contributing_anchor_count
                    ),
                }
            }
        }
    }
    if let Some(batch) = windower.flush() {
        let estimate = solver.estimate(&batch, &anchors, warm_start);
        println!("last window: {:?}", estimate.position);
    }
}
