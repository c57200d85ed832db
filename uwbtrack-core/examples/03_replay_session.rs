//! Session Replay Example
//!
//! Replays a recorded ranging log for two tags through the multi-tag
//! tracker and prints a summary of each resulting trajectory.
//!
//! ## What You'll Learn
//!
//! - Parsing collector records into `RangeMeasurement`s
//! - Feeding a tracker from a ranging source
//! - Tracking states and frame sources in the output
//! - Distance and speed queries on a trajectory
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 03_replay_session
//! ```

use uwbtrack_core::{
    share, source::RecordSource, AnchorMap, FrameSource, NoModel, Point2, SessionConfig, TrackState, Tracker,
    TrackerConfig,
};

/// Collector payload lines for two tags, with a blackout for tag 2
fn recording(anchors: &AnchorMap) -> Vec<String> {
    let mut lines = vec!["# tag,device_ms,anchor,raw_m,filtered_m,signal_dbm,status".to_string()];
    for cycle in 0..200u64 {
        let ts = cycle * 50;
        let t = ts as f64 / 1000.0;
        let walker = Point2::new(1.0 + 0.4 * t, 1.5 + 0.3 * t);
        let runner = Point2::new(3.0 + 2.0 * (t * 0.8).cos(), 3.3 + 2.0 * (t * 0.8).sin());

        for (tag, position) in [(1u32, walker), (2u32, runner)] {
            if tag == 2 && (4000..6000).contains(&ts) {
                continue;
            }
            for (i, anchor) in anchors.iter().enumerate() {
                let distance = anchor.position.distance_to(&position);
                lines.push(format!(
                    "{},{},{},{:.3},{:.3},-70,1",
                    tag,
                    ts + i as u64,
                    anchor.anchor_id,
                    distance + 0.03,
                    distance
                ));
            }
        }
    }
    lines.push("2,not-a-timestamp,10,1.0,1.0,-70,1".to_string());
    lines
}

fn main() {
    println!("uwbtrack Session Replay Example");
    println!("===============================\n");

    // horizontal ranges only for this synthetic log
    let mut anchors = AnchorMap::new();
    for anchor in AnchorMap::test_court().iter() {
        anchors.insert(uwbtrack_core::AnchorConfig::new(anchor.anchor_id, anchor.position.x, anchor.position.y));
    }
    let lines = recording(&anchors);

    let config = TrackerConfig::default().with_session(SessionConfig::default());
    let mut tracker = Tracker::new(config, share(anchors), |_| NoModel);

    let mut source = RecordSource::new(lines.iter());
    let processed = tracker.run_source(&mut source);
    let stats = tracker.stats();
    println!(
        "{} records routed, {} malformed, {} sessions\n",
        processed, stats.malformed, stats.sessions
    );

    let queue = tracker.queue();
    let trajectories = tracker.shutdown();
    println!("queue closed: {}\n", queue.is_closed());

    let mut tags: Vec<_> = trajectories.keys().copied().collect();
    tags.sort_unstable();
    for tag in tags {
        let trajectory = &trajectories[&tag];
        let frames = trajectory.frames();
        let count = |source: FrameSource| frames.iter().filter(|f| f.source == source).count();
        let lost = frames.iter().filter(|f| f.track_state == TrackState::Lost).count();

        println!("Tag {}", tag);
        println!("------");
        println!("  frames:       {}", frames.len());
        println!(
            "  measured:     {}  predicted: {}  interpolated: {}",
            count(FrameSource::Measured),
            count(FrameSource::Predicted),
            count(FrameSource::Interpolated)
        );
        println!("  lost frames:  {}", lost);
        println!("  distance:     {:.2} m", trajectory.total_distance());
        if let Some(speed) = trajectory.speed_between(0, trajectory.len().saturating_sub(1)) {
            println!("  mean speed:   {:.2} m/s", speed);
        }
        println!();
    }
}
