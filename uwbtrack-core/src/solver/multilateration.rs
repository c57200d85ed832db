//! Bounded nonlinear least-squares multilateration
//!
//! ## Algorithm
//!
//! For anchors aᵢ and measured floor-plane distances dᵢ:
//!
//! ```text
//! rᵢ(p)  = ‖p − aᵢ‖ − dᵢ                 residual
//! Jᵢ(p)  = (p − aᵢ)ᵀ / ‖p − aᵢ‖          residual gradient
//! (JᵀJ + λ·diag(JᵀJ))·δ = −Jᵀr           damped normal equations
//! p ← Π(p + δ)                           projection onto search area
//! ```
//!
//! λ shrinks after a step that lowers the cost and grows after one that
//! does not. The loop converges when the projected step is shorter than the
//! tolerance.

use heapless::Vec;

use crate::{
    anchors::AnchorMap,
    constants::{
        physics::SOLVER_AREA_MARGIN_M,
        solver::{
            MAX_ANCHORS_PER_WINDOW, MIN_ANCHORS_FOR_FIX, MIN_GEOMETRY_SPREAD,
            SOLVER_INITIAL_DAMPING, SOLVER_MAX_ITERATIONS, SOLVER_MAX_RMS_RESIDUAL_M,
            SOLVER_STEP_TOLERANCE_M,
        },
    },
    errors::{TrackError, TrackResult},
    frame::PositionEstimate,
    geometry::{Bounds, Point2},
    macros::log_warn,
    matrix::{invert, SquareMatrix},
    measurement::AnchorId,
    solver::window::RangeBatch,
};

/// Damping beyond which the solver stops retrying rejected steps
const MAX_DAMPING: f64 = 1e10;

/// Solver configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Playing area
    pub bounds: Bounds,
    /// Search margin around the area (m)
    pub margin_m: f64,
    /// Minimum valid ranges for a fix
    pub min_anchors: usize,
    /// Iteration limit
    pub max_iterations: usize,
    /// Convergence threshold on the step length (m)
    pub step_tolerance_m: f64,
    /// Largest acceptable RMS range residual (m)
    pub max_rms_residual_m: f64,
    /// Smallest acceptable normalized anchor triangle area
    pub min_geometry_spread: f64,
    /// Tag height used to project slant ranges onto the floor (m)
    pub tag_height_m: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            margin_m: SOLVER_AREA_MARGIN_M,
            min_anchors: MIN_ANCHORS_FOR_FIX,
            max_iterations: SOLVER_MAX_ITERATIONS,
            step_tolerance_m: SOLVER_STEP_TOLERANCE_M,
            max_rms_residual_m: SOLVER_MAX_RMS_RESIDUAL_M,
            min_geometry_spread: MIN_GEOMETRY_SPREAD,
            tag_height_m: None,
        }
    }
}

impl SolverConfig {
    /// Set the playing area
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the search margin
    pub fn with_margin(mut self, margin_m: f64) -> Self {
        self.margin_m = margin_m.max(0.0);
        self
    }

    /// Set the residual sanity bound
    pub fn with_max_rms_residual(mut self, max_rms_residual_m: f64) -> Self {
        self.max_rms_residual_m = max_rms_residual_m;
        self
    }

    /// Project slant ranges using the given tag height
    pub fn with_tag_height(mut self, tag_height_m: f64) -> Self {
        self.tag_height_m = Some(tag_height_m);
        self
    }
}

/// One anchor position paired with a floor-plane distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRange {
    /// Anchor the range was measured against
    pub anchor_id: AnchorId,
    /// Anchor floor-plane position
    pub position: Point2,
    /// Floor-plane distance (m)
    pub distance_m: f64,
}

impl AnchorRange {
    /// Pair an anchor position with a distance
    pub fn new(anchor_id: AnchorId, position: Point2, distance_m: f64) -> Self {
        Self {
            anchor_id,
            position,
            distance_m,
        }
    }
}

/// Successful fix with diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Solved position
    pub position: Point2,
    /// RMS of the range residuals at the solution (m)
    pub rms_residual_m: f64,
    /// Iterations used
    pub iterations: usize,
    /// Anchors that contributed
    pub anchors_used: usize,
}

/// Multilateration solver
#[derive(Debug, Clone)]
pub struct Multilaterator {
    config: SolverConfig,
    search: Bounds,
}

impl Multilaterator {
    /// Create a solver
    pub fn new(config: SolverConfig) -> Self {
        Self {
            search: config.bounds.expanded(config.margin_m),
            config,
        }
    }

    /// Configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Pair a batch's valid ranges with known anchors
    ///
    /// Ranges from anchors missing in `anchors` are skipped. With both an
    /// anchor height and a tag height configured, slant ranges are projected
    /// onto the floor plane.
    pub fn resolve(&self, batch: &RangeBatch, anchors: &AnchorMap) -> Vec<AnchorRange, MAX_ANCHORS_PER_WINDOW> {
        let mut pairs = Vec::new();
        for range in batch.ranges.iter() {
            let Some(anchor) = anchors.get(range.anchor_id) else {
                log_warn!("range from unknown anchor {} ignored", range.anchor_id);
                continue;
            };
            let slant = range.distance_m();
            let distance = match (anchor.z, self.config.tag_height_m) {
                (Some(z), Some(h)) => {
                    let dz = z - h;
                    libm::sqrt((slant * slant - dz * dz).max(0.0))
                }
                _ => slant,
            };
            // capacity matches the batch, so this cannot overflow
            let _ = pairs.push(AnchorRange::new(anchor.anchor_id, anchor.position, distance));
        }
        pairs
    }

    /// Solve one window into a labelled estimate
    ///
    /// Solver failures become Unknown; they are logged, never propagated.
    pub fn estimate(&self, batch: &RangeBatch, anchors: &AnchorMap, warm_start: Option<Point2>) -> PositionEstimate {
        let pairs = self.resolve(batch, anchors);
        match self.solve(&pairs, warm_start) {
            Ok(report) => PositionEstimate::known(batch.timestamp_ms, report.position, report.anchors_used),
            Err(err) => {
                if !matches!(err, TrackError::InsufficientAnchors { .. }) {
                    log_warn!("tag {} at {} ms: {}", batch.tag_id, batch.timestamp_ms, err);
                }
                PositionEstimate::unknown(batch.timestamp_ms, pairs.len())
            }
        }
    }

    /// Solve for the point that best explains the given ranges
    pub fn solve(&self, ranges: &[AnchorRange], warm_start: Option<Point2>) -> TrackResult<SolveReport> {
        let valid = ranges
            .iter()
            .filter(|r| r.distance_m.is_finite() && r.distance_m >= 0.0 && r.position.is_finite())
            .count();
        if valid < self.config.min_anchors.max(MIN_ANCHORS_FOR_FIX) {
            return Err(TrackError::InsufficientAnchors {
                required: self.config.min_anchors.max(MIN_ANCHORS_FOR_FIX),
                available: valid,
            });
        }
        if valid != ranges.len() {
            return Err(TrackError::SolverDivergence { reason: "non-finite range" });
        }

        if geometry_spread(ranges) < self.config.min_geometry_spread {
            return Err(TrackError::SolverDivergence { reason: "collinear anchors" });
        }

        let start = warm_start
            .filter(Point2::is_finite)
            .unwrap_or_else(|| self.config.bounds.centroid());
        let mut position = self.search.clamp(start);
        let mut cost = sum_squared_residuals(ranges, position);
        let mut damping = SOLVER_INITIAL_DAMPING;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let (normal, gradient) = normal_equations(ranges, position);
            let mut damped = normal;
            for i in 0..2 {
                damped[i][i] += damping * normal[i][i] + 1e-12;
            }
            let Some(inverse) = invert(&damped) else {
                return Err(TrackError::SolverDivergence { reason: "singular normal equations" });
            };
            let step = Point2::new(
                -(inverse[0][0] * gradient[0] + inverse[0][1] * gradient[1]),
                -(inverse[1][0] * gradient[0] + inverse[1][1] * gradient[1]),
            );

            let candidate = self.search.clamp(position + step);
            let moved = candidate.distance_to(&position);
            let candidate_cost = sum_squared_residuals(ranges, candidate);

            if candidate_cost <= cost {
                position = candidate;
                cost = candidate_cost;
                damping = (damping * 0.3).max(1e-12);
                if moved < self.config.step_tolerance_m {
                    converged = true;
                    break;
                }
            } else {
                damping *= 10.0;
                if moved < self.config.step_tolerance_m || damping > MAX_DAMPING {
                    // no descent direction left inside the search area
                    converged = true;
                    break;
                }
            }
        }

        if !converged || !position.is_finite() {
            return Err(TrackError::SolverDivergence { reason: "did not converge" });
        }

        let rms_residual_m = libm::sqrt(cost / ranges.len() as f64);
        if rms_residual_m > self.config.max_rms_residual_m {
            return Err(TrackError::SolverDivergence { reason: "residual above sanity bound" });
        }

        Ok(SolveReport {
            position,
            rms_residual_m,
            iterations,
            anchors_used: ranges.len(),
        })
    }
}

fn sum_squared_residuals(ranges: &[AnchorRange], p: Point2) -> f64 {
    ranges
        .iter()
        .map(|r| {
            let residual = p.distance_to(&r.position) - r.distance_m;
            residual * residual
        })
        .sum()
}

/// JᵀJ and Jᵀr at `p`
fn normal_equations(ranges: &[AnchorRange], p: Point2) -> (SquareMatrix<2>, [f64; 2]) {
    let mut jtj = [[0.0; 2]; 2];
    let mut jtr = [0.0; 2];
    for r in ranges {
        let delta = p - r.position;
        let dist = delta.norm();
        if dist < 1e-9 {
            continue;
        }
        let j = [delta.x / dist, delta.y / dist];
        let residual = dist - r.distance_m;
        for a in 0..2 {
            jtr[a] += j[a] * residual;
            for b in 0..2 {
                jtj[a][b] += j[a] * j[b];
            }
        }
    }
    (jtj, jtr)
}

/// Largest anchor triangle area normalized by the squared anchor spread
fn geometry_spread(ranges: &[AnchorRange]) -> f64 {
    let mut max_area = 0.0f64;
    let mut max_dist_sq = 0.0f64;
    for i in 0..ranges.len() {
        let a = ranges[i].position;
        for j in (i + 1)..ranges.len() {
            let b = ranges[j].position;
            max_dist_sq = max_dist_sq.max((b - a).dot(&(b - a)));
            for c in ranges.iter().skip(j + 1).map(|r| r.position) {
                let ab = b - a;
                let ac = c - a;
                let area = 0.5 * libm::fabs(ab.x * ac.y - ab.y * ac.x);
                max_area = max_area.max(area);
            }
        }
    }
    if max_dist_sq > 0.0 {
        max_area / max_dist_sq
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anchors::AnchorConfig, measurement::RangeMeasurement};

    fn solver() -> Multilaterator {
        Multilaterator::new(SolverConfig::default().with_bounds(Bounds::from_size(10.0, 10.0)))
    }

    fn exact(anchors: &[(f64, f64)], truth: Point2) -> alloc::vec::Vec<AnchorRange> {
        anchors
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let a = Point2::new(x, y);
                AnchorRange::new(i as u32, a, a.distance_to(&truth))
            })
            .collect()
    }

    #[test]
    fn recovers_point_from_three_anchors() {
        let truth = Point2::new(3.0, 4.0);
        let ranges = exact(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], truth);
        assert!((ranges[0].distance_m - 5.0).abs() < 1e-12);

        let report = solver().solve(&ranges, None).unwrap();
        assert!(report.position.distance_to(&truth) < 0.01);
        assert!(report.rms_residual_m < 1e-6);
        assert_eq!(report.anchors_used, 3);
    }

    #[test]
    fn over_determined_with_warm_start() {
        let truth = Point2::new(7.5, 1.25);
        let ranges = exact(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (5.0, 5.0)], truth);

        let report = solver().solve(&ranges, Some(Point2::new(7.0, 1.0))).unwrap();
        assert!(report.position.distance_to(&truth) < 0.01);
    }

    #[test]
    fn fewer_than_three_ranges_is_unknown() {
        let ranges = exact(&[(0.0, 0.0), (10.0, 0.0)], Point2::new(3.0, 4.0));
        assert_eq!(
            solver().solve(&ranges, None),
            Err(TrackError::InsufficientAnchors { required: 3, available: 2 })
        );
        assert!(matches!(
            solver().solve(&[], None),
            Err(TrackError::InsufficientAnchors { available: 0, .. })
        ));
    }

    #[test]
    fn collinear_anchors_fail() {
        let ranges = exact(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)], Point2::new(3.0, 4.0));
        assert_eq!(
            solver().solve(&ranges, None),
            Err(TrackError::SolverDivergence { reason: "collinear anchors" })
        );
    }

    #[test]
    fn inconsistent_ranges_fail_sanity_bound() {
        let mut ranges = exact(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)], Point2::new(3.0, 4.0));
        ranges[3].distance_m += 8.0;
        let strict = Multilaterator::new(
            SolverConfig::default()
                .with_bounds(Bounds::from_size(10.0, 10.0))
                .with_max_rms_residual(0.2),
        );
        assert!(matches!(
            strict.solve(&ranges, None),
            Err(TrackError::SolverDivergence { .. })
        ));
    }

    #[test]
    fn estimate_resolves_anchors_and_heights() {
        let truth = Point2::new(2.0, 3.0);
        let anchors: AnchorMap = [
            AnchorConfig::new(10, 0.0, 0.0).with_height(2.2),
            AnchorConfig::new(20, 6.0, 0.0).with_height(2.2),
            AnchorConfig::new(30, 0.0, 6.0).with_height(2.2),
        ]
        .into_iter()
        .collect();

        let mut batch = RangeBatch {
            tag_id: 1,
            start_ms: 0,
            timestamp_ms: 40,
            ranges: Vec::new(),
            invalid: 0,
        };
        for anchor in anchors.iter() {
            let floor = anchor.position.distance_to(&truth);
            let slant = libm::sqrt(floor * floor + 1.0); // 2.2 m anchor, 1.2 m tag
            batch.ranges.push(RangeMeasurement::new(1, 40, anchor.anchor_id, slant)).unwrap();
        }
        batch.ranges.push(RangeMeasurement::new(1, 40, 99, 1.0)).unwrap();

        let solver = Multilaterator::new(
            SolverConfig::default()
                .with_bounds(Bounds::from_size(6.0, 6.0))
                .with_tag_height(1.2),
        );
        let estimate = solver.estimate(&batch, &anchors, None);
        assert_eq!(estimate.timestamp_ms, 40);
        assert_eq!(estimate.contributing_anchor_count, 3);
        assert!(estimate.position.unwrap().distance_to(&truth) < 0.01);
    }
}
