//! Position Solver
//!
//! ## Overview
//!
//! Turns the anchor ranges of one ranging window into a single 2D position,
//! or into "Unknown" when the window cannot support a trustworthy fix.
//!
//! ```text
//! RangeMeasurement ─→ RangeWindower ─→ RangeBatch ─→ Multilaterator ─→ PositionEstimate
//!                     (50 ms window,                  (bounded LM
//!                      latest per anchor)              least squares)
//! ```
//!
//! ## Multilateration
//!
//! The solver minimizes the sum of squared range residuals
//!
//! ```text
//! f(p) = Σ (‖p − aᵢ‖ − dᵢ)²
//! ```
//!
//! with a Levenberg-Marquardt damped Gauss-Newton iteration. Every step is
//! projected onto the playing area grown by a small margin, and the search
//! starts from the previous fix (warm start) or the area centroid. Three
//! anchors give an exactly determined problem; more anchors simply make it
//! over-determined.
//!
//! ## Failure Handling
//!
//! A fix is never fabricated. Fewer than three valid ranges, collinear
//! anchor geometry, non-convergence or an implausible residual all yield
//! Unknown, which the filter bridges with predict-only steps.

pub mod multilateration;
pub mod window;

pub use multilateration::{AnchorRange, Multilaterator, SolveReport, SolverConfig};
pub use window::{RangeBatch, RangeWindower, WindowConfig};
