//! Trajectory prediction for uwbtrack
//!
//! ## Overview
//!
//! Fills timeline gaps too long for interpolation with a short-horizon
//! Gaussian-process model of the tag's recent motion. The predictor plugs
//! into the core resampler through the [`GapFiller`](uwbtrack_core::GapFiller)
//! seam, one instance per tag.
//!
//! ## Why Gaussian Processes?
//!
//! 1. **Small data**: ten fixes are enough for a useful fit
//! 2. **Smooth but agile**: the Matérn 3/2 kernel allows sharp turns
//! 3. **No training phase**: hyper-parameters are picked per fit from the data
//!
//! ## Model
//!
//! ```text
//! window of N fixes (t, x, y)
//!   ──→ t normalised to [0, 1], x and y to zero mean / unit variance
//!   ──→ GP_x(t), GP_y(t) with Matérn 3/2 + white noise
//!   ──→ mean at target t*, back to metres
//!   ──→ clamp to area, acceleration and speed limits
//! ```
//!
//! The speed limit depends on context: a sprinting player (recent speed above
//! 4 m/s) may use the full sport limit, otherwise predictions stay within
//! 1.2 × the recent average speed.
//!
//! ## Cost
//!
//! | Operation          | Time            | Memory  |
//! |--------------------|-----------------|---------|
//! | Fit (per grid ℓ)   | O(n³), n ≤ 32   | O(n²)   |
//! | Predict one point  | O(n)            | O(1)    |
//!
//! Fits are cached for a retrain interval (500 ms by default), so the cubic
//! cost is paid a few times per second at most.
//!
//! ## Usage
//!
//! ```no_run
//! use uwbtrack_core::{AnchorMap, SessionConfig, TagSession};
//! use uwbtrack_ml::{PredictorConfig, TrajectoryPredictor};
//!
//! let config = SessionConfig::default();
//! let predictor = TrajectoryPredictor::new(PredictorConfig::default().with_limits(config.resample.limits));
//! let session = TagSession::new(1, config, predictor);
//! let trajectory = session.replay(Vec::new(), &AnchorMap::test_court());
//! assert!(trajectory.is_empty());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod gp;
pub mod kernel;
pub mod linalg;
pub(crate) mod macros;
pub mod motion;
pub mod predictor;

pub use gp::GaussianProcess;
pub use kernel::{KernelConfig, KernelKind};
pub use motion::{MotionConfig, MotionContext};
pub use predictor::{PredictorConfig, PredictorStats, TrainedModel, TrajectoryPredictor};
