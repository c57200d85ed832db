//! Constant-Velocity Kalman Model
//!
//! ## State and Measurement
//!
//! ```text
//! x = [px, py, vx, vy]ᵀ          z = [px, py]ᵀ
//!
//!     ┌ 1 0 Δt 0  ┐                ┌ 1 0 0 0 ┐
//! F = │ 0 1 0  Δt │            H = └ 0 1 0 0 ┘
//!     │ 0 0 1  0  │
//!     └ 0 0 0  1  ┘
//! ```
//!
//! ## Process Noise
//!
//! White-noise acceleration with spectral density q, per axis:
//!
//! ```text
//! Q_axis = q · ┌ Δt³/3  Δt²/2 ┐
//!              └ Δt²/2  Δt    ┘
//! ```
//!
//! so uncertainty grows with the time since the last step, whatever the
//! ranging rate.
//!
//! ## Update
//!
//! ```text
//! Innovation:      ν = z − H·x̂
//! Innovation cov:  S = H·P·Hᵀ + R
//! Kalman gain:     K = P·Hᵀ·S⁻¹
//! State update:    x = x̂ + K·ν
//! Covariance:      P = (I − K·H)·P·(I − K·H)ᵀ + K·R·Kᵀ   (Joseph form)
//! ```

use crate::{
    errors::{TrackError, TrackResult},
    matrix::{
        add, identity, invert, make_symmetric, matvec, multiply, scale, transpose,
        Matrix, SquareMatrix, Vector,
    },
};

/// State dimension
pub const STATE_DIM: usize = 4;

/// Measurement dimension
pub const MEAS_DIM: usize = 2;

/// Measurement matrix H
const H: Matrix<MEAS_DIM, STATE_DIM> = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];

/// Innovation of one measurement against the predicted state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Innovation {
    /// ν = z − H·x̂
    pub residual: Vector<MEAS_DIM>,
    /// S = H·P·Hᵀ + R
    pub covariance: SquareMatrix<MEAS_DIM>,
}

impl Innovation {
    /// Euclidean length of the residual (m)
    pub fn magnitude(&self) -> f64 {
        libm::hypot(self.residual[0], self.residual[1])
    }

    /// Squared Mahalanobis distance νᵀ·S⁻¹·ν
    pub fn mahalanobis_sq(&self) -> TrackResult<f64> {
        let inverse = invert(&self.covariance).ok_or(TrackError::SingularMatrix)?;
        Ok(crate::matrix::quadratic_form(&inverse, &self.residual))
    }
}

/// Linear constant-velocity motion model with white-noise acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantVelocityModel {
    /// Acceleration noise spectral density q (m²/s³)
    pub process_noise_density: f64,
    /// Measurement variance per axis (m²)
    pub measurement_variance: f64,
}

impl ConstantVelocityModel {
    /// Create a model
    pub fn new(process_noise_density: f64, measurement_variance: f64) -> Self {
        Self {
            process_noise_density,
            measurement_variance,
        }
    }

    /// State transition F for a step of `dt_s` seconds
    pub fn transition(&self, dt_s: f64) -> SquareMatrix<STATE_DIM> {
        let mut f = identity::<STATE_DIM>();
        f[0][2] = dt_s;
        f[1][3] = dt_s;
        f
    }

    /// Process noise Q for a step of `dt_s` seconds
    pub fn process_noise(&self, dt_s: f64) -> SquareMatrix<STATE_DIM> {
        let q = self.process_noise_density;
        let dt2 = dt_s * dt_s;
        let dt3 = dt2 * dt_s;
        let mut noise = [[0.0; STATE_DIM]; STATE_DIM];
        for (pos, vel) in [(0, 2), (1, 3)] {
            noise[pos][pos] = q * dt3 / 3.0;
            noise[pos][vel] = q * dt2 / 2.0;
            noise[vel][pos] = q * dt2 / 2.0;
            noise[vel][vel] = q * dt_s;
        }
        noise
    }

    /// Measurement noise R, optionally inflated
    pub fn measurement_noise(&self, inflation: f64) -> SquareMatrix<MEAS_DIM> {
        scale(&identity::<MEAS_DIM>(), self.measurement_variance * inflation)
    }

    /// Prediction step: x̂ = F·x, P = F·P·Fᵀ + Q
    pub fn predict(
        &self,
        state: &Vector<STATE_DIM>,
        covariance: &SquareMatrix<STATE_DIM>,
        dt_s: f64,
    ) -> (Vector<STATE_DIM>, SquareMatrix<STATE_DIM>) {
        let f = self.transition(dt_s);
        let predicted_state = matvec(&f, state);
        let fp = multiply(&f, covariance);
        let mut predicted_cov = add(&multiply(&fp, &transpose(&f)), &self.process_noise(dt_s));
        make_symmetric(&mut predicted_cov);
        (predicted_state, predicted_cov)
    }

    /// Innovation of `measurement` against a predicted state
    pub fn innovation(
        &self,
        state: &Vector<STATE_DIM>,
        covariance: &SquareMatrix<STATE_DIM>,
        measurement: &Vector<MEAS_DIM>,
        noise: &SquareMatrix<MEAS_DIM>,
    ) -> Innovation {
        let hx = matvec(&H, state);
        let residual = [measurement[0] - hx[0], measurement[1] - hx[1]];
        let hp = multiply(&H, covariance);
        let covariance = add(&multiply(&hp, &transpose(&H)), noise);
        Innovation { residual, covariance }
    }

    /// Update step with Joseph-form covariance
    pub fn correct(
        &self,
        state: &Vector<STATE_DIM>,
        covariance: &SquareMatrix<STATE_DIM>,
        innovation: &Innovation,
        noise: &SquareMatrix<MEAS_DIM>,
    ) -> TrackResult<(Vector<STATE_DIM>, SquareMatrix<STATE_DIM>)> {
        let s_inv = invert(&innovation.covariance).ok_or(TrackError::SingularMatrix)?;
        let ht = transpose(&H);
        let gain = multiply(&multiply(covariance, &ht), &s_inv);

        let correction = matvec(&gain, &innovation.residual);
        let mut updated = *state;
        for (value, delta) in updated.iter_mut().zip(correction.iter()) {
            *value += delta;
        }

        // P = (I − K·H)·P·(I − K·H)ᵀ + K·R·Kᵀ
        let kh = multiply(&gain, &H);
        let mut i_kh = identity::<STATE_DIM>();
        for i in 0..STATE_DIM {
            for j in 0..STATE_DIM {
                i_kh[i][j] -= kh[i][j];
            }
        }
        let left = multiply(&multiply(&i_kh, covariance), &transpose(&i_kh));
        let right = multiply(&multiply(&gain, noise), &transpose(&gain));
        let mut updated_cov = add(&left, &right);
        make_symmetric(&mut updated_cov);

        if !updated.iter().all(|v| v.is_finite()) {
            return Err(TrackError::NumericalInstability);
        }
        Ok((updated, updated_cov))
    }
}
