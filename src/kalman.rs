use crate::{
    error::{Error, Result},
    object::Xyah,
};
use nalgebra::{Matrix4, SMatrix, SVector};

/// `[center_x, center_y, aspect_ratio, height, vx, vy, va, vh]`
pub type StateMean = SVector<f32, 8>;
pub type StateCovariance = SMatrix<f32, 8, 8>;

/// Constant-velocity Kalman filter over [Xyah] boxes.
///
/// The filter itself keeps no per-track state. Each track owns its mean and
/// covariance and hands them in on every call. All noise terms are scaled by
/// the box height so that near and far objects get comparable relative
/// uncertainty.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    /// State transition matrix
    f: StateCovariance,
    /// Observation Matrix
    h: SMatrix<f32, 4, 8>,
    std_weight_position: f32,
    std_weight_velocity: f32,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(1. / 20., 1. / 160.)
    }
}

impl KalmanFilter {
    pub fn new(std_weight_position: f32, std_weight_velocity: f32) -> Self {
        // One frame per step
        let mut f = StateCovariance::identity();
        for i in 0..4 {
            f[(i, i + 4)] = 1.0;
        }
        let h = SMatrix::<f32, 4, 8>::identity();

        Self {
            f,
            h,
            std_weight_position,
            std_weight_velocity,
        }
    }

    /// Start a new state from a single measurement with zero velocity.
    pub fn initiate(&self, measurement: &Xyah) -> (StateMean, StateCovariance) {
        let mut mean = StateMean::zeros();
        mean.fixed_rows_mut::<4>(0).copy_from(measurement);

        let height = measurement[3];
        let pos = 2.0 * self.std_weight_position * height;
        let vel = 10.0 * self.std_weight_velocity * height;
        let std = [pos, pos, 1e-2, pos, vel, vel, 1e-5, vel];

        (mean, diagonal_covariance(std))
    }

    /// Advance the state by one frame.
    pub fn predict(&self, mean: &mut StateMean, covariance: &mut StateCovariance) {
        let height = mean[3];
        let pos = self.std_weight_position * height;
        let vel = self.std_weight_velocity * height;
        let motion_cov = diagonal_covariance([pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        *mean = self.f * *mean;
        *covariance = self.f * *covariance * self.f.transpose() + motion_cov;
    }

    /// Project the state into measurement space.
    pub fn project(&self, mean: &StateMean, covariance: &StateCovariance) -> (Xyah, Matrix4<f32>) {
        let height = mean[3];
        let pos = self.std_weight_position * height;
        let innovation_std = Xyah::new(pos, pos, 1e-1, pos);
        let innovation_cov = Matrix4::from_diagonal(&innovation_std.component_mul(&innovation_std));

        let projected_mean = self.h * mean;
        let projected_cov = self.h * covariance * self.h.transpose() + innovation_cov;
        (projected_mean, projected_cov)
    }

    /// Correct the state with a measurement.
    ///
    /// The state is left untouched when the projected covariance cannot be
    /// factorized.
    pub fn update(
        &self,
        mean: &mut StateMean,
        covariance: &mut StateCovariance,
        measurement: &Xyah,
    ) -> Result<()> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let cholesky = projected_cov
            .cholesky()
            .ok_or(Error::SingularCovariance)?;

        // K = P Hᵀ S⁻¹, solved as (S⁻¹ H P)ᵀ since P and S are symmetric.
        let kalman_gain = cholesky.solve(&(self.h * *covariance)).transpose();
        let innovation = measurement - projected_mean;

        *mean += kalman_gain * innovation;
        *covariance -= kalman_gain * projected_cov * kalman_gain.transpose();
        Ok(())
    }
}

fn diagonal_covariance(std: [f32; 8]) -> StateCovariance {
    let variance = StateMean::from_iterator(std.into_iter().map(|s| s * s));
    StateCovariance::from_diagonal(&variance)
}
