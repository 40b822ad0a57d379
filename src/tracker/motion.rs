//! Motion models used to predict where a live track's box will be in the
//! current frame before association.

use std::collections::VecDeque;

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

type Vector4 = SVector<f64, 4>;
type Vector8 = SVector<f64, 8>;
type Matrix4 = SMatrix<f64, 4, 4>;
type Matrix8 = SMatrix<f64, 8, 8>;
type Matrix4x8 = SMatrix<f64, 4, 8>;

/// Motion model selection for a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionModel {
    /// Extrapolate the centre linearly from the last `window` observations.
    ConstantVelocity {
        #[serde(default = "default_velocity_window")]
        window: usize,
    },
    /// Constant-velocity Kalman filter over (cx, cy, aspect, height).
    Kalman,
}

fn default_velocity_window() -> usize {
    3
}

impl Default for MotionModel {
    fn default() -> Self {
        MotionModel::ConstantVelocity {
            window: default_velocity_window(),
        }
    }
}

/// Per-track motion state.
#[derive(Debug, Clone)]
pub(crate) enum MotionState {
    ConstantVelocity {
        window: usize,
        recent: VecDeque<(u64, Rect)>,
    },
    Kalman {
        filter: KalmanFilter,
        mean: Vector8,
        covariance: Matrix8,
        frame: u64,
    },
}

impl MotionState {
    pub fn new(model: &MotionModel, frame: u64, rect: Rect) -> Self {
        match *model {
            MotionModel::ConstantVelocity { window } => {
                let window = window.max(1);
                let mut recent = VecDeque::with_capacity(window);
                recent.push_back((frame, rect));
                MotionState::ConstantVelocity { window, recent }
            }
            MotionModel::Kalman => {
                let filter = KalmanFilter::default();
                let (mean, covariance) = filter.initiate(xyah(&rect));
                MotionState::Kalman {
                    filter,
                    mean,
                    covariance,
                    frame,
                }
            }
        }
    }

    /// Expected box at `frame`.
    pub fn predict(&mut self, frame: u64) -> Rect {
        match self {
            MotionState::ConstantVelocity { recent, .. } => {
                let (Some(&(last_frame, last)), Some(&(first_frame, first))) =
                    (recent.back(), recent.front())
                else {
                    return Rect::default();
                };
                let span = last_frame.saturating_sub(first_frame);
                if span == 0 {
                    return last;
                }
                let velocity = (last.center() - first.center()) / span as f32;
                let dt = frame.saturating_sub(last_frame) as f32;
                last.translated(velocity.x * dt, velocity.y * dt)
            }
            MotionState::Kalman {
                filter,
                mean,
                covariance,
                frame: state_frame,
            } => {
                let dt = frame.saturating_sub(*state_frame);
                if dt > 0 {
                    let (m, c) = filter.predict(mean, covariance, dt as f64);
                    *mean = m;
                    *covariance = c;
                    *state_frame = frame;
                }
                rect_from_state(mean)
            }
        }
    }

    /// Fold an observed box at `frame` into the state.
    pub fn correct(&mut self, frame: u64, rect: Rect) {
        match self {
            MotionState::ConstantVelocity { window, recent } => {
                if recent.len() == *window {
                    recent.pop_front();
                }
                recent.push_back((frame, rect));
            }
            MotionState::Kalman { .. } => {
                self.predict(frame);
                if let MotionState::Kalman {
                    filter,
                    mean,
                    covariance,
                    ..
                } = self
                {
                    let measurement = xyah(&rect);
                    let (m, c) = filter
                        .update(mean, covariance, measurement)
                        .unwrap_or_else(|| filter.initiate(measurement));
                    *mean = m;
                    *covariance = c;
                }
            }
        }
    }
}

fn xyah(rect: &Rect) -> Vector4 {
    let [cx, cy, a, h] = rect.to_xyah();
    Vector4::new(cx as f64, cy as f64, a as f64, h as f64)
}

fn rect_from_state(mean: &Vector8) -> Rect {
    Rect::from_xyah(
        mean[0] as f32,
        mean[1] as f32,
        mean[2].max(0.0) as f32,
        mean[3].max(0.0) as f32,
    )
}

/// Kalman filter over the box state `(cx, cy, a, h, vcx, vcy, va, vh)`.
#[derive(Debug, Clone)]
pub(crate) struct KalmanFilter {
    update_mat: Matrix4x8,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut update_mat = Matrix4x8::zeros();
        for i in 0..4 {
            update_mat[(i, i)] = 1.0;
        }

        Self {
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, measurement: Vector4) -> (Vector8, Matrix8) {
        let mut mean = Vector8::zeros();
        mean.fixed_rows_mut::<4>(0).copy_from(&measurement);

        let std = self.state_std(measurement[3], 2.0, 10.0);
        (mean, Matrix8::from_diagonal(&std.component_mul(&std)))
    }

    /// Advance the state by `dt` frames.
    pub fn predict(&self, mean: &Vector8, covariance: &Matrix8, dt: f64) -> (Vector8, Matrix8) {
        let mut motion_mat = Matrix8::identity();
        for i in 0..4 {
            motion_mat[(i, 4 + i)] = dt;
        }

        let std = self.state_std(mean[3], 1.0, 1.0);
        let motion_cov = Matrix8::from_diagonal(&(std.component_mul(&std) * dt));

        let new_mean = motion_mat * mean;
        let new_covariance = motion_mat * covariance * motion_mat.transpose() + motion_cov;
        (new_mean, new_covariance)
    }

    /// Per-component noise; position and velocity terms scale with box height.
    fn state_std(&self, height: f64, position_scale: f64, velocity_scale: f64) -> Vector8 {
        let p = position_scale * self.std_weight_position * height;
        let v = velocity_scale * self.std_weight_velocity * height;
        Vector8::from([p, p, 1e-2, p, v, v, 1e-5, v])
    }

    fn project(&self, mean: &Vector8, covariance: &Matrix8) -> (Vector4, Matrix4) {
        let p = self.std_weight_position * mean[3];
        let std = Vector4::new(p, p, 1e-1, p);
        let innovation_cov = Matrix4::from_diagonal(&std.component_mul(&std));

        let mean_proj = self.update_mat * mean;
        let covariance_proj =
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov;
        (mean_proj, covariance_proj)
    }

    /// Measurement update. `None` when the innovation covariance is singular.
    pub fn update(
        &self,
        mean: &Vector8,
        covariance: &Matrix8,
        measurement: Vector4,
    ) -> Option<(Vector8, Matrix8)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s_inv = projected_cov.try_inverse()?;

        let kalman_gain = covariance * self.update_mat.transpose() * s_inv;
        let innovation = measurement - projected_mean;

        let new_mean = mean + kalman_gain * innovation;
        let new_covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();
        Some((new_mean, new_covariance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate(Vector4::new(100.0, 200.0, 0.5, 50.0));
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[4], 0.0);
        assert!(cov[(0, 0)] > 0.0);
    }

    #[test]
    fn test_constant_velocity_extrapolates() {
        let model = MotionModel::ConstantVelocity { window: 3 };
        let mut state = MotionState::new(&model, 0, Rect::new(10.0, 10.0, 20.0, 20.0));
        // One observation: no velocity yet.
        assert_eq!(state.predict(1), Rect::new(10.0, 10.0, 20.0, 20.0));

        state.correct(1, Rect::new(12.0, 10.0, 20.0, 20.0));
        state.correct(2, Rect::new(14.0, 10.0, 20.0, 20.0));
        let predicted = state.predict(3);
        assert!((predicted.x - 16.0).abs() < 1e-5);
        // Two missed frames extrapolate twice as far.
        let predicted = state.predict(4);
        assert!((predicted.x - 18.0).abs() < 1e-5);
        assert!((predicted.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_kalman_follows_motion() {
        let mut state = MotionState::new(&MotionModel::Kalman, 0, Rect::new(0.0, 0.0, 20.0, 40.0));
        for frame in 1..20u64 {
            state.predict(frame);
            state.correct(frame, Rect::new(frame as f32 * 5.0, 0.0, 20.0, 40.0));
        }
        let predicted = state.predict(20);
        // Should land close to x = 100 and well ahead of the last observation.
        assert!(predicted.x > 96.0 && predicted.x < 106.0, "x = {}", predicted.x);
        assert!((predicted.height - 40.0).abs() < 1.0);
    }
}
