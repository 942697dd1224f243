use ndarray::Array1;

use super::WeightUpdater;
use crate::{error::ConfigError, types::CostGradient};

/// Adam, following http://arxiv.org/abs/1412.6980.
///
/// Maintains exponential moving averages of the gradient and of the squared
/// gradient, both lazily allocated to the gradient's shape on first use. The
/// bias-corrected effective step size multiplies the engine's learning rate;
/// when the correction degenerates (NaN or zero at iteration zero) it is
/// floored to epsilon.
#[derive(Debug)]
pub struct AdamUpdater {
    alpha: f64,
    moving_avg_decay: f64,
    squared_decay: f64,
    epsilon: f64,
    moving_avg: Option<Array1<f64>>,
    squared_gradient: Option<Array1<f64>>,
}

impl AdamUpdater {
    /// Default decay of the gradient moving average (beta1).
    pub const MOVING_AVERAGE_DECAY: f64 = 0.9;
    /// Default decay of the squared-gradient moving average (beta2).
    pub const SQUARED_DECAY: f64 = 0.999;
    /// Default numeric floor.
    pub const EPS: f64 = 1e-8;

    /// Creates a new `AdamUpdater` with the default decays and epsilon.
    ///
    /// # Arguments
    /// * `alpha` - The step-size base, must be positive.
    pub fn new(alpha: f64) -> Result<Self, ConfigError> {
        Self::with_decays(alpha, Self::MOVING_AVERAGE_DECAY, Self::SQUARED_DECAY)
    }

    /// Creates a new `AdamUpdater` with explicit decays.
    ///
    /// # Arguments
    /// * `alpha` - The step-size base, must be positive.
    /// * `moving_avg_decay` - beta1, must lie in `[0, 1)`.
    /// * `squared_decay` - beta2, must lie in `[0, 1)`.
    pub fn with_decays(
        alpha: f64,
        moving_avg_decay: f64,
        squared_decay: f64,
    ) -> Result<Self, ConfigError> {
        Self::with_epsilon(alpha, moving_avg_decay, squared_decay, Self::EPS)
    }

    /// Creates a new `AdamUpdater` with explicit decays and epsilon.
    pub fn with_epsilon(
        alpha: f64,
        moving_avg_decay: f64,
        squared_decay: f64,
        epsilon: f64,
    ) -> Result<Self, ConfigError> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "adam alpha",
                got: alpha,
                valid: "(0, inf)",
            });
        }
        if !(0.0..1.0).contains(&moving_avg_decay) {
            return Err(ConfigError::OutOfRange {
                what: "adam moving average decay",
                got: moving_avg_decay,
                valid: "[0, 1)",
            });
        }
        if !(0.0..1.0).contains(&squared_decay) {
            return Err(ConfigError::OutOfRange {
                what: "adam squared decay",
                got: squared_decay,
                valid: "[0, 1)",
            });
        }

        Ok(Self {
            alpha,
            moving_avg_decay,
            squared_decay,
            epsilon,
            moving_avg: None,
            squared_gradient: None,
        })
    }
}

impl WeightUpdater for AdamUpdater {
    fn update_gradient(
        &mut self,
        _theta: &Array1<f64>,
        gradient: Array1<f64>,
        _learning_rate: f64,
        iteration: u64,
        cost: f64,
    ) -> CostGradient {
        let b1 = self.moving_avg_decay;
        let b2 = self.squared_decay;
        let eps = self.epsilon;

        let moving_avg = self
            .moving_avg
            .get_or_insert_with(|| Array1::zeros(gradient.len()));
        let squared = self
            .squared_gradient
            .get_or_insert_with(|| Array1::zeros(gradient.len()));

        moving_avg.zip_mut_with(&gradient, |m, g| *m = b1 * *m + (1.0 - b1) * g);
        squared.zip_mut_with(&gradient, |s, g| *s = b2 * *s + (1.0 - b2) * g * g);

        let beta1_t = b1.powf(iteration as f64);
        let beta2_t = b2.powf(iteration as f64);

        let mut effective_step = self.alpha * (1.0 - beta2_t).sqrt() / (1.0 - beta1_t);
        if effective_step.is_nan() || effective_step == 0.0 {
            effective_step = Self::EPS;
        }

        let adjusted =
            Array1::from_shape_fn(gradient.len(), |i| {
                moving_avg[i] * effective_step / (squared[i].sqrt() + eps)
            });

        CostGradient::new(cost, adjusted)
    }
}
