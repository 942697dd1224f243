use ndarray::Array1;

use super::WeightUpdater;
use crate::{
    error::ConfigError,
    types::{CostWeights, LabeledExample},
};

/// Per-coordinate adaptive FTRL-proximal, based on the ad-click-prediction
/// paper (McMahan et al., KDD 2013).
///
/// Keeps a cumulative squared-gradient accumulator (`n` in the paper) and a
/// cumulative weighted-gradient accumulator (`z`) per coordinate. Both are
/// lazily allocated and only the coordinates present in the current example's
/// nonzero features are ever touched, which keeps high-dimensional sparse
/// inputs cheap. Weights are materialized in closed form on the pre-update
/// hook; the weight step itself only refreshes the accumulators.
#[derive(Debug)]
pub struct AdaptiveFtrlRegularizer {
    beta: f64,
    l1: f64,
    l2: f64,
    squared_previous_gradient: Option<Array1<f64>>,
    per_coordinate_weights: Option<Array1<f64>>,
}

impl AdaptiveFtrlRegularizer {
    /// Creates a new `AdaptiveFtrlRegularizer`.
    ///
    /// # Arguments
    /// * `beta` - The smoothing term of the adaptive learning rate.
    /// * `l1` - The L1 regularization weight.
    /// * `l2` - The L2 regularization weight.
    ///
    /// # Returns
    /// An error if any value is negative or not finite.
    pub fn new(beta: f64, l1: f64, l2: f64) -> Result<Self, ConfigError> {
        for (what, value) in [("ftrl beta", beta), ("ftrl l1", l1), ("ftrl l2", l2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    what,
                    got: value,
                    valid: "[0, inf)",
                });
            }
        }

        Ok(Self {
            beta,
            l1,
            l2,
            squared_previous_gradient: None,
            per_coordinate_weights: None,
        })
    }
}

impl WeightUpdater for AdaptiveFtrlRegularizer {
    fn pre_update_weights(
        &mut self,
        example: &LabeledExample,
        mut theta: Array1<f64>,
        learning_rate: f64,
        _iteration: u64,
    ) -> Array1<f64> {
        let n = self
            .squared_previous_gradient
            .get_or_insert_with(|| Array1::zeros(theta.len()));
        let z = self
            .per_coordinate_weights
            .get_or_insert_with(|| Array1::zeros(theta.len()));

        for (index, &value) in example.feature().iter().enumerate() {
            if value == 0.0 {
                continue;
            }

            let zi = z[index];
            let ni = n[index];
            if zi.abs() <= self.l1 {
                theta[index] = 0.0;
            } else {
                let scale = -1.0 / (((self.beta + ni.sqrt()) / learning_rate) + self.l2);
                theta[index] = scale * (zi - value.signum() * self.l1);
            }
        }

        theta
    }

    fn update_weights(
        &mut self,
        theta: Array1<f64>,
        gradient: Array1<f64>,
        learning_rate: f64,
        _iteration: u64,
        cost: f64,
    ) -> CostWeights {
        let n = self
            .squared_previous_gradient
            .get_or_insert_with(|| Array1::zeros(theta.len()));
        let z = self
            .per_coordinate_weights
            .get_or_insert_with(|| Array1::zeros(theta.len()));

        for (index, &g) in gradient.iter().enumerate() {
            if g == 0.0 {
                continue;
            }

            let ni = n[index];
            let sigma = ((ni + g * g).sqrt() - ni.sqrt()) / learning_rate;
            z[index] += g - sigma * theta[index];
            n[index] = ni + g * g;
        }

        CostWeights::new(cost, theta)
    }
}
