use ndarray::Array1;

use super::WeightUpdater;
use crate::{error::ConfigError, types::CostWeights};

/// L1 (lasso) regularization: `R(w) = lambda * ||w||_1`.
///
/// Instead of a subgradient of the regularizer, the proximal operator
/// (soft-thresholding) is applied after the plain gradient step, which is
/// known to produce better sparsity in the intermediate solution. Weights
/// whose post-shrinkage magnitude falls below the tolerance snap to exactly
/// zero. The bias on index zero is never shrunk.
#[derive(Debug)]
pub struct L1Regularizer {
    lambda: f64,
    tolerance: f64,
}

impl L1Regularizer {
    /// Creates a new `L1Regularizer` whose snap tolerance equals `lambda`.
    ///
    /// # Arguments
    /// * `lambda` - The regularization weight, must be non-negative.
    ///
    /// # Returns
    /// An error if `lambda` is negative or not finite.
    pub fn new(lambda: f64) -> Result<Self, ConfigError> {
        Self::with_tolerance(lambda, lambda)
    }

    /// Creates a new `L1Regularizer` with an explicit snap tolerance.
    ///
    /// # Arguments
    /// * `lambda` - The regularization weight, must be non-negative.
    /// * `tolerance` - Post-shrinkage magnitudes below this snap to zero.
    ///
    /// # Returns
    /// An error if either value is negative or not finite.
    pub fn with_tolerance(lambda: f64, tolerance: f64) -> Result<Self, ConfigError> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "l1 lambda",
                got: lambda,
                valid: "[0, inf)",
            });
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "l1 tolerance",
                got: tolerance,
                valid: "[0, inf)",
            });
        }

        Ok(Self { lambda, tolerance })
    }

    fn shrink(&self, weight: f64, shrinkage: f64) -> (f64, f64) {
        let magnitude = weight.abs();
        let mut shrunk = weight.signum() * (magnitude - shrinkage).max(0.0);
        if shrunk.abs() < self.tolerance {
            shrunk = 0.0;
        }
        (shrunk, magnitude)
    }
}

impl WeightUpdater for L1Regularizer {
    fn update_weights(
        &mut self,
        theta: Array1<f64>,
        gradient: Array1<f64>,
        learning_rate: f64,
        _iteration: u64,
        mut cost: f64,
    ) -> CostWeights {
        let mut weights = theta;
        weights.scaled_add(-learning_rate, &gradient);

        // degenerates to the plain gradient step
        if self.lambda == 0.0 {
            return CostWeights::new(cost, weights);
        }

        let shrinkage = self.lambda * learning_rate;
        let mut added_cost = 0.0;
        for w in weights.iter_mut().skip(1) {
            let (shrunk, magnitude) = self.shrink(*w, shrinkage);
            added_cost += magnitude;
            *w = shrunk;
        }
        cost += added_cost * self.lambda;

        CostWeights::new(cost, weights)
    }
}

#[cfg(test)]
mod test {
    use ndarray::array;

    use super::*;
    use crate::types::LabeledExample;

    #[test]
    fn proximal_gradient_update() {
        let mut updater = L1Regularizer::with_tolerance(1.0, 0.0).unwrap();

        let theta = array![1.0, 1.0, 1.0];
        let grad = array![1.0, 1.0, 1.0];
        let update = updater.update_weights(theta, grad, 0.1, 1, 1.0);

        let expected = array![0.9, 0.8, 0.8];
        for (w, e) in update.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-8);
        }
        assert!((update.cost - 2.8).abs() < 1e-8);
    }

    #[test]
    fn no_op_update() {
        let mut updater = L1Regularizer::with_tolerance(0.0, 0.0).unwrap();

        let theta = array![1.0, 1.0, 1.0];
        let grad = array![1.0, 1.0, 1.0];
        let update = updater.update_weights(theta, grad, 0.1, 1, 1.0);

        let expected = array![0.9, 0.9, 0.9];
        for (w, e) in update.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-8);
        }
        assert_eq!(update.cost, 1.0);
    }

    #[test]
    fn tolerance_snaps_to_zero() {
        let mut updater = L1Regularizer::with_tolerance(1.0, 0.75).unwrap();

        let theta = array![1.0, 1.0, 1.0];
        let grad = array![1.0, 1.0, 2.0];
        let update = updater.update_weights(theta, grad, 0.1, 1, 1.0);

        let expected = array![0.9, 0.8, 0.0];
        for (w, e) in update.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-8);
        }
        assert!((update.cost - 2.7).abs() < 1e-8);
    }

    #[test]
    fn pre_update_is_identity() {
        let mut updater = L1Regularizer::new(1.0).unwrap();
        let example = LabeledExample::new(array![1.0], array![1.0]);

        let theta = array![0.5, -0.5];
        let out = updater.pre_update_weights(&example, theta.clone(), 0.1, 0);
        assert_eq!(out, theta);
    }

    #[test]
    fn negative_values_rejected() {
        assert!(L1Regularizer::new(-1.0).is_err());
        assert!(L1Regularizer::with_tolerance(1.0, -0.1).is_err());
    }
}
