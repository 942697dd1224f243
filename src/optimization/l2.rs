use ndarray::Array1;

use super::WeightUpdater;
use crate::{error::ConfigError, types::CostGradient};

/// L2 (ridge) regularization: `R(w) = lambda * ||w||^2 / 2`.
///
/// The bias term is assumed to live on the very first dimension (index zero)
/// and is deliberately not regularized.
#[derive(Debug)]
pub struct L2Regularizer {
    lambda: f64,
}

impl L2Regularizer {
    /// Creates a new `L2Regularizer`.
    ///
    /// # Arguments
    /// * `lambda` - The regularization weight, must be non-negative.
    ///
    /// # Returns
    /// An error if `lambda` is negative or not finite.
    pub fn new(lambda: f64) -> Result<Self, ConfigError> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "l2 lambda",
                got: lambda,
                valid: "[0, inf)",
            });
        }

        Ok(Self { lambda })
    }
}

impl WeightUpdater for L2Regularizer {
    fn update_gradient(
        &mut self,
        theta: &Array1<f64>,
        mut gradient: Array1<f64>,
        _learning_rate: f64,
        _iteration: u64,
        mut cost: f64,
    ) -> CostGradient {
        let lambda = self.lambda;
        if lambda != 0.0 {
            // skip index zero, the bias is never regularized
            for (g, w) in gradient.iter_mut().zip(theta).skip(1) {
                cost += lambda * w * w / 2.0;
                *g += lambda * w;
            }
        }

        CostGradient::new(cost, gradient)
    }
}

#[cfg(test)]
mod test {
    use ndarray::array;

    use super::*;

    #[test]
    fn regularized_gradient_update() {
        let mut updater = L2Regularizer::new(1.0).unwrap();

        let theta = array![1.0, 1.0, 1.0];
        let grad = array![1.0, 1.0, 1.0];
        let update = updater.update_weights(theta, grad, 0.1, 1, 1.0);

        let expected = array![0.9, 0.8, 0.8];
        for (w, e) in update.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-8);
        }
        assert_eq!(update.cost, 2.0);
    }

    #[test]
    fn no_op_update() {
        let mut updater = L2Regularizer::new(0.0).unwrap();

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
    fn negative_lambda_rejected() {
        assert!(L2Regularizer::new(-0.1).is_err());
    }
}
