use ndarray::Array1;

use crate::types::{CostGradient, CostWeights, LabeledExample};

/// Defines the strategy for turning a per-example gradient into new weights,
/// optionally folding a regularization penalty into the reported cost.
///
/// The default implementations together form the plain stochastic gradient
/// descent step. Strategies hook in at three points:
///
/// * `pre_update_weights` - transforms the visible weights before the cost
///   function sees them (FTRL materializes its closed-form weights here);
/// * `update_gradient` - adjusts the raw gradient and cost (L2, Adam);
/// * `update_weights` - replaces the whole step (L1's proximal operator).
pub trait WeightUpdater {
    /// Transforms the currently visible weights before prediction. Identity
    /// unless overridden.
    ///
    /// # Arguments
    /// * `example` - The example about to be observed.
    /// * `theta` - The current weights.
    /// * `learning_rate` - The current (possibly annealed) learning rate.
    /// * `iteration` - The global iteration count across all passes.
    fn pre_update_weights(
        &mut self,
        _example: &LabeledExample,
        theta: Array1<f64>,
        _learning_rate: f64,
        _iteration: u64,
    ) -> Array1<f64> {
        theta
    }

    /// Adjusts the raw gradient and cost before the weight step. Identity
    /// unless overridden.
    fn update_gradient(
        &mut self,
        _theta: &Array1<f64>,
        gradient: Array1<f64>,
        _learning_rate: f64,
        _iteration: u64,
        cost: f64,
    ) -> CostGradient {
        CostGradient::new(cost, gradient)
    }

    /// Computes the new weights for the given gradient.
    ///
    /// The default adjusts the gradient through [`Self::update_gradient`] and
    /// applies `theta - learning_rate * gradient`.
    ///
    /// # Arguments
    /// * `theta` - The old weights.
    /// * `gradient` - The gradient observed for the current example.
    /// * `learning_rate` - The current (possibly annealed) learning rate.
    /// * `iteration` - The global iteration count across all passes.
    /// * `cost` - The cost observed for the current example.
    ///
    /// # Returns
    /// The updated weights and the (possibly regularizer-adjusted) cost.
    fn update_weights(
        &mut self,
        theta: Array1<f64>,
        gradient: Array1<f64>,
        learning_rate: f64,
        iteration: u64,
        cost: f64,
    ) -> CostWeights {
        let adjusted = self.update_gradient(&theta, gradient, learning_rate, iteration, cost);

        let mut weights = theta;
        weights.scaled_add(-learning_rate, &adjusted.gradient);

        CostWeights::new(adjusted.cost, weights)
    }
}
