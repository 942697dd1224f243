use super::WeightUpdater;

/// Simplistic gradient descent without regularization: all three hooks keep
/// their default behavior.
#[derive(Debug, Default)]
pub struct GradientDescentUpdater;

impl GradientDescentUpdater {
    /// Creates a new `GradientDescentUpdater`.
    pub fn new() -> Self {
        Self
    }
}

impl WeightUpdater for GradientDescentUpdater {}

#[cfg(test)]
mod test {
    use ndarray::array;

    use super::*;

    #[test]
    fn plain_gradient_step() {
        let mut updater = GradientDescentUpdater::new();

        let theta = array![1.0, 1.0, 1.0];
        let grad = array![1.0, 1.0, 1.0];
        let update = updater.update_weights(theta, grad, 0.1, 1, 1.0);

        let expected = array![0.9, 0.9, 0.9];
        for (w, e) in update.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-8);
        }
        assert_eq!(update.cost, 1.0);
    }
}
