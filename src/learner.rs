use std::num::NonZeroUsize;

use ndarray::{Array1, ArrayView1};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use crate::{
    error::{Result, TrainError},
    minimizer::StochasticGradientDescent,
    optimization::WeightUpdater,
    types::{CostGradient, LabeledExample},
};

/// Dimensions established from the first example of a training stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainedDimensions {
    feature: usize,
    outcome: usize,
}

impl TrainedDimensions {
    /// Returns the feature dimension.
    pub fn feature(&self) -> usize {
        self.feature
    }

    /// Returns the outcome dimension.
    pub fn outcome(&self) -> usize {
        self.outcome
    }

    /// Returns the number of outcome classes, at least two.
    pub fn num_outcome_classes(&self) -> usize {
        self.outcome.max(2)
    }
}

/// How the orchestrator seeds the initial parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WeightInit {
    /// Uniform in [-1, 1).
    #[default]
    Uniform,
    /// All zeros; the natural choice for sparsity-seeking updaters like
    /// FTRL.
    Zero,
}

/// Wires a minimizer, a problem-specific cost function and a model factory
/// together across one or more passes.
///
/// Owns dimension discovery and enforcement as well as the random weight
/// initialization; everything else is delegated to the engine.
pub struct MinimizingLearner<U: WeightUpdater> {
    minimizer: StochasticGradientDescent<U>,
    num_passes: NonZeroUsize,
    verbose: bool,
    init: WeightInit,
    rng: StdRng,
}

impl<U: WeightUpdater> MinimizingLearner<U> {
    /// Creates a new `MinimizingLearner` running a single pass.
    ///
    /// # Arguments
    /// * `minimizer` - The minimizer engine to drive.
    pub fn new(minimizer: StochasticGradientDescent<U>) -> Self {
        Self {
            minimizer,
            num_passes: NonZeroUsize::new(1).unwrap(),
            verbose: false,
            init: WeightInit::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Sets the number of passes over the training stream.
    pub fn set_num_passes(&mut self, num_passes: NonZeroUsize) {
        self.num_passes = num_passes;
    }

    /// Seeds the weight-initialization RNG for reproducible runs.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Initializes the weights to all zeros instead of uniform random
    /// values.
    pub fn use_zero_initialization(&mut self) {
        self.init = WeightInit::Zero;
    }

    /// Emit progress reports through the `log` facade while training.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Grants access to the underlying minimizer, e.g. to register
    /// callbacks.
    pub fn minimizer_mut(&mut self) -> &mut StochasticGradientDescent<U> {
        &mut self.minimizer
    }

    /// Trains a model on the supplied streams.
    ///
    /// Peeks one fresh stream to establish the feature/outcome dimensions,
    /// enforces them on every subsequent example, minimizes over the
    /// configured number of passes and hands the final weights to the model
    /// factory exactly once.
    ///
    /// # Arguments
    /// * `stream_supplier` - Produces an independent, equivalent stream on
    ///   every call.
    /// * `cost_fn` - The problem-specific training objective.
    /// * `model_factory` - Builds the model from the minimized weights.
    ///
    /// # Returns
    /// The trained model, or an error for an empty stream, a dimension
    /// mismatch or a failing cost function.
    pub fn train<S, I, F, G, M>(
        &mut self,
        mut stream_supplier: S,
        mut cost_fn: F,
        model_factory: G,
    ) -> Result<M>
    where
        S: FnMut() -> I,
        I: IntoIterator<Item = LabeledExample>,
        F: FnMut(&LabeledExample, ArrayView1<'_, f64>) -> Result<CostGradient>,
        G: FnOnce(Array1<f64>) -> M,
    {
        let dimensions = peek_dimensions(stream_supplier())?;
        let start = self.initialize_weights(dimensions.feature());

        let checked = move |example: &LabeledExample, weights: ArrayView1<'_, f64>| {
            check_dimensions(&dimensions, example, &weights)?;
            cost_fn(example, weights)
        };

        let minimized = self.minimizer.minimize(
            start,
            &mut stream_supplier,
            checked,
            self.num_passes.get(),
            self.verbose,
        )?;

        Ok(model_factory(minimized))
    }

    fn initialize_weights(&mut self, dimension: usize) -> Array1<f64> {
        match self.init {
            WeightInit::Zero => Array1::zeros(dimension),
            WeightInit::Uniform => {
                // the range is always valid
                let uniform = Uniform::new(-1.0, 1.0).unwrap();
                Array1::from_shape_fn(dimension, |_| uniform.sample(&mut self.rng))
            }
        }
    }
}

/// Establishes the training dimensions from the first example of a fresh
/// stream.
///
/// # Returns
/// `TrainError::EmptyStream` when the stream holds no example at all.
fn peek_dimensions<I>(stream: I) -> Result<TrainedDimensions>
where
    I: IntoIterator<Item = LabeledExample>,
{
    let first = stream.into_iter().next().ok_or(TrainError::EmptyStream)?;

    Ok(TrainedDimensions {
        feature: first.feature().len(),
        outcome: first.outcome().len(),
    })
}

fn check_dimensions(
    dimensions: &TrainedDimensions,
    example: &LabeledExample,
    weights: &ArrayView1<'_, f64>,
) -> Result<()> {
    if weights.len() != dimensions.feature() {
        return Err(TrainError::ShapeMismatch {
            what: "weights",
            got: weights.len(),
            expected: dimensions.feature(),
        });
    }
    if example.feature().len() != dimensions.feature() {
        return Err(TrainError::ShapeMismatch {
            what: "feature",
            got: example.feature().len(),
            expected: dimensions.feature(),
        });
    }
    if example.outcome().len() != dimensions.outcome() {
        return Err(TrainError::ShapeMismatch {
            what: "outcome",
            got: example.outcome().len(),
            expected: dimensions.outcome(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use ndarray::array;

    use super::*;
    use crate::minimizer::SgdConfig;

    fn linear_stream() -> impl Iterator<Item = LabeledExample> {
        // y = 2x, features carry a leading bias dimension
        (0..20).map(|i| {
            let x = i as f64 / 20.0;
            LabeledExample::new(array![1.0, x], array![2.0 * x])
        })
    }

    fn squared_error(example: &LabeledExample, weights: ArrayView1<'_, f64>) -> Result<CostGradient> {
        let prediction = example.feature().dot(&weights);
        let target = example.outcome()[0];
        let diff = prediction - target;
        let gradient = example.feature().mapv(|f| 2.0 * diff * f);
        Ok(CostGradient::new(diff * diff, gradient))
    }

    #[test]
    fn trains_a_model_through_the_factory() {
        let minimizer = StochasticGradientDescent::new(SgdConfig::new(0.2)).unwrap();
        let mut learner = MinimizingLearner::new(minimizer);
        learner.set_seed(3);
        learner.set_num_passes(NonZeroUsize::new(200).unwrap());

        let weights: Array1<f64> = learner
            .train(linear_stream, squared_error, |weights| weights)
            .unwrap();

        assert!((weights[0]).abs() < 0.1);
        assert!((weights[1] - 2.0).abs() < 0.1);
    }

    #[test]
    fn empty_stream_is_rejected() {
        let minimizer = StochasticGradientDescent::new(SgdConfig::new(0.1)).unwrap();
        let mut learner = MinimizingLearner::new(minimizer);

        let result: Result<Array1<f64>> =
            learner.train(std::iter::empty, squared_error, |weights| weights);

        assert!(matches!(result, Err(TrainError::EmptyStream)));
    }

    #[test]
    fn dimension_changes_fail_fast() {
        let minimizer = StochasticGradientDescent::new(SgdConfig::new(0.1)).unwrap();
        let mut learner = MinimizingLearner::new(minimizer);
        learner.set_seed(3);

        let result: Result<Array1<f64>> = learner.train(
            || {
                vec![
                    LabeledExample::new(array![1.0, 0.5], array![1.0]),
                    LabeledExample::new(array![1.0, 0.5, 0.25], array![1.0]),
                ]
            },
            squared_error,
            |weights| weights,
        );

        assert!(matches!(
            result,
            Err(TrainError::ShapeMismatch { what: "feature", .. })
        ));
    }

    #[test]
    fn zero_initialization_starts_at_the_origin() {
        let minimizer = StochasticGradientDescent::new(SgdConfig::new(0.1)).unwrap();
        let mut learner = MinimizingLearner::new(minimizer);
        learner.use_zero_initialization();

        // a zero-gradient objective keeps the weights where they started
        let weights: Array1<f64> = learner
            .train(
                linear_stream,
                |_, weights| Ok(CostGradient::new(0.0, Array1::zeros(weights.len()))),
                |weights| weights,
            )
            .unwrap();

        assert_eq!(weights, array![0.0, 0.0]);
    }

    #[test]
    fn outcome_classes_bottom_out_at_two() {
        let dims = TrainedDimensions {
            feature: 4,
            outcome: 1,
        };
        assert_eq!(dims.num_outcome_classes(), 2);

        let dims = TrainedDimensions {
            feature: 4,
            outcome: 5,
        };
        assert_eq!(dims.num_outcome_classes(), 5);
    }
}
