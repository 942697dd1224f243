use std::{mem, sync::mpsc, time::Instant};

use log::info;
use ndarray::{Array1, ArrayView1};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    SgdConfig,
    callbacks::{IterationCallback, PassCallback, ValidationCallback},
    history::CostHistory,
};
use crate::{
    error::{ConfigError, Result},
    optimization::{GradientDescentUpdater, WeightUpdater},
    types::{CostGradient, LabeledExample},
};

/// Backpressure bound of the feeder channel in the parallel regime, so an
/// unbounded upstream cannot balloon memory.
const FEED_CHANNEL_BOUND: usize = 256;

/// Stochastic gradient descent over a re-enterable stream of examples.
///
/// Drives one or more passes over the stream supplier, applies the configured
/// [`WeightUpdater`] per example, routes holdout validation draws past the
/// weight update, tracks convergence over a bounded cost history and invokes
/// the optional callbacks. The parameter vector is owned exclusively by this
/// instance; under [`Self::minimize_parallel`] it is only ever mutated by the
/// single step-owner thread.
pub struct StochasticGradientDescent<U = GradientDescentUpdater> {
    config: SgdConfig,
    updater: U,

    iteration_callback: Option<IterationCallback>,
    validation_callback: Option<ValidationCallback>,
    pass_callback: Option<PassCallback>,

    theta: Array1<f64>,
    alpha: f64,
    history: CostHistory,
    validation_rng: StdRng,
    iteration: u64,
    all_iterations: u64,
    validation_items: u64,
    training_error: f64,
    validation_error: f64,
    stop_after_this_pass: bool,
    started: Instant,
}

impl StochasticGradientDescent<GradientDescentUpdater> {
    /// Creates a new engine with the plain gradient-descent updater.
    ///
    /// # Arguments
    /// * `config` - The engine configuration, validated here.
    ///
    /// # Returns
    /// An error if any configuration value is out of range.
    pub fn new(config: SgdConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_updater(config, GradientDescentUpdater::new())
    }
}

impl<U: WeightUpdater> StochasticGradientDescent<U> {
    /// Creates a new engine with the given weight-update strategy.
    ///
    /// # Arguments
    /// * `config` - The engine configuration, validated here.
    /// * `updater` - The weight-update strategy, e.g. a regularizer.
    ///
    /// # Returns
    /// An error if any configuration value is out of range.
    pub fn with_updater(config: SgdConfig, updater: U) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            alpha: config.learning_rate,
            history: CostHistory::new(config.history_size.get()),
            validation_rng: StdRng::seed_from_u64(config.validation_seed),
            config,
            updater,
            iteration_callback: None,
            validation_callback: None,
            pass_callback: None,
            theta: Array1::zeros(0),
            iteration: 0,
            all_iterations: 0,
            validation_items: 0,
            training_error: 0.0,
            validation_error: 0.0,
            stop_after_this_pass: false,
            started: Instant::now(),
        })
    }

    /// Registers the per-iteration callback.
    pub fn set_iteration_callback<C>(&mut self, callback: C)
    where
        C: FnMut(usize, u64, f64, ArrayView1<'_, f64>, bool) + Send + 'static,
    {
        self.iteration_callback = Some(Box::new(callback));
    }

    /// Registers the per-validation-draw callback.
    pub fn set_validation_callback<C>(&mut self, callback: C)
    where
        C: FnMut(usize, u64, f64, ArrayView1<'_, f64>, &LabeledExample) + Send + 'static,
    {
        self.validation_callback = Some(Box::new(callback));
    }

    /// Registers the pass-finished callback; its return value gates whether
    /// training continues to the next pass.
    pub fn set_pass_callback<C>(&mut self, callback: C)
    where
        C: FnMut(usize, u64, f64, ArrayView1<'_, f64>) -> bool + Send + 'static,
    {
        self.pass_callback = Some(Box::new(callback));
    }

    /// Minimizes the cost function over the supplied streams, sequentially.
    ///
    /// # Arguments
    /// * `start` - The start parameters.
    /// * `stream_supplier` - Produces an independent, equivalent stream of
    ///   examples on every call, once per pass. Single-pass iterators are not
    ///   reusable across passes.
    /// * `cost_fn` - Observes one example under the given weights. Errors are
    ///   not caught, they abort the current pass and propagate.
    /// * `num_passes` - The number of passes over the stream.
    /// * `verbose` - Emit progress reports through the `log` facade.
    ///
    /// # Returns
    /// The optimized parameters.
    pub fn minimize<S, I, F>(
        &mut self,
        start: Array1<f64>,
        mut stream_supplier: S,
        mut cost_fn: F,
        num_passes: usize,
        verbose: bool,
    ) -> Result<Array1<f64>>
    where
        S: FnMut() -> I,
        I: IntoIterator<Item = LabeledExample>,
        F: FnMut(&LabeledExample, ArrayView1<'_, f64>) -> Result<CostGradient>,
    {
        self.reset(start);

        for pass in 0..num_passes {
            self.begin_pass();

            for example in stream_supplier() {
                self.step(pass, &example, &mut cost_fn, verbose)?;
            }

            if !self.finish_pass(pass, verbose) {
                break;
            }
        }

        Ok(mem::take(&mut self.theta))
    }

    /// Minimizes like [`Self::minimize`], pulling the stream from parallel
    /// feeder threads.
    ///
    /// The parameter vector stays owned by the calling thread, which
    /// serializes the update requests arriving over a bounded channel; at
    /// most one logical update is ever in flight, so no update is lost. The
    /// feeders only share the upstream iterator (behind a mutex), never the
    /// parameters. Arrival order may vary between runs, so the final weights
    /// are correctness-preserving but not bit-reproducible.
    pub fn minimize_parallel<S, I, F>(
        &mut self,
        start: Array1<f64>,
        mut stream_supplier: S,
        mut cost_fn: F,
        num_passes: usize,
        verbose: bool,
    ) -> Result<Array1<f64>>
    where
        U: Send,
        S: FnMut() -> I,
        I: IntoIterator<Item = LabeledExample>,
        I::IntoIter: Send,
        F: FnMut(&LabeledExample, ArrayView1<'_, f64>) -> Result<CostGradient> + Send,
    {
        self.reset(start);

        for pass in 0..num_passes {
            self.begin_pass();

            let upstream = Mutex::new(stream_supplier().into_iter().fuse());
            let (tx, rx) = mpsc::sync_channel(FEED_CHANNEL_BOUND);
            let feeders = rayon::current_num_threads().max(1);

            let fed: Result<()> = rayon::scope(|scope| {
                for _ in 0..feeders {
                    let tx = tx.clone();
                    let upstream = &upstream;
                    scope.spawn(move |_| {
                        loop {
                            let Some(example) = upstream.lock().next() else {
                                break;
                            };
                            // the owner hung up, wind down
                            if tx.send(example).is_err() {
                                break;
                            }
                        }
                    });
                }
                drop(tx);

                let mut outcome = Ok(());
                while let Ok(example) = rx.recv() {
                    if let Err(e) = self.step(pass, &example, &mut cost_fn, verbose) {
                        outcome = Err(e);
                        break;
                    }
                }
                // unblocks feeders stuck on a full channel so the scope can
                // join them
                drop(rx);
                outcome
            });
            fed?;

            if !self.finish_pass(pass, verbose) {
                break;
            }
        }

        Ok(mem::take(&mut self.theta))
    }

    /// Processes a single example: pre-update hook, cost evaluation, holdout
    /// routing, weight update, momentum blend, convergence bookkeeping.
    fn step<F>(
        &mut self,
        pass: usize,
        example: &LabeledExample,
        cost_fn: &mut F,
        verbose: bool,
    ) -> Result<()>
    where
        F: FnMut(&LabeledExample, ArrayView1<'_, f64>) -> Result<CostGradient>,
    {
        let theta = mem::take(&mut self.theta);
        let local_theta =
            self.updater
                .pre_update_weights(example, theta, self.alpha, self.all_iterations);

        let observed = cost_fn(example, local_theta.view())?;

        if verbose
            && self.iteration > 0
            && self.iteration % self.config.progress_report_interval.get() == 0
        {
            self.report_progress(pass);
        }

        let mut validation = false;
        if self.config.holdout_validation_fraction > 0.0 {
            if self.validation_rng.random::<f64>() < self.config.holdout_validation_fraction {
                validation = true;
                self.validation_error += observed.cost;
                self.validation_items += 1;
                self.history
                    .push(self.validation_error / self.validation_items as f64);

                if let Some(callback) = self.validation_callback.as_mut() {
                    callback(pass, self.iteration, observed.cost, local_theta.view(), example);
                }
            }
        } else {
            self.history
                .push(observed.cost / self.iteration.max(1) as f64);
        }

        if let Some(callback) = self.iteration_callback.as_mut() {
            callback(
                pass,
                self.iteration,
                observed.cost,
                local_theta.view(),
                validation,
            );
        }

        if validation {
            // validation draws never move the weights
            self.theta = local_theta;
            self.bump_counters();
            return Ok(());
        }

        self.training_error += observed.cost;

        let CostGradient { cost, gradient } = observed;
        let previous = (self.config.momentum != 0.0).then(|| local_theta.clone());
        let update =
            self.updater
                .update_weights(local_theta, gradient, self.alpha, self.all_iterations, cost);
        self.theta = update.weights;

        if let Some(previous) = previous {
            let momentum = self.config.momentum;
            self.theta
                .zip_mut_with(&previous, |t, p| *t += momentum * (p - *t));
        }

        // acted on at the pass boundary, never mid-pass
        if self.history.converged(self.config.break_difference) {
            self.stop_after_this_pass = true;
        }

        self.bump_counters();
        Ok(())
    }

    fn bump_counters(&mut self) {
        self.all_iterations += 1;
        self.iteration += 1;

        if self.config.adaptive_learning_rate {
            self.alpha = 1.0 / (self.config.learning_rate * (self.all_iterations + 2) as f64);
        }
    }

    /// Pass epilogue: summary report and the pass callback's veto. Returns
    /// whether training continues.
    fn finish_pass(&mut self, pass: usize, verbose: bool) -> bool {
        if verbose {
            let elapsed = self.started.elapsed().as_secs_f64();
            info!(
                pass = pass, iteration = self.iteration;
                "pass summary | validation cost: {:e} | training cost: {:e} | iterations/s: {:.0}",
                self.validation_error / self.validation_items.max(1) as f64,
                self.training_error / (self.iteration - self.validation_items).max(1) as f64,
                self.all_iterations as f64 / elapsed.max(1.0),
            );
        }

        if let Some(callback) = self.pass_callback.as_mut() {
            let continue_training =
                callback(pass, self.iteration, self.validation_error, self.theta.view());
            if !continue_training {
                return false;
            }
        }

        !self.stop_after_this_pass
    }

    fn report_progress(&self, pass: usize) {
        let elapsed = self.started.elapsed().as_secs_f64();
        info!(
            pass = pass, iteration = self.iteration;
            "validation cost: {:e} | training cost: {:e} | avg improvement: {:e} | iterations/s: {:.0}",
            self.validation_error / self.validation_items.max(1) as f64,
            self.training_error / (self.iteration - self.validation_items).max(1) as f64,
            self.history.average_improvement(),
            self.all_iterations as f64 / elapsed.max(1.0),
        );
    }

    /// Clears the run state so the engine can be reused; the updater's own
    /// state intentionally survives (reset it by constructing a new updater).
    fn reset(&mut self, start: Array1<f64>) {
        self.theta = start;
        self.alpha = self.config.learning_rate;
        self.history.clear();
        self.stop_after_this_pass = false;
        self.all_iterations = 0;
        self.started = Instant::now();
    }

    /// Pass prologue: reseeds the validation RNG with the configured seed so
    /// the Bernoulli split repeats pass over pass, and zeroes the pass-local
    /// counters.
    fn begin_pass(&mut self) {
        self.validation_rng = StdRng::seed_from_u64(self.config.validation_seed);
        self.iteration = 0;
        self.validation_items = 0;
        self.training_error = 0.0;
        self.validation_error = 0.0;
    }
}

#[cfg(test)]
mod test {
    use ndarray::array;

    use super::*;

    fn paraboloid(
        _example: &LabeledExample,
        weights: ArrayView1<'_, f64>,
    ) -> Result<CostGradient> {
        let cost = weights[0] * weights[0] + weights[1] * weights[1];
        let gradient = array![2.0 * weights[0], 2.0 * weights[1]];
        Ok(CostGradient::new(cost, gradient))
    }

    fn hundred_items() -> impl Iterator<Item = LabeledExample> {
        (0..100).map(|i| LabeledExample::new(array![i as f64], array![i as f64]))
    }

    #[test]
    fn gradient_descent_reaches_the_minimum() {
        let mut minimizer = StochasticGradientDescent::new(SgdConfig::new(0.5)).unwrap();
        let minimized = minimizer
            .minimize(array![2.0, -1.0], hundred_items, paraboloid, 10, false)
            .unwrap();

        assert!(minimized[0].abs() < 1e-5);
        assert!(minimized[1].abs() < 1e-5);
    }

    #[test]
    fn momentum_gradient_descent_reaches_the_minimum() {
        let mut config = SgdConfig::new(0.01);
        config.momentum = 0.9;
        let mut minimizer = StochasticGradientDescent::new(config).unwrap();
        let minimized = minimizer
            .minimize(array![2.0, -1.0], hundred_items, paraboloid, 100, false)
            .unwrap();

        assert!(minimized[0].abs() < 1e-5);
        assert!(minimized[1].abs() < 1e-5);
    }

    #[test]
    fn pass_callback_veto_stops_training() {
        let mut minimizer = StochasticGradientDescent::new(SgdConfig::new(1e-6)).unwrap();
        minimizer.set_pass_callback(|pass, _, _, _| {
            assert_eq!(pass, 0);
            false
        });

        let mut passes_seen = 0usize;
        let minimized = minimizer
            .minimize(
                array![2.0, -1.0],
                || {
                    passes_seen += 1;
                    hundred_items()
                },
                paraboloid,
                10,
                false,
            )
            .unwrap();

        assert_eq!(passes_seen, 1);
        // barely moved, the veto cut training short
        assert!(minimized[0] > 1.9);
    }

    #[test]
    fn cost_function_errors_propagate() {
        let mut minimizer = StochasticGradientDescent::new(SgdConfig::new(0.1)).unwrap();
        let result = minimizer.minimize(
            array![1.0],
            hundred_items,
            |_, _| Err(crate::error::TrainError::InvalidInput("bad example")),
            1,
            false,
        );

        assert!(matches!(
            result,
            Err(crate::error::TrainError::InvalidInput(_))
        ));
    }

    #[test]
    fn validation_fraction_zero_never_withholds() {
        let mut config = SgdConfig::new(0.01);
        config.holdout_validation_fraction = 0.0;
        let mut minimizer = StochasticGradientDescent::new(config).unwrap();

        let (tx, rx) = mpsc::channel();
        minimizer.set_iteration_callback(move |_, _, _, _, validation| {
            tx.send(validation).unwrap();
        });

        minimizer
            .minimize(array![2.0, -1.0], hundred_items, paraboloid, 3, false)
            .unwrap();

        let flags: Vec<bool> = rx.try_iter().collect();
        assert_eq!(flags.len(), 300);
        assert!(flags.iter().all(|&validation| !validation));
    }

    #[test]
    fn holdout_split_repeats_pass_over_pass() {
        let mut config = SgdConfig::new(0.01);
        config.holdout_validation_fraction = 0.3;
        config.validation_seed = 42;
        let mut minimizer = StochasticGradientDescent::new(config).unwrap();

        let (tx, rx) = mpsc::channel();
        minimizer.set_iteration_callback(move |pass, iteration, _, _, validation| {
            tx.send((pass, iteration, validation)).unwrap();
        });

        minimizer
            .minimize(array![2.0, -1.0], hundred_items, paraboloid, 2, false)
            .unwrap();

        let mut per_pass: [Vec<bool>; 2] = [Vec::new(), Vec::new()];
        for (pass, _, validation) in rx.try_iter() {
            per_pass[pass].push(validation);
        }
        assert_eq!(per_pass[0], per_pass[1]);
        assert!(per_pass[0].iter().any(|&v| v));
        assert!(per_pass[0].iter().any(|&v| !v));
    }

    #[test]
    fn adaptive_rate_anneals_per_iteration() {
        let mut config = SgdConfig::new(0.5);
        config.adaptive_learning_rate = true;
        let mut minimizer = StochasticGradientDescent::new(config).unwrap();

        let (tx, rx) = mpsc::channel();
        minimizer.set_iteration_callback(move |_, _, _, weights, _| {
            tx.send(weights[0]).unwrap();
        });

        minimizer
            .minimize(
                array![10.0],
                || (0..5).map(|i| LabeledExample::new(array![i as f64], array![i as f64])),
                |_, _| Ok(CostGradient::new(0.0, array![1.0])),
                1,
                false,
            )
            .unwrap();

        // a constant unit gradient exposes the rate as the difference of
        // consecutive weights: the initial rate once, then
        // 1 / (initial_rate * (t + 2))
        let weights: Vec<f64> = rx.try_iter().collect();
        assert_eq!(weights.len(), 5);
        let expected = [0.5, 1.0 / 1.5, 1.0 / 2.0, 1.0 / 2.5];
        for (t, alpha) in expected.iter().enumerate() {
            assert!((weights[t] - weights[t + 1] - alpha).abs() < 1e-12);
        }
    }

    #[test]
    fn sequential_runs_are_reproducible() {
        let run = || {
            let mut config = SgdConfig::new(0.05);
            config.holdout_validation_fraction = 0.2;
            config.validation_seed = 7;
            let mut minimizer = StochasticGradientDescent::new(config).unwrap();
            minimizer
                .minimize(array![2.0, -1.0], hundred_items, paraboloid, 5, false)
                .unwrap()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn parallel_minimize_preserves_correctness() {
        let mut minimizer = StochasticGradientDescent::new(SgdConfig::new(0.5)).unwrap();
        let minimized = minimizer
            .minimize_parallel(array![2.0, -1.0], hundred_items, paraboloid, 10, false)
            .unwrap();

        // no lost update exhibited as divergence or NaN
        assert!(minimized.iter().all(|w| w.is_finite()));
        assert!(minimized[0].abs() < 1e-5);
        assert!(minimized[1].abs() < 1e-5);
    }

    #[test]
    fn convergence_stops_at_the_pass_boundary() {
        let mut config = SgdConfig::new(0.5);
        config.break_difference = 1e-9;
        let mut minimizer = StochasticGradientDescent::new(config).unwrap();

        let mut passes_seen = 0usize;
        minimizer
            .minimize(
                array![2.0, -1.0],
                || {
                    passes_seen += 1;
                    hundred_items()
                },
                paraboloid,
                10,
                false,
            )
            .unwrap();

        // lr 0.5 lands on the exact minimum within the first pass
        assert_eq!(passes_seen, 1);
    }
}
