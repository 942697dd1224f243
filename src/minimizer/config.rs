use std::num::{NonZeroU64, NonZeroUsize};

use crate::error::ConfigError;

/// Immutable configuration of the stochastic minimizer.
///
/// `new` fills the defaults; the whole value is validated once when the
/// engine is constructed, so invalid combinations are rejected before any
/// training begins. Knobs that must be positive are statically positive
/// through their `NonZero` types.
#[derive(Debug, Clone)]
pub struct SgdConfig {
    /// The initial learning rate. Required, must be positive and finite.
    pub learning_rate: f64,
    /// Momentum blend factor in `[0, 1]`. Zero disables momentum.
    pub momentum: f64,
    /// Convergence break threshold on the windowed average improvement.
    /// Zero (the default) never triggers a convergence stop.
    pub break_difference: f64,
    /// Window size of the cost history used for the convergence test.
    pub history_size: NonZeroUsize,
    /// Emit a progress report every n-th iteration when verbose.
    pub progress_report_interval: NonZeroU64,
    /// Fraction of the stream withheld for holdout validation, in `[0, 1]`.
    /// Zero disables validation entirely.
    pub holdout_validation_fraction: f64,
    /// Seed of the validation split RNG, reseeded at every pass start so the
    /// Bernoulli split is reproducible pass over pass.
    pub validation_seed: u64,
    /// Recompute the learning rate as `1 / (initial_rate * (iterations + 2))`
    /// after every update.
    pub adaptive_learning_rate: bool,
}

impl SgdConfig {
    /// Creates a configuration with the given learning rate and defaults for
    /// everything else.
    ///
    /// The default validation seed is drawn randomly; pin it to fix the
    /// train/validation split across runs.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            break_difference: 0.0,
            history_size: NonZeroUsize::new(10).unwrap(),
            progress_report_interval: NonZeroU64::new(1).unwrap(),
            holdout_validation_fraction: 0.0,
            validation_seed: rand::random(),
            adaptive_learning_rate: false,
        }
    }

    /// Validates the whole configuration.
    ///
    /// # Returns
    /// An error naming the first offending value, if any.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "learning rate",
                got: self.learning_rate,
                valid: "(0, inf)",
            });
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err(ConfigError::OutOfRange {
                what: "momentum",
                got: self.momentum,
                valid: "[0, 1]",
            });
        }
        if !self.break_difference.is_finite() || self.break_difference < 0.0 {
            return Err(ConfigError::OutOfRange {
                what: "break difference",
                got: self.break_difference,
                valid: "[0, inf)",
            });
        }
        if !(0.0..=1.0).contains(&self.holdout_validation_fraction) {
            return Err(ConfigError::OutOfRange {
                what: "holdout validation fraction",
                got: self.holdout_validation_fraction,
                valid: "[0, 1]",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SgdConfig::new(0.1).validate().is_ok());
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(SgdConfig::new(0.0).validate().is_err());
        assert!(SgdConfig::new(f64::NAN).validate().is_err());

        let mut cfg = SgdConfig::new(0.1);
        cfg.momentum = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SgdConfig::new(0.1);
        cfg.holdout_validation_fraction = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = SgdConfig::new(0.1);
        cfg.break_difference = -1e-4;
        assert!(cfg.validate().is_err());
    }
}
