pub mod error;
pub mod learner;
pub mod minimizer;
pub mod optimization;
pub mod stream;
pub mod types;

pub use error::{ConfigError, Result, TrainError};
pub use learner::MinimizingLearner;
pub use minimizer::{SgdConfig, StochasticGradientDescent};
pub use optimization::{
    AdamUpdater, AdaptiveFtrlRegularizer, GradientDescentUpdater, L1Regularizer, L2Regularizer,
    WeightUpdater,
};
pub use stream::ShuffledIterator;
pub use types::{CostGradient, CostWeights, LabeledExample};
