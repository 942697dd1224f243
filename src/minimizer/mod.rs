mod callbacks;
mod config;
mod history;
mod sgd;

pub use callbacks::{IterationCallback, PassCallback, ValidationCallback};
pub use config::SgdConfig;
pub use sgd::StochasticGradientDescent;
