mod adam;
mod ftrl;
mod gradient_descent;
mod l1;
mod l2;
mod updater;

pub use adam::AdamUpdater;
pub use ftrl::AdaptiveFtrlRegularizer;
pub use gradient_descent::GradientDescentUpdater;
pub use l1::L1Regularizer;
pub use l2::L2Regularizer;
pub use updater::WeightUpdater;
