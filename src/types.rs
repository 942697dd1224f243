use ndarray::{Array1, ArrayView1};

/// An immutable feature/outcome pair as delivered by the upstream data
/// source.
///
/// Both dimensions are fixed for a whole training run; the learner checks
/// them once against the first example and enforces them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    feature: Array1<f64>,
    outcome: Array1<f64>,
}

impl LabeledExample {
    /// Creates a new `LabeledExample`.
    ///
    /// # Arguments
    /// * `feature` - The feature vector.
    /// * `outcome` - The outcome (label) vector.
    pub fn new(feature: Array1<f64>, outcome: Array1<f64>) -> Self {
        Self { feature, outcome }
    }

    /// Returns a view of the feature vector.
    pub fn feature(&self) -> ArrayView1<'_, f64> {
        self.feature.view()
    }

    /// Returns a view of the outcome vector.
    pub fn outcome(&self) -> ArrayView1<'_, f64> {
        self.outcome.view()
    }
}

/// A cost/gradient pair produced by the cost function for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct CostGradient {
    pub cost: f64,
    pub gradient: Array1<f64>,
}

impl CostGradient {
    /// Creates a new `CostGradient`.
    pub fn new(cost: f64, gradient: Array1<f64>) -> Self {
        Self { cost, gradient }
    }
}

/// A cost/weights pair produced by a weight updater.
#[derive(Debug, Clone, PartialEq)]
pub struct CostWeights {
    pub cost: f64,
    pub weights: Array1<f64>,
}

impl CostWeights {
    /// Creates a new `CostWeights`.
    pub fn new(cost: f64, weights: Array1<f64>) -> Self {
        Self { cost, weights }
    }
}
