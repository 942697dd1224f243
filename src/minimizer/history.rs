use std::collections::VecDeque;

/// Bounded FIFO of recent cost samples backing the convergence test.
///
/// The window bound holds after every insertion: push first, then trim.
#[derive(Debug)]
pub(crate) struct CostHistory {
    window: usize,
    costs: VecDeque<f64>,
}

impl CostHistory {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window,
            costs: VecDeque::with_capacity(window),
        }
    }

    /// Pushes a new cost sample, dropping the oldest samples beyond the
    /// window.
    pub(crate) fn push(&mut self, cost: f64) {
        self.costs.push_back(cost);
        while self.costs.len() > self.window {
            self.costs.pop_front();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.costs.clear();
    }

    /// Average improvement over the window: `(newest - oldest) / len`, zero
    /// while fewer than two samples are present.
    pub(crate) fn average_improvement(&self) -> f64 {
        if self.costs.len() >= 2 {
            let oldest = self.costs.front().copied().unwrap_or(0.0);
            let newest = self.costs.back().copied().unwrap_or(0.0);
            (newest - oldest) / self.costs.len() as f64
        } else {
            0.0
        }
    }

    /// True when the absolute average improvement fell below the threshold.
    /// Needs at least two samples to decide.
    pub(crate) fn converged(&self, threshold: f64) -> bool {
        self.costs.len() >= 2 && self.average_improvement().abs() < threshold
    }
}
