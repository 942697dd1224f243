use ndarray::ArrayView1;

use crate::types::LabeledExample;

/// Invoked after every processed item.
///
/// Arguments: pass, iteration, cost, current weights, whether the item was a
/// validation draw.
pub type IterationCallback = Box<dyn FnMut(usize, u64, f64, ArrayView1<'_, f64>, bool) + Send>;

/// Invoked after every validation draw.
///
/// Arguments: pass, iteration, cost, current weights, the validated example.
pub type ValidationCallback =
    Box<dyn FnMut(usize, u64, f64, ArrayView1<'_, f64>, &LabeledExample) + Send>;

/// Invoked after every pass with the pass's validation error and the current
/// weights. Returning `false` stops training after this pass, independent of
/// the convergence flag.
///
/// Arguments: pass, iteration, validation cost, current weights.
pub type PassCallback = Box<dyn FnMut(usize, u64, f64, ArrayView1<'_, f64>) -> bool + Send>;
