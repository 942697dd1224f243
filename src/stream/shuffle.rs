use std::num::NonZeroUsize;

use rand::{Rng, seq::SliceRandom};

/// Approximate shuffle over a forward-only source using a bounded buffer.
///
/// Pulls up to the buffer capacity from the upstream iterator, shuffles
/// exactly the items present uniformly in place, drains them, then refills
/// by continuing to consume the same upstream. Terminates when a refill
/// yields nothing. The output is a bag-equal permutation of the input for
/// any capacity, but not a uniform-random global permutation: locality of
/// the original order bleeds through when the buffer is much smaller than
/// the input. Restartable only by wrapping a fresh upstream.
pub struct ShuffledIterator<I: Iterator, R: Rng> {
    upstream: I,
    buffer: Vec<I::Item>,
    capacity: usize,
    rng: R,
}

impl<I: Iterator, R: Rng> ShuffledIterator<I, R> {
    /// Creates a new `ShuffledIterator`.
    ///
    /// # Arguments
    /// * `upstream` - The source sequence; consumed exactly once, never
    ///   rewound.
    /// * `capacity` - The shuffle buffer size; the only auxiliary memory.
    /// * `rng` - The random number generator driving the shuffles.
    pub fn new(upstream: I, capacity: NonZeroUsize, rng: R) -> Self {
        let capacity = capacity.get();
        Self {
            upstream,
            buffer: Vec::with_capacity(capacity),
            capacity,
            rng,
        }
    }

    fn refill(&mut self) {
        for _ in 0..self.capacity {
            match self.upstream.next() {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }
        self.buffer.shuffle(&mut self.rng);
    }
}

impl<I: Iterator, R: Rng> Iterator for ShuffledIterator<I, R> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        // draining from the tail of a uniformly shuffled buffer is itself a
        // uniform order and frees the slot immediately
        if let Some(item) = self.buffer.pop() {
            return Some(item);
        }

        self.refill();
        self.buffer.pop()
    }
}
