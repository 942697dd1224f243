mod shuffle;

pub use shuffle::ShuffledIterator;
