use std::{error::Error, fmt};

/// The crate's training result type.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Rejected configuration values. Produced exclusively at construction time,
/// never while training is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A scalar hyperparameter fell outside its valid range.
    OutOfRange {
        what: &'static str,
        got: f64,
        valid: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { what, got, valid } => {
                write!(f, "{what} out of range: got {got}, valid {valid}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Training runtime failures.
#[derive(Debug)]
pub enum TrainError {
    /// The stream supplier produced a stream without a single example.
    EmptyStream,

    /// A vector's dimension disagreed with the one established from the
    /// first example.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A configuration value was rejected.
    Config(ConfigError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::EmptyStream => f.write_str("supplied an empty stream"),
            TrainError::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got}, expected {expected}"
            ),
            TrainError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            TrainError::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl Error for TrainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for TrainError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
