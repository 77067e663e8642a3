//! Error types shared across the Haze workspace.
//!
//! Organized by subsystem: cross-process communication and wavelength
//! grid construction. Configuration errors of the medium system live in
//! `haze-medium` and wrap these where needed.

use std::error::Error;
use std::fmt;

/// Errors from a [`Communicator`](crate::comm::Communicator) reduce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// Ranks contributed buffers of different lengths to the same reduce.
    LengthMismatch {
        /// Rank whose buffer did not match.
        rank: usize,
        /// Length expected by the root.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },
    /// A peer hung up before the reduce completed.
    Disconnected {
        /// Rank that observed the disconnect.
        rank: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                rank,
                expected,
                actual,
            } => write!(
                f,
                "rank {rank} contributed {actual} values, expected {expected}"
            ),
            Self::Disconnected { rank } => {
                write!(f, "peer disconnected during reduce (observed by rank {rank})")
            }
        }
    }
}

impl Error for CommError {}

/// Errors from [`WavelengthGrid`](crate::wavelength::WavelengthGrid) construction.
#[derive(Clone, Debug, PartialEq)]
pub enum WavelengthGridError {
    /// Fewer than two borders, so no bin can be formed.
    TooFewBorders {
        /// Number of borders supplied.
        count: usize,
    },
    /// A border is zero, negative, or not finite.
    InvalidBorder {
        /// Index of the offending border.
        index: usize,
        /// The offending value.
        value: f64,
    },
    /// Borders are not strictly increasing.
    NotIncreasing {
        /// Index of the first border that does not exceed its predecessor.
        index: usize,
    },
}

impl fmt::Display for WavelengthGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewBorders { count } => {
                write!(f, "wavelength grid needs at least 2 borders, got {count}")
            }
            Self::InvalidBorder { index, value } => {
                write!(f, "wavelength border {index} is not a positive finite value: {value}")
            }
            Self::NotIncreasing { index } => {
                write!(f, "wavelength border {index} does not exceed the previous border")
            }
        }
    }
}

impl Error for WavelengthGridError {}
