//! Error module for the Rusty LGN library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum LGNError {
    /// Error for invalid parameters, e.g., a non-positive time step or kernel width.
    InvalidParameter(String),
    /// Error for out of bounds access, e.g., neuron not found.
    OutOfBounds(String),
    /// Error for connections forbidden by the pathway, e.g., an input to a ganglion cell.
    InvalidConnection(String),
    /// Error for arrays whose shape does not match the integration grid.
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Error for operations requiring a stimulus while none is set.
    MissingStimulus,
    /// Error for a network whose linear system cannot be solved at some frequency.
    SingularSystem { w: f64, kx: f64, ky: f64 },
    /// Error for I/O operations.
    IOError(String),
    /// Error while (de)serializing networks or configurations.
    SerializationError(String),
}

impl fmt::Display for LGNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LGNError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            LGNError::OutOfBounds(e) => write!(f, "Index out of bounds: {}", e),
            LGNError::InvalidConnection(e) => write!(f, "Invalid connection: {}", e),
            LGNError::ShapeMismatch { expected, found } => write!(
                f,
                "Shape mismatch: expected {:?}, found {:?}",
                expected, found
            ),
            LGNError::MissingStimulus => write!(f, "No stimulus has been set on the network"),
            LGNError::SingularSystem { w, kx, ky } => write!(
                f,
                "The network equations are singular at (w, kx, ky) = ({}, {}, {})",
                w, kx, ky
            ),
            LGNError::IOError(e) => write!(f, "I/O error: {}", e),
            LGNError::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl Error for LGNError {}

impl From<std::io::Error> for LGNError {
    fn from(e: std::io::Error) -> Self {
        LGNError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for LGNError {
    fn from(e: serde_json::Error) -> Self {
        LGNError::SerializationError(e.to_string())
    }
}
