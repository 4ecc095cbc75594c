//! Module implementing the concept of connections in a network.

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::error::LGNError;
use super::kernels::Kernel;

/// Represents a connection between two neurons in a network.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Connection {
    /// Source ID
    source_id: usize,
    /// Target ID
    target_id: usize,
    /// Connection kernel
    kernel: Kernel,
    /// Connection weight (scales the kernel, negative for inhibition)
    weight: f64,
}

impl Connection {
    /// Create a new connection with the specified parameters.
    /// Returns an error if the weight is not finite.
    pub fn build(
        source_id: usize,
        target_id: usize,
        kernel: Kernel,
        weight: f64,
    ) -> Result<Self, LGNError> {
        check_weight(weight)?;

        Ok(Connection {
            source_id,
            target_id,
            kernel,
            weight,
        })
    }

    /// Returns the ID of the source neuron.
    pub fn source_id(&self) -> usize {
        self.source_id
    }

    /// Returns the ID of the target neuron.
    pub fn target_id(&self) -> usize {
        self.target_id
    }

    /// Returns the kernel of the connection.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Returns the weight of the connection.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Set the weight of the connection.
    /// Returns an error if the weight is not finite, leaving the connection unchanged.
    pub fn set_weight(&mut self, weight: f64) -> Result<(), LGNError> {
        check_weight(weight)?;
        self.weight = weight;
        Ok(())
    }

    /// Evaluate the weighted kernel Fourier transform.
    pub fn eval_ft(&self, w: f64, kx: f64, ky: f64) -> Complex64 {
        self.kernel.eval_ft(w, kx, ky) * self.weight
    }
}

fn check_weight(weight: f64) -> Result<(), LGNError> {
    if !weight.is_finite() {
        return Err(LGNError::InvalidParameter(
            "Connection weight must be finite".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{SpatialKernel, TemporalKernel};

    #[test]
    fn test_connection_build() {
        let connection = Connection::build(0, 1, Kernel::identity(), 0.5).unwrap();
        assert_eq!(connection.source_id(), 0);
        assert_eq!(connection.target_id(), 1);
        assert_eq!(connection.weight(), 0.5);
        assert_eq!(connection.eval_ft(1.0, 2.0, 3.0), Complex64::new(0.5, 0.0));
    }

    #[test]
    fn test_connection_build_invalid_weight() {
        assert!(matches!(
            Connection::build(0, 1, Kernel::identity(), f64::NAN),
            Err(LGNError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_set_weight_invalid() {
        let mut connection = Connection::build(0, 1, Kernel::identity(), 0.5).unwrap();
        assert!(matches!(
            connection.set_weight(f64::INFINITY),
            Err(LGNError::InvalidParameter(_))
        ));
        assert!(connection.set_weight(f64::NAN).is_err());
        assert_eq!(connection.weight(), 0.5);
    }

    #[test]
    fn test_weighted_kernel() {
        let kernel = Kernel::new(
            SpatialKernel::gauss(1.0, 0.3, 0.0, 0.0).unwrap(),
            TemporalKernel::exp_decay(5.0, 1.0).unwrap(),
        );
        let mut connection = Connection::build(2, 0, kernel.clone(), 1.0).unwrap();
        connection.set_weight(-2.0).unwrap();
        let value = connection.eval_ft(0.4, 1.0, -1.0);
        assert!((value + 2.0 * kernel.eval_ft(0.4, 1.0, -1.0)).norm() < 1e-15);
    }
}
