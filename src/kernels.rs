//! Spatiotemporal response kernels.
//!
//! Kernels are separable: a [`Kernel`] is the product of a [`SpatialKernel`] and a
//! [`TemporalKernel`], both known in closed form in space-time and in the Fourier domain.
//!
//! ```
//! use rusty_lgn::kernels::{Kernel, SpatialKernel, TemporalKernel};
//!
//! let kernel = Kernel::new(
//!     SpatialKernel::gauss(1.0, 0.5, 0.0, 0.0).unwrap(),
//!     TemporalKernel::delta(0.0).unwrap(),
//! );
//! assert!((kernel.eval_ft(0.0, 0.0, 0.0).re - 1.0).abs() < 1e-12);
//! ```
pub mod spatial;
pub mod temporal;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub use spatial::SpatialKernel;
pub use temporal::TemporalKernel;

/// Represents a separable spatiotemporal kernel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Kernel {
    /// The spatial part of the kernel.
    pub spatial: SpatialKernel,
    /// The temporal part of the kernel.
    pub temporal: TemporalKernel,
}

impl Kernel {
    /// Create a kernel from its spatial and temporal parts.
    pub fn new(spatial: SpatialKernel, temporal: TemporalKernel) -> Self {
        Kernel { spatial, temporal }
    }

    /// The identity kernel: no spatial blur, no delay.
    pub fn identity() -> Self {
        Kernel {
            spatial: SpatialKernel::Delta {
                shift_x: 0.0,
                shift_y: 0.0,
            },
            temporal: TemporalKernel::Delta { delay: 0.0 },
        }
    }

    /// Evaluate the kernel Fourier transform at the given angular frequency and wavenumbers.
    pub fn eval_ft(&self, w: f64, kx: f64, ky: f64) -> Complex64 {
        self.spatial.eval_ft(kx, ky) * self.temporal.eval_ft(w)
    }

    /// Evaluate the kernel in space-time.
    /// Point masses (delta kernels) evaluate to zero, see [`TemporalKernel::sample`].
    pub fn eval(&self, t: f64, x: f64, y: f64) -> f64 {
        self.spatial.eval(x, y) * self.temporal.eval(t)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::identity()
    }
}
