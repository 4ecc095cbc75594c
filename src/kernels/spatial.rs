//! Spatial kernels, i.e., receptive field profiles over the visual field (deg).
use std::f64::consts::PI;

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::LGNError;
use crate::utils::nearest_index;

/// Default width of the receptive field centre (deg).
pub const CENTER_WIDTH: f64 = 0.62;
/// Default relative weight of the receptive field surround.
pub const SURROUND_WEIGHT: f64 = 0.85;
/// Default width of the receptive field surround (deg).
pub const SURROUND_WIDTH: f64 = 1.26;

/// Represents a spatial kernel.
///
/// Deserialization goes through the validating constructors.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "SpatialKernelParams")]
pub enum SpatialKernel {
    /// Point mass at the given shift.
    Delta { shift_x: f64, shift_y: f64 },
    /// Normalized Gaussian `A / (pi a^2) exp(-|r - d|^2 / a^2)`.
    Gauss {
        amplitude: f64,
        width: f64,
        dx: f64,
        dy: f64,
    },
    /// Difference of a centre and a surround Gaussian sharing the same centre.
    Dog {
        center_amplitude: f64,
        center_width: f64,
        surround_amplitude: f64,
        surround_width: f64,
        dx: f64,
        dy: f64,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SpatialKernelParams {
    Delta {
        shift_x: f64,
        shift_y: f64,
    },
    Gauss {
        amplitude: f64,
        width: f64,
        dx: f64,
        dy: f64,
    },
    Dog {
        center_amplitude: f64,
        center_width: f64,
        surround_amplitude: f64,
        surround_width: f64,
        dx: f64,
        dy: f64,
    },
}

impl TryFrom<SpatialKernelParams> for SpatialKernel {
    type Error = LGNError;

    fn try_from(params: SpatialKernelParams) -> Result<Self, Self::Error> {
        match params {
            SpatialKernelParams::Delta { shift_x, shift_y } => {
                check_finite(&[shift_x, shift_y])?;
                Ok(SpatialKernel::delta(shift_x, shift_y))
            }
            SpatialKernelParams::Gauss {
                amplitude,
                width,
                dx,
                dy,
            } => {
                check_finite(&[amplitude, dx, dy])?;
                SpatialKernel::gauss(amplitude, width, dx, dy)
            }
            SpatialKernelParams::Dog {
                center_amplitude,
                center_width,
                surround_amplitude,
                surround_width,
                dx,
                dy,
            } => {
                check_finite(&[center_amplitude, surround_amplitude, dx, dy])?;
                SpatialKernel::dog(
                    center_amplitude,
                    center_width,
                    surround_amplitude,
                    surround_width,
                    dx,
                    dy,
                )
            }
        }
    }
}

impl SpatialKernel {
    /// Create a point-mass kernel, shifting its input by (`shift_x`, `shift_y`).
    pub fn delta(shift_x: f64, shift_y: f64) -> Self {
        SpatialKernel::Delta { shift_x, shift_y }
    }

    /// Create a Gaussian kernel.
    /// The function returns an error if the width is not positive.
    pub fn gauss(amplitude: f64, width: f64, dx: f64, dy: f64) -> Result<Self, LGNError> {
        check_width(width)?;
        Ok(SpatialKernel::Gauss {
            amplitude,
            width,
            dx,
            dy,
        })
    }

    /// Create a difference-of-Gaussians kernel.
    /// The function returns an error if one of the widths is not positive.
    ///
    /// # Examples
    ///
    /// ```
    /// use rusty_lgn::kernels::SpatialKernel;
    ///
    /// let kernel = SpatialKernel::dog(1.0, 0.62, 0.85, 1.26, 0.0, 0.0).unwrap();
    /// assert!(kernel.eval(0.0, 0.0) > 0.0);
    /// assert!(kernel.eval(1.5, 0.0) < 0.0);
    /// ```
    pub fn dog(
        center_amplitude: f64,
        center_width: f64,
        surround_amplitude: f64,
        surround_width: f64,
        dx: f64,
        dy: f64,
    ) -> Result<Self, LGNError> {
        check_width(center_width)?;
        check_width(surround_width)?;
        Ok(SpatialKernel::Dog {
            center_amplitude,
            center_width,
            surround_amplitude,
            surround_width,
            dx,
            dy,
        })
    }

    /// Create the difference-of-Gaussians receptive field of a typical ON-centre ganglion cell,
    /// i.e., with unit centre amplitude and the default widths and surround weight.
    pub fn dog_default(dx: f64, dy: f64) -> Self {
        SpatialKernel::Dog {
            center_amplitude: 1.0,
            center_width: CENTER_WIDTH,
            surround_amplitude: SURROUND_WEIGHT,
            surround_width: SURROUND_WIDTH,
            dx,
            dy,
        }
    }

    /// Evaluate the kernel at position (`x`, `y`).
    /// Point masses evaluate to zero, see [`SpatialKernel::sample`].
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        match *self {
            SpatialKernel::Delta { .. } => 0.0,
            SpatialKernel::Gauss {
                amplitude,
                width,
                dx,
                dy,
            } => gauss(amplitude, width, x - dx, y - dy),
            SpatialKernel::Dog {
                center_amplitude,
                center_width,
                surround_amplitude,
                surround_width,
                dx,
                dy,
            } => {
                gauss(center_amplitude, center_width, x - dx, y - dy)
                    - gauss(surround_amplitude, surround_width, x - dx, y - dy)
            }
        }
    }

    /// Evaluate the kernel Fourier transform at wavenumbers (`kx`, `ky`).
    pub fn eval_ft(&self, kx: f64, ky: f64) -> Complex64 {
        let k2 = kx * kx + ky * ky;
        match *self {
            SpatialKernel::Delta { shift_x, shift_y } => {
                Complex64::from_polar(1.0, -(kx * shift_x + ky * shift_y))
            }
            SpatialKernel::Gauss {
                amplitude,
                width,
                dx,
                dy,
            } => Complex64::from_polar(gauss_ft(amplitude, width, k2), -(kx * dx + ky * dy)),
            SpatialKernel::Dog {
                center_amplitude,
                center_width,
                surround_amplitude,
                surround_width,
                dx,
                dy,
            } => {
                let magnitude = gauss_ft(center_amplitude, center_width, k2)
                    - gauss_ft(surround_amplitude, surround_width, k2);
                Complex64::from_polar(1.0, -(kx * dx + ky * dy)) * magnitude
            }
        }
    }

    /// Sample the kernel on the grid `positions x positions`, indexed `[x, y]`.
    /// A point mass is rendered as `1 / dr^2` on the closest grid point.
    pub fn sample(&self, positions: &[f64]) -> Array2<f64> {
        let n = positions.len();
        match *self {
            SpatialKernel::Delta { shift_x, shift_y } => {
                let mut frame = Array2::zeros((n, n));
                let dr = if n > 1 {
                    positions[1] - positions[0]
                } else {
                    1.0
                };
                if let (Some(i), Some(j)) = (
                    nearest_index(positions, shift_x),
                    nearest_index(positions, shift_y),
                ) {
                    frame[[i, j]] = 1.0 / (dr * dr);
                }
                frame
            }
            _ => Array2::from_shape_fn((n, n), |(i, j)| self.eval(positions[i], positions[j])),
        }
    }
}

fn check_finite(values: &[f64]) -> Result<(), LGNError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LGNError::InvalidParameter(
            "Kernel parameters must be finite".to_string(),
        ));
    }
    Ok(())
}

fn check_width(width: f64) -> Result<(), LGNError> {
    if !(width.is_finite() && width > 0.0) {
        return Err(LGNError::InvalidParameter(format!(
            "Kernel width must be positive and finite (got {})",
            width
        )));
    }
    Ok(())
}

fn gauss(amplitude: f64, width: f64, x: f64, y: f64) -> f64 {
    amplitude / (PI * width * width) * (-(x * x + y * y) / (width * width)).exp()
}

fn gauss_ft(amplitude: f64, width: f64, k2: f64) -> f64 {
    amplitude * (-width * width * k2 / 4.0).exp()
}
