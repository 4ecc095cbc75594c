//! Module implementing the integration grid and the discrete Fourier transforms between
//! the space-time and the frequency domains.
//!
//! The grid has `Nt = 2^nt` time steps of `dt` (ms) and `Nr x Nr = 2^nr x 2^nr` positions
//! spaced by `dr` (deg). Positions are centred, i.e., the origin sits at index `Nr / 2`.
//! Frequency cubes are stored in FFT order and indexed `[w, kx, ky]`.
use std::f64::consts::PI;
use std::sync::Arc;

use log::debug;
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Array3, Axis, Zip};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use super::error::LGNError;
use super::utils::fftfreq;

/// The largest admissible exponent for the number of time steps or positions.
pub const MAX_EXPONENT: u32 = 16;

#[derive(Debug, Serialize, Deserialize)]
struct IntegratorParams {
    nt: u32,
    nr: u32,
    dt: f64,
    dr: f64,
}

/// Represents the space-time grid on which responses are computed.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "IntegratorParams", into = "IntegratorParams")]
pub struct Integrator {
    /// Base-2 exponent of the number of time steps.
    nt: u32,
    /// Base-2 exponent of the number of positions along each spatial axis.
    nr: u32,
    /// Time step (ms).
    dt: f64,
    /// Spatial resolution (deg).
    dr: f64,
}

impl TryFrom<IntegratorParams> for Integrator {
    type Error = LGNError;

    fn try_from(params: IntegratorParams) -> Result<Self, Self::Error> {
        Integrator::new(params.nt, params.nr, params.dt, params.dr)
    }
}

impl From<Integrator> for IntegratorParams {
    fn from(integrator: Integrator) -> Self {
        IntegratorParams {
            nt: integrator.nt,
            nr: integrator.nr,
            dt: integrator.dt,
            dr: integrator.dr,
        }
    }
}

impl Integrator {
    /// Create a grid with `2^nt` time steps of `dt` ms and `2^nr x 2^nr` positions spaced by `dr` deg.
    /// The function returns an error for non-positive resolutions or too large exponents.
    ///
    /// # Examples
    ///
    /// ```
    /// use rusty_lgn::integrator::Integrator;
    ///
    /// let integrator = Integrator::new(8, 6, 1.0, 0.1).unwrap();
    /// assert_eq!(integrator.shape(), (256, 64, 64));
    /// assert_eq!(integrator.positions()[32], 0.0);
    /// ```
    pub fn new(nt: u32, nr: u32, dt: f64, dr: f64) -> Result<Self, LGNError> {
        if nt > MAX_EXPONENT || nr > MAX_EXPONENT {
            return Err(LGNError::InvalidParameter(format!(
                "Grid exponents must not exceed {} (got nt={}, nr={})",
                MAX_EXPONENT, nt, nr
            )));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(LGNError::InvalidParameter(
                "The time step must be positive and finite".to_string(),
            ));
        }
        if !(dr.is_finite() && dr > 0.0) {
            return Err(LGNError::InvalidParameter(
                "The spatial resolution must be positive and finite".to_string(),
            ));
        }

        Ok(Integrator { nt, nr, dt, dr })
    }

    /// Returns the number of time steps.
    pub fn num_times(&self) -> usize {
        1 << self.nt
    }

    /// Returns the number of positions along each spatial axis.
    pub fn num_positions(&self) -> usize {
        1 << self.nr
    }

    /// Returns the time step (ms).
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the spatial resolution (deg).
    pub fn dr(&self) -> f64 {
        self.dr
    }

    /// Returns the temporal frequency resolution (rad/ms).
    pub fn dw(&self) -> f64 {
        2.0 * PI / (self.num_times() as f64 * self.dt)
    }

    /// Returns the spatial frequency resolution (rad/deg).
    pub fn dk(&self) -> f64 {
        2.0 * PI / (self.num_positions() as f64 * self.dr)
    }

    /// Returns the shape `(Nt, Nr, Nr)` of the cubes handled by the integrator.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_times(), self.num_positions(), self.num_positions())
    }

    /// Returns the sampled times, starting at zero.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter((0..self.num_times()).map(|i| i as f64 * self.dt))
    }

    /// Returns the sampled positions along one spatial axis, centred at zero.
    pub fn positions(&self) -> Array1<f64> {
        let half = (self.num_positions() / 2) as f64;
        Array1::from_iter((0..self.num_positions()).map(|i| (i as f64 - half) * self.dr))
    }

    /// Returns the angular temporal frequencies in FFT order.
    pub fn temporal_freqs(&self) -> Array1<f64> {
        Array1::from_iter(
            fftfreq(self.num_times(), self.dt)
                .into_iter()
                .map(|f| 2.0 * PI * f),
        )
    }

    /// Returns the angular spatial frequencies in FFT order.
    pub fn spatial_freqs(&self) -> Array1<f64> {
        Array1::from_iter(
            fftfreq(self.num_positions(), self.dr)
                .into_iter()
                .map(|f| 2.0 * PI * f),
        )
    }

    /// Evaluate a Fourier-domain function on the whole frequency grid.
    pub fn evaluate_ft<F>(&self, f: F) -> Array3<Complex64>
    where
        F: Fn(f64, f64, f64) -> Complex64 + Sync + Send,
    {
        let w = self.temporal_freqs();
        let k = self.spatial_freqs();
        let mut cube = Array3::zeros(self.shape());
        Zip::indexed(&mut cube).par_for_each(|(i, j, l), value| {
            *value = f(w[i], k[j], k[l]);
        });
        cube
    }

    /// Transform a frequency cube back to space-time.
    /// The output is real, sampled at `times()` x `positions()` x `positions()`.
    pub fn compute_inverse_fft(&self, cube: &Array3<Complex64>) -> Result<Array3<f64>, LGNError> {
        self.check_shape(cube.shape())?;
        let (nt, nr, _) = self.shape();
        debug!("Inverse FFT of a {}x{}x{} cube", nt, nr, nr);

        let mut planner = FftPlanner::<f64>::new();
        let mut cube = cube.clone();

        // e^{+ik.r} along space, e^{-iwt} along time
        let spatial = planner.plan_fft_inverse(nr);
        transform_axis(&mut cube, 1, &spatial);
        transform_axis(&mut cube, 2, &spatial);
        let temporal = planner.plan_fft_forward(nt);
        transform_axis(&mut cube, 0, &temporal);

        let scale = 1.0 / (nt as f64 * self.dt * (nr as f64 * self.dr).powi(2));
        Ok(shift_spatial(&cube).mapv(|c| c.re * scale))
    }

    /// Transform a space-time cube to the frequency domain.
    pub fn compute_fft(&self, cube: &Array3<f64>) -> Result<Array3<Complex64>, LGNError> {
        self.check_shape(cube.shape())?;
        let (nt, nr, _) = self.shape();
        debug!("Forward FFT of a {}x{}x{} cube", nt, nr, nr);

        let mut planner = FftPlanner::<f64>::new();
        let mut cube = shift_spatial(&cube.mapv(|v| Complex64::new(v, 0.0)));

        // e^{-ik.r} along space, e^{+iwt} along time
        let spatial = planner.plan_fft_forward(nr);
        transform_axis(&mut cube, 1, &spatial);
        transform_axis(&mut cube, 2, &spatial);
        let temporal = planner.plan_fft_inverse(nt);
        transform_axis(&mut cube, 0, &temporal);

        let scale = self.dt * self.dr * self.dr;
        cube.par_mapv_inplace(|c| c * scale);
        Ok(cube)
    }

    /// Transform a single frame sampled at `positions()` x `positions()` to the spatial frequency domain.
    pub fn compute_spatial_fft(&self, frame: &Array2<f64>) -> Result<Array2<Complex64>, LGNError> {
        let nr = self.num_positions();
        if frame.shape() != [nr, nr] {
            return Err(LGNError::ShapeMismatch {
                expected: vec![nr, nr],
                found: frame.shape().to_vec(),
            });
        }

        let mut planner = FftPlanner::<f64>::new();
        let cube = frame.mapv(|v| Complex64::new(v, 0.0)).insert_axis(Axis(0));
        let mut cube = shift_spatial(&cube);

        let spatial = planner.plan_fft_forward(nr);
        transform_axis(&mut cube, 1, &spatial);
        transform_axis(&mut cube, 2, &spatial);

        let scale = self.dr * self.dr;
        Ok(cube.index_axis_move(Axis(0), 0).mapv(|c| c * scale))
    }

    fn check_shape(&self, shape: &[usize]) -> Result<(), LGNError> {
        let (nt, nr, _) = self.shape();
        if shape != [nt, nr, nr] {
            return Err(LGNError::ShapeMismatch {
                expected: vec![nt, nr, nr],
                found: shape.to_vec(),
            });
        }
        Ok(())
    }
}

/// Apply the (unnormalized) transform to every lane of the cube along the given axis.
fn transform_axis(cube: &mut Array3<Complex64>, axis: usize, fft: &Arc<dyn Fft<f64>>) {
    // Lanes are processed plane by plane, planes in parallel.
    let (outer, inner) = match axis {
        0 => (Axis(1), Axis(0)),
        1 => (Axis(0), Axis(0)),
        _ => (Axis(0), Axis(1)),
    };

    cube.axis_iter_mut(outer)
        .into_par_iter()
        .for_each(|mut plane| {
            let mut buffer = vec![Complex64::new(0.0, 0.0); plane.len_of(inner)];
            let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
            for mut lane in plane.lanes_mut(inner) {
                buffer
                    .iter_mut()
                    .zip(lane.iter())
                    .for_each(|(b, v)| *b = *v);
                fft.process_with_scratch(&mut buffer, &mut scratch);
                lane.iter_mut()
                    .zip(buffer.iter())
                    .for_each(|(v, b)| *v = *b);
            }
        });
}

/// Swap the half-spaces of both spatial axes, mapping index 0 to the centre and back.
/// Positions come in powers of two, so the shift is its own inverse.
fn shift_spatial<T: Clone>(cube: &Array3<T>) -> Array3<T> {
    let (nt, nx, ny) = cube.dim();
    let (sx, sy) = (nx / 2, ny / 2);
    Array3::from_shape_fn((nt, nx, ny), |(t, i, j)| {
        cube[[t, (i + sx) % nx, (j + sy) % ny]].clone()
    })
}
