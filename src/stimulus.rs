//! Module implementing the visual stimuli driving the network.
//!
//! Descriptive stimuli (gratings, flashing spots) are known in closed form in the Fourier domain.
//! Natural stimuli (images, movies) are given as frames and transformed numerically.
//! Frames are indexed `[x, y]` like the integration grid.
use std::f64::consts::PI;

use log::{info, warn};
use ndarray::{Array2, Array3, Zip};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::error::LGNError;
use super::integrator::Integrator;
use super::utils::disk_ft;

// Relative distance to the grid beyond which a grating frequency is reported as snapped.
const GRID_TOL: f64 = 1e-6;

/// Represents a visual stimulus.
/// Deserialization goes through the validating constructors.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "StimulusParams")]
pub enum Stimulus {
    /// Drifting sinusoidal grating `contrast * cos(kx x + ky y - w t)` covering the visual field.
    /// The orientation is in degrees.
    FullFieldGrating {
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        contrast: f64,
    },
    /// Drifting sinusoidal grating restricted to a disk centred at the origin.
    PatchGrating {
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        patch_diameter: f64,
        contrast: f64,
    },
    /// Uniform disk centred at the origin, switched on during `[delay, delay + duration)`.
    FlashingSpot {
        contrast: f64,
        patch_diameter: f64,
        delay: f64,
        duration: f64,
    },
    /// Static frame switched on during `[delay, delay + duration)`.
    NaturalImage {
        image: Array2<f64>,
        delay: f64,
        duration: f64,
    },
    /// Sequence of frames, each shown for `frame_duration` starting at time zero.
    NaturalMovie {
        frames: Vec<Array2<f64>>,
        frame_duration: f64,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StimulusParams {
    FullFieldGrating {
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        contrast: f64,
    },
    PatchGrating {
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        patch_diameter: f64,
        contrast: f64,
    },
    FlashingSpot {
        contrast: f64,
        patch_diameter: f64,
        delay: f64,
        duration: f64,
    },
    NaturalImage {
        image: Array2<f64>,
        delay: f64,
        duration: f64,
    },
    NaturalMovie {
        frames: Vec<Array2<f64>>,
        frame_duration: f64,
    },
}

impl TryFrom<StimulusParams> for Stimulus {
    type Error = LGNError;

    fn try_from(params: StimulusParams) -> Result<Self, Self::Error> {
        match params {
            StimulusParams::FullFieldGrating {
                angular_freq,
                wavenumber,
                orient,
                contrast,
            } => Stimulus::full_field_grating(angular_freq, wavenumber, orient, contrast),
            StimulusParams::PatchGrating {
                angular_freq,
                wavenumber,
                orient,
                patch_diameter,
                contrast,
            } => Stimulus::patch_grating(angular_freq, wavenumber, orient, patch_diameter, contrast),
            StimulusParams::FlashingSpot {
                contrast,
                patch_diameter,
                delay,
                duration,
            } => Stimulus::flashing_spot(contrast, patch_diameter, delay, duration),
            StimulusParams::NaturalImage {
                image,
                delay,
                duration,
            } => Stimulus::natural_image(image, delay, duration),
            StimulusParams::NaturalMovie {
                frames,
                frame_duration,
            } => Stimulus::natural_movie(frames, frame_duration),
        }
    }
}

impl Stimulus {
    /// Create a full-field grating.
    /// The function returns an error for non-finite parameters.
    pub fn full_field_grating(
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        contrast: f64,
    ) -> Result<Self, LGNError> {
        check_finite(&[angular_freq, wavenumber, orient, contrast])?;
        Ok(Stimulus::FullFieldGrating {
            angular_freq,
            wavenumber,
            orient,
            contrast,
        })
    }

    /// Create a patch grating.
    /// The function returns an error for non-finite parameters or a non-positive diameter.
    pub fn patch_grating(
        angular_freq: f64,
        wavenumber: f64,
        orient: f64,
        patch_diameter: f64,
        contrast: f64,
    ) -> Result<Self, LGNError> {
        check_finite(&[angular_freq, wavenumber, orient, contrast])?;
        check_positive("Patch diameter", patch_diameter)?;
        Ok(Stimulus::PatchGrating {
            angular_freq,
            wavenumber,
            orient,
            patch_diameter,
            contrast,
        })
    }

    /// Create a flashing spot.
    /// The function returns an error for a non-positive diameter or duration, or a negative delay.
    pub fn flashing_spot(
        contrast: f64,
        patch_diameter: f64,
        delay: f64,
        duration: f64,
    ) -> Result<Self, LGNError> {
        check_finite(&[contrast])?;
        check_positive("Patch diameter", patch_diameter)?;
        check_window(delay, duration)?;
        Ok(Stimulus::FlashingSpot {
            contrast,
            patch_diameter,
            delay,
            duration,
        })
    }

    /// Create a natural image stimulus.
    /// The image is resampled to the integration grid when evaluated.
    pub fn natural_image(image: Array2<f64>, delay: f64, duration: f64) -> Result<Self, LGNError> {
        check_frame(&image)?;
        check_window(delay, duration)?;
        Ok(Stimulus::NaturalImage {
            image,
            delay,
            duration,
        })
    }

    /// Create a natural movie stimulus.
    /// All frames must be non-empty, finite and share the same shape.
    pub fn natural_movie(frames: Vec<Array2<f64>>, frame_duration: f64) -> Result<Self, LGNError> {
        let first = frames.first().ok_or_else(|| {
            LGNError::InvalidParameter("A movie needs at least one frame".to_string())
        })?;
        for frame in frames.iter() {
            check_frame(frame)?;
            if frame.shape() != first.shape() {
                return Err(LGNError::ShapeMismatch {
                    expected: first.shape().to_vec(),
                    found: frame.shape().to_vec(),
                });
            }
        }
        check_positive("Frame duration", frame_duration)?;
        Ok(Stimulus::NaturalMovie {
            frames,
            frame_duration,
        })
    }

    /// Sample the stimulus on the integration grid, indexed `[t, x, y]`.
    pub fn sample(&self, integrator: &Integrator) -> Result<Array3<f64>, LGNError> {
        let times = integrator.times();
        let positions = integrator.positions();
        let nr = integrator.num_positions();

        let cube = match self {
            Stimulus::FullFieldGrating {
                angular_freq,
                wavenumber,
                orient,
                contrast,
            } => {
                let (kx, ky) = wavevector(*wavenumber, *orient);
                Array3::from_shape_fn(integrator.shape(), |(n, i, j)| {
                    contrast * (kx * positions[i] + ky * positions[j] - angular_freq * times[n]).cos()
                })
            }
            Stimulus::PatchGrating {
                angular_freq,
                wavenumber,
                orient,
                patch_diameter,
                contrast,
            } => {
                let (kx, ky) = wavevector(*wavenumber, *orient);
                let radius = patch_diameter / 2.0;
                Array3::from_shape_fn(integrator.shape(), |(n, i, j)| {
                    let (x, y) = (positions[i], positions[j]);
                    if x * x + y * y <= radius * radius {
                        contrast * (kx * x + ky * y - angular_freq * times[n]).cos()
                    } else {
                        0.0
                    }
                })
            }
            Stimulus::FlashingSpot {
                contrast,
                patch_diameter,
                delay,
                duration,
            } => {
                let radius = patch_diameter / 2.0;
                Array3::from_shape_fn(integrator.shape(), |(n, i, j)| {
                    let (x, y) = (positions[i], positions[j]);
                    if x * x + y * y <= radius * radius && in_window(times[n], *delay, *duration) {
                        *contrast
                    } else {
                        0.0
                    }
                })
            }
            Stimulus::NaturalImage {
                image,
                delay,
                duration,
            } => {
                let frame = resample(image, nr);
                Array3::from_shape_fn(integrator.shape(), |(n, i, j)| {
                    if in_window(times[n], *delay, *duration) {
                        frame[[i, j]]
                    } else {
                        0.0
                    }
                })
            }
            Stimulus::NaturalMovie {
                frames,
                frame_duration,
            } => {
                let frames: Vec<Array2<f64>> = frames.iter().map(|f| resample(f, nr)).collect();
                Array3::from_shape_fn(integrator.shape(), |(n, i, j)| {
                    let index = (times[n] / frame_duration).floor() as usize;
                    frames.get(index).map_or(0.0, |frame| frame[[i, j]])
                })
            }
        };

        Ok(cube)
    }

    /// Evaluate the stimulus Fourier transform on the frequency grid of the integrator.
    pub fn evaluate_ft(&self, integrator: &Integrator) -> Result<Array3<Complex64>, LGNError> {
        match self {
            Stimulus::FullFieldGrating {
                angular_freq,
                wavenumber,
                orient,
                contrast,
            } => {
                let (kx, ky) = wavevector(*wavenumber, *orient);
                let mut cube = Array3::<Complex64>::zeros(integrator.shape());
                let value = 4.0 * PI.powi(3) * contrast
                    / (integrator.dw() * integrator.dk() * integrator.dk());
                for sign in [1.0, -1.0] {
                    let index = (
                        grid_index(sign * angular_freq, integrator.dw(), integrator.num_times()),
                        grid_index(sign * kx, integrator.dk(), integrator.num_positions()),
                        grid_index(sign * ky, integrator.dk(), integrator.num_positions()),
                    );
                    cube[index] += Complex64::new(value, 0.0);
                }
                Ok(cube)
            }
            Stimulus::PatchGrating {
                angular_freq,
                wavenumber,
                orient,
                patch_diameter,
                contrast,
            } => {
                let (kx_g, ky_g) = wavevector(*wavenumber, *orient);
                let radius = patch_diameter / 2.0;
                let k = integrator.spatial_freqs();
                let mut cube = Array3::<Complex64>::zeros(integrator.shape());
                let value = PI * contrast / integrator.dw();
                for sign in [1.0, -1.0] {
                    let n = grid_index(sign * angular_freq, integrator.dw(), integrator.num_times());
                    let mut plane = cube.index_axis_mut(ndarray::Axis(0), n);
                    Zip::indexed(&mut plane).for_each(|(i, j), v| {
                        let dk = (k[i] - sign * kx_g).hypot(k[j] - sign * ky_g);
                        *v += Complex64::new(value * disk_ft(dk, radius), 0.0);
                    });
                }
                Ok(cube)
            }
            Stimulus::FlashingSpot {
                contrast,
                patch_diameter,
                delay,
                duration,
            } => {
                let radius = patch_diameter / 2.0;
                Ok(integrator.evaluate_ft(|w, kx, ky| {
                    box_ft(w, *delay, *duration) * contrast * disk_ft(kx.hypot(ky), radius)
                }))
            }
            Stimulus::NaturalImage {
                image,
                delay,
                duration,
            } => {
                let frame = resample(image, integrator.num_positions());
                let frame_ft = integrator.compute_spatial_fft(&frame)?;
                let w = integrator.temporal_freqs();
                let mut cube = Array3::<Complex64>::zeros(integrator.shape());
                Zip::indexed(&mut cube).par_for_each(|(n, i, j), v| {
                    *v = frame_ft[[i, j]] * box_ft(w[n], *delay, *duration);
                });
                Ok(cube)
            }
            Stimulus::NaturalMovie { .. } => integrator.compute_fft(&self.sample(integrator)?),
        }
    }
}

/// Fourier transform of the indicator function of `[delay, delay + duration)`.
fn box_ft(w: f64, delay: f64, duration: f64) -> Complex64 {
    if w == 0.0 {
        return Complex64::new(duration, 0.0);
    }
    Complex64::from_polar(1.0, w * delay) * (Complex64::from_polar(1.0, w * duration) - 1.0)
        / Complex64::new(0.0, w)
}

fn in_window(t: f64, delay: f64, duration: f64) -> bool {
    t >= delay && t < delay + duration
}

fn wavevector(wavenumber: f64, orient: f64) -> (f64, f64) {
    let theta = orient.to_radians();
    (wavenumber * theta.cos(), wavenumber * theta.sin())
}

/// Returns the position of the frequency on an FFT-ordered grid with the given spacing and size.
/// Off-grid frequencies are snapped to the closest grid point.
fn grid_index(freq: f64, spacing: f64, size: usize) -> usize {
    let m = freq / spacing;
    let rounded = m.round();
    if (m - rounded).abs() > GRID_TOL {
        warn!(
            "Frequency {} is not on the grid (spacing {}), snapped to {}",
            freq,
            spacing,
            rounded * spacing
        );
    }
    if rounded.abs() > (size / 2) as f64 {
        warn!(
            "Frequency {} exceeds the Nyquist frequency {} and aliases",
            freq,
            (size / 2) as f64 * spacing
        );
    }
    (rounded as i64).rem_euclid(size as i64) as usize
}

/// Nearest-neighbour resampling of a frame to a square grid of the given size.
fn resample(frame: &Array2<f64>, size: usize) -> Array2<f64> {
    let (rows, cols) = frame.dim();
    if rows == size && cols == size {
        return frame.clone();
    }
    info!("Resampling a {}x{} frame to {}x{}", rows, cols, size, size);
    Array2::from_shape_fn((size, size), |(i, j)| frame[[i * rows / size, j * cols / size]])
}

fn check_finite(values: &[f64]) -> Result<(), LGNError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LGNError::InvalidParameter(
            "Stimulus parameters must be finite".to_string(),
        ));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), LGNError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(LGNError::InvalidParameter(format!(
            "{} must be positive and finite (got {})",
            name, value
        )));
    }
    Ok(())
}

fn check_window(delay: f64, duration: f64) -> Result<(), LGNError> {
    if !(delay.is_finite() && delay >= 0.0) {
        return Err(LGNError::InvalidParameter(format!(
            "Delay must be non-negative and finite (got {})",
            delay
        )));
    }
    check_positive("Duration", duration)
}

fn check_frame(frame: &Array2<f64>) -> Result<(), LGNError> {
    if frame.is_empty() {
        return Err(LGNError::InvalidParameter("Frames must not be empty".to_string()));
    }
    if frame.iter().any(|v| !v.is_finite()) {
        return Err(LGNError::InvalidParameter(
            "Frame values must be finite".to_string(),
        ));
    }
    Ok(())
}
