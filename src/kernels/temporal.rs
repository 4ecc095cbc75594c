//! Temporal kernels, i.e., response time courses (ms).
use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::LGNError;
use crate::utils::{heaviside, nearest_index};

/// Default duration of each lobe of the biphasic kernel (ms).
pub const BIPHASIC_PHASE: f64 = 43.0;
/// Default relative weight of the second lobe of the biphasic kernel.
pub const BIPHASIC_DAMPING: f64 = 0.38;

// Distance to the removable singularity of the biphasic transform below which the limit is used.
const SINGULARITY_TOL: f64 = 1e-9;

/// Represents a temporal kernel.
/// Deserialization goes through the validating constructors.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "TemporalKernelParams")]
pub enum TemporalKernel {
    /// Point mass at the given delay.
    Delta { delay: f64 },
    /// Causal exponential decay `exp(-(t - delay) / tau) / tau`.
    ExpDecay { tau: f64, delay: f64 },
    /// Two half sine waves of duration `phase`, the second one inverted and scaled by `damping`.
    Biphasic { phase: f64, damping: f64, delay: f64 },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TemporalKernelParams {
    Delta { delay: f64 },
    ExpDecay { tau: f64, delay: f64 },
    Biphasic { phase: f64, damping: f64, delay: f64 },
}

impl TryFrom<TemporalKernelParams> for TemporalKernel {
    type Error = LGNError;

    fn try_from(params: TemporalKernelParams) -> Result<Self, Self::Error> {
        match params {
            TemporalKernelParams::Delta { delay } => TemporalKernel::delta(delay),
            TemporalKernelParams::ExpDecay { tau, delay } => TemporalKernel::exp_decay(tau, delay),
            TemporalKernelParams::Biphasic {
                phase,
                damping,
                delay,
            } => TemporalKernel::biphasic(phase, damping, delay),
        }
    }
}

impl TemporalKernel {
    /// Create a point-mass kernel, delaying its input by `delay`.
    /// The function returns an error for negative delays.
    pub fn delta(delay: f64) -> Result<Self, LGNError> {
        check_delay(delay)?;
        Ok(TemporalKernel::Delta { delay })
    }

    /// Create an exponential decay kernel with time constant `tau`.
    /// The function returns an error for non-positive time constants or negative delays.
    pub fn exp_decay(tau: f64, delay: f64) -> Result<Self, LGNError> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(LGNError::InvalidParameter(format!(
                "Time constant must be positive and finite (got {})",
                tau
            )));
        }
        check_delay(delay)?;
        Ok(TemporalKernel::ExpDecay { tau, delay })
    }

    /// Create a biphasic kernel.
    /// The function returns an error for non-positive phases or negative delays.
    ///
    /// # Examples
    ///
    /// ```
    /// use rusty_lgn::kernels::TemporalKernel;
    ///
    /// let kernel = TemporalKernel::biphasic(43.0, 0.38, 0.0).unwrap();
    /// assert!(kernel.eval(21.5) > 0.0);
    /// assert!(kernel.eval(64.5) < 0.0);
    /// assert_eq!(kernel.eval(100.0), 0.0);
    /// ```
    pub fn biphasic(phase: f64, damping: f64, delay: f64) -> Result<Self, LGNError> {
        if !(phase.is_finite() && phase > 0.0) {
            return Err(LGNError::InvalidParameter(format!(
                "Biphasic phase must be positive and finite (got {})",
                phase
            )));
        }
        if !damping.is_finite() {
            return Err(LGNError::InvalidParameter(
                "Biphasic damping must be finite".to_string(),
            ));
        }
        check_delay(delay)?;
        Ok(TemporalKernel::Biphasic {
            phase,
            damping,
            delay,
        })
    }

    /// Create the biphasic time course of a typical ganglion cell, with the default phase and
    /// damping. The function returns an error for negative delays.
    pub fn biphasic_default(delay: f64) -> Result<Self, LGNError> {
        TemporalKernel::biphasic(BIPHASIC_PHASE, BIPHASIC_DAMPING, delay)
    }

    /// Returns the delay of the kernel.
    pub fn delay(&self) -> f64 {
        match *self {
            TemporalKernel::Delta { delay }
            | TemporalKernel::ExpDecay { delay, .. }
            | TemporalKernel::Biphasic { delay, .. } => delay,
        }
    }

    /// Evaluate the kernel at time `t`.
    /// Point masses evaluate to zero, see [`TemporalKernel::sample`].
    pub fn eval(&self, t: f64) -> f64 {
        match *self {
            TemporalKernel::Delta { .. } => 0.0,
            TemporalKernel::ExpDecay { tau, delay } => {
                let s = t - delay;
                heaviside(s) * (-s / tau).exp() / tau
            }
            TemporalKernel::Biphasic {
                phase,
                damping,
                delay,
            } => {
                let s = t - delay;
                if s < 0.0 {
                    0.0
                } else if s <= phase {
                    (PI * s / phase).sin()
                } else if s <= 2.0 * phase {
                    -damping * (PI * (s - phase) / phase).sin()
                } else {
                    0.0
                }
            }
        }
    }

    /// Evaluate the kernel Fourier transform at angular frequency `w`.
    pub fn eval_ft(&self, w: f64) -> Complex64 {
        let shift = Complex64::from_polar(1.0, w * self.delay());
        match *self {
            TemporalKernel::Delta { .. } => shift,
            TemporalKernel::ExpDecay { tau, .. } => shift / Complex64::new(1.0, -w * tau),
            TemporalKernel::Biphasic { phase, damping, .. } => {
                let x = w * phase;
                if (x.abs() - PI).abs() < SINGULARITY_TOL {
                    // Limit of the ratio at w * phase = +/- pi.
                    return shift * Complex64::new(0.0, x.signum() * phase * (1.0 + damping) / 2.0);
                }
                let lobe = Complex64::from_polar(1.0, x);
                shift * PI * phase * (1.0 + lobe) * (1.0 - damping * lobe) / (PI * PI - x * x)
            }
        }
    }

    /// Sample the kernel at the given (uniformly spaced) times.
    /// A point mass is rendered as `1 / dt` on the closest sample.
    pub fn sample(&self, times: &[f64]) -> Vec<f64> {
        match *self {
            TemporalKernel::Delta { delay } => {
                let mut samples = vec![0.0; times.len()];
                let dt = if times.len() > 1 {
                    times[1] - times[0]
                } else {
                    1.0
                };
                if let Some(i) = nearest_index(times, delay) {
                    samples[i] = 1.0 / dt;
                }
                samples
            }
            _ => times.iter().map(|t| self.eval(*t)).collect(),
        }
    }
}

fn check_delay(delay: f64) -> Result<(), LGNError> {
    if !(delay.is_finite() && delay >= 0.0) {
        return Err(LGNError::InvalidParameter(format!(
            "Delay must be non-negative and finite (got {})",
            delay
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integral(kernel: &TemporalKernel, dt: f64, duration: f64) -> f64 {
        let times: Vec<f64> = (0..(duration / dt) as usize).map(|i| i as f64 * dt).collect();
        kernel.sample(&times).iter().sum::<f64>() * dt
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(TemporalKernel::delta(-1.0).is_err());
        assert!(TemporalKernel::exp_decay(0.0, 0.0).is_err());
        assert!(TemporalKernel::exp_decay(10.0, f64::INFINITY).is_err());
        assert!(TemporalKernel::biphasic(-43.0, 0.38, 0.0).is_err());
        assert!(TemporalKernel::biphasic(43.0, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_delta() {
        let kernel = TemporalKernel::delta(5.0).unwrap();
        let value = kernel.eval_ft(0.2);
        assert!((value - Complex64::from_polar(1.0, 1.0)).norm() < 1e-12);
        assert_eq!(kernel.sample(&[0.0, 2.0, 4.0, 6.0]), vec![0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_exp_decay() {
        let kernel = TemporalKernel::exp_decay(10.0, 2.0).unwrap();
        assert_eq!(kernel.eval(1.0), 0.0);
        assert!((kernel.eval(2.0) - 0.1).abs() < 1e-12);
        assert!((kernel.eval(12.0) - 0.1 * (-1.0_f64).exp()).abs() < 1e-12);

        assert!((kernel.eval_ft(0.0) - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        // |1 / (1 - i w tau)| at w tau = 1
        assert!((kernel.eval_ft(0.1).norm() - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((integral(&kernel, 0.01, 200.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_biphasic() {
        let (phase, damping) = (BIPHASIC_PHASE, BIPHASIC_DAMPING);
        let kernel = TemporalKernel::biphasic(phase, damping, 0.0).unwrap();

        assert!((kernel.eval(phase / 2.0) - 1.0).abs() < 1e-12);
        assert!((kernel.eval(1.5 * phase) + damping).abs() < 1e-12);
        assert_eq!(kernel.eval(-1.0), 0.0);

        let dc = 2.0 * phase * (1.0 - damping) / PI;
        assert!((kernel.eval_ft(0.0).re - dc).abs() < 1e-9);
        assert!(kernel.eval_ft(0.0).im.abs() < 1e-9);
        assert!((integral(&kernel, 0.01, 100.0) - dc).abs() < 1e-3);
    }

    #[test]
    fn test_biphasic_removable_singularity() {
        let phase = 20.0;
        let kernel = TemporalKernel::biphasic(phase, 0.5, 0.0).unwrap();
        let w0 = PI / phase;

        let limit = kernel.eval_ft(w0);
        assert!((limit - Complex64::new(0.0, phase * 1.5 / 2.0)).norm() < 1e-12);
        assert!((kernel.eval_ft(w0 + 1e-7) - limit).norm() < 1e-3);
        assert!((kernel.eval_ft(-w0 - 1e-7) - limit.conj()).norm() < 1e-3);
    }

    #[test]
    fn test_delay_shifts_phase() {
        let kernel = TemporalKernel::exp_decay(10.0, 0.0).unwrap();
        let delayed = TemporalKernel::exp_decay(10.0, 3.0).unwrap();
        let w = 0.7;
        let expected = kernel.eval_ft(w) * Complex64::from_polar(1.0, 3.0 * w);
        assert!((delayed.eval_ft(w) - expected).norm() < 1e-12);
        assert!((delayed.eval(13.0) - kernel.eval(10.0)).abs() < 1e-15);
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<TemporalKernel>(r#"{"type":"delta","delay":-1.0}"#).is_err());
        assert!(
            serde_json::from_str::<TemporalKernel>(r#"{"type":"exp_decay","tau":0.0,"delay":0.0}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<TemporalKernel>(
            r#"{"type":"biphasic","phase":-43.0,"damping":0.38,"delay":0.0}"#
        )
        .is_err());

        let kernel = TemporalKernel::biphasic_default(2.0).unwrap();
        let json = serde_json::to_string(&kernel).unwrap();
        assert!(json.contains(r#""type":"biphasic""#));
        assert_eq!(serde_json::from_str::<TemporalKernel>(&json).unwrap(), kernel);
    }
}
