//! Module implementing the generation of spike trains from firing rates.
//!
//! Spikes are drawn from an inhomogeneous Poisson process by thinning: candidate spikes are drawn
//! at the peak rate and each one is kept with probability `rate(t) / peak rate`.
use log::debug;
use ndarray::{s, Array2, Array3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use rayon::prelude::*;

use super::error::LGNError;

/// Generate a spike train from firing rates (spikes/s) sampled at uniformly spaced times (ms).
///
/// The rate is piecewise constant over each time step, negative rates are treated as zero.
/// The returned spike times are sorted and lie in `[times[0], times[last] + dt)`.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use rusty_lgn::spike_train::generate_spike_train;
///
/// let times: Vec<f64> = (0..1000).map(|i| i as f64).collect();
/// let rates = vec![20.0; 1000];
/// let mut rng = StdRng::seed_from_u64(42);
///
/// let spikes = generate_spike_train(&rates, &times, &mut rng).unwrap();
/// assert!(spikes.windows(2).all(|ts| ts[0] <= ts[1]));
/// assert!(spikes.iter().all(|t| (0.0..1000.0).contains(t)));
/// ```
pub fn generate_spike_train<R: Rng>(
    rates: &[f64],
    times: &[f64],
    rng: &mut R,
) -> Result<Vec<f64>, LGNError> {
    if rates.len() != times.len() {
        return Err(LGNError::ShapeMismatch {
            expected: vec![times.len()],
            found: vec![rates.len()],
        });
    }
    if times.len() < 2 {
        return Err(LGNError::InvalidParameter(
            "At least two time samples are required".to_string(),
        ));
    }
    let t0 = times[0];
    let dt = times[1] - times[0];
    if !(dt.is_finite() && dt > 0.0) {
        return Err(LGNError::InvalidParameter(
            "Times must be increasing and finite".to_string(),
        ));
    }
    if rates.iter().any(|rate| !rate.is_finite()) {
        return Err(LGNError::InvalidParameter(
            "Firing rates must be finite".to_string(),
        ));
    }

    // spikes/s -> spikes/ms
    let peak_rate = rates.iter().fold(0.0_f64, |acc, rate| acc.max(*rate)) / 1000.0;
    if peak_rate <= 0.0 {
        return Ok(vec![]);
    }
    let intervals =
        Exp::new(peak_rate).map_err(|e| LGNError::InvalidParameter(e.to_string()))?;

    let t_end = t0 + times.len() as f64 * dt;
    let mut spikes = vec![];
    let mut t = t0 + intervals.sample(rng);
    while t < t_end {
        let n = (((t - t0) / dt).floor() as usize).min(rates.len() - 1);
        let rate = rates[n].max(0.0) / 1000.0;
        if rng.gen::<f64>() * peak_rate < rate {
            spikes.push(t);
        }
        t += intervals.sample(rng);
    }

    Ok(spikes)
}

/// Generate one spike train per spatial location of a response cube indexed `[t, x, y]`.
///
/// Each location draws from its own ChaCha stream derived from `seed`, hence the result does not
/// depend on how the work is scheduled across threads.
pub fn generate_spike_trains(
    cube: &Array3<f64>,
    times: &[f64],
    seed: u64,
) -> Result<Array2<Vec<f64>>, LGNError> {
    let (nt, nx, ny) = cube.dim();
    if nt != times.len() {
        return Err(LGNError::ShapeMismatch {
            expected: vec![times.len(), nx, ny],
            found: vec![nt, nx, ny],
        });
    }

    let trains = (0..nx * ny)
        .into_par_iter()
        .map(|p| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(p as u64);
            let rates = cube.slice(s![.., p / ny, p % ny]).to_vec();
            generate_spike_train(&rates, times, &mut rng)
        })
        .collect::<Result<Vec<Vec<f64>>, LGNError>>()?;
    debug!(
        "Generated {} spikes at {} locations",
        trains.iter().map(|train| train.len()).sum::<usize>(),
        nx * ny
    );

    Array2::from_shape_vec((nx, ny), trains).map_err(|e| LGNError::InvalidParameter(e.to_string()))
}
