//! Helpers turning responses and spike trains into data ready for display, e.g., raster plots or
//! frame-by-frame animations of the activity over the visual field.
use itertools::{Itertools, MinMaxResult};
use ndarray::{Array2, Array3};

use super::error::LGNError;

/// Map `value` onto `[0, 1]` such that `vmin`, `midpoint` and `vmax` land on 0, 0.5 and 1.
/// Both halves are linear and the result is clamped.
/// The function returns an error unless `vmin < midpoint < vmax`.
///
/// # Examples
///
/// ```
/// use rusty_lgn::activity::midpoint_normalize;
///
/// assert_eq!(midpoint_normalize(0.0, -1.0, 0.0, 4.0).unwrap(), 0.5);
/// assert_eq!(midpoint_normalize(2.0, -1.0, 0.0, 4.0).unwrap(), 0.75);
/// assert_eq!(midpoint_normalize(-5.0, -1.0, 0.0, 4.0).unwrap(), 0.0);
/// ```
pub fn midpoint_normalize(value: f64, vmin: f64, midpoint: f64, vmax: f64) -> Result<f64, LGNError> {
    if !(vmin < midpoint && midpoint < vmax) {
        return Err(LGNError::InvalidParameter(format!(
            "Expected vmin < midpoint < vmax (got {}, {}, {})",
            vmin, midpoint, vmax
        )));
    }
    let normalized = if value <= midpoint {
        0.5 * (value - vmin) / (midpoint - vmin)
    } else {
        0.5 + 0.5 * (value - midpoint) / (vmax - midpoint)
    };
    Ok(normalized.clamp(0.0, 1.0))
}

/// Flatten spike trains indexed `[x, y]` into `(time, location)` events sorted by time,
/// where the location is the row-major index `x * ny + y`.
pub fn raster_events(spike_trains: &Array2<Vec<f64>>) -> Vec<(f64, usize)> {
    let (_, ny) = spike_trains.dim();
    spike_trains
        .indexed_iter()
        .flat_map(|((i, j), train)| train.iter().map(move |t| (*t, i * ny + j)))
        .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .collect()
}

/// Bin spike trains indexed `[x, y]` on the given (uniformly spaced) times.
/// Each spike marks the closest time sample (ties to even) with `marker_size`; spikes outside the
/// window are ignored.
pub fn spike_activity_cube(
    spike_trains: &Array2<Vec<f64>>,
    times: &[f64],
    marker_size: f64,
) -> Result<Array3<f64>, LGNError> {
    if times.len() < 2 {
        return Err(LGNError::InvalidParameter(
            "At least two time samples are required".to_string(),
        ));
    }
    let (t0, dt) = (times[0], times[1] - times[0]);
    if !(dt.is_finite() && dt > 0.0) {
        return Err(LGNError::InvalidParameter(
            "Times must be increasing and finite".to_string(),
        ));
    }

    let (nx, ny) = spike_trains.dim();
    let mut cube = Array3::zeros((times.len(), nx, ny));
    for ((i, j), train) in spike_trains.indexed_iter() {
        for t in train.iter() {
            let bin = ((t - t0) / dt).round_ties_even();
            if bin >= 0.0 && bin < times.len() as f64 {
                cube[[bin as usize, i, j]] = marker_size;
            }
        }
    }
    Ok(cube)
}

/// Returns the colour limits `(min, max)` of a cube, or `None` if it is empty.
pub fn frame_range(cube: &Array3<f64>) -> Option<(f64, f64)> {
    match cube.iter().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((*v, *v)),
        MinMaxResult::MinMax(min, max) => Some((*min, *max)),
    }
}
