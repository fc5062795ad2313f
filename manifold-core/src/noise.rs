//! Spatially-correlated Gaussian noise.
//!
//! Each call draws white noise from the caller's RNG and smooths it with a
//! truncated Gaussian kernel along every axis, so neighbouring cells are
//! correlated over roughly one grid cell. Nothing is carried between calls.

use ndarray::{ArrayD, Axis, IxDyn};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::grid::GridSpec;

const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;

/// Seed for trial `trial_idx` derived from a base seed. Nearby indices give
/// unrelated ChaCha streams, so repeated trials stay independent.
pub fn trial_seed(base: u64, trial_idx: u64) -> u64 {
    base ^ trial_idx.wrapping_mul(GOLDEN_GAMMA)
}

#[derive(Clone, Debug, PartialEq)]
pub struct NoiseGenerator {
    amplitude: f64,
    kernel: Vec<f64>,
}

impl NoiseGenerator {
    /// Correlation length in grid cells.
    pub const SIGMA: f64 = 1.0;
    /// Kernel is cut off at this many standard deviations.
    pub const TRUNCATE: f64 = 4.0;

    pub fn new(amplitude: f64) -> NoiseGenerator {
        NoiseGenerator {
            amplitude,
            kernel: gaussian_kernel(Self::SIGMA, Self::TRUNCATE),
        }
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude;
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// One zero-mean noise field congruent with `grid`.
    pub fn generate<R: Rng + ?Sized>(&self, grid: &GridSpec, rng: &mut R) -> ArrayD<f64> {
        if self.amplitude == 0.0 {
            return grid.zeros();
        }

        let white: Vec<f64> = (0..grid.len())
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let mut field = ArrayD::from_shape_vec(IxDyn(grid.shape()), white)
            .unwrap_or_else(|_| grid.zeros());

        for axis in 0..field.ndim() {
            smooth_axis(&mut field, Axis(axis), &self.kernel);
        }

        let amplitude = self.amplitude;
        field.mapv_inplace(|v| v * amplitude);
        field
    }
}

/// Normalised Gaussian weights over `[-r, r]`, `r = floor(truncate * sigma + 0.5)`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

// Mirror boundary that repeats the edge sample: d c b a | a b c d | d c b a
fn reflect(i: i64, n: usize) -> usize {
    let period = 2 * n as i64;
    let m = i.rem_euclid(period);
    if m < n as i64 {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn smooth_axis(field: &mut ArrayD<f64>, axis: Axis, kernel: &[f64]) {
    let n = field.len_of(axis);
    if n < 2 {
        return;
    }
    let radius = (kernel.len() / 2) as i64;
    let mut src = Vec::with_capacity(n);

    for mut lane in field.lanes_mut(axis) {
        src.clear();
        src.extend(lane.iter().copied());
        for (i, out) in lane.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(j, w)| w * src[reflect(i as i64 + j as i64 - radius, n)])
                .sum();
        }
    }
}
