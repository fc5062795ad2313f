//! Isotropic power spectrum and simple field statistics.

use ndarray::{ArrayD, Zip};

use crate::grid::GridSpec;
use crate::spectral::SpectralBackend;
use crate::wavenumber::WavenumberOperator;

pub const MAX_DEFAULT_BINS: usize = 50;

/// Radially binned |F(k)|^2.
#[derive(Clone, Debug, PartialEq)]
pub struct PowerSpectrum {
    /// Bin centres.
    pub k: Vec<f64>,
    /// Mean power per bin; zero for bins without samples.
    pub power: Vec<f64>,
    /// Number of grid indices that fell into each bin.
    pub counts: Vec<usize>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    /// Sum of |F|^2 recovered from the bin means and counts.
    pub fn total_power(&self) -> f64 {
        self.power
            .iter()
            .zip(self.counts.iter())
            .map(|(p, &n)| p * n as f64)
            .sum()
    }

    /// Bin centres whose power exceeds `fraction` of the strongest bin.
    pub fn peaks_above(&self, fraction: f64) -> Vec<f64> {
        let max = self.power.iter().cloned().fold(0.0f64, f64::max);
        if max <= 0.0 {
            return Vec::new();
        }
        self.k
            .iter()
            .zip(self.power.iter())
            .filter(|&(_, &p)| p > fraction * max)
            .map(|(&k, _)| k)
            .collect()
    }
}

/// min(50, first axis / 2), never below one bin.
pub fn default_bin_count(grid: &GridSpec) -> usize {
    (grid.shape()[0] / 2).clamp(1, MAX_DEFAULT_BINS)
}

pub fn power_spectrum<B>(
    field: &ArrayD<f64>,
    operator: &WavenumberOperator,
    backend: &mut B,
    n_bins: usize,
) -> PowerSpectrum
where
    B: SpectralBackend + ?Sized,
{
    let spectrum = backend.forward(field);
    let power = spectrum.mapv(|c| c.norm_sqr());
    bin_isotropic(&power, operator.k_squared(), n_bins)
}

/// Bins `power` by |k| into `n_bins` equal-width bins over `[0, k_max]`.
///
/// Bins are half-open `[lo, hi)` except the last, which also takes `k_max`.
pub fn bin_isotropic(power: &ArrayD<f64>, k_squared: &ArrayD<f64>, n_bins: usize) -> PowerSpectrum {
    let n_bins = n_bins.max(1);
    let k_max = k_squared.iter().fold(0.0f64, |acc, &k2| acc.max(k2)).sqrt();
    let edges: Vec<f64> = (0..=n_bins)
        .map(|i| k_max * i as f64 / n_bins as f64)
        .collect();

    let mut sums = vec![0.0; n_bins];
    let mut counts = vec![0usize; n_bins];
    Zip::from(power).and(k_squared).for_each(|&p, &k2| {
        let bin = bin_index(k2.sqrt(), &edges);
        sums[bin] += p;
        counts[bin] += 1;
    });

    let k = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
    let power = sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
        .collect();

    PowerSpectrum { k, power, counts }
}

fn bin_index(k: f64, edges: &[f64]) -> usize {
    let n_bins = edges.len() - 1;
    let k_max = edges[n_bins];
    if k_max <= 0.0 {
        return 0;
    }
    if k >= k_max {
        return n_bins - 1;
    }
    // start from the arithmetic guess, then settle against the stored edges
    let mut i = ((k / k_max) * n_bins as f64) as usize;
    i = i.min(n_bins - 1);
    while i > 0 && k < edges[i] {
        i -= 1;
    }
    while i + 1 < n_bins && k >= edges[i + 1] {
        i += 1;
    }
    i
}

/// Scalar summary of a field snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    /// Mean of g^2.
    pub energy: f64,
    pub max_abs: f64,
}

impl FieldStats {
    pub fn of(field: &ArrayD<f64>) -> FieldStats {
        let n = field.len().max(1) as f64;
        let (sum, sum_sq, max_abs) = field.iter().fold((0.0, 0.0, 0.0f64), |(s, s2, m), &v| {
            (s + v, s2 + v * v, m.max(v.abs()))
        });
        FieldStats {
            mean: sum / n,
            energy: sum_sq / n,
            max_abs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use crate::spectral::RustFftBackend;
    use ndarray::IxDyn;
    use std::f64::consts::PI;

    #[test]
    fn bin_edges_are_half_open_with_closed_last_bin() {
        let edges = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(bin_index(0.0, &edges), 0);
        assert_eq!(bin_index(0.999, &edges), 0);
        assert_eq!(bin_index(1.0, &edges), 1);
        assert_eq!(bin_index(2.0, &edges), 2);
        assert_eq!(bin_index(3.0, &edges), 2);
    }

    #[test]
    fn empty_bins_report_zero() {
        let k_squared = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0, 0.0, 16.0]).unwrap();
        let power = ArrayD::from_shape_vec(IxDyn(&[3]), vec![2.0, 4.0, 1.0]).unwrap();
        let spectrum = bin_isotropic(&power, &k_squared, 4);
        assert_eq!(spectrum.counts, vec![2, 0, 0, 1]);
        assert_eq!(spectrum.power, vec![3.0, 0.0, 0.0, 1.0]);
        assert_eq!(spectrum.k, vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn default_bins_follow_grid() {
        assert_eq!(default_bin_count(&GridSpec::square(64).unwrap()), 32);
        assert_eq!(default_bin_count(&GridSpec::square(256).unwrap()), 50);
        assert_eq!(default_bin_count(&GridSpec::new(vec![1, 8], 1.0).unwrap()), 1);
    }

    #[test]
    fn binned_power_accounts_for_every_mode() {
        let grid = GridSpec::new(vec![16, 12], 1.0).unwrap();
        let op = WavenumberOperator::new(&grid, &ParameterSet::default()).unwrap();
        let field = ArrayD::from_shape_fn(IxDyn(&[16, 12]), |i| {
            (i[0] as f64 * 0.9).sin() + 0.3 * (i[1] as f64 * 2.1).cos() + 0.25
        });
        let mut backend = RustFftBackend::new();
        let total: f64 = backend.forward(&field).iter().map(|c| c.norm_sqr()).sum();

        let spectrum = power_spectrum(&field, &op, &mut backend, 8);
        assert_eq!(spectrum.counts.iter().sum::<usize>(), grid.len());
        assert!(spectrum.power[0] >= 0.0);
        assert!((spectrum.total_power() - total).abs() < 1e-9 * total);
    }

    #[test]
    fn plane_wave_peaks_at_its_wavenumber() {
        let n = 64;
        let grid = GridSpec::square(n).unwrap();
        let op = WavenumberOperator::new(&grid, &ParameterSet::default()).unwrap();
        let k0 = 2.0 * PI * 8.0 / n as f64;
        let field = ArrayD::from_shape_fn(IxDyn(&[n, n]), |i| (k0 * i[0] as f64).cos());

        let spectrum = power_spectrum(&field, &op, &mut RustFftBackend::new(), 32);
        let peaks = spectrum.peaks_above(0.5);
        assert_eq!(peaks.len(), 1);
        let width = spectrum.k[1] - spectrum.k[0];
        assert!((peaks[0] - k0).abs() <= width);
    }

    #[test]
    fn stats_summarise_field() {
        let field = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0, -3.0, 2.0, 0.0]).unwrap();
        let stats = FieldStats::of(&field);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.energy, 3.5);
        assert_eq!(stats.max_abs, 3.0);
    }
}
