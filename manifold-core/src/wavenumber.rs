use std::f64::consts::PI;

use ndarray::{ArrayD, IxDyn, Zip};
use num_complex::Complex64;
use tracing::debug;

use crate::error::ManifoldResult;
use crate::grid::GridSpec;
use crate::params::ParameterSet;

/// Angular wavenumbers for `n` samples at spacing `d`, in DFT bin order:
/// zero, ascending positive, then the negative half ascending towards -1.
pub fn angular_frequencies(n: usize, d: f64) -> Vec<f64> {
    let scale = 2.0 * PI / (n as f64 * d);
    (0..n)
        .map(|i| {
            let signed = if i <= (n - 1) / 2 {
                i as f64
            } else {
                i as f64 - n as f64
            };
            signed * scale
        })
        .collect()
}

/// |k|^2 over the whole grid, summed across axes.
pub fn squared_wavenumbers(grid: &GridSpec) -> ArrayD<f64> {
    let per_axis: Vec<Vec<f64>> = grid
        .shape()
        .iter()
        .map(|&n| angular_frequencies(n, grid.spacing()))
        .collect();

    ArrayD::from_shape_fn(IxDyn(grid.shape()), |idx| {
        per_axis
            .iter()
            .enumerate()
            .map(|(axis, k)| k[idx[axis]] * k[idx[axis]])
            .sum()
    })
}

/// Fourier-space scaffolding for the implicit half-step.
///
/// Built once per (grid, dt, tau_m, xi_squared, mu_squared) and never mutated.
/// It may be shared read-only between solvers via `Arc`.
#[derive(Clone, Debug)]
pub struct WavenumberOperator {
    grid: GridSpec,
    dt: f64,
    tau_m: f64,
    xi_squared: f64,
    mu_squared: f64,
    k_squared: ArrayD<f64>,
    implicit_factor: ArrayD<f64>,
}

impl WavenumberOperator {
    pub fn new(grid: &GridSpec, params: &ParameterSet) -> ManifoldResult<WavenumberOperator> {
        params.validate()?;

        let k_squared = squared_wavenumbers(grid);
        let rate = params.rate();
        let implicit_factor = k_squared
            .mapv(|k2| 1.0 / (1.0 + rate * (params.xi_squared * k2 + params.mu_squared)));

        let op = WavenumberOperator {
            grid: grid.clone(),
            dt: params.dt,
            tau_m: params.tau_m,
            xi_squared: params.xi_squared,
            mu_squared: params.mu_squared,
            k_squared,
            implicit_factor,
        };

        debug!(
            shape = ?grid.shape(),
            spacing = grid.spacing(),
            dt = params.dt,
            tau_m = params.tau_m,
            xi_squared = params.xi_squared,
            mu_squared = params.mu_squared,
            amplified_modes = op.amplified_modes(),
            "built wavenumber operator"
        );
        Ok(op)
    }

    /// Whether this operator was built from exactly these inputs.
    pub fn matches(&self, grid: &GridSpec, params: &ParameterSet) -> bool {
        self.grid == *grid
            && self.dt == params.dt
            && self.tau_m == params.tau_m
            && self.xi_squared == params.xi_squared
            && self.mu_squared == params.mu_squared
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn k_squared(&self) -> &ArrayD<f64> {
        &self.k_squared
    }

    pub fn implicit_factor(&self) -> &ArrayD<f64> {
        &self.implicit_factor
    }

    /// m_eff^2(k) = xi^2 k^2 + mu^2
    pub fn effective_mass_squared(&self) -> ArrayD<f64> {
        self.k_squared
            .mapv(|k2| self.xi_squared * k2 + self.mu_squared)
    }

    /// Modes the implicit step amplifies rather than damps. Non-zero only
    /// when mu_squared is negative enough to beat the stiffness at low k.
    pub fn amplified_modes(&self) -> usize {
        self.implicit_factor.iter().filter(|&&f| f > 1.0).count()
    }

    pub fn max_k(&self) -> f64 {
        self.k_squared.iter().fold(0.0f64, |acc, &k2| acc.max(k2)).sqrt()
    }

    /// Multiplies a spectrum by -k^2, i.e. the Laplacian in Fourier space.
    pub(crate) fn apply_laplacian(&self, spectrum: &mut ArrayD<Complex64>) {
        Zip::from(spectrum)
            .and(&self.k_squared)
            .for_each(|c, &k2| *c *= -k2);
    }
}
