use serde::{Deserialize, Serialize};

use crate::error::{ManifoldError, ManifoldResult};
use crate::grid::GridSpec;

/// Physical and numerical parameters of the manifold evolution
///
/// ```text
/// tau_m * dg/dt = xi_squared * lap(g) - mu_squared * g - beta * g^3 + kappa * J + eta
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Relaxation time.
    pub tau_m: f64,
    /// Stiffness, penalises curvature.
    pub xi_squared: f64,
    /// Mass-like term. Negative values amplify low wavenumbers.
    pub mu_squared: f64,
    /// Cubic saturation coefficient.
    pub beta: f64,
    /// Coupling of the imprint current.
    pub kappa: f64,
    pub noise_amplitude: f64,
    pub dt: f64,
    /// Field values are clipped to `[-clip_value, clip_value]` after every step.
    pub clip_value: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            tau_m: 1.0,
            xi_squared: 0.1,
            mu_squared: 0.1,
            beta: 1.0,
            kappa: 1.0,
            noise_amplitude: 0.01,
            dt: 0.01,
            clip_value: 10.0,
        }
    }
}

impl ParameterSet {
    pub fn validate(&self) -> ManifoldResult<()> {
        positive("tau_m", self.tau_m)?;
        positive("dt", self.dt)?;
        positive("clip_value", self.clip_value)?;
        finite("xi_squared", self.xi_squared)?;
        finite("mu_squared", self.mu_squared)?;
        finite("beta", self.beta)?;
        finite("kappa", self.kappa)?;
        finite("noise_amplitude", self.noise_amplitude)?;
        if self.noise_amplitude < 0.0 {
            return Err(ManifoldError::InvalidParameter(format!(
                "noise_amplitude must be >= 0, got {}",
                self.noise_amplitude
            )));
        }
        Ok(())
    }

    /// dt / tau_m, the weight of one explicit Euler increment.
    pub fn rate(&self) -> f64 {
        self.dt / self.tau_m
    }

    /// True when switching to `other` changes the implicit operator.
    pub fn implicit_terms_differ(&self, other: &ParameterSet) -> bool {
        self.dt != other.dt
            || self.tau_m != other.tau_m
            || self.xi_squared != other.xi_squared
            || self.mu_squared != other.mu_squared
    }
}

fn finite(name: &str, value: f64) -> ManifoldResult<()> {
    if !value.is_finite() {
        return Err(ManifoldError::InvalidParameter(format!(
            "{name} must be finite, got {value}"
        )));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> ManifoldResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ManifoldError::InvalidParameter(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

/// Everything needed to stand up one solver instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifoldConfig {
    pub grid: GridSpec,
    #[serde(default)]
    pub params: ParameterSet,
    #[serde(default)]
    pub seed: u64,
}

impl ManifoldConfig {
    pub fn from_json_str(raw: &str) -> ManifoldResult<ManifoldConfig> {
        let config: ManifoldConfig =
            serde_json::from_str(raw).map_err(|e| ManifoldError::Config(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }
}
