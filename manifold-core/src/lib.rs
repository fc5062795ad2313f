//! Driven, damped, nonlinear scalar field on a periodic grid.
//!
//! The field obeys
//!
//! ```text
//! tau_m * dg/dt = xi^2 lap(g) - mu^2 g - beta g^3 + kappa J(t) + eta
//! ```
//!
//! and is advanced with a spectral IMEX scheme ([`ImexStepper`]).
//! [`EvolutionDriver`] runs multi-step evolutions with external forcing and
//! observer callbacks; [`diagnostics`] turns snapshots into power spectra.

pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod explicit;
pub mod grid;
pub mod imprint;
pub mod noise;
pub mod params;
pub mod spectral;
pub mod state;
pub mod stepper;
pub mod telemetry;
pub mod wavenumber;

pub use diagnostics::{FieldStats, PowerSpectrum};
pub use driver::{EvolutionDriver, StepObservation};
pub use error::{ManifoldError, ManifoldResult};
pub use explicit::{ExplicitFn, ExplicitTerms};
pub use grid::GridSpec;
pub use imprint::ImprintSource;
pub use noise::{trial_seed, NoiseGenerator};
pub use params::{ManifoldConfig, ParameterSet};
pub use spectral::{RustFftBackend, SpectralBackend};
pub use state::FieldState;
pub use stepper::ImexStepper;
pub use wavenumber::WavenumberOperator;
