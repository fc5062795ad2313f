use ndarray::{ArrayD, ArrayViewD};
use tracing::{debug, info_span};

use crate::diagnostics::{FieldStats, PowerSpectrum};
use crate::error::ManifoldResult;
use crate::imprint::ImprintSource;
use crate::params::ManifoldConfig;
use crate::spectral::{RustFftBackend, SpectralBackend};
use crate::stepper::ImexStepper;

/// What an observer sees after each step.
#[derive(Clone, Debug)]
pub struct StepObservation<'a> {
    pub step: u64,
    pub time: f64,
    pub field: ArrayViewD<'a, f64>,
}

/// Runs fixed-length evolutions on one stepper and hands intermediate
/// states to observers, so analysers never have to be wired into the solver.
pub struct EvolutionDriver<B: SpectralBackend = RustFftBackend> {
    stepper: ImexStepper<B>,
}

impl EvolutionDriver<RustFftBackend> {
    pub fn from_config(config: &ManifoldConfig) -> ManifoldResult<Self> {
        Ok(EvolutionDriver::new(ImexStepper::from_config(config)?))
    }
}

impl<B: SpectralBackend> EvolutionDriver<B> {
    pub fn new(stepper: ImexStepper<B>) -> Self {
        EvolutionDriver { stepper }
    }

    pub fn stepper(&self) -> &ImexStepper<B> {
        &self.stepper
    }

    pub fn stepper_mut(&mut self) -> &mut ImexStepper<B> {
        &mut self.stepper
    }

    pub fn field(&self) -> &ArrayD<f64> {
        self.stepper.field()
    }

    pub fn time(&self) -> f64 {
        self.stepper.time()
    }

    pub fn step_count(&self) -> u64 {
        self.stepper.step_count()
    }

    pub fn evolve(
        &mut self,
        n_steps: usize,
        imprint: &mut ImprintSource,
    ) -> ManifoldResult<&ArrayD<f64>> {
        self.evolve_observed(n_steps, imprint, |_| {})
    }

    /// Steps `n_steps` times, sampling the imprint at the time each step
    /// starts and calling `observer` with the post-step state.
    pub fn evolve_observed<F>(
        &mut self,
        n_steps: usize,
        imprint: &mut ImprintSource,
        mut observer: F,
    ) -> ManifoldResult<&ArrayD<f64>>
    where
        F: FnMut(StepObservation<'_>),
    {
        let span = info_span!(
            "evolve",
            n_steps,
            from_step = self.stepper.step_count()
        );
        let _entered = span.enter();

        for _ in 0..n_steps {
            let forcing = imprint.sample(self.stepper.time());
            self.stepper.step(forcing.as_deref())?;
            observer(StepObservation {
                step: self.stepper.step_count(),
                time: self.stepper.time(),
                field: self.stepper.field().view(),
            });
        }

        let stats = FieldStats::of(self.stepper.field());
        debug!(
            step = self.stepper.step_count(),
            time = self.stepper.time(),
            mean = stats.mean,
            energy = stats.energy,
            max_abs = stats.max_abs,
            "evolution finished"
        );
        Ok(self.stepper.field())
    }

    /// Starts a fresh trial from `initial` (or zeros) at t = 0. The
    /// wavenumber operator is kept.
    pub fn reset(&mut self, initial: Option<ArrayD<f64>>) -> ManifoldResult<()> {
        self.stepper.reset(initial)?;
        debug!(shape = ?self.stepper.grid().shape(), "reset field state");
        Ok(())
    }

    pub fn power_spectrum(&mut self) -> PowerSpectrum {
        self.stepper.power_spectrum()
    }

    pub fn stats(&self) -> FieldStats {
        FieldStats::of(self.stepper.field())
    }
}
