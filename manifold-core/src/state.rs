use ndarray::ArrayD;

use crate::error::ManifoldResult;
use crate::grid::GridSpec;

/// The evolving field together with its clock.
///
/// Owned by exactly one stepper; never shared for mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    values: ArrayD<f64>,
    time: f64,
    step_count: u64,
}

impl FieldState {
    pub fn zeros(grid: &GridSpec) -> FieldState {
        FieldState {
            values: grid.zeros(),
            time: 0.0,
            step_count: 0,
        }
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Back to t = 0 with either the given field or zeros.
    pub fn reset(&mut self, grid: &GridSpec, initial: Option<ArrayD<f64>>) -> ManifoldResult<()> {
        match initial {
            Some(field) => {
                grid.ensure_congruent("initial field", field.shape())?;
                self.values = field;
            }
            None => self.values = grid.zeros(),
        }
        self.time = 0.0;
        self.step_count = 0;
        Ok(())
    }

    pub(crate) fn values_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.values
    }

    pub(crate) fn advance(&mut self, dt: f64) {
        self.time += dt;
        self.step_count += 1;
    }
}
