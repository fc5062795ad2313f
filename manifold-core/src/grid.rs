use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{ManifoldError, ManifoldResult};

pub const MAX_DIMS: usize = 3;

/// Shape and spacing of a periodic grid. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGridSpec")]
pub struct GridSpec {
    shape: Vec<usize>,
    spacing: f64,
}

#[derive(Deserialize)]
struct RawGridSpec {
    shape: Vec<usize>,
    #[serde(default = "default_spacing")]
    spacing: f64,
}

fn default_spacing() -> f64 {
    1.0
}

impl TryFrom<RawGridSpec> for GridSpec {
    type Error = ManifoldError;

    fn try_from(raw: RawGridSpec) -> Result<Self, Self::Error> {
        GridSpec::new(raw.shape, raw.spacing)
    }
}

impl GridSpec {
    pub fn new(shape: impl Into<Vec<usize>>, spacing: f64) -> ManifoldResult<GridSpec> {
        let shape = shape.into();
        if shape.is_empty() || shape.len() > MAX_DIMS {
            return Err(ManifoldError::InvalidGrid(format!(
                "dimensionality must be 1..={MAX_DIMS}, got {}",
                shape.len()
            )));
        }
        if shape.iter().any(|&n| n == 0) {
            return Err(ManifoldError::InvalidGrid(format!(
                "every axis needs at least one cell, got {shape:?}"
            )));
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ManifoldError::InvalidGrid(format!(
                "spacing must be finite and > 0, got {spacing}"
            )));
        }
        Ok(GridSpec { shape, spacing })
    }

    /// Square 2D grid with unit spacing.
    pub fn square(n: usize) -> ManifoldResult<GridSpec> {
        GridSpec::new(vec![n, n], 1.0)
    }

    // ---- Accessors ----

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zeros(&self) -> ArrayD<f64> {
        ArrayD::zeros(IxDyn(&self.shape))
    }

    pub fn filled(&self, value: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&self.shape), value)
    }

    /// Fails fast instead of broadcasting when `found` differs from the grid shape.
    pub fn ensure_congruent(&self, what: &'static str, found: &[usize]) -> ManifoldResult<()> {
        if found != self.shape.as_slice() {
            return Err(ManifoldError::ShapeMismatch {
                what,
                expected: self.shape.clone(),
                found: found.to_vec(),
            });
        }
        Ok(())
    }
}
