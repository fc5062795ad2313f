use std::borrow::Cow;
use std::fmt;

use ndarray::ArrayD;

/// Source of the imprint current J(t) fed into the explicit half-step.
#[derive(Default)]
pub enum ImprintSource {
    #[default]
    Zero,
    Constant(ArrayD<f64>),
    Function(Box<dyn FnMut(f64) -> ArrayD<f64>>),
}

impl ImprintSource {
    pub fn constant(field: ArrayD<f64>) -> ImprintSource {
        ImprintSource::Constant(field)
    }

    pub fn function<F>(f: F) -> ImprintSource
    where
        F: FnMut(f64) -> ArrayD<f64> + 'static,
    {
        ImprintSource::Function(Box::new(f))
    }

    /// J at time `t`, or `None` when there is no forcing.
    pub fn sample(&mut self, t: f64) -> Option<Cow<'_, ArrayD<f64>>> {
        match self {
            ImprintSource::Zero => None,
            ImprintSource::Constant(field) => Some(Cow::Borrowed(field)),
            ImprintSource::Function(f) => Some(Cow::Owned(f(t))),
        }
    }
}

impl From<ArrayD<f64>> for ImprintSource {
    fn from(field: ArrayD<f64>) -> Self {
        ImprintSource::Constant(field)
    }
}

impl fmt::Debug for ImprintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImprintSource::Zero => f.write_str("Zero"),
            ImprintSource::Constant(field) => {
                f.debug_tuple("Constant").field(&field.shape()).finish()
            }
            ImprintSource::Function(_) => f.write_str("Function(..)"),
        }
    }
}
