use std::fmt;

use ndarray::ArrayD;

use crate::params::ParameterSet;

/// Caller-supplied replacement for the whole explicit right-hand side,
/// called with the current field and time.
pub type ExplicitFn = Box<dyn FnMut(&ArrayD<f64>, f64) -> ArrayD<f64>>;

/// How the explicit (non-stiff) half of the step is computed.
pub enum ExplicitTerms {
    /// `-beta * g^3 + kappa * J + eta`
    Default { beta: f64, kappa: f64 },
    /// The function's output is used as-is; imprint and noise are not added.
    Custom(ExplicitFn),
}

impl ExplicitTerms {
    pub fn from_params(params: &ParameterSet) -> ExplicitTerms {
        ExplicitTerms::Default {
            beta: params.beta,
            kappa: params.kappa,
        }
    }

    pub fn custom<F>(f: F) -> ExplicitTerms
    where
        F: FnMut(&ArrayD<f64>, f64) -> ArrayD<f64> + 'static,
    {
        ExplicitTerms::Custom(Box::new(f))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ExplicitTerms::Custom(_))
    }
}

impl fmt::Debug for ExplicitTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplicitTerms::Default { beta, kappa } => f
                .debug_struct("Default")
                .field("beta", beta)
                .field("kappa", kappa)
                .finish(),
            ExplicitTerms::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
