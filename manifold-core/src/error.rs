use thiserror::Error;

/// Errors raised while building or driving a manifold solver.
///
/// The stepping algorithm itself never reports numerical divergence; only
/// contract violations (bad grids, bad parameters, incongruent arrays) end up
/// here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifoldError {
    /// Grid shape or spacing is unusable.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A physical or numerical parameter is out of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An array handed to the solver is not congruent with the grid.
    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A shared wavenumber operator was built for a different grid or parameter set.
    #[error("wavenumber operator does not match the solver grid and parameters")]
    OperatorMismatch,

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

pub type ManifoldResult<T> = Result<T, ManifoldError>;
