//! Preconditioned conjugate gradient solve of a constrained system.
use crate::boundary::ConstrainedSystem;
use log::{debug, warn};
use meshfem_sparse::cg::{
    ConjugateGradient, IdentityOperator, JacobiPreconditioner, LinearOperator, RelativeResidualCriterion,
    SolveErrorKind,
};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preconditioner {
    None,
    /// Diagonal scaling by the inverse of the matrix diagonal.
    Jacobi,
}

impl Default for Preconditioner {
    fn default() -> Self {
        Self::Jacobi
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Relative residual tolerance, `||r|| <= tolerance * ||b||`.
    pub tolerance: f64,
    /// Maximum number of iterations. Defaults to the number of free degrees of freedom.
    pub max_iter: Option<usize>,
    pub preconditioner: Preconditioner,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iter: None,
            preconditioner: Preconditioner::default(),
        }
    }
}

impl SolverSettings {
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }

    pub fn with_preconditioner(self, preconditioner: Preconditioner) -> Self {
        Self { preconditioner, ..self }
    }
}

/// The starting point of the iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialGuess {
    /// The same value at every free degree of freedom.
    Uniform(f64),
    /// A vector with one entry per degree of freedom, free and constrained. Entries at
    /// constrained degrees of freedom are ignored.
    Vector(DVector<f64>),
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self::Uniform(0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutput {
    /// Values at all degrees of freedom, with constrained values inserted exactly.
    pub solution: DVector<f64>,
    pub iterations: usize,
    pub relative_residual: f64,
}

/// Why the iteration stopped without converging.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConvergenceFailure {
    MaxIterationsReached { max_iter: usize },
    /// The matrix is not positive definite on the free degrees of freedom.
    IndefiniteOperator,
    IndefinitePreconditioner,
    /// The operator or preconditioner could not be applied.
    Breakdown(String),
}

impl Display for ConvergenceFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterationsReached { max_iter } => write!(f, "maximum number of iterations ({}) reached", max_iter),
            Self::IndefiniteOperator => write!(f, "operator is not positive definite"),
            Self::IndefinitePreconditioner => write!(f, "preconditioner is not positive definite"),
            Self::Breakdown(message) => write!(f, "{}", message),
        }
    }
}

impl From<SolveErrorKind> for ConvergenceFailure {
    fn from(kind: SolveErrorKind) -> Self {
        match kind {
            SolveErrorKind::MaxIterationsReached { max_iter } => Self::MaxIterationsReached { max_iter },
            SolveErrorKind::IndefiniteOperator => Self::IndefiniteOperator,
            SolveErrorKind::IndefinitePreconditioner => Self::IndefinitePreconditioner,
            other => Self::Breakdown(other.to_string()),
        }
    }
}

/// The solver did not reach the requested tolerance.
///
/// This error is recoverable: the last iterate is a complete solution vector (constrained values
/// included) that callers may inspect or export.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceError {
    pub last_iterate: DVector<f64>,
    pub relative_residual: f64,
    pub iterations: usize,
    pub reason: ConvergenceFailure,
}

impl Display for ConvergenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solver did not converge after {} iterations (relative residual {:e}): {}",
            self.iterations, self.relative_residual, self.reason
        )
    }
}

impl std::error::Error for ConvergenceError {}

/// Solves the constrained system with conjugate gradient.
///
/// # Panics
///
/// Panics if an [`InitialGuess::Vector`] does not have one entry per degree of freedom.
pub fn solve(
    system: &ConstrainedSystem,
    initial_guess: &InitialGuess,
    settings: &SolverSettings,
) -> Result<SolveOutput, ConvergenceError> {
    let num_free = system.num_free_dofs();
    let mut x = match initial_guess {
        InitialGuess::Uniform(value) => DVector::repeat(num_free, *value),
        InitialGuess::Vector(full) => {
            assert_eq!(
                full.len(),
                system.num_dofs(),
                "Initial guess must have one entry per degree of freedom"
            );
            system.restrict(full)
        }
    };

    if num_free == 0 {
        debug!("No free degrees of freedom, nothing to solve");
        return Ok(SolveOutput {
            solution: system.expand(&x),
            iterations: 0,
            relative_residual: 0.0,
        });
    }

    let preconditioner: Box<dyn LinearOperator> = match settings.preconditioner {
        Preconditioner::None => Box::new(IdentityOperator),
        Preconditioner::Jacobi => match JacobiPreconditioner::from_csr(system.matrix()) {
            Ok(jacobi) => Box::new(jacobi),
            Err(err) => {
                warn!("Cannot build Jacobi preconditioner: {}", err);
                return Err(ConvergenceError {
                    last_iterate: system.expand(&x),
                    relative_residual: f64::NAN,
                    iterations: 0,
                    reason: ConvergenceFailure::Breakdown(format!("cannot build Jacobi preconditioner: {}", err)),
                });
            }
        },
    };

    let max_iter = settings.max_iter.unwrap_or(num_free);
    debug!(
        "Solving for {} free degrees of freedom (tolerance {:e}, at most {} iterations, {:?} preconditioner)",
        num_free, settings.tolerance, max_iter, settings.preconditioner
    );

    let result = ConjugateGradient::new()
        .with_operator(system.matrix())
        .with_preconditioner(&*preconditioner)
        .with_stopping_criterion(RelativeResidualCriterion::new(settings.tolerance))
        .with_max_iter(max_iter)
        .solve_with_guess(system.rhs(), &mut x);

    match result {
        Ok(output) => Ok(SolveOutput {
            solution: system.expand(&x),
            iterations: output.num_iterations,
            relative_residual: output.relative_residual(),
        }),
        Err(err) => {
            warn!("Solver failed: {}", err);
            Err(ConvergenceError {
                last_iterate: system.expand(&x),
                relative_residual: err.output.relative_residual(),
                iterations: err.output.num_iterations,
                reason: err.kind.into(),
            })
        }
    }
}
