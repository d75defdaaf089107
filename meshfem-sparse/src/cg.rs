//! Preconditioned Conjugate Gradient for symmetric positive definite systems.
//!
//! The solver is configured with a builder:
//!
//! ```
//! # use nalgebra::{DMatrix, DVector};
//! # use meshfem_sparse::cg::{ConjugateGradient, RelativeResidualCriterion};
//! let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
//! let b = DVector::from_column_slice(&[1.0, 2.0]);
//! let mut x = DVector::zeros(2);
//! let output = ConjugateGradient::new()
//!     .with_operator(&a)
//!     .with_stopping_criterion(RelativeResidualCriterion::new(1e-12))
//!     .solve_with_guess(&b, &mut x)
//!     .unwrap();
//! assert!(output.num_iterations <= 2);
//! ```
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;

/// A linear map `y = A x` on vectors of a fixed length.
pub trait LinearOperator {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>>;
}

impl<'a, A> LinearOperator for &'a A
where
    A: ?Sized + LinearOperator,
{
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator>::apply(self, y, x)
    }
}

fn check_operator_dimensions(nrows: usize, ncols: usize, y: &DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
    if nrows != y.len() || ncols != x.len() {
        return Err(format!(
            "operator of size {}x{} cannot map a vector of length {} into a vector of length {}",
            nrows,
            ncols,
            x.len(),
            y.len()
        )
        .into());
    }
    Ok(())
}

impl LinearOperator for DMatrix<f64> {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
        check_operator_dimensions(self.nrows(), self.ncols(), y, x)?;
        y.gemv(1.0, self, x, 0.0);
        Ok(())
    }
}

impl LinearOperator for CsrMatrix<f64> {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
        check_operator_dimensions(self.nrows(), self.ncols(), y, x)?;
        for (y_i, row) in y.iter_mut().zip(self.row_iter()) {
            *y_i = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(&j, a_ij)| a_ij * x[j])
                .sum();
        }
        Ok(())
    }
}

pub struct IdentityOperator;

impl LinearOperator for IdentityOperator {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
        y.copy_from(x);
        Ok(())
    }
}

/// Diagonal (Jacobi) preconditioner `P = diag(A)^{-1}`.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inverse_diagonal: DVector<f64>,
}

impl JacobiPreconditioner {
    /// Builds the preconditioner from the diagonal of a square sparse matrix.
    ///
    /// Returns an error if a diagonal entry is missing or not strictly positive, in which case
    /// the matrix cannot be symmetric positive definite.
    pub fn from_csr(matrix: &CsrMatrix<f64>) -> Result<Self, Box<dyn Error>> {
        if matrix.nrows() != matrix.ncols() {
            return Err("Jacobi preconditioner requires a square matrix".into());
        }
        let mut inverse_diagonal = DVector::zeros(matrix.nrows());
        for (i, row) in matrix.row_iter().enumerate() {
            let diagonal = row
                .col_indices()
                .binary_search(&i)
                .map(|idx| row.values()[idx])
                .unwrap_or(0.0);
            if !(diagonal > 0.0) {
                return Err(format!("diagonal entry {} is not positive ({})", i, diagonal).into());
            }
            inverse_diagonal[i] = 1.0 / diagonal;
        }
        Ok(Self { inverse_diagonal })
    }
}

impl LinearOperator for JacobiPreconditioner {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), Box<dyn Error>> {
        check_operator_dimensions(self.inverse_diagonal.len(), self.inverse_diagonal.len(), y, x)?;
        y.copy_from(x);
        y.component_mul_assign(&self.inverse_diagonal);
        Ok(())
    }
}

pub trait CgStoppingCriterion {
    fn has_converged(
        &self,
        b_norm: f64,
        iteration: usize,
        approx_residual: &DVector<f64>,
    ) -> Result<bool, SolveErrorKind>;
}

/// Relative residual tolerance ||r|| <= tol * ||b||.
///
/// Note that we use the *approximate* residual given by Conjugate-Gradient. For ill-conditioned
/// problems, it is possible that CG's residual converges, but the real residual does not.
#[derive(Debug, Clone, Copy)]
pub struct RelativeResidualCriterion {
    tol: f64,
}

impl RelativeResidualCriterion {
    pub fn new(tol: f64) -> Self {
        Self { tol }
    }

    pub fn tolerance(&self) -> f64 {
        self.tol
    }
}

impl Default for RelativeResidualCriterion {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl CgStoppingCriterion for RelativeResidualCriterion {
    fn has_converged(
        &self,
        b_norm: f64,
        _iteration: usize,
        approx_residual: &DVector<f64>,
    ) -> Result<bool, SolveErrorKind> {
        let r_approx_norm = approx_residual.norm();
        Ok(r_approx_norm <= self.tol * b_norm)
    }
}

#[derive(Debug)]
pub struct ConjugateGradient<A, P, Criterion> {
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl ConjugateGradient<(), IdentityOperator, ()> {
    pub fn new() -> Self {
        Self {
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl Default for ConjugateGradient<(), IdentityOperator, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Criterion> ConjugateGradient<(), P, Criterion> {
    pub fn with_operator<A>(self, operator: A) -> ConjugateGradient<A, P, Criterion> {
        ConjugateGradient {
            operator,
            preconditioner: self.preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<A, P2, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<A, P> ConjugateGradient<A, P, ()> {
    pub fn with_stopping_criterion<Criterion>(self, stopping_criterion: Criterion) -> ConjugateGradient<A, P, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error>),
    PreconditionerError(Box<dyn Error>),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "Error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "Error applying preconditioner: {}", err),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached", max_iter)
            }
        }
    }
}

#[derive(Debug)]
pub struct SolveError {
    pub output: CgOutput,
    pub kind: SolveErrorKind,
}

impl SolveError {
    fn new(output: CgOutput, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations (relative residual {:e}): {}",
            self.output.num_iterations,
            self.output.relative_residual(),
            self.kind
        )
    }
}

impl Error for SolveError {}

#[derive(Debug, Clone, PartialEq)]
pub struct CgOutput {
    /// Number of iterations of the solver.
    ///
    /// Corresponds to the number of updates made to the (initial) solution vector.
    pub num_iterations: usize,
    /// Norm of the approximate residual maintained by the iteration.
    pub residual_norm: f64,
    /// Norm of the right-hand side.
    pub rhs_norm: f64,
}

impl CgOutput {
    /// `||r|| / ||b||`, or zero when the right-hand side vanishes.
    pub fn relative_residual(&self) -> f64 {
        if self.rhs_norm == 0.0 {
            0.0
        } else {
            self.residual_norm / self.rhs_norm
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion>
where
    A: LinearOperator,
    P: LinearOperator,
    Criterion: CgStoppingCriterion,
{
    /// Solves `A x = b`, using the contents of `x` as the initial guess.
    ///
    /// On failure, `x` holds the last iterate.
    ///
    /// # Panics
    ///
    /// Panics if `b` and `x` have different lengths.
    #[allow(non_snake_case)]
    pub fn solve_with_guess(&self, b: &DVector<f64>, x: &mut DVector<f64>) -> Result<CgOutput, SolveError> {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len(), "right-hand side and solution must have the same length");

        let n = x.len();
        let b_norm = b.norm();
        let mut output = CgOutput {
            num_iterations: 0,
            residual_norm: 0.0,
            rhs_norm: b_norm,
        };

        if b_norm == 0.0 {
            x.fill(0.0);
            return Ok(output);
        }

        let mut r = DVector::zeros(n);
        let mut z = DVector::zeros(n);
        let mut Ap = DVector::zeros(n);

        // r = b - Ax
        if let Err(err) = self.operator.apply(&mut r, x) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        r.axpy(1.0, b, -1.0);
        output.residual_norm = r.norm();

        // z = Pr
        if let Err(err) = self.preconditioner.apply(&mut z, &r) {
            return Err(SolveError::new(output, PreconditionerError(err)));
        }

        let mut p = z.clone();
        let mut zTr = z.dot(&r);

        loop {
            let has_converged = match self
                .stopping_criterion
                .has_converged(b_norm, output.num_iterations, &r)
            {
                Ok(converged) => converged,
                Err(kind) => return Err(SolveError::new(output, kind)),
            };

            if has_converged {
                break;
            } else if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
                }
            }

            // Ap = A * p
            if let Err(err) = self.operator.apply(&mut Ap, &p) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            let pAp = p.dot(&Ap);

            if !(pAp > 0.0) {
                return Err(SolveError::new(output, IndefiniteOperator));
            }
            if !(zTr > 0.0) {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }

            let alpha = zTr / pAp;
            // x <- x + alpha * p
            x.axpy(alpha, &p, 1.0);
            // r <- r - alpha * Ap
            r.axpy(-alpha, &Ap, 1.0);

            output.num_iterations += 1;
            output.residual_norm = r.norm();

            // z <- P r
            if let Err(err) = self.preconditioner.apply(&mut z, &r) {
                return Err(SolveError::new(output, PreconditionerError(err)));
            }
            let zTr_next = z.dot(&r);
            let beta = zTr_next / zTr;

            // p <- z + beta * p
            p.axpy(1.0, &z, beta);

            zTr = zTr_next;
        }

        debug!(
            "CG converged after {} iterations with relative residual {:e}",
            output.num_iterations,
            output.relative_residual()
        );
        Ok(output)
    }
}
