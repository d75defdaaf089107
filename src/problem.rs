//! The Laplace pipeline from a mesh to a solution field.
//!
//! ```
//! use meshfem::boundary::BoundaryConditions;
//! use meshfem::mesh::procedural::create_rectangular_quad_mesh;
//! use meshfem::problem::LaplaceProblem;
//!
//! let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 3).unwrap();
//! let mut bcs = BoundaryConditions::new();
//! bcs.fix(1, 0, 0.0).unwrap();
//! bcs.fix(8, 0, 1.0).unwrap();
//! let solution = LaplaceProblem::new(&mesh, bcs).solve().unwrap();
//! assert_eq!(solution.field.value("solution", 8, 0).unwrap(), 1.0);
//! ```
use crate::assembly::{CsrAssembler, SourceTerm};
use crate::basis::Basis;
use crate::boundary::{self, BoundaryConditions};
use crate::error::{Error, FieldError};
use crate::field::{Field, VariableKind, SOLUTION_VARIABLE};
use crate::mesh::Mesh;
use crate::solver::{self, InitialGuess, SolverSettings};
use log::info;
use nalgebra::DVector;

/// A solved Laplace (or Poisson) problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Geometric field extended with the [`SOLUTION_VARIABLE`].
    pub field: Field,
    pub iterations: usize,
    pub relative_residual: f64,
}

#[derive(Debug, Clone)]
pub struct LaplaceProblem<'a> {
    mesh: &'a Mesh,
    boundary_conditions: BoundaryConditions,
    settings: SolverSettings,
    initial_guess: InitialGuess,
    source: Option<SourceTerm>,
}

impl<'a> LaplaceProblem<'a> {
    pub fn new(mesh: &'a Mesh, boundary_conditions: BoundaryConditions) -> Self {
        Self {
            mesh,
            boundary_conditions,
            settings: SolverSettings::default(),
            initial_guess: InitialGuess::default(),
            source: None,
        }
    }

    pub fn with_settings(self, settings: SolverSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_initial_guess(self, initial_guess: InitialGuess) -> Self {
        Self { initial_guess, ..self }
    }

    /// Solves the Poisson equation `-Δu = f` instead of the Laplace equation.
    pub fn with_source(self, source: SourceTerm) -> Self {
        Self {
            source: Some(source),
            ..self
        }
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions {
        &self.boundary_conditions
    }

    /// Assembles, constrains and solves the system.
    ///
    /// A [`ConvergenceError`](crate::solver::ConvergenceError) is returned as
    /// [`Error::Convergence`] and still carries the last iterate, which can be turned into a
    /// field with [`solution_field`].
    pub fn solve(&self) -> Result<Solution, Error> {
        let mesh = self.mesh;
        let basis = Basis::new(mesh.element_type())?;
        let geometry = Field::geometric(mesh);
        let system = CsrAssembler::default().assemble(mesh, &basis, &geometry, self.source.as_ref())?;
        let constrained = boundary::apply(&system, mesh, &self.boundary_conditions)?;
        info!(
            "Solving for {} of {} degrees of freedom ({} constrained)",
            constrained.num_free_dofs(),
            constrained.num_dofs(),
            self.boundary_conditions.len()
        );

        let output = solver::solve(&constrained, &self.initial_guess, &self.settings)?;
        info!(
            "Solution converged after {} iterations (relative residual {:e})",
            output.iterations, output.relative_residual
        );
        Ok(Solution {
            field: solution_field(mesh, &output.solution)?,
            iterations: output.iterations,
            relative_residual: output.relative_residual,
        })
    }
}

/// Creates a geometric field for the mesh with a scalar [`SOLUTION_VARIABLE`] holding the given
/// values, one per node.
pub fn solution_field(mesh: &Mesh, values: &DVector<f64>) -> Result<Field, FieldError> {
    let mut field = Field::geometric(mesh);
    field
        .add_variable(SOLUTION_VARIABLE, VariableKind::Dependent, 1)?
        .set_from_dof_vector(SOLUTION_VARIABLE, values)?;
    Ok(field)
}
