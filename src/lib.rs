//! Mesh ingestion, finite element assembly of the Laplace operator, Dirichlet constraints,
//! conjugate gradient solution and export of the result.
//!
//! A run reads (or generates) a [`Mesh`](mesh::Mesh), assembles the stiffness matrix with a
//! [`Basis`](basis::Basis), eliminates the [`BoundaryConditions`](boundary::BoundaryConditions),
//! solves the reduced system and writes the solution [`Field`](field::Field) to text records or
//! a VTK file. [`problem::LaplaceProblem`] wires these steps together.
pub mod assembly;
pub mod basis;
pub mod boundary;
pub mod element;
pub mod error;
pub mod field;
pub mod io;
pub mod mesh;
pub mod problem;
pub mod solver;

pub use error::Error;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;

pub mod quadrature {
    pub use meshfem_quadrature::*;
}
