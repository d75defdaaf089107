//! Reading and writing meshes and solutions.
pub mod export;
pub mod tetgen;
pub mod vtk;
