//! Iterative solvers for the sparse systems produced by finite element assembly.
pub mod cg;
