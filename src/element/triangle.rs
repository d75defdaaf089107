use super::{
    check_buffers, nodes_matrix, populate_linear_simplex_basis, populate_linear_simplex_gradients,
    populate_quadratic_simplex_basis, populate_quadratic_simplex_gradients, ReferenceFiniteElement,
};
use nalgebra::DMatrix;

const TRI3_NODES: [[f64; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];

const TRI6_NODES: [[f64; 2]; 6] = [
    [0.0, 0.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [0.5, 0.0],
    [0.5, 0.5],
    [0.0, 0.5],
];

/// Vertex pairs of the edge nodes of the quadratic triangle, in local node order.
const TRI6_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];

/// Linear basis functions on the unit triangle with vertices (0, 0), (1, 0), (0, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3Element;

impl ReferenceFiniteElement for Tri3Element {
    fn reference_dim(&self) -> usize {
        2
    }

    fn num_nodes(&self) -> usize {
        3
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&TRI3_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 2, basis_values.len());
        populate_linear_simplex_basis(basis_values, xi);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_linear_simplex_gradients(gradients, 2);
    }
}

/// Quadratic basis functions on the unit triangle.
///
/// Nodes 0-2 are the vertices of [`Tri3Element`], nodes 3-5 the midpoints of the edges
/// (0, 1), (1, 2) and (2, 0).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri6Element;

impl ReferenceFiniteElement for Tri6Element {
    fn reference_dim(&self) -> usize {
        2
    }

    fn num_nodes(&self) -> usize {
        6
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&TRI6_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 2, basis_values.len());
        populate_quadratic_simplex_basis(basis_values, xi, &TRI6_EDGES);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_quadratic_simplex_gradients(gradients, xi, &TRI6_EDGES);
    }
}
