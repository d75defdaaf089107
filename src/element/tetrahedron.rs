use super::{
    check_buffers, nodes_matrix, populate_linear_simplex_basis, populate_linear_simplex_gradients,
    populate_quadratic_simplex_basis, populate_quadratic_simplex_gradients, ReferenceFiniteElement,
};
use nalgebra::DMatrix;

const TET4_NODES: [[f64; 3]; 4] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

#[rustfmt::skip]
const TET10_NODES: [[f64; 3]; 10] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.5, 0.0, 0.0],
    [0.5, 0.5, 0.0],
    [0.0, 0.5, 0.0],
    [0.0, 0.0, 0.5],
    [0.5, 0.0, 0.5],
    [0.0, 0.5, 0.5],
];

/// Vertex pairs of the edge nodes of the quadratic tetrahedron, in local node order.
const TET10_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];

/// Linear basis functions on the unit tetrahedron with vertices
/// (0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet4Element;

impl ReferenceFiniteElement for Tet4Element {
    fn reference_dim(&self) -> usize {
        3
    }

    fn num_nodes(&self) -> usize {
        4
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&TET4_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 3, basis_values.len());
        populate_linear_simplex_basis(basis_values, xi);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_linear_simplex_gradients(gradients, 3);
    }
}

/// Quadratic basis functions on the unit tetrahedron.
///
/// Nodes 0-3 are the vertices of [`Tet4Element`], nodes 4-9 the midpoints of the edges
/// (0, 1), (1, 2), (2, 0), (0, 3), (1, 3) and (2, 3), which is the ordering used by VTK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet10Element;

impl ReferenceFiniteElement for Tet10Element {
    fn reference_dim(&self) -> usize {
        3
    }

    fn num_nodes(&self) -> usize {
        10
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&TET10_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 3, basis_values.len());
        populate_quadratic_simplex_basis(basis_values, xi, &TET10_EDGES);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_quadratic_simplex_gradients(gradients, xi, &TET10_EDGES);
    }
}
