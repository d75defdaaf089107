use super::{check_buffers, nodes_matrix, populate_multilinear_basis, populate_multilinear_gradients, ReferenceFiniteElement};
use nalgebra::DMatrix;

/// Corners of the unit square in counter-clockwise order.
const QUAD4_NODES: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Bilinear basis functions on the unit square.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4Element;

impl ReferenceFiniteElement for Quad4Element {
    fn reference_dim(&self) -> usize {
        2
    }

    fn num_nodes(&self) -> usize {
        4
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&QUAD4_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 2, basis_values.len());
        populate_multilinear_basis(basis_values, xi, &QUAD4_NODES);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_multilinear_gradients(gradients, xi, &QUAD4_NODES);
    }
}
