use super::{check_buffers, nodes_matrix, populate_multilinear_basis, populate_multilinear_gradients, ReferenceFiniteElement};
use nalgebra::DMatrix;

/// Corners of the unit cube: the bottom face counter-clockwise, then the top face.
#[rustfmt::skip]
const HEX8_NODES: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Trilinear basis functions on the unit cube.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Hex8Element;

impl ReferenceFiniteElement for Hex8Element {
    fn reference_dim(&self) -> usize {
        3
    }

    fn num_nodes(&self) -> usize {
        8
    }

    fn reference_nodes(&self) -> DMatrix<f64> {
        nodes_matrix(&HEX8_NODES)
    }

    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]) {
        check_buffers(self, xi, 3, basis_values.len());
        populate_multilinear_basis(basis_values, xi, &HEX8_NODES);
    }

    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]) {
        check_buffers(self, xi, gradients.nrows(), gradients.ncols());
        populate_multilinear_gradients(gradients, xi, &HEX8_NODES);
    }
}
