//! Reference finite elements and their Lagrange basis functions.
//!
//! All elements are defined on unit reference domains. Simplices live on
//! `{ xi_i >= 0, sum_i xi_i <= 1 }` and tensor product elements on `[0, 1]^d`. The local node
//! ordering of every element coincides with the corresponding VTK cell, so connectivity can be
//! exported without reordering.
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

mod hexahedron;
mod quadrilateral;
mod tetrahedron;
mod triangle;

pub use hexahedron::Hex8Element;
pub use quadrilateral::Quad4Element;
pub use tetrahedron::{Tet10Element, Tet4Element};
pub use triangle::{Tri3Element, Tri6Element};

/// The shape of a reference element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    Simplex,
    TensorProduct,
}

/// The supported element types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    /// Linear triangle.
    Tri3,
    /// Quadratic triangle.
    Tri6,
    /// Bilinear quadrilateral.
    Quad4,
    /// Linear tetrahedron.
    Tet4,
    /// Quadratic tetrahedron.
    Tet10,
    /// Trilinear hexahedron.
    Hex8,
}

/// Swapping the second and third vertex of a simplex flips its orientation. For quadratic
/// simplices the edge nodes follow the vertices.
const TRI3_REORIENTATION: [usize; 3] = [0, 2, 1];
const TRI6_REORIENTATION: [usize; 6] = [0, 2, 1, 5, 4, 3];
const TET4_REORIENTATION: [usize; 4] = [0, 2, 1, 3];
const TET10_REORIENTATION: [usize; 10] = [0, 2, 1, 3, 6, 5, 4, 7, 9, 8];

impl ElementType {
    pub const ALL: [ElementType; 6] = [Self::Tri3, Self::Tri6, Self::Quad4, Self::Tet4, Self::Tet10, Self::Hex8];

    /// Infers the element type from the spatial dimension and the number of nodes per element.
    pub fn from_dim_and_node_count(dim: usize, nodes_per_element: usize) -> Option<Self> {
        match (dim, nodes_per_element) {
            (2, 3) => Some(Self::Tri3),
            (2, 6) => Some(Self::Tri6),
            (2, 4) => Some(Self::Quad4),
            (3, 4) => Some(Self::Tet4),
            (3, 10) => Some(Self::Tet10),
            (3, 8) => Some(Self::Hex8),
            _ => None,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.reference_element().num_nodes()
    }

    pub fn reference_dim(&self) -> usize {
        self.reference_element().reference_dim()
    }

    /// Number of corner vertices. The remaining nodes (if any) are edge nodes.
    pub fn num_vertices(&self) -> usize {
        match self {
            Self::Tri3 | Self::Tri6 => 3,
            Self::Quad4 | Self::Tet4 | Self::Tet10 => 4,
            Self::Hex8 => 8,
        }
    }

    /// Polynomial order of the basis in each parametric direction.
    pub fn order(&self) -> usize {
        match self {
            Self::Tri6 | Self::Tet10 => 2,
            _ => 1,
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Self::Tri3 | Self::Tri6 | Self::Tet4 | Self::Tet10 => Topology::Simplex,
            Self::Quad4 | Self::Hex8 => Topology::TensorProduct,
        }
    }

    /// Measure (area or volume) of the reference domain.
    pub fn reference_measure(&self) -> f64 {
        match self {
            Self::Tri3 | Self::Tri6 => 0.5,
            Self::Tet4 | Self::Tet10 => 1.0 / 6.0,
            Self::Quad4 | Self::Hex8 => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tri3 => "tri3",
            Self::Tri6 => "tri6",
            Self::Quad4 => "quad4",
            Self::Tet4 => "tet4",
            Self::Tet10 => "tet10",
            Self::Hex8 => "hex8",
        }
    }

    pub fn reference_element(&self) -> &'static dyn ReferenceFiniteElement {
        match self {
            Self::Tri3 => &Tri3Element,
            Self::Tri6 => &Tri6Element,
            Self::Quad4 => &Quad4Element,
            Self::Tet4 => &Tet4Element,
            Self::Tet10 => &Tet10Element,
            Self::Hex8 => &Hex8Element,
        }
    }

    /// The local node permutation that reverses the orientation of an element, if any.
    ///
    /// The permuted connectivity is given by `new[i] = old[permutation[i]]`. Tensor product
    /// elements have no such permutation: a mis-wound quadrilateral or hexahedron cannot be
    /// repaired without knowing how it was constructed.
    pub fn reorientation(&self) -> Option<&'static [usize]> {
        match self {
            Self::Tri3 => Some(&TRI3_REORIENTATION),
            Self::Tri6 => Some(&TRI6_REORIENTATION),
            Self::Tet4 => Some(&TET4_REORIENTATION),
            Self::Tet10 => Some(&TET10_REORIENTATION),
            Self::Quad4 | Self::Hex8 => None,
        }
    }

    /// Reference points at which the orientation of an element is checked: the corner
    /// vertices and the centroid of the vertices.
    pub fn orientation_check_points(&self) -> Vec<Vec<f64>> {
        let nodes = self.reference_element().reference_nodes();
        let num_vertices = self.num_vertices();
        let mut points: Vec<Vec<f64>> = (0..num_vertices)
            .map(|i| nodes.column(i).iter().copied().collect())
            .collect();
        let centroid = nodes.columns(0, num_vertices).column_mean();
        points.push(centroid.iter().copied().collect());
        points
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A finite element defined on a fixed reference domain.
///
/// Basis gradients are stored column-wise: column `i` of the gradient matrix holds the
/// gradient of basis function `i` with respect to the reference coordinates.
pub trait ReferenceFiniteElement {
    fn reference_dim(&self) -> usize;

    fn num_nodes(&self) -> usize;

    /// The reference coordinates of the nodes, stored as the columns of a
    /// `reference_dim x num_nodes` matrix.
    fn reference_nodes(&self) -> DMatrix<f64>;

    /// Evaluates all basis functions at the given reference point.
    ///
    /// # Panics
    ///
    /// Panics if `basis_values.len() != self.num_nodes()` or if the point does not have
    /// dimension `self.reference_dim()`.
    fn populate_basis(&self, basis_values: &mut [f64], xi: &[f64]);

    /// Evaluates the gradients of all basis functions at the given reference point.
    ///
    /// # Panics
    ///
    /// Panics if `gradients` is not a `reference_dim x num_nodes` matrix or if the point does
    /// not have dimension `self.reference_dim()`.
    fn populate_basis_gradients(&self, gradients: &mut DMatrix<f64>, xi: &[f64]);
}

fn check_buffers(element: &dyn ReferenceFiniteElement, xi: &[f64], nrows: usize, ncols: usize) {
    assert_eq!(xi.len(), element.reference_dim(), "Reference point has wrong dimension");
    assert_eq!(nrows, element.reference_dim(), "Buffer has wrong number of rows");
    assert_eq!(ncols, element.num_nodes(), "Buffer has wrong number of columns");
}

/// Barycentric coordinates `(1 - sum xi, xi_1, ..., xi_d)` of a point on the unit simplex.
fn barycentric_coordinates(xi: &[f64]) -> Vec<f64> {
    let mut lambda = Vec::with_capacity(xi.len() + 1);
    lambda.push(1.0 - xi.iter().sum::<f64>());
    lambda.extend_from_slice(xi);
    lambda
}

/// Partial derivative of barycentric coordinate `k` in reference direction `d`.
fn barycentric_derivative(k: usize, d: usize) -> f64 {
    if k == 0 {
        -1.0
    } else if k == d + 1 {
        1.0
    } else {
        0.0
    }
}

fn populate_linear_simplex_basis(basis_values: &mut [f64], xi: &[f64]) {
    basis_values.copy_from_slice(&barycentric_coordinates(xi));
}

fn populate_linear_simplex_gradients(gradients: &mut DMatrix<f64>, dim: usize) {
    for k in 0..=dim {
        for d in 0..dim {
            gradients[(d, k)] = barycentric_derivative(k, d);
        }
    }
}

/// Quadratic simplex basis: `L_i (2 L_i - 1)` for vertices and `4 L_i L_j` for the edge
/// between vertices `i` and `j`.
fn populate_quadratic_simplex_basis(basis_values: &mut [f64], xi: &[f64], edges: &[[usize; 2]]) {
    let lambda = barycentric_coordinates(xi);
    let num_vertices = lambda.len();
    for (i, &l) in lambda.iter().enumerate() {
        basis_values[i] = l * (2.0 * l - 1.0);
    }
    for (e, &[i, j]) in edges.iter().enumerate() {
        basis_values[num_vertices + e] = 4.0 * lambda[i] * lambda[j];
    }
}

fn populate_quadratic_simplex_gradients(gradients: &mut DMatrix<f64>, xi: &[f64], edges: &[[usize; 2]]) {
    let lambda = barycentric_coordinates(xi);
    let num_vertices = lambda.len();
    for d in 0..xi.len() {
        for (i, &l) in lambda.iter().enumerate() {
            gradients[(d, i)] = (4.0 * l - 1.0) * barycentric_derivative(i, d);
        }
        for (e, &[i, j]) in edges.iter().enumerate() {
            gradients[(d, num_vertices + e)] =
                4.0 * (lambda[i] * barycentric_derivative(j, d) + lambda[j] * barycentric_derivative(i, d));
        }
    }
}

/// The 1D linear Lagrange polynomial associated with the corner coordinate `c` (0 or 1).
fn linear_lagrange(c: f64, t: f64) -> f64 {
    if c == 0.0 {
        1.0 - t
    } else {
        t
    }
}

fn linear_lagrange_derivative(c: f64) -> f64 {
    if c == 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Multilinear basis on `[0, 1]^d` with the given corner nodes.
fn populate_multilinear_basis<const D: usize>(basis_values: &mut [f64], xi: &[f64], corners: &[[f64; D]]) {
    for (phi, corner) in basis_values.iter_mut().zip(corners) {
        *phi = corner
            .iter()
            .zip(xi)
            .map(|(&c, &t)| linear_lagrange(c, t))
            .product();
    }
}

fn populate_multilinear_gradients<const D: usize>(gradients: &mut DMatrix<f64>, xi: &[f64], corners: &[[f64; D]]) {
    for (i, corner) in corners.iter().enumerate() {
        for d in 0..D {
            gradients[(d, i)] = (0..D)
                .map(|e| {
                    if e == d {
                        linear_lagrange_derivative(corner[e])
                    } else {
                        linear_lagrange(corner[e], xi[e])
                    }
                })
                .product();
        }
    }
}

fn nodes_matrix<const D: usize>(nodes: &[[f64; D]]) -> DMatrix<f64> {
    DMatrix::from_fn(D, nodes.len(), |i, j| nodes[j][i])
}

/// The Jacobian `J = X G^T` of the map from reference to physical coordinates.
///
/// `coords` holds the physical node coordinates as columns and `gradients` the reference basis
/// gradients as columns.
#[allow(non_snake_case)]
pub fn reference_jacobian(coords: &DMatrix<f64>, gradients: &DMatrix<f64>) -> DMatrix<f64> {
    let X = coords;
    let G = gradients;
    X * G.transpose()
}

/// The smallest Jacobian determinant over the orientation check points of an element with
/// the given physical node coordinates.
///
/// Returns NaN if any determinant is NaN. Returns NaN as well if the spatial dimension does not
/// match the reference dimension, in which case the determinant is undefined.
pub fn min_jacobian_determinant(element_type: ElementType, coords: &DMatrix<f64>) -> f64 {
    let element = element_type.reference_element();
    let dim = element.reference_dim();
    if coords.nrows() != dim || coords.ncols() != element.num_nodes() {
        return f64::NAN;
    }
    let mut gradients = DMatrix::zeros(dim, element.num_nodes());
    let mut min_det = f64::INFINITY;
    for xi in element_type.orientation_check_points() {
        element.populate_basis_gradients(&mut gradients, &xi);
        let det = reference_jacobian(coords, &gradients).determinant();
        if det.is_nan() {
            return det;
        }
        min_det = min_det.min(det);
    }
    min_det
}
