//! Element bases paired with quadrature rules.
use crate::element::{ElementType, ReferenceFiniteElement, Topology};
use crate::error::BasisError;
use log::debug;
use meshfem_quadrature::{simplex, tensor};
use nalgebra::{DMatrix, DVector};

/// Tolerance for the check that quadrature weights sum to the reference measure.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-12;

/// A quadrature point together with the basis functions tabulated at that point.
#[derive(Debug, Clone, Copy)]
pub struct QuadraturePoint<'a> {
    pub weight: f64,
    pub point: &'a [f64],
    /// Basis function values, one per node.
    pub values: &'a DVector<f64>,
    /// Reference gradients, one column per node.
    pub gradients: &'a DMatrix<f64>,
}

/// The basis of an element type together with a quadrature rule for its reference element.
///
/// A `Basis` is shared by all elements of a mesh. Basis values and gradients are tabulated at
/// the quadrature points when the basis is constructed.
#[derive(Debug, Clone)]
pub struct Basis {
    element_type: ElementType,
    weights: Vec<f64>,
    // Flattened points, with stride given by the reference dimension
    points: Vec<f64>,
    values: Vec<DVector<f64>>,
    gradients: Vec<DMatrix<f64>>,
}

impl Basis {
    /// Creates a basis with a quadrature rule that is exact for the stiffness integrand.
    ///
    /// The stiffness integrand of an element of order `p` has degree `2 (p - 1)` on affine
    /// simplices and degree at most `2 p` per direction on multilinear boxes. The rule has
    /// strength `2 p` for boxes and `2 p + 1` for simplices.
    pub fn new(element_type: ElementType) -> Result<Self, BasisError> {
        let strength = Self::default_strength(element_type);
        let (weights, points) = match (element_type.topology(), element_type.reference_dim()) {
            (Topology::Simplex, 2) => flatten(simplex::triangle_rule_with_strength(strength)?),
            (Topology::Simplex, _) => flatten(simplex::tetrahedron_rule_with_strength(strength)?),
            (Topology::TensorProduct, 2) => flatten(tensor::quadrilateral_rule_with_strength(strength)?),
            (Topology::TensorProduct, _) => flatten(tensor::hexahedron_rule_with_strength(strength)?),
        };
        debug!(
            "Using {}-point quadrature of strength {} for {} elements",
            weights.len(),
            strength,
            element_type
        );
        Self::from_flat_rule(element_type, weights, points)
    }

    /// Creates a basis with a custom quadrature rule.
    ///
    /// Fails if any point does not have the dimension of the reference element, or if the
    /// weights do not sum to the measure of the reference element.
    pub fn with_quadrature(
        element_type: ElementType,
        weights: Vec<f64>,
        points: Vec<Vec<f64>>,
    ) -> Result<Self, BasisError> {
        if weights.len() != points.len() {
            return Err(BasisError::RuleSize {
                weights: weights.len(),
                points: points.len(),
            });
        }
        let dim = element_type.reference_dim();
        if let Some(point) = points.iter().find(|point| point.len() != dim) {
            return Err(BasisError::PointDimension {
                expected: dim,
                found: point.len(),
            });
        }
        Self::from_flat_rule(element_type, weights, points.concat())
    }

    /// The strength of the rule chosen by [`Basis::new`].
    pub fn default_strength(element_type: ElementType) -> usize {
        let order = element_type.order();
        match element_type.topology() {
            Topology::Simplex => 2 * order + 1,
            Topology::TensorProduct => 2 * order,
        }
    }

    fn from_flat_rule(element_type: ElementType, weights: Vec<f64>, points: Vec<f64>) -> Result<Self, BasisError> {
        let expected = element_type.reference_measure();
        let actual: f64 = weights.iter().sum();
        if !((actual - expected).abs() <= WEIGHT_SUM_TOLERANCE) {
            return Err(BasisError::WeightSum { expected, actual });
        }

        let element = element_type.reference_element();
        let dim = element.reference_dim();
        let n = element.num_nodes();
        let mut values = Vec::with_capacity(weights.len());
        let mut gradients = Vec::with_capacity(weights.len());
        for xi in points.chunks_exact(dim) {
            let mut phi = DVector::zeros(n);
            let mut grad = DMatrix::zeros(dim, n);
            element.populate_basis(phi.as_mut_slice(), xi);
            element.populate_basis_gradients(&mut grad, xi);
            values.push(phi);
            gradients.push(grad);
        }

        Ok(Self {
            element_type,
            weights,
            points,
            values,
            gradients,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn num_nodes(&self) -> usize {
        self.element_type.num_nodes()
    }

    pub fn reference_dim(&self) -> usize {
        self.element_type.reference_dim()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.weights.len()
    }

    pub fn quadrature_weights(&self) -> &[f64] {
        &self.weights
    }

    /// The quadrature rule as an ordered sequence of `(point, weight)` pairs.
    pub fn quadrature_rule(&self) -> impl Iterator<Item = (&[f64], f64)> {
        self.points
            .chunks_exact(self.reference_dim())
            .zip(self.weights.iter().copied())
    }

    /// Iterates over quadrature points with tabulated basis values and gradients.
    pub fn quadrature_points(&self) -> impl Iterator<Item = QuadraturePoint<'_>> {
        self.points
            .chunks_exact(self.reference_dim())
            .zip(&self.weights)
            .zip(self.values.iter().zip(&self.gradients))
            .map(|((point, &weight), (values, gradients))| QuadraturePoint {
                weight,
                point,
                values,
                gradients,
            })
    }

    /// Evaluates basis values and reference gradients at an arbitrary reference point.
    ///
    /// # Panics
    ///
    /// Panics if the point does not have the dimension of the reference element.
    pub fn evaluate(&self, xi: &[f64]) -> (DVector<f64>, DMatrix<f64>) {
        let element = self.element_type.reference_element();
        let mut values = DVector::zeros(element.num_nodes());
        let mut gradients = DMatrix::zeros(element.reference_dim(), element.num_nodes());
        element.populate_basis(values.as_mut_slice(), xi);
        element.populate_basis_gradients(&mut gradients, xi);
        (values, gradients)
    }
}

fn flatten<const D: usize>((weights, points): meshfem_quadrature::Rule<D>) -> (Vec<f64>, Vec<f64>) {
    let points = points.into_iter().flatten().collect();
    (weights, points)
}
