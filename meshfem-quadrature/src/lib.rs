//! Quadrature rules for finite element reference domains.
//!
//! All rules in this crate are defined on *unit* reference domains:
//!
//! - the unit interval `[0, 1]`,
//! - the unit square `[0, 1]^2` and the unit cube `[0, 1]^3`,
//! - the unit triangle `{ x, y >= 0, x + y <= 1 }` and the unit tetrahedron
//!   `{ x, y, z >= 0, x + y + z <= 1 }`.
//!
//! Rules are characterized by their *strength*: a rule of strength `k` integrates every
//! polynomial of total degree at most `k` exactly (up to floating point round-off).
//! Simplex rules are obtained by collapsing tensor product Gauss rules (the conical product
//! construction of Stroud), which gives rules of arbitrary strength with positive weights
//! and points strictly inside the domain.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule, given as a pair of weights and points.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Largest strength for which rules are provided.
///
/// The underlying Gauss rules are available for any number of points, but there is no use
/// for very high strengths in low order finite element assembly.
pub const MAX_STRENGTH: usize = 30;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, x)| w * f(x)).sum()
}

/// The number of Gauss points per direction needed to integrate a univariate polynomial of
/// the given degree exactly.
pub(crate) fn gauss_points_for_degree(degree: usize) -> usize {
    // n Gauss points integrate polynomials of degree 2n - 1 exactly
    degree / 2 + 1
}
