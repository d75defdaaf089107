//! 2D and 3D quadrature rules formed by tensor products.
//!
//! For the unit square and the unit cube, quadrature rules can be constructed as tensor
//! products of 1D rules. A tensor product of `n`-point Gauss rules integrates every
//! polynomial of degree at most `2n - 1` *in each variable* exactly, which in particular
//! covers all polynomials of total degree `2n - 1`.

use crate::univariate::gauss_unit;
use crate::{gauss_points_for_degree, Error, Rule, MAX_STRENGTH};

/// A Gauss quadrature rule for the unit square.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided number of
/// points per dimension.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss_unit(n);
    let mut weights2d = Vec::with_capacity(n * n);
    let mut points2d = Vec::with_capacity(n * n);

    let rule1d_iter = || weights1d.iter().zip(&points1d);

    for (&wx, &[x]) in rule1d_iter() {
        for (&wy, &[y]) in rule1d_iter() {
            weights2d.push(wx * wy);
            points2d.push([x, y]);
        }
    }

    (weights2d, points2d)
}

/// A Gauss quadrature rule for the unit cube.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided number of
/// points per dimension.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss_unit(n);
    let mut weights3d = Vec::with_capacity(n * n * n);
    let mut points3d = Vec::with_capacity(n * n * n);

    let rule1d_iter = || weights1d.iter().zip(&points1d);

    for (&wx, &[x]) in rule1d_iter() {
        for (&wy, &[y]) in rule1d_iter() {
            for (&wz, &[z]) in rule1d_iter() {
                weights3d.push(wx * wy * wz);
                points3d.push([x, y, z]);
            }
        }
    }

    (weights3d, points3d)
}

/// A tensor product Gauss rule for the unit square with at least the requested strength.
pub fn quadrilateral_rule_with_strength(strength: usize) -> Result<Rule<2>, Error> {
    if strength > MAX_STRENGTH {
        return Err(Error::NoRuleAvailable);
    }
    Ok(quadrilateral_gauss(gauss_points_for_degree(strength)))
}

/// A tensor product Gauss rule for the unit cube with at least the requested strength.
pub fn hexahedron_rule_with_strength(strength: usize) -> Result<Rule<3>, Error> {
    if strength > MAX_STRENGTH {
        return Err(Error::NoRuleAvailable);
    }
    Ok(hexahedron_gauss(gauss_points_for_degree(strength)))
}
