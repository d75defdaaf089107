//! Collapsed Gauss rules for the unit triangle and the unit tetrahedron.
//!
//! The unit triangle is the image of the unit square under the Duffy map
//! `(u, v) -> (u, v (1 - u))` with Jacobian determinant `1 - u`. For a polynomial `p(x, y)` of
//! total degree `k`, the pulled back integrand `p(u, v (1 - u)) (1 - u)` has degree at most
//! `k + 1` in `u` and at most `k` in `v`, so a tensor product of Gauss rules with enough points
//! per direction integrates it exactly. The tetrahedron works the same way with the map
//! `(u, v, w) -> (u, v (1 - u), w (1 - u) (1 - v))` and determinant `(1 - u)^2 (1 - v)`,
//! which raises the degree by two in `u` and by one in `v`. The tetrahedral rules therefore use
//! one more point in `u` than in the other directions.

use crate::univariate::gauss_unit;
use crate::{gauss_points_for_degree, Error, Rule, MAX_STRENGTH};

/// A collapsed Gauss rule for the unit triangle with the given number of points per
/// collapsed direction.
pub fn triangle_collapsed_gauss(num_points_per_dim: usize) -> Rule<2> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss_unit(n);
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);

    for (&wu, &[u]) in weights1d.iter().zip(&points1d) {
        for (&wv, &[v]) in weights1d.iter().zip(&points1d) {
            weights.push(wu * wv * (1.0 - u));
            points.push([u, v * (1.0 - u)]);
        }
    }

    (weights, points)
}

/// A collapsed Gauss rule for the unit tetrahedron with the given number of points in the
/// `v` and `w` directions and one additional point in the `u` direction.
///
/// With `n` points per direction the rule integrates polynomials of total degree `2n - 2`
/// exactly. In particular, any `n >= 1` gives the exact volume.
pub fn tetrahedron_collapsed_gauss(num_points_per_dim: usize) -> Rule<3> {
    let n = num_points_per_dim;
    let (weights_u, points_u) = gauss_unit(n + 1);
    let (weights1d, points1d) = gauss_unit(n);
    let mut weights = Vec::with_capacity((n + 1) * n * n);
    let mut points = Vec::with_capacity((n + 1) * n * n);

    let rule1d_iter = || weights1d.iter().zip(&points1d);

    for (&wu, &[u]) in weights_u.iter().zip(&points_u) {
        for (&wv, &[v]) in rule1d_iter() {
            for (&ww, &[w]) in rule1d_iter() {
                let jacobian = (1.0 - u) * (1.0 - u) * (1.0 - v);
                weights.push(wu * wv * ww * jacobian);
                points.push([u, v * (1.0 - u), w * (1.0 - u) * (1.0 - v)]);
            }
        }
    }

    (weights, points)
}

/// A rule for the unit triangle that integrates all polynomials of total degree
/// `<= strength` exactly.
pub fn triangle_rule_with_strength(strength: usize) -> Result<Rule<2>, Error> {
    if strength > MAX_STRENGTH {
        return Err(Error::NoRuleAvailable);
    }
    // The collapse raises the degree in the first direction by one
    Ok(triangle_collapsed_gauss(gauss_points_for_degree(strength + 1)))
}

/// A rule for the unit tetrahedron that integrates all polynomials of total degree
/// `<= strength` exactly.
pub fn tetrahedron_rule_with_strength(strength: usize) -> Result<Rule<3>, Error> {
    if strength > MAX_STRENGTH {
        return Err(Error::NoRuleAvailable);
    }
    // The collapse raises the degree by one in the second direction. The first direction
    // gets an extra point for its additional degree
    Ok(tetrahedron_collapsed_gauss(gauss_points_for_degree(strength + 1)))
}
