use crate::unit_tests::factorial;
use matrixcompare::{assert_scalar_eq, prop_assert_scalar_eq};
use meshfem_quadrature::integrate;
use meshfem_quadrature::simplex::{
    tetrahedron_collapsed_gauss, tetrahedron_rule_with_strength, triangle_collapsed_gauss,
    triangle_rule_with_strength,
};
use proptest::prelude::*;

/// Exact integral of x^a y^b over the unit triangle.
fn triangle_monomial_integral(a: i32, b: i32) -> f64 {
    factorial(a) * factorial(b) / factorial(a + b + 2)
}

/// Exact integral of x^a y^b z^c over the unit tetrahedron.
fn tetrahedron_monomial_integral(a: i32, b: i32, c: i32) -> f64 {
    factorial(a) * factorial(b) * factorial(c) / factorial(a + b + c + 3)
}

#[test]
fn triangle_weights_sum_to_reference_area() {
    for n in 1..=8 {
        let (weights, points) = triangle_collapsed_gauss(n);
        assert!(weights.iter().all(|&w| w > 0.0));
        assert!(points.iter().all(|&[x, y]| x > 0.0 && y > 0.0 && x + y < 1.0));
        assert_scalar_eq!(weights.iter().sum::<f64>(), 0.5, comp = abs, tol = 1e-14);
    }
}

#[test]
fn tetrahedron_weights_sum_to_reference_volume() {
    for n in 1..=6 {
        let (weights, points) = tetrahedron_collapsed_gauss(n);
        assert_eq!(weights.len(), (n + 1) * n * n);
        assert!(weights.iter().all(|&w| w > 0.0));
        assert!(points
            .iter()
            .all(|&[x, y, z]| x > 0.0 && y > 0.0 && z > 0.0 && x + y + z < 1.0));
        assert_scalar_eq!(weights.iter().sum::<f64>(), 1.0 / 6.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn tetrahedron_collapsed_gauss_integrates_up_to_degree() {
    // n points per direction integrate total degree 2n - 2
    for n in 1..=4 {
        let rule = tetrahedron_collapsed_gauss(n);
        let degree = 2 * n as i32 - 2;
        for a in 0..=degree {
            for b in 0..=(degree - a) {
                for c in 0..=(degree - a - b) {
                    let estimated = integrate(&rule, |&[x, y, z]| x.powi(a) * y.powi(b) * z.powi(c));
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn triangle_rules_integrate_monomials_up_to_strength() {
    for strength in 0..=10 {
        let rule = triangle_rule_with_strength(strength).unwrap();
        for a in 0..=strength as i32 {
            for b in 0..=(strength as i32 - a) {
                let estimated = integrate(&rule, |&[x, y]| x.powi(a) * y.powi(b));
                assert_scalar_eq!(estimated, triangle_monomial_integral(a, b), comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn tetrahedron_rules_integrate_monomials_up_to_strength() {
    for strength in 0..=8 {
        let rule = tetrahedron_rule_with_strength(strength).unwrap();
        for a in 0..=strength as i32 {
            for b in 0..=(strength as i32 - a) {
                for c in 0..=(strength as i32 - a - b) {
                    let estimated = integrate(&rule, |&[x, y, z]| x.powi(a) * y.powi(b) * z.powi(c));
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn triangle_rule_integrates_arbitrary_quadratics(coeffs in proptest::array::uniform6(-10.0..10.0f64)) {
        let [c0, c1, c2, c3, c4, c5] = coeffs;
        let p = |x: f64, y: f64| c0 + c1 * x + c2 * y + c3 * x * x + c4 * x * y + c5 * y * y;
        let expected = c0 * triangle_monomial_integral(0, 0)
            + c1 * triangle_monomial_integral(1, 0)
            + c2 * triangle_monomial_integral(0, 1)
            + c3 * triangle_monomial_integral(2, 0)
            + c4 * triangle_monomial_integral(1, 1)
            + c5 * triangle_monomial_integral(0, 2);
        let rule = triangle_rule_with_strength(2).unwrap();
        let estimated = integrate(&rule, |&[x, y]| p(x, y));
        prop_assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-12);
    }
}
