use crate::unit_tests::monomial_integral_1d;
use matrixcompare::assert_scalar_eq;
use meshfem_quadrature::integrate;
use meshfem_quadrature::univariate::{gauss, gauss_unit, interval_rule_with_strength};

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=30 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);

        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let monomial_integral = (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0);
            let estimated_integral = integrate(&rule, |&[x]| x.powi(alpha));

            assert_scalar_eq!(estimated_integral, monomial_integral, comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn unit_gauss_rules_live_in_unit_interval() {
    for n in 1..=20 {
        let (weights, points) = gauss_unit(n);
        assert_eq!(weights.len(), n);
        assert!(points.iter().all(|&[x]| x > 0.0 && x < 1.0));
        assert!(points.windows(2).all(|pair| pair[0][0] < pair[1][0]));

        let weight_sum: f64 = weights.iter().sum();
        assert_scalar_eq!(weight_sum, 1.0, comp = abs, tol = 1e-14);

        for alpha in 0..=(2 * n - 1) as i32 {
            let estimated_integral = integrate(&(weights.clone(), points.clone()), |&[x]| x.powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral_1d(alpha), comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn interval_rule_strength_is_honored() {
    for strength in 0..=12 {
        let rule = interval_rule_with_strength(strength).unwrap();
        for alpha in 0..=strength as i32 {
            let estimated_integral = integrate(&rule, |&[x]| x.powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral_1d(alpha), comp = abs, tol = 1e-14);
        }
    }
    assert!(interval_rule_with_strength(1000).is_err());
}
