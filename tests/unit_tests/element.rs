use matrixcompare::{assert_matrix_eq, assert_scalar_eq, prop_assert_scalar_eq};
use meshfem::element::{min_jacobian_determinant, reference_jacobian, ElementType, Topology};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

fn point_in_reference_domain(element_type: ElementType) -> BoxedStrategy<Vec<f64>> {
    match (element_type.topology(), element_type.reference_dim()) {
        (Topology::TensorProduct, dim) => proptest::collection::vec(0.0..=1.0f64, dim).boxed(),
        (Topology::Simplex, 2) => (0.0..=1.0f64)
            .prop_flat_map(|x| (Just(x), 0.0..=1.0 - x))
            .prop_map(|(x, y)| vec![x, y])
            .boxed(),
        (Topology::Simplex, _) => (0.0..=1.0f64)
            .prop_flat_map(|x| (Just(x), 0.0..=1.0 - x))
            .prop_flat_map(|(x, y)| (Just(x), Just(y), 0.0..=(1.0 - x - y).max(0.0)))
            .prop_map(|(x, y, z)| vec![x, y, z])
            .boxed(),
    }
}

fn element_type_and_point() -> impl Strategy<Value = (ElementType, Vec<f64>)> {
    proptest::sample::select(ElementType::ALL.to_vec())
        .prop_flat_map(|element_type| (Just(element_type), point_in_reference_domain(element_type)))
}

fn evaluate(element_type: ElementType, xi: &[f64]) -> (DVector<f64>, DMatrix<f64>) {
    let element = element_type.reference_element();
    let mut values = DVector::zeros(element.num_nodes());
    let mut gradients = DMatrix::zeros(element.reference_dim(), element.num_nodes());
    element.populate_basis(values.as_mut_slice(), xi);
    element.populate_basis_gradients(&mut gradients, xi);
    (values, gradients)
}

#[test]
fn element_type_from_dim_and_node_count() {
    assert_eq!(ElementType::from_dim_and_node_count(2, 3), Some(ElementType::Tri3));
    assert_eq!(ElementType::from_dim_and_node_count(2, 6), Some(ElementType::Tri6));
    assert_eq!(ElementType::from_dim_and_node_count(2, 4), Some(ElementType::Quad4));
    assert_eq!(ElementType::from_dim_and_node_count(3, 4), Some(ElementType::Tet4));
    assert_eq!(ElementType::from_dim_and_node_count(3, 10), Some(ElementType::Tet10));
    assert_eq!(ElementType::from_dim_and_node_count(3, 8), Some(ElementType::Hex8));
    assert_eq!(ElementType::from_dim_and_node_count(2, 8), None);
    assert_eq!(ElementType::from_dim_and_node_count(1, 2), None);

    for element_type in ElementType::ALL {
        let dim = element_type.reference_dim();
        let n = element_type.num_nodes();
        assert_eq!(ElementType::from_dim_and_node_count(dim, n), Some(element_type));
    }
}

#[test]
fn lagrange_property() {
    // N_i(x_j) = delta_ij, where x_j is the reference position of node j
    for element_type in ElementType::ALL {
        let element = element_type.reference_element();
        let nodes = element.reference_nodes();
        let n = element.num_nodes();
        assert_eq!(nodes.nrows(), element.reference_dim());
        assert_eq!(nodes.ncols(), n);

        for j in 0..n {
            let xi: Vec<f64> = nodes.column(j).iter().copied().collect();
            let (phi, _) = evaluate(element_type, &xi);
            let mut expected = DVector::zeros(n);
            expected[j] = 1.0;
            assert_matrix_eq!(phi, expected, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn reference_node_order() {
    let tri6 = ElementType::Tri6.reference_element().reference_nodes();
    #[rustfmt::skip]
    let expected_tri6 = DMatrix::from_row_slice(2, 6, &[
        0.0, 1.0, 0.0, 0.5, 0.5, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.5, 0.5,
    ]);
    assert_matrix_eq!(tri6, expected_tri6, comp = float);

    let quad4 = ElementType::Quad4.reference_element().reference_nodes();
    #[rustfmt::skip]
    let expected_quad4 = DMatrix::from_row_slice(2, 4, &[
        0.0, 1.0, 1.0, 0.0,
        0.0, 0.0, 1.0, 1.0,
    ]);
    assert_matrix_eq!(quad4, expected_quad4, comp = float);

    let tet10 = ElementType::Tet10.reference_element().reference_nodes();
    #[rustfmt::skip]
    let expected_tet10 = DMatrix::from_row_slice(3, 10, &[
        0.0, 1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.5, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.5,
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5,
    ]);
    assert_matrix_eq!(tet10, expected_tet10, comp = float);
}

#[test]
fn reorientation_is_an_involution() {
    for element_type in ElementType::ALL {
        if let Some(permutation) = element_type.reorientation() {
            assert_eq!(permutation.len(), element_type.num_nodes());
            for (i, &p) in permutation.iter().enumerate() {
                assert_eq!(permutation[p], i);
            }
        }
    }
    assert!(ElementType::Quad4.reorientation().is_none());
    assert!(ElementType::Hex8.reorientation().is_none());
}

#[test]
fn reoriented_reference_element_is_inverted() {
    for element_type in ElementType::ALL {
        let nodes = element_type.reference_element().reference_nodes();
        assert_scalar_eq!(min_jacobian_determinant(element_type, &nodes), 1.0, comp = abs, tol = 1e-12);

        if let Some(permutation) = element_type.reorientation() {
            let permuted = DMatrix::from_fn(nodes.nrows(), nodes.ncols(), |i, j| nodes[(i, permutation[j])]);
            assert_scalar_eq!(min_jacobian_determinant(element_type, &permuted), -1.0, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn reference_jacobian_of_scaled_triangle() {
    let coords = DMatrix::from_column_slice(2, 3, &[1.0, 1.0, 3.0, 1.0, 1.0, 4.0]);
    let (_, gradients) = evaluate(ElementType::Tri3, &[0.25, 0.25]);
    let jacobian = reference_jacobian(&coords, &gradients);
    let expected = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]);
    assert_matrix_eq!(jacobian, expected, comp = abs, tol = 1e-14);
    assert_scalar_eq!(min_jacobian_determinant(ElementType::Tri3, &coords), 6.0, comp = abs, tol = 1e-14);
}

#[test]
fn degenerate_element_has_zero_determinant() {
    // All nodes on a line
    let coords = DMatrix::from_column_slice(2, 3, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    assert_scalar_eq!(min_jacobian_determinant(ElementType::Tri3, &coords), 0.0, comp = abs, tol = 1e-14);
}

proptest! {
    #[test]
    fn partition_of_unity((element_type, xi) in element_type_and_point()) {
        let (phi, gradients) = evaluate(element_type, &xi);
        prop_assert_scalar_eq!(phi.sum(), 1.0, comp = abs, tol = 1e-10);
        // The gradients of a partition of unity sum to zero
        for d in 0..gradients.nrows() {
            prop_assert_scalar_eq!(gradients.row(d).sum(), 0.0, comp = abs, tol = 1e-10);
        }
    }

    #[test]
    fn basis_gradients_match_finite_differences((element_type, xi) in element_type_and_point()) {
        let h = 1e-6;
        let (_, gradients) = evaluate(element_type, &xi);
        for d in 0..xi.len() {
            let mut xi_plus = xi.clone();
            let mut xi_minus = xi.clone();
            xi_plus[d] += h;
            xi_minus[d] -= h;
            let (phi_plus, _) = evaluate(element_type, &xi_plus);
            let (phi_minus, _) = evaluate(element_type, &xi_minus);
            let fd = (phi_plus - phi_minus) / (2.0 * h);
            for i in 0..fd.len() {
                prop_assert_scalar_eq!(gradients[(d, i)], fd[i], comp = abs, tol = 1e-6);
            }
        }
    }
}
