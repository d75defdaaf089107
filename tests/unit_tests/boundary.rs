use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use meshfem::assembly::assemble;
use meshfem::basis::Basis;
use meshfem::boundary::{apply, BoundaryConditions};
use meshfem::element::ElementType;
use meshfem::error::BoundaryConditionError;
use meshfem::field::Field;
use meshfem::mesh::procedural::create_rectangular_quad_mesh;
use meshfem::mesh::{Mesh, MeshBuilder};
use nalgebra::{DMatrix, DVector};

fn quad_strip() -> Mesh {
    create_rectangular_quad_mesh(1.0, 1.0, 1, 3).unwrap()
}

#[test]
fn fixing_the_same_value_twice_is_allowed() {
    let mut bcs = BoundaryConditions::new();
    assert!(bcs.is_empty());
    bcs.fix(3, 0, 1.5).unwrap();
    bcs.fix(3, 0, 1.5).unwrap();
    assert_eq!(bcs.len(), 1);
    assert!(bcs.is_fixed(3, 0));
    assert!(!bcs.is_fixed(3, 1));
    assert_eq!(bcs.value(3, 0), Some(1.5));
    assert_eq!(bcs.value(4, 0), None);
}

#[test]
fn conflicting_values_are_rejected() {
    let mut bcs = BoundaryConditions::new();
    bcs.fix(3, 0, 1.5).unwrap();
    assert_eq!(
        bcs.fix(3, 0, 2.0),
        Err(BoundaryConditionError::ConflictingConstraint {
            node_id: 3,
            component: 0,
            existing: 1.5,
            requested: 2.0
        })
    );
    assert_eq!(bcs.value(3, 0), Some(1.5));
}

#[test]
fn iteration_is_ordered_by_node_id() {
    let mut bcs = BoundaryConditions::new();
    bcs.fix(8, 0, 1.0).unwrap();
    bcs.fix(1, 0, 0.0).unwrap();
    bcs.fix(4, 0, 0.5).unwrap();
    let fixed: Vec<_> = bcs.iter().collect();
    assert_eq!(fixed, vec![((1, 0), 0.0), ((4, 0), 0.5), ((8, 0), 1.0)]);
}

#[test]
fn fix_nodes_by_marker() {
    let mesh = MeshBuilder::new(2, ElementType::Tri3)
        .node_with_data(1, &[0.0, 0.0], &[], Some(1))
        .node_with_data(2, &[1.0, 0.0], &[], Some(2))
        .node_with_data(3, &[0.0, 1.0], &[], Some(1))
        .element(1, &[1, 2, 3])
        .build()
        .unwrap();

    let mut bcs = BoundaryConditions::new();
    assert_eq!(bcs.fix_marker(&mesh, 1, 0.25).unwrap(), 2);
    assert_eq!(bcs.fix_marker(&mesh, 5, 1.0).unwrap(), 0);
    assert_eq!(bcs.value(1, 0), Some(0.25));
    assert_eq!(bcs.value(3, 0), Some(0.25));
    assert!(!bcs.is_fixed(2, 0));

    // Nodes without markers never match
    let unmarked = quad_strip();
    assert_eq!(bcs.fix_marker(&unmarked, 0, 1.0).unwrap(), 0);
}

#[test]
fn fix_nodes_by_predicate() {
    let mesh = quad_strip();
    let mut bcs = BoundaryConditions::new();
    let bottom = bcs.fix_nodes_where(&mesh, |_, x| x[1] == 0.0, 0.0).unwrap();
    let top = bcs.fix_nodes_where(&mesh, |_, x| x[1] == 1.0, 1.0).unwrap();
    assert_eq!((bottom, top), (2, 2));
    assert_eq!(bcs.value(2, 0), Some(0.0));
    assert_eq!(bcs.value(7, 0), Some(1.0));

    let result = bcs.fix_nodes_where(&mesh, |id, _| id == 1, 3.0);
    assert!(matches!(
        result,
        Err(BoundaryConditionError::ConflictingConstraint { node_id: 1, .. })
    ));
}

#[test]
fn unknown_dofs_are_rejected() {
    let mesh = quad_strip();
    let basis = Basis::new(ElementType::Quad4).unwrap();
    let system = assemble(&mesh, &basis, &Field::geometric(&mesh)).unwrap();

    let mut bcs = BoundaryConditions::new();
    bcs.fix(9, 0, 1.0).unwrap();
    assert_eq!(
        apply(&system, &mesh, &bcs).unwrap_err(),
        BoundaryConditionError::UnknownDof {
            node_id: 9,
            component: 0
        }
    );

    let mut bcs = BoundaryConditions::new();
    bcs.fix(1, 1, 1.0).unwrap();
    assert_eq!(
        apply(&system, &mesh, &bcs).unwrap_err(),
        BoundaryConditionError::UnknownDof {
            node_id: 1,
            component: 1
        }
    );
}

#[test]
fn elimination_of_small_system() {
    let mesh = MeshBuilder::new(2, ElementType::Tri3)
        .node(1, &[0.0, 0.0])
        .node(2, &[1.0, 0.0])
        .node(3, &[0.0, 1.0])
        .element(1, &[1, 2, 3])
        .build()
        .unwrap();
    let basis = Basis::new(ElementType::Tri3).unwrap();
    let mut system = assemble(&mesh, &basis, &Field::geometric(&mesh)).unwrap();
    system.rhs = DVector::from_column_slice(&[1.0, 2.0, 3.0]);

    let mut bcs = BoundaryConditions::new();
    bcs.fix(2, 0, 4.0).unwrap();
    let constrained = apply(&system, &mesh, &bcs).unwrap();

    assert_eq!(constrained.num_dofs(), 3);
    assert_eq!(constrained.free_dofs(), &[0, 2]);

    // The reference stiffness matrix restricted to nodes 1 and 3
    #[rustfmt::skip]
    let expected_matrix = DMatrix::from_row_slice(2, 2, &[
         1.0, -0.5,
        -0.5,  0.5,
    ]);
    assert_matrix_eq!(DMatrix::from(constrained.matrix()), expected_matrix, comp = abs, tol = 1e-14);

    // b_f - A_fc u_c with A_12 = -0.5 and A_32 = 0
    let expected_rhs = DVector::from_column_slice(&[1.0 + 0.5 * 4.0, 3.0]);
    assert_matrix_eq!(constrained.rhs().clone(), expected_rhs, comp = abs, tol = 1e-14);

    let full = constrained.expand(&DVector::from_column_slice(&[7.0, 8.0]));
    assert_eq!(full, DVector::from_column_slice(&[7.0, 4.0, 8.0]));
    assert_eq!(constrained.restrict(&full), DVector::from_column_slice(&[7.0, 8.0]));
}

#[test]
fn eliminated_solution_satisfies_full_system() {
    let mesh = quad_strip();
    let basis = Basis::new(ElementType::Quad4).unwrap();
    let system = assemble(&mesh, &basis, &Field::geometric(&mesh)).unwrap();

    let mut bcs = BoundaryConditions::new();
    bcs.fix(1, 0, 0.0).unwrap();
    bcs.fix(8, 0, 1.0).unwrap();
    let constrained = apply(&system, &mesh, &bcs).unwrap();
    assert_eq!(constrained.num_free_dofs(), 6);

    let reduced = DMatrix::from(constrained.matrix());
    assert_matrix_eq!(reduced.clone(), reduced.transpose(), comp = abs, tol = 1e-14);

    let free_values = reduced
        .cholesky()
        .expect("Reduced stiffness matrix must be positive definite")
        .solve(constrained.rhs());
    let u = constrained.expand(&free_values);
    assert_eq!(u[0], 0.0);
    assert_eq!(u[7], 1.0);

    let residual = DMatrix::from(&system.matrix) * &u - &system.rhs;
    for &dof in constrained.free_dofs() {
        assert_scalar_eq!(residual[dof], 0.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn no_constraints_leaves_system_unchanged() {
    let mesh = quad_strip();
    let basis = Basis::new(ElementType::Quad4).unwrap();
    let system = assemble(&mesh, &basis, &Field::geometric(&mesh)).unwrap();
    let constrained = apply(&system, &mesh, &BoundaryConditions::new()).unwrap();
    assert_eq!(constrained.matrix(), &system.matrix);
    assert_eq!(constrained.rhs(), &system.rhs);
    assert_eq!(constrained.free_dofs(), &[0, 1, 2, 3, 4, 5, 6, 7]);
}
