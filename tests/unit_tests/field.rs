use meshfem::error::FieldError;
use meshfem::field::{Field, VariableKind, GEOMETRY_VARIABLE, SOLUTION_VARIABLE};
use meshfem::mesh::procedural::create_rectangular_quad_mesh;
use nalgebra::DVector;

#[test]
fn geometric_field_holds_coordinates() {
    let mesh = create_rectangular_quad_mesh(2.0, 1.0, 2, 1).unwrap();
    let field = Field::geometric(&mesh);

    assert_eq!(field.num_nodes(), 6);
    let geometry = field.variable(GEOMETRY_VARIABLE).unwrap();
    assert_eq!(geometry.kind(), VariableKind::Geometric);
    assert_eq!(geometry.num_components(), 2);
    assert_eq!(geometry.node_values(2), &[2.0, 0.0]);
    assert_eq!(field.value(GEOMETRY_VARIABLE, 5, 1).unwrap(), 1.0);
    assert_eq!(
        field.component_values(GEOMETRY_VARIABLE, 0).unwrap(),
        vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]
    );
}

#[test]
fn geometric_variable_is_immutable() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 1).unwrap();
    let mut field = Field::geometric(&mesh);
    assert_eq!(
        field.set_value(GEOMETRY_VARIABLE, 1, 0, 5.0),
        Err(FieldError::ImmutableVariable {
            name: GEOMETRY_VARIABLE.to_string()
        })
    );
    assert_eq!(field.value(GEOMETRY_VARIABLE, 1, 0).unwrap(), 0.0);
}

#[test]
fn dependent_variable_can_be_written() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 1).unwrap();
    let mut field = Field::new(&mesh);
    field
        .add_variable(SOLUTION_VARIABLE, VariableKind::Dependent, 2)
        .unwrap();

    assert_eq!(field.value(SOLUTION_VARIABLE, 3, 1).unwrap(), 0.0);
    field.set_value(SOLUTION_VARIABLE, 3, 1, 4.0).unwrap();
    assert_eq!(field.value(SOLUTION_VARIABLE, 3, 1).unwrap(), 4.0);
    assert_eq!(field.component_values(SOLUTION_VARIABLE, 1).unwrap(), vec![0.0, 0.0, 4.0, 0.0]);

    let dofs = DVector::from_fn(8, |i, _| i as f64);
    field.set_from_dof_vector(SOLUTION_VARIABLE, &dofs).unwrap();
    assert_eq!(field.value(SOLUTION_VARIABLE, 2, 1).unwrap(), 3.0);
    assert_eq!(field.dof_vector(SOLUTION_VARIABLE).unwrap(), dofs);
}

#[test]
fn invalid_access_is_reported() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 1).unwrap();
    let mut field = Field::geometric(&mesh);
    field
        .add_variable(SOLUTION_VARIABLE, VariableKind::Dependent, 1)
        .unwrap();

    assert_eq!(
        field.add_variable(SOLUTION_VARIABLE, VariableKind::Dependent, 1).err(),
        Some(FieldError::DuplicateVariable {
            name: SOLUTION_VARIABLE.to_string()
        })
    );
    assert_eq!(
        field.value("pressure", 1, 0),
        Err(FieldError::UnknownVariable {
            name: "pressure".to_string()
        })
    );
    assert_eq!(
        field.value(SOLUTION_VARIABLE, 9, 0),
        Err(FieldError::UnknownNode { node_id: 9 })
    );
    assert_eq!(
        field.value(SOLUTION_VARIABLE, 1, 1),
        Err(FieldError::ComponentOutOfRange {
            component: 1,
            num_components: 1
        })
    );
    assert_eq!(
        field.set_from_dof_vector(SOLUTION_VARIABLE, &DVector::zeros(3)),
        Err(FieldError::NodeCountMismatch { expected: 4, found: 3 })
    );
}
