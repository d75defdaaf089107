use crate::integration_tests::data_output_path;
use matrixcompare::assert_scalar_eq;
use meshfem::boundary::BoundaryConditions;
use meshfem::field::{Field, SOLUTION_VARIABLE};
use meshfem::io::export::{export_elements, export_nodes, save_element_records, save_node_records};
use meshfem::io::tetgen::{load_tetgen_mesh, MeshOptions};
use meshfem::io::vtk::InterchangeMesh;
use meshfem::mesh::procedural::{create_box_tet_mesh, create_rectangular_quad_mesh, create_unit_cube_hex_mesh};
use meshfem::mesh::Mesh;
use meshfem::problem::{solution_field, LaplaceProblem};
use meshfem::solver::{ConvergenceFailure, InitialGuess, SolverSettings};
use meshfem::Error;

fn tight_settings() -> SolverSettings {
    SolverSettings::default().with_tolerance(1e-12).with_max_iter(1000)
}

fn nodal_values(mesh: &Mesh, field: &Field) -> Vec<f64> {
    (0..mesh.num_nodes())
        .map(|i| field.value(SOLUTION_VARIABLE, mesh.node_id(i), 0).unwrap())
        .collect()
}

fn is_on_boundary(x: &[f64], extents: &[f64]) -> bool {
    x.iter()
        .zip(extents)
        .any(|(&x_d, &extent)| x_d.abs() < 1e-12 || (x_d - extent).abs() < 1e-12)
}

#[test]
fn quad_strip_with_corner_constraints() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 3).unwrap();
    let mut bcs = BoundaryConditions::new();
    bcs.fix(1, 0, 0.0).unwrap();
    bcs.fix(8, 0, 1.0).unwrap();

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_settings(tight_settings())
        .solve()
        .unwrap();
    let u = nodal_values(&mesh, &solution.field);

    // Constrained values are inserted exactly
    assert_eq!(u[0], 0.0);
    assert_eq!(u[7], 1.0);

    // Point constraints produce a solution that is not monotone in y, but it is symmetric under
    // the point reflection of the strip and bounded by the constrained values
    for k in 0..8 {
        assert_scalar_eq!(u[k] + u[7 - k], 1.0, comp = abs, tol = 1e-10);
        assert!((0.0..=1.0).contains(&u[k]));
    }

    let expected = [
        0.0,
        19.0 / 30.0,
        29.0 / 90.0,
        5.0 / 9.0,
        4.0 / 9.0,
        61.0 / 90.0,
        11.0 / 30.0,
        1.0,
    ];
    for (computed, expected) in u.iter().zip(expected) {
        assert_scalar_eq!(*computed, expected, comp = abs, tol = 1e-10);
    }

    let output_path = data_output_path().join("laplace/quad_strip_with_corner_constraints.vtk");
    InterchangeMesh::from_field(&mesh, &solution.field, SOLUTION_VARIABLE)
        .unwrap()
        .export_vtk(output_path)
        .unwrap();
}

#[test]
fn quad_strip_with_edge_constraints_is_linear() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 1, 3).unwrap();
    let mut bcs = BoundaryConditions::new();
    bcs.fix_nodes_where(&mesh, |_, x| x[1] == 0.0, 0.0).unwrap();
    bcs.fix_nodes_where(&mesh, |_, x| x[1] == 1.0, 1.0).unwrap();

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_settings(tight_settings())
        .solve()
        .unwrap();
    for i in 0..mesh.num_nodes() {
        let y = mesh.node_coords(i)[1];
        let u = solution.field.value(SOLUTION_VARIABLE, mesh.node_id(i), 0).unwrap();
        assert_scalar_eq!(u, y, comp = abs, tol = 1e-10);
    }
}

#[test]
fn read_solve_and_export() {
    let mesh = load_tetgen_mesh(
        "assets/meshes/quad_strip.node",
        "assets/meshes/quad_strip.ele",
        &MeshOptions::default(),
    )
    .unwrap();
    let mut bcs = BoundaryConditions::new();
    assert_eq!(bcs.fix_marker(&mesh, 1, 0.0).unwrap(), 2);
    assert_eq!(bcs.fix_marker(&mesh, 2, 1.0).unwrap(), 2);

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_settings(tight_settings())
        .solve()
        .unwrap();
    let u = nodal_values(&mesh, &solution.field);
    for (i, u_i) in u.iter().enumerate() {
        assert_scalar_eq!(*u_i, mesh.node_coords(i)[1], comp = abs, tol = 1e-10);
    }

    let output_dir = data_output_path().join("laplace/read_solve_and_export");
    std::fs::create_dir_all(&output_dir).unwrap();
    let nodes = export_nodes(&mesh, &solution.field, SOLUTION_VARIABLE).unwrap();
    save_node_records(&nodes, output_dir.join("nodes.csv")).unwrap();
    save_element_records(&export_elements(&mesh), output_dir.join("elements.csv")).unwrap();
    InterchangeMesh::from_field(&mesh, &solution.field, SOLUTION_VARIABLE)
        .unwrap()
        .export_vtk(output_dir.join("solution.vtk"))
        .unwrap();

    let text = std::fs::read_to_string(output_dir.join("nodes.csv")).unwrap();
    let last = text.lines().last().unwrap();
    let fields: Vec<f64> = last.split(',').map(|token| token.parse().unwrap()).collect();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], 8.0);
    assert_scalar_eq!(fields[3], 1.0, comp = abs, tol = 1e-10);
}

#[test]
fn linear_function_is_reproduced_on_tet_mesh() {
    let extents = [1.0, 2.0, 1.5];
    let mesh = create_box_tet_mesh(extents, [3, 3, 3]).unwrap();
    let exact = |x: &[f64]| 1.0 + x[0] + 2.0 * x[1] - x[2];

    let mut bcs = BoundaryConditions::new();
    for i in 0..mesh.num_nodes() {
        let x = mesh.node_coords(i);
        if is_on_boundary(x, &extents) {
            bcs.fix(mesh.node_id(i), 0, exact(x)).unwrap();
        }
    }
    assert_eq!(mesh.num_nodes() - bcs.len(), 8);

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_settings(tight_settings())
        .with_initial_guess(InitialGuess::Uniform(0.0))
        .solve()
        .unwrap();
    for (i, u_i) in nodal_values(&mesh, &solution.field).iter().enumerate() {
        assert_scalar_eq!(*u_i, exact(mesh.node_coords(i)), comp = abs, tol = 1e-9);
    }
}

#[test]
fn trilinear_function_is_reproduced_on_hex_mesh() {
    // xy - yz is harmonic and lies in the span of the trilinear basis
    let mesh = create_unit_cube_hex_mesh(3).unwrap();
    let exact = |x: &[f64]| x[0] * x[1] - x[1] * x[2];

    let mut bcs = BoundaryConditions::new();
    for i in 0..mesh.num_nodes() {
        let x = mesh.node_coords(i);
        if is_on_boundary(x, &[1.0; 3]) {
            bcs.fix(mesh.node_id(i), 0, exact(x)).unwrap();
        }
    }

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_settings(tight_settings())
        .solve()
        .unwrap();
    for (i, u_i) in nodal_values(&mesh, &solution.field).iter().enumerate() {
        assert_scalar_eq!(*u_i, exact(mesh.node_coords(i)), comp = abs, tol = 1e-9);
    }
}

#[test]
fn convergence_failure_keeps_last_iterate() {
    let mesh = create_rectangular_quad_mesh(1.0, 1.0, 4, 4).unwrap();
    let mut bcs = BoundaryConditions::new();
    bcs.fix(1, 0, 0.0).unwrap();
    bcs.fix(25, 0, 1.0).unwrap();

    let settings = SolverSettings::default().with_tolerance(1e-14).with_max_iter(2);
    let result = LaplaceProblem::new(&mesh, bcs.clone())
        .with_settings(settings)
        .solve();
    let error = match result {
        Err(Error::Convergence(error)) => error,
        other => panic!("expected convergence error, got {:?}", other),
    };
    assert_eq!(error.reason, ConvergenceFailure::MaxIterationsReached { max_iter: 2 });
    assert_eq!(error.iterations, 2);

    // The partial result can still be inspected as a field, with exact boundary values
    let field = solution_field(&mesh, &error.last_iterate).unwrap();
    for ((node_id, _), value) in bcs.iter() {
        assert_eq!(field.value(SOLUTION_VARIABLE, node_id, 0).unwrap(), value);
    }
}
