//! Poisson problems `-Δu = f` with known solutions.
use crate::integration_tests::data_output_path;
use matrixcompare::assert_scalar_eq;
use meshfem::assembly::SourceTerm;
use meshfem::boundary::BoundaryConditions;
use meshfem::field::SOLUTION_VARIABLE;
use meshfem::io::vtk::InterchangeMesh;
use meshfem::mesh::procedural::{create_rectangular_quad_mesh, create_unit_square_tri_mesh};
use meshfem::mesh::Mesh;
use meshfem::problem::LaplaceProblem;
use meshfem::solver::SolverSettings;
use std::f64::consts::PI;

fn u_exact(x: &[f64]) -> f64 {
    (PI * x[0]).sin() * (PI * x[1]).sin()
}

fn f(x: &[f64]) -> f64 {
    2.0 * PI * PI * u_exact(x)
}

fn homogeneous_boundary_conditions(mesh: &Mesh) -> BoundaryConditions {
    let mut bcs = BoundaryConditions::new();
    bcs.fix_nodes_where(
        mesh,
        |_, x| x.iter().any(|&x_d| x_d == 0.0 || x_d == 1.0),
        0.0,
    )
    .unwrap();
    bcs
}

/// Maximum nodal error of the solution on a unit square mesh with the given resolution.
fn max_nodal_error(resolution: usize) -> f64 {
    let mesh = create_unit_square_tri_mesh(resolution).unwrap();
    let source: Vec<f64> = (0..mesh.num_nodes())
        .map(|i| f(mesh.node_coords(i)))
        .collect();
    let solution = LaplaceProblem::new(&mesh, homogeneous_boundary_conditions(&mesh))
        .with_source(SourceTerm::Nodal(source))
        .with_settings(SolverSettings::default().with_tolerance(1e-12).with_max_iter(10_000))
        .solve()
        .unwrap();

    let output_path = data_output_path().join(format!("poisson/sin_sin_res_{resolution}.vtk"));
    InterchangeMesh::from_field(&mesh, &solution.field, SOLUTION_VARIABLE)
        .unwrap()
        .export_vtk(output_path)
        .unwrap();

    (0..mesh.num_nodes())
        .map(|i| {
            let u = solution
                .field
                .value(SOLUTION_VARIABLE, mesh.node_id(i), 0)
                .unwrap();
            (u - u_exact(mesh.node_coords(i))).abs()
        })
        .fold(0.0, f64::max)
}

#[test]
fn sin_sin_converges_at_second_order() {
    let errors: Vec<f64> = [4, 8, 16].into_iter().map(max_nodal_error).collect();
    assert!(errors[0] < 0.2, "errors: {:?}", errors);
    for pair in errors.windows(2) {
        let rate = (pair[0] / pair[1]).log2();
        assert!(rate > 1.7, "errors: {:?}", errors);
    }
}

#[test]
fn constant_source_gives_parabola() {
    // u = x (1 - x) / 2 solves -Δu = 1 with u = 0 at x = 0 and x = 1 and natural conditions on
    // the remaining edges. Nodal values are exact for bilinear elements on this grid.
    let mesh = create_rectangular_quad_mesh(1.0, 0.5, 5, 2).unwrap();
    let mut bcs = BoundaryConditions::new();
    bcs.fix_nodes_where(&mesh, |_, x| x[0] == 0.0 || x[0] == 1.0, 0.0)
        .unwrap();

    let solution = LaplaceProblem::new(&mesh, bcs)
        .with_source(SourceTerm::Constant(1.0))
        .with_settings(SolverSettings::default().with_tolerance(1e-12).with_max_iter(1000))
        .solve()
        .unwrap();
    for i in 0..mesh.num_nodes() {
        let x = mesh.node_coords(i)[0];
        let u = solution
            .field
            .value(SOLUTION_VARIABLE, mesh.node_id(i), 0)
            .unwrap();
        assert_scalar_eq!(u, x * (1.0 - x) / 2.0, comp = abs, tol = 1e-10);
    }
}
