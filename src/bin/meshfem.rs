//! Command line interface: solve the Laplace equation on a TetGen style mesh, or generate
//! rectangular meshes in that format.
use clap::{Parser, Subcommand, ValueEnum};
use eyre::{eyre, Context};
use meshfem::boundary::BoundaryConditions;
use meshfem::error::Error;
use meshfem::field::{Field, SOLUTION_VARIABLE};
use meshfem::io::export::{export_elements, export_nodes, save_element_records, save_node_records};
use meshfem::io::tetgen::{load_tetgen_mesh, save_tetgen_mesh, MeshOptions};
use meshfem::io::vtk::InterchangeMesh;
use meshfem::mesh::procedural::{
    create_box_hex_mesh, create_box_tet_mesh, create_rectangular_quad_mesh, create_rectangular_tri_mesh,
};
use meshfem::mesh::{Mesh, WindingPolicy};
use meshfem::problem::{solution_field, LaplaceProblem};
use meshfem::solver::{InitialGuess, SolverSettings};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve the Laplace equation with Dirichlet boundary conditions on a mesh.
    Run(RunArgs),
    /// Generate a rectangular mesh and write it as node and element files.
    Generate(GenerateArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Node file.
    #[arg(long, value_name = "FILE")]
    nodes: PathBuf,

    /// Element file.
    #[arg(long, value_name = "FILE")]
    elements: PathBuf,

    /// Output directory.
    #[arg(long, value_name = "DIR", default_value = "output")]
    out: PathBuf,

    /// Relative residual tolerance of the solver.
    #[arg(long, default_value_t = 1e-8)]
    tol: f64,

    /// Maximum number of solver iterations [default: number of free degrees of freedom].
    #[arg(long)]
    max_iter: Option<usize>,

    /// Initial value at every free degree of freedom.
    #[arg(long, default_value_t = 0.5)]
    initial_guess: f64,

    /// Fix the value at a node. Without any constraints, the first node is fixed to 0 and the
    /// last node to 1.
    #[arg(long = "fix", value_name = "NODE_ID=VALUE", value_parser = parse_assignment::<usize>)]
    fix: Vec<(usize, f64)>,

    /// Fix the value at all nodes with the given boundary marker.
    #[arg(long = "fix-marker", value_name = "MARKER=VALUE", value_parser = parse_assignment::<i64>)]
    fix_marker: Vec<(i64, f64)>,

    /// Reorient inverted simplex elements instead of rejecting the mesh.
    #[arg(long)]
    reorient: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum GeneratedElement {
    Quad4,
    Tri3,
    Hex8,
    Tet4,
}

#[derive(clap::Args)]
struct GenerateArgs {
    #[arg(long, default_value_t = 1.0)]
    width: f64,

    #[arg(long, default_value_t = 1.0)]
    height: f64,

    /// Extent in z, only used by 3D elements.
    #[arg(long, default_value_t = 1.0)]
    depth: f64,

    #[arg(long, default_value_t = 1)]
    nx: usize,

    #[arg(long, default_value_t = 1)]
    ny: usize,

    /// Cells in z, only used by 3D elements.
    #[arg(long, default_value_t = 1)]
    nz: usize,

    #[arg(long, value_enum, default_value_t = GeneratedElement::Quad4)]
    element: GeneratedElement,

    /// Output directory. The mesh is written to `mesh.node` and `mesh.ele`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,
}

fn parse_assignment<K>(s: &str) -> Result<(K, f64), String>
where
    K: FromStr,
{
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found '{}'", s))?;
    let key = key
        .trim()
        .parse()
        .map_err(|_| format!("invalid key '{}'", key))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{}'", value))?;
    Ok((key, value))
}

#[derive(Serialize)]
struct RunSummary<'a> {
    num_nodes: usize,
    num_elements: usize,
    element_type: meshfem::element::ElementType,
    num_constraints: usize,
    converged: bool,
    iterations: usize,
    relative_residual: f64,
    settings: &'a SolverSettings,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(&args),
        Command::Generate(args) => generate(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}

fn boundary_conditions(mesh: &Mesh, args: &RunArgs) -> eyre::Result<BoundaryConditions> {
    let mut bcs = BoundaryConditions::new();
    for &(node_id, value) in &args.fix {
        bcs.fix(node_id, 0, value)?;
    }
    for &(marker, value) in &args.fix_marker {
        let count = bcs.fix_marker(mesh, marker, value)?;
        if count == 0 {
            log::warn!("No nodes have boundary marker {}", marker);
        }
    }

    if bcs.is_empty() {
        if mesh.num_nodes() == 0 {
            return Err(eyre!("mesh has no nodes to constrain"));
        }
        let first = mesh.node_id(0);
        let last = mesh.node_id(mesh.num_nodes() - 1);
        log::info!("No constraints given, fixing node {} to 0 and node {} to 1", first, last);
        bcs.fix(first, 0, 0.0)?;
        bcs.fix(last, 0, 1.0)?;
    }
    Ok(bcs)
}

fn write_outputs(mesh: &Mesh, field: &Field, out: &Path) -> eyre::Result<()> {
    std::fs::create_dir_all(out).wrap_err_with(|| format!("failed to create output directory {}", out.display()))?;
    let nodes = export_nodes(mesh, field, SOLUTION_VARIABLE)?;
    save_node_records(&nodes, out.join("nodes.csv"))?;
    save_element_records(&export_elements(mesh), out.join("elements.csv"))?;
    InterchangeMesh::from_field(mesh, field, SOLUTION_VARIABLE)?.export_vtk(out.join("solution.vtk"))?;
    Ok(())
}

fn write_summary(summary: &RunSummary, out: &Path) -> eyre::Result<()> {
    let path = out.join("summary.json");
    let file = File::create(&path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn run(args: &RunArgs) -> eyre::Result<()> {
    let winding = if args.reorient {
        WindingPolicy::Reorient
    } else {
        WindingPolicy::Reject
    };
    let options = MeshOptions::default().with_winding(winding);
    let mesh = load_tetgen_mesh(&args.nodes, &args.elements, &options).wrap_err("mesh loading failed")?;
    let bcs = boundary_conditions(&mesh, args).wrap_err("invalid boundary conditions")?;
    let num_constraints = bcs.len();

    let mut settings = SolverSettings::default().with_tolerance(args.tol);
    if let Some(max_iter) = args.max_iter {
        settings = settings.with_max_iter(max_iter);
    }
    let problem = LaplaceProblem::new(&mesh, bcs)
        .with_settings(settings)
        .with_initial_guess(InitialGuess::Uniform(args.initial_guess));

    let summary = |converged, iterations, relative_residual| RunSummary {
        num_nodes: mesh.num_nodes(),
        num_elements: mesh.num_elements(),
        element_type: mesh.element_type(),
        num_constraints,
        converged,
        iterations,
        relative_residual,
        settings: &settings,
    };

    match problem.solve() {
        Ok(solution) => {
            write_outputs(&mesh, &solution.field, &args.out).wrap_err("export failed")?;
            write_summary(
                &summary(true, solution.iterations, solution.relative_residual),
                &args.out,
            )?;
            println!(
                "Solved for {} nodes in {} iterations, results written to {}",
                mesh.num_nodes(),
                solution.iterations,
                args.out.display()
            );
            Ok(())
        }
        Err(Error::Convergence(err)) => {
            let field = solution_field(&mesh, &err.last_iterate)?;
            write_outputs(&mesh, &field, &args.out).wrap_err("export of last iterate failed")?;
            write_summary(&summary(false, err.iterations, err.relative_residual), &args.out)?;
            Err(eyre::Report::new(*err).wrap_err(format!(
                "solve did not converge, last iterate written to {}",
                args.out.display()
            )))
        }
        Err(err) => Err(eyre::Report::new(err).wrap_err("solve failed")),
    }
}

fn generate(args: &GenerateArgs) -> eyre::Result<()> {
    let mesh = match args.element {
        GeneratedElement::Quad4 => create_rectangular_quad_mesh(args.width, args.height, args.nx, args.ny),
        GeneratedElement::Tri3 => create_rectangular_tri_mesh(args.width, args.height, args.nx, args.ny),
        GeneratedElement::Hex8 => create_box_hex_mesh([args.width, args.height, args.depth], [args.nx, args.ny, args.nz]),
        GeneratedElement::Tet4 => create_box_tet_mesh([args.width, args.height, args.depth], [args.nx, args.ny, args.nz]),
    }
    .wrap_err("mesh generation failed")?;

    std::fs::create_dir_all(&args.out)
        .wrap_err_with(|| format!("failed to create output directory {}", args.out.display()))?;
    save_tetgen_mesh(&mesh, args.out.join("mesh.node"), args.out.join("mesh.ele"))?;
    println!(
        "Wrote {} nodes and {} {} elements to {}",
        mesh.num_nodes(),
        mesh.num_elements(),
        mesh.element_type(),
        args.out.display()
    );
    Ok(())
}
