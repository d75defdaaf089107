//! Basic procedural mesh generation routines.
//!
//! All generators produce axis-aligned meshes of `[0, width] x [0, height] (x [0, depth])`.
//! Node ids start at 1 and are numbered with x varying fastest, then y, then z. Element ids
//! start at 1 as well.
use crate::element::ElementType;
use crate::error::MeshError;
use crate::mesh::{Mesh, MeshBuilder};

/// Splits each hexahedron (with local nodes ordered as [`ElementType::Hex8`]) into six
/// positively oriented tetrahedra sharing the diagonal from local node 0 to local node 6.
const HEX_TO_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 5, 1, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 4, 5, 6],
    [0, 7, 4, 6],
];

struct Grid2d {
    nx: usize,
    ny: usize,
}

impl Grid2d {
    fn node_id(&self, i: usize, j: usize) -> usize {
        (self.nx + 1) * j + i + 1
    }

    /// Corner node ids of cell `(i, j)`, counter-clockwise from the lower left.
    fn cell(&self, i: usize, j: usize) -> [usize; 4] {
        [
            self.node_id(i, j),
            self.node_id(i + 1, j),
            self.node_id(i + 1, j + 1),
            self.node_id(i, j + 1),
        ]
    }
}

struct Grid3d {
    nx: usize,
    ny: usize,
    nz: usize,
}

impl Grid3d {
    fn node_id(&self, i: usize, j: usize, k: usize) -> usize {
        (self.nx + 1) * (self.ny + 1) * k + (self.nx + 1) * j + i + 1
    }

    /// Corner node ids of cell `(i, j, k)` in [`ElementType::Hex8`] order.
    fn cell(&self, i: usize, j: usize, k: usize) -> [usize; 8] {
        [
            self.node_id(i, j, k),
            self.node_id(i + 1, j, k),
            self.node_id(i + 1, j + 1, k),
            self.node_id(i, j + 1, k),
            self.node_id(i, j, k + 1),
            self.node_id(i + 1, j, k + 1),
            self.node_id(i + 1, j + 1, k + 1),
            self.node_id(i, j + 1, k + 1),
        ]
    }
}

fn rectangle_nodes(builder: MeshBuilder, width: f64, height: f64, nx: usize, ny: usize) -> MeshBuilder {
    let grid = Grid2d { nx, ny };
    let mut builder = builder;
    for j in 0..=grid.ny {
        for i in 0..=grid.nx {
            let x = width * i as f64 / nx as f64;
            let y = height * j as f64 / ny as f64;
            builder = builder.node(grid.node_id(i, j), &[x, y]);
        }
    }
    builder
}

fn box_nodes(builder: MeshBuilder, extents: [f64; 3], cells: [usize; 3]) -> MeshBuilder {
    let [nx, ny, nz] = cells;
    let grid = Grid3d { nx, ny, nz };
    let mut builder = builder;
    for k in 0..=grid.nz {
        for j in 0..=grid.ny {
            for i in 0..=grid.nx {
                let x = extents[0] * i as f64 / nx as f64;
                let y = extents[1] * j as f64 / ny as f64;
                let z = extents[2] * k as f64 / nz as f64;
                builder = builder.node(grid.node_id(i, j, k), &[x, y, z]);
            }
        }
    }
    builder
}

/// Generates a uniform mesh of bilinear quadrilaterals with `nx x ny` cells.
///
/// Returns an empty mesh if `nx` or `ny` is zero.
pub fn create_rectangular_quad_mesh(width: f64, height: f64, nx: usize, ny: usize) -> Result<Mesh, MeshError> {
    let builder = MeshBuilder::new(2, ElementType::Quad4);
    if nx == 0 || ny == 0 {
        return builder.build();
    }

    let grid = Grid2d { nx, ny };
    let mut builder = rectangle_nodes(builder, width, height, nx, ny);
    let mut element_id = 1;
    for j in 0..ny {
        for i in 0..nx {
            builder = builder.element(element_id, &grid.cell(i, j));
            element_id += 1;
        }
    }
    builder.build()
}

/// Generates a uniform triangle mesh by splitting each of the `nx x ny` cells along the
/// diagonal from its lower left to its upper right corner.
pub fn create_rectangular_tri_mesh(width: f64, height: f64, nx: usize, ny: usize) -> Result<Mesh, MeshError> {
    let builder = MeshBuilder::new(2, ElementType::Tri3);
    if nx == 0 || ny == 0 {
        return builder.build();
    }

    let grid = Grid2d { nx, ny };
    let mut builder = rectangle_nodes(builder, width, height, nx, ny);
    let mut element_id = 1;
    for j in 0..ny {
        for i in 0..nx {
            let [a, b, c, d] = grid.cell(i, j);
            builder = builder
                .element(element_id, &[a, b, c])
                .element(element_id + 1, &[a, c, d]);
            element_id += 2;
        }
    }
    builder.build()
}

/// Generates a uniform mesh of trilinear hexahedra with `nx x ny x nz` cells.
pub fn create_box_hex_mesh(extents: [f64; 3], cells: [usize; 3]) -> Result<Mesh, MeshError> {
    let builder = MeshBuilder::new(3, ElementType::Hex8);
    if cells.contains(&0) {
        return builder.build();
    }

    let [nx, ny, nz] = cells;
    let grid = Grid3d { nx, ny, nz };
    let mut builder = box_nodes(builder, extents, cells);
    let mut element_id = 1;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                builder = builder.element(element_id, &grid.cell(i, j, k));
                element_id += 1;
            }
        }
    }
    builder.build()
}

/// Generates a uniform tetrahedral mesh by splitting each of the `nx x ny x nz` cells into
/// six tetrahedra.
///
/// All cells are split along the same diagonal, so the resulting mesh is conforming.
pub fn create_box_tet_mesh(extents: [f64; 3], cells: [usize; 3]) -> Result<Mesh, MeshError> {
    let builder = MeshBuilder::new(3, ElementType::Tet4);
    if cells.contains(&0) {
        return builder.build();
    }

    let [nx, ny, nz] = cells;
    let grid = Grid3d { nx, ny, nz };
    let mut builder = box_nodes(builder, extents, cells);
    let mut element_id = 1;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let hex = grid.cell(i, j, k);
                for tet in HEX_TO_TETS {
                    builder = builder.element(element_id, &tet.map(|local| hex[local]));
                    element_id += 1;
                }
            }
        }
    }
    builder.build()
}

pub fn create_unit_square_quad_mesh(cells_per_dim: usize) -> Result<Mesh, MeshError> {
    create_rectangular_quad_mesh(1.0, 1.0, cells_per_dim, cells_per_dim)
}

pub fn create_unit_square_tri_mesh(cells_per_dim: usize) -> Result<Mesh, MeshError> {
    create_rectangular_tri_mesh(1.0, 1.0, cells_per_dim, cells_per_dim)
}

pub fn create_unit_cube_hex_mesh(cells_per_dim: usize) -> Result<Mesh, MeshError> {
    create_box_hex_mesh([1.0; 3], [cells_per_dim; 3])
}

pub fn create_unit_cube_tet_mesh(cells_per_dim: usize) -> Result<Mesh, MeshError> {
    create_box_tet_mesh([1.0; 3], [cells_per_dim; 3])
}
