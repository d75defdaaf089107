//! Export to legacy VTK files through an intermediate interchange representation.
//!
//! VTK refers to points by their 0-based position in the point list, while meshes refer to nodes
//! by arbitrary ids. [`renumber_node_ids`] performs the translation.
use crate::element::ElementType;
use crate::error::FieldError;
use crate::field::Field;
use crate::mesh::Mesh;
use eyre::eyre;
use log::info;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType as VtkElementType, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Connectivity of a block of cells of the same type, in terms of 0-based point indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBlock {
    pub element_type: ElementType,
    /// Point indices of all cells, cell by cell.
    pub connectivity: Vec<usize>,
}

impl CellBlock {
    pub fn num_cells(&self) -> usize {
        self.connectivity.len() / self.element_type.num_nodes()
    }

    pub fn cells(&self) -> impl Iterator<Item = &[usize]> {
        self.connectivity.chunks_exact(self.element_type.num_nodes())
    }
}

/// A named array with `num_components` values per point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointData {
    pub name: String,
    pub num_components: usize,
    pub values: Vec<f64>,
}

/// Points, cells and point data in the form expected by visualization tools.
#[derive(Debug, Clone, PartialEq)]
pub struct InterchangeMesh {
    /// Point coordinates. Two-dimensional points are padded with a zero z-coordinate.
    pub points: Vec<[f64; 3]>,
    pub cells: CellBlock,
    pub point_data: Vec<PointData>,
}

/// Maps node ids to 0-based point indices, in the node order of the mesh.
///
/// Returns `None` if any id is not a node of the mesh.
pub fn renumber_node_ids(mesh: &Mesh, node_ids: &[usize]) -> Option<Vec<usize>> {
    node_ids.iter().map(|&id| mesh.node_index(id)).collect()
}

pub fn vtk_cell_type(element_type: ElementType) -> CellType {
    match element_type {
        ElementType::Tri3 => CellType::Triangle,
        ElementType::Tri6 => CellType::QuadraticTriangle,
        ElementType::Quad4 => CellType::Quad,
        ElementType::Tet4 => CellType::Tetra,
        ElementType::Tet10 => CellType::QuadraticTetra,
        ElementType::Hex8 => CellType::Hexahedron,
    }
}

impl InterchangeMesh {
    /// Creates an interchange mesh without point data.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let points = (0..mesh.num_nodes())
            .map(|node_index| {
                let mut point = [0.0; 3];
                point[..mesh.dim()].copy_from_slice(mesh.node_coords(node_index));
                point
            })
            .collect();

        let mut connectivity = Vec::with_capacity(mesh.num_elements() * mesh.nodes_per_element());
        for element_index in 0..mesh.num_elements() {
            let indices = renumber_node_ids(mesh, &mesh.element_node_ids(element_index))
                .expect("Element node ids of a valid mesh are always nodes of the mesh");
            connectivity.extend(indices);
        }

        Self {
            points,
            cells: CellBlock {
                element_type: mesh.element_type(),
                connectivity,
            },
            point_data: Vec::new(),
        }
    }

    /// Creates an interchange mesh with one point data array holding all components of the
    /// given field variable.
    pub fn from_field(mesh: &Mesh, field: &Field, variable: &str) -> Result<Self, FieldError> {
        let field_variable = field.variable(variable).ok_or_else(|| FieldError::UnknownVariable {
            name: variable.to_string(),
        })?;
        let mut values = Vec::with_capacity(field_variable.values().len());
        for node_index in 0..mesh.num_nodes() {
            let node_id = mesh.node_id(node_index);
            let field_index = field
                .node_ids()
                .index_of(node_id)
                .ok_or(FieldError::UnknownNode { node_id })?;
            values.extend_from_slice(field_variable.node_values(field_index));
        }
        Self::from_mesh(mesh).with_point_data(variable, field_variable.num_components(), values)
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Attaches a named point data array with `num_components` values per point.
    pub fn with_point_data(
        mut self,
        name: impl Into<String>,
        num_components: usize,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        let name = name.into();
        if self.point_data.iter().any(|data| data.name == name) {
            return Err(FieldError::DuplicateVariable { name });
        }
        if values.len() != num_components * self.num_points() {
            return Err(FieldError::NodeCountMismatch {
                expected: num_components * self.num_points(),
                found: values.len(),
            });
        }
        self.point_data.push(PointData {
            name,
            num_components,
            values,
        });
        Ok(self)
    }

    /// Builds a legacy VTK unstructured grid.
    pub fn to_vtk(&self, title: impl Into<String>) -> Vtk {
        let points: Vec<f64> = self.points.iter().flatten().copied().collect();

        // Legacy cell layout: N, i_1, ..., i_N for every cell
        let nodes_per_cell = self.cells.element_type.num_nodes();
        let mut vertices = Vec::with_capacity(self.cells.num_cells() * (nodes_per_cell + 1));
        for cell in self.cells.cells() {
            vertices.push(nodes_per_cell as u32);
            vertices.extend(cell.iter().map(|&index| index as u32));
        }
        let cell_type = vtk_cell_type(self.cells.element_type);

        let point_attributes = self
            .point_data
            .iter()
            .map(|data| {
                Attribute::DataArray(DataArray {
                    name: data.name.clone(),
                    elem: VtkElementType::Scalars {
                        num_comp: data.num_components as u32,
                        lookup_table: None,
                    },
                    data: data.values.clone().into(),
                })
            })
            .collect();

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: self.cells.num_cells() as u32,
                    vertices,
                },
                types: vec![cell_type; self.cells.num_cells()],
            },
            data: Attributes {
                point: point_attributes,
                cell: Vec::new(),
            },
        };

        Vtk {
            version: Version { major: 4, minor: 1 },
            title: title.into(),
            byte_order: ByteOrder::BigEndian,
            data: DataSet::UnstructuredGrid {
                meta: None,
                pieces: vec![Piece::Inline(Box::new(piece))],
            },
            file_path: None,
        }
    }

    /// Writes a legacy `.vtk` file. The file stem is used as the title.
    pub fn export_vtk(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        self.to_vtk(title)
            .export(path)
            .map_err(|err| eyre!("failed to export VTK file {}: {:?}", path.display(), err))?;
        info!(
            "Wrote {} points and {} cells to {}",
            self.num_points(),
            self.cells.num_cells(),
            path.display()
        );
        Ok(())
    }
}
