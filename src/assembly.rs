//! Assembly of the global Laplace stiffness system.
//!
//! The local stiffness matrix of an element is
//!
//! ```text
//! K_ij = sum_q w_q det(J_q) (J_q^{-T} g_i(xi_q)) . (J_q^{-T} g_j(xi_q)),
//! ```
//!
//! where `g_i` is the reference gradient of basis function `i` and `J_q` the Jacobian of the
//! map from reference to physical coordinates at quadrature point `xi_q`. Local matrices are
//! scattered into a CSR matrix whose sparsity pattern is determined by the mesh connectivity.
use crate::basis::Basis;
use crate::element::reference_jacobian;
use crate::error::AssemblyError;
use crate::field::{Field, GEOMETRY_VARIABLE};
use crate::mesh::Mesh;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::csr::CsrRowMut;
use nalgebra_sparse::CsrMatrix;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// A global linear system `A u = b` with one degree of freedom per node.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: CsrMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl LinearSystem {
    pub fn num_dofs(&self) -> usize {
        self.rhs.len()
    }
}

/// The right-hand side `f` of the Poisson problem `-Δu = f`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceTerm {
    Constant(f64),
    /// One value per node, in the node order of the mesh. The source is interpolated with the
    /// element basis.
    Nodal(Vec<f64>),
}

/// An assembler for CSR matrices.
#[derive(Debug, Default)]
pub struct CsrAssembler {
    // All members are buffers that help prevent unnecessary allocations
    // when assembling multiple matrices with the same assembler
    workspace: RefCell<CsrAssemblerWorkspace>,
}

#[derive(Debug)]
struct CsrAssemblerWorkspace {
    connectivity_permutation: Vec<usize>,
    element_matrix: DMatrix<f64>,
    element_vector: DVector<f64>,
    element_source: DVector<f64>,
}

impl Default for CsrAssemblerWorkspace {
    fn default() -> Self {
        Self {
            connectivity_permutation: Vec::new(),
            element_matrix: DMatrix::zeros(0, 0),
            element_vector: DVector::zeros(0),
            element_source: DVector::zeros(0),
        }
    }
}

impl CsrAssembler {
    /// Computes the sparsity pattern of the global matrix: entry `(i, j)` is present whenever
    /// nodes `i` and `j` share an element.
    pub fn assemble_pattern(&self, mesh: &Mesh) -> SparsityPattern {
        // Collecting into a BTreeSet stores each matrix entry exactly once, and yields the
        // entries sorted by row and column
        let mut matrix_entries = BTreeSet::new();
        for element_nodes in mesh.connectivity() {
            for &node_i in element_nodes {
                for &node_j in element_nodes {
                    matrix_entries.insert((node_i, node_j));
                }
            }
        }

        let num_rows = mesh.num_nodes();
        let mut offsets = Vec::with_capacity(num_rows + 1);
        let mut column_indices = Vec::with_capacity(matrix_entries.len());

        offsets.push(0);
        for (i, j) in matrix_entries {
            while i + 1 > offsets.len() {
                // This condition indicates that we have reached a new row. We need to run this
                // in a while loop to correctly handle consecutive empty rows
                offsets.push(column_indices.len());
            }
            column_indices.push(j);
        }

        // Make sure we fill out the remaining offsets if the last rows are empty
        while offsets.len() < (num_rows + 1) {
            offsets.push(column_indices.len());
        }

        SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
            .expect("Entries collected from a BTreeSet form a valid sparsity pattern")
    }

    /// Assembles the global stiffness matrix and, if a source term is given, the load vector.
    pub fn assemble(
        &self,
        mesh: &Mesh,
        basis: &Basis,
        geometry: &Field,
        source: Option<&SourceTerm>,
    ) -> Result<LinearSystem, AssemblyError> {
        let pattern = self.assemble_pattern(mesh);
        let initial_matrix_values = vec![0.0; pattern.nnz()];
        let mut matrix = CsrMatrix::try_from_pattern_and_values(pattern, initial_matrix_values)
            .expect("Number of values matches the sparsity pattern");
        let mut rhs = DVector::zeros(mesh.num_nodes());
        self.assemble_into_csr(&mut matrix, &mut rhs, mesh, basis, geometry, source)?;
        info!(
            "Assembled global system with {} degrees of freedom and {} non-zeros",
            rhs.len(),
            matrix.nnz()
        );
        Ok(LinearSystem { matrix, rhs })
    }

    /// Adds the element contributions to an existing matrix and right-hand side.
    ///
    /// The matrix must contain the pattern returned by [`CsrAssembler::assemble_pattern`].
    pub fn assemble_into_csr(
        &self,
        csr: &mut CsrMatrix<f64>,
        rhs: &mut DVector<f64>,
        mesh: &Mesh,
        basis: &Basis,
        geometry: &Field,
        source: Option<&SourceTerm>,
    ) -> Result<(), AssemblyError> {
        if basis.element_type() != mesh.element_type() {
            return Err(AssemblyError::BasisMismatch {
                mesh: mesh.element_type(),
                basis: basis.element_type(),
            });
        }
        let geometry_values = geometry_values(mesh, geometry)?;
        if let Some(SourceTerm::Nodal(values)) = source {
            if values.len() != mesh.num_nodes() {
                return Err(AssemblyError::SourceMismatch {
                    expected: mesh.num_nodes(),
                    found: values.len(),
                });
            }
        }

        // Reuse previously allocated buffers
        let ws = &mut *self.workspace.borrow_mut();
        let connectivity_permutation = &mut ws.connectivity_permutation;
        let element_matrix = &mut ws.element_matrix;
        let element_vector = &mut ws.element_vector;
        let element_source = &mut ws.element_source;

        let dim = mesh.dim();
        let n = mesh.nodes_per_element();
        for (element_index, element_nodes) in mesh.connectivity().enumerate() {
            let coords = DMatrix::from_fn(dim, n, |i, j| geometry_values[dim * element_nodes[j] + i]);
            element_matrix.resize_mut(n, n, 0.0);
            element_vector.resize_vertically_mut(n, 0.0);
            element_matrix.fill(0.0);
            element_vector.fill(0.0);

            let nodal_source = match source {
                None => None,
                Some(SourceTerm::Constant(value)) => {
                    element_source.resize_vertically_mut(n, 0.0);
                    element_source.fill(*value);
                    Some(&*element_source)
                }
                Some(SourceTerm::Nodal(values)) => {
                    element_source.resize_vertically_mut(n, 0.0);
                    for (f_i, &node) in element_source.iter_mut().zip(element_nodes) {
                        *f_i = values[node];
                    }
                    Some(&*element_source)
                }
            };

            assemble_element_into(
                element_matrix,
                element_vector,
                basis,
                &coords,
                nodal_source,
                mesh.element_id(element_index),
            )?;

            connectivity_permutation.clear();
            connectivity_permutation.extend(0..n);
            connectivity_permutation.sort_unstable_by_key(|i| element_nodes[*i]);

            for (local_row, &global_row) in element_nodes.iter().enumerate() {
                let mut csr_row = csr.row_mut(global_row);
                add_element_row_to_csr_row(
                    &mut csr_row,
                    element_nodes,
                    connectivity_permutation,
                    element_matrix,
                    local_row,
                );
                rhs[global_row] += element_vector[local_row];
            }
        }

        debug!("Assembled {} element matrices", mesh.num_elements());
        Ok(())
    }
}

/// Assembles the global stiffness matrix with a zero right-hand side.
pub fn assemble(mesh: &Mesh, basis: &Basis, geometry: &Field) -> Result<LinearSystem, AssemblyError> {
    CsrAssembler::default().assemble(mesh, basis, geometry, None)
}

/// Assembles the global stiffness matrix and the load vector of the given source term.
pub fn assemble_with_source(
    mesh: &Mesh,
    basis: &Basis,
    geometry: &Field,
    source: &SourceTerm,
) -> Result<LinearSystem, AssemblyError> {
    CsrAssembler::default().assemble(mesh, basis, geometry, Some(source))
}

/// Computes the stiffness matrix of a single element with the given physical node coordinates
/// (one column per node).
///
/// `element_id` is only used to identify the element in errors.
pub fn assemble_element_stiffness(
    basis: &Basis,
    coords: &DMatrix<f64>,
    element_id: usize,
) -> Result<DMatrix<f64>, AssemblyError> {
    let n = basis.num_nodes();
    let dim = basis.reference_dim();
    if coords.nrows() != dim || coords.ncols() != n {
        return Err(AssemblyError::GeometryMismatch {
            message: format!(
                "expected {}x{} element coordinates, got {}x{}",
                dim,
                n,
                coords.nrows(),
                coords.ncols()
            ),
        });
    }
    let mut element_matrix = DMatrix::zeros(n, n);
    let mut element_vector = DVector::zeros(n);
    assemble_element_into(&mut element_matrix, &mut element_vector, basis, coords, None, element_id)?;
    Ok(element_matrix)
}

fn geometry_values<'a>(mesh: &Mesh, geometry: &'a Field) -> Result<&'a [f64], AssemblyError> {
    let variable = geometry
        .variable(GEOMETRY_VARIABLE)
        .ok_or_else(|| AssemblyError::GeometryMismatch {
            message: format!("field has no '{}' variable", GEOMETRY_VARIABLE),
        })?;
    if geometry.node_ids() != mesh.node_ids() {
        return Err(AssemblyError::GeometryMismatch {
            message: "field is not defined on the nodes of the mesh".to_string(),
        });
    }
    if variable.num_components() != mesh.dim() {
        return Err(AssemblyError::GeometryMismatch {
            message: format!(
                "geometry has {} components, but the mesh has dimension {}",
                variable.num_components(),
                mesh.dim()
            ),
        });
    }
    Ok(variable.values())
}

/// Computes the element stiffness matrix and, if nodal source values are given, the element
/// load vector `f_i = sum_q w_q det(J_q) phi_i(xi_q) f(xi_q)`.
#[allow(non_snake_case)]
fn assemble_element_into(
    element_matrix: &mut DMatrix<f64>,
    element_vector: &mut DVector<f64>,
    basis: &Basis,
    coords: &DMatrix<f64>,
    nodal_source: Option<&DVector<f64>>,
    element_id: usize,
) -> Result<(), AssemblyError> {
    for qp in basis.quadrature_points() {
        let J = reference_jacobian(coords, qp.gradients);
        let determinant = J.determinant();
        let inverted = AssemblyError::InvertedElement {
            element_id,
            determinant,
        };
        if !(determinant > 0.0) {
            return Err(inverted);
        }
        let J_inv_t = J.try_inverse().ok_or(inverted)?.transpose();
        // Physical gradients, one column per node
        let B = J_inv_t * qp.gradients;
        element_matrix.gemm_tr(qp.weight * determinant, &B, &B, 1.0);

        if let Some(f) = nodal_source {
            let f_q = qp.values.dot(f);
            element_vector.axpy(qp.weight * determinant * f_q, qp.values, 1.0);
        }
    }
    Ok(())
}

/// Adds row `local_row` of the element matrix to the corresponding row of the CSR matrix.
///
/// `element_nodes`: The global indices of nodes.
/// `sorted_permutation`: The local indices of nodes in the element, ordered such that the
///    corresponding global indices are sorted.
fn add_element_row_to_csr_row(
    row: &mut CsrRowMut<f64>,
    element_nodes: &[usize],
    sorted_permutation: &[usize],
    element_matrix: &DMatrix<f64>,
    local_row: usize,
) {
    assert_eq!(element_nodes.len(), sorted_permutation.len());
    assert_eq!(element_nodes.len(), element_matrix.ncols());

    let (column_indices, values) = row.cols_and_values_mut();

    let mut csr_col_idx_iter = column_indices.iter().copied().enumerate();

    for &local_col in sorted_permutation {
        let global_col = element_nodes[local_col];
        let (local_csr_col_idx, _) = csr_col_idx_iter
            .find(|(_, csr_col_idx)| *csr_col_idx == global_col)
            .expect("Could not find column index associated with node in CSR row");
        values[local_csr_col_idx] += element_matrix[(local_row, local_col)];
    }
}
