//! Dirichlet boundary conditions and their elimination from a linear system.
use crate::assembly::LinearSystem;
use crate::error::BoundaryConditionError;
use crate::mesh::Mesh;
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeMap;

/// A set of fixed degrees of freedom, identified by `(node id, component)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryConditions {
    fixed: BTreeMap<(usize, usize), f64>,
}

impl BoundaryConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes a degree of freedom to the given value.
    ///
    /// Fixing a degree of freedom again with the same value has no effect. Fixing it with a
    /// different value is an error, and leaves the existing constraint in place.
    pub fn fix(&mut self, node_id: usize, component: usize, value: f64) -> Result<(), BoundaryConditionError> {
        match self.fixed.get(&(node_id, component)) {
            Some(&existing) if existing == value => Ok(()),
            Some(&existing) => Err(BoundaryConditionError::ConflictingConstraint {
                node_id,
                component,
                existing,
                requested: value,
            }),
            None => {
                self.fixed.insert((node_id, component), value);
                Ok(())
            }
        }
    }

    /// Fixes the first component of every node with the given boundary marker.
    ///
    /// Returns the number of nodes with the marker.
    pub fn fix_marker(&mut self, mesh: &Mesh, marker: i64, value: f64) -> Result<usize, BoundaryConditionError> {
        self.fix_nodes_matching(mesh, value, |node_index| mesh.boundary_marker(node_index) == Some(marker))
    }

    /// Fixes the first component of every node whose id and coordinates satisfy the predicate.
    ///
    /// Returns the number of matching nodes.
    pub fn fix_nodes_where(
        &mut self,
        mesh: &Mesh,
        predicate: impl Fn(usize, &[f64]) -> bool,
        value: f64,
    ) -> Result<usize, BoundaryConditionError> {
        self.fix_nodes_matching(mesh, value, |node_index| {
            predicate(mesh.node_id(node_index), mesh.node_coords(node_index))
        })
    }

    fn fix_nodes_matching(
        &mut self,
        mesh: &Mesh,
        value: f64,
        matches: impl Fn(usize) -> bool,
    ) -> Result<usize, BoundaryConditionError> {
        let mut count = 0;
        for node_index in (0..mesh.num_nodes()).filter(|&i| matches(i)) {
            self.fix(mesh.node_id(node_index), 0, value)?;
            count += 1;
        }
        Ok(count)
    }

    /// The value a degree of freedom is fixed to, if any.
    pub fn value(&self, node_id: usize, component: usize) -> Option<f64> {
        self.fixed.get(&(node_id, component)).copied()
    }

    pub fn is_fixed(&self, node_id: usize, component: usize) -> bool {
        self.fixed.contains_key(&(node_id, component))
    }

    pub fn len(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }

    /// Iterates over `((node id, component), value)`, ordered by node id and component.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.fixed.iter().map(|(&dof, &value)| (dof, value))
    }
}

/// The system restricted to the free degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedSystem {
    matrix: CsrMatrix<f64>,
    rhs: DVector<f64>,
    free_dofs: Vec<usize>,
    // Prescribed values at constrained degrees of freedom, zero elsewhere
    prescribed: DVector<f64>,
}

impl ConstrainedSystem {
    /// The matrix `A_ff` coupling the free degrees of freedom.
    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    /// The reduced right-hand side `b_f - A_fc u_c`.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Global indices of the free degrees of freedom, in increasing order.
    pub fn free_dofs(&self) -> &[usize] {
        &self.free_dofs
    }

    pub fn num_free_dofs(&self) -> usize {
        self.free_dofs.len()
    }

    /// Total number of degrees of freedom, free and constrained.
    pub fn num_dofs(&self) -> usize {
        self.prescribed.len()
    }

    /// Builds the full solution vector from values at the free degrees of freedom. Constrained
    /// degrees of freedom take exactly their prescribed values.
    ///
    /// # Panics
    ///
    /// Panics if `free_values` does not have one entry per free degree of freedom.
    pub fn expand(&self, free_values: &DVector<f64>) -> DVector<f64> {
        assert_eq!(free_values.len(), self.num_free_dofs(), "One value per free DOF required");
        let mut full = self.prescribed.clone();
        for (&dof, &value) in self.free_dofs.iter().zip(free_values.iter()) {
            full[dof] = value;
        }
        full
    }

    /// Extracts the values at the free degrees of freedom from a full vector.
    ///
    /// # Panics
    ///
    /// Panics if `full` does not have one entry per degree of freedom.
    pub fn restrict(&self, full: &DVector<f64>) -> DVector<f64> {
        assert_eq!(full.len(), self.num_dofs(), "One value per DOF required");
        DVector::from_iterator(self.free_dofs.len(), self.free_dofs.iter().map(|&dof| full[dof]))
    }
}

/// Eliminates the constrained degrees of freedom from the system.
///
/// The constrained values are moved to the right-hand side, `b_f <- b_f - A_fc u_c`, and the
/// rows and columns of the constrained degrees of freedom are removed. The reduced matrix is
/// symmetric whenever the original matrix is.
pub fn apply(
    system: &LinearSystem,
    mesh: &Mesh,
    boundary_conditions: &BoundaryConditions,
) -> Result<ConstrainedSystem, BoundaryConditionError> {
    let num_dofs = system.num_dofs();
    let num_components = if mesh.num_nodes() == 0 {
        1
    } else {
        num_dofs / mesh.num_nodes()
    };

    let mut prescribed = DVector::zeros(num_dofs);
    let mut is_constrained = vec![false; num_dofs];
    for ((node_id, component), value) in boundary_conditions.iter() {
        let unknown = BoundaryConditionError::UnknownDof { node_id, component };
        let node_index = mesh.node_index(node_id).ok_or(unknown.clone())?;
        if component >= num_components {
            return Err(unknown);
        }
        let dof = num_components * node_index + component;
        prescribed[dof] = value;
        is_constrained[dof] = true;
    }

    let free_dofs: Vec<usize> = (0..num_dofs).filter(|&dof| !is_constrained[dof]).collect();
    let mut free_index = vec![None; num_dofs];
    for (i, &dof) in free_dofs.iter().enumerate() {
        free_index[dof] = Some(i);
    }

    let mut offsets = Vec::with_capacity(free_dofs.len() + 1);
    let mut column_indices = Vec::new();
    let mut values = Vec::new();
    let mut rhs = DVector::zeros(free_dofs.len());
    offsets.push(0);
    for (i, &dof) in free_dofs.iter().enumerate() {
        rhs[i] = system.rhs[dof];
        let row = system.matrix.row(dof);
        for (&col, &a_ij) in row.col_indices().iter().zip(row.values()) {
            match free_index[col] {
                // The map from global to free indices is monotone, so columns stay sorted
                Some(j) => {
                    column_indices.push(j);
                    values.push(a_ij);
                }
                None => rhs[i] -= a_ij * prescribed[col],
            }
        }
        offsets.push(column_indices.len());
    }

    let num_free = free_dofs.len();
    let matrix = CsrMatrix::try_from_csr_data(num_free, num_free, offsets, column_indices, values)
        .expect("Restriction of a valid CSR matrix is a valid CSR matrix");
    debug!(
        "Eliminated {} constrained degrees of freedom, {} remain free",
        num_dofs - num_free,
        num_free
    );

    Ok(ConstrainedSystem {
        matrix,
        rhs,
        free_dofs,
        prescribed,
    })
}
