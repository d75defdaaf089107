//! Nodal fields with named variables.
use crate::error::FieldError;
use crate::mesh::{IdMap, Mesh};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Name of the variable holding node coordinates in a geometric field.
pub const GEOMETRY_VARIABLE: &str = "geometry";

/// Name of the variable written by the Laplace solve.
pub const SOLUTION_VARIABLE: &str = "solution";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// Fixed at creation, such as node coordinates.
    Geometric,
    /// Written by the solver.
    Dependent,
}

/// A named variable with a fixed number of components per node.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    num_components: usize,
    // Stored node by node
    values: Vec<f64>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// All values, stored node by node in the node order of the mesh.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The values of all components at the node with the given dense index.
    pub fn node_values(&self, node_index: usize) -> &[f64] {
        let n = self.num_components;
        &self.values[n * node_index..n * (node_index + 1)]
    }
}

/// Values associated with (node, component) pairs for one or more named variables.
///
/// A field is defined on all nodes of the mesh it was created from, in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    node_ids: IdMap,
    variables: Vec<Variable>,
}

impl Field {
    /// Creates a field without variables on the nodes of the mesh.
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            node_ids: mesh.node_ids().clone(),
            variables: Vec::new(),
        }
    }

    /// Creates a field with an immutable [`GEOMETRY_VARIABLE`] holding the mesh coordinates.
    pub fn geometric(mesh: &Mesh) -> Self {
        let mut field = Self::new(mesh);
        field.variables.push(Variable {
            name: GEOMETRY_VARIABLE.to_string(),
            kind: VariableKind::Geometric,
            num_components: mesh.dim(),
            values: mesh.coordinates().to_vec(),
        });
        field
    }

    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    pub fn node_ids(&self) -> &IdMap {
        &self.node_ids
    }

    /// Adds a zero-initialized variable.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        num_components: usize,
    ) -> Result<&mut Self, FieldError> {
        let name = name.into();
        if self.variable(&name).is_some() {
            return Err(FieldError::DuplicateVariable { name });
        }
        self.variables.push(Variable {
            name,
            kind,
            num_components,
            values: vec![0.0; num_components * self.num_nodes()],
        });
        Ok(self)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn try_variable(&self, name: &str) -> Result<&Variable, FieldError> {
        self.variable(name).ok_or_else(|| FieldError::UnknownVariable {
            name: name.to_string(),
        })
    }

    fn try_variable_mut(&mut self, name: &str) -> Result<&mut Variable, FieldError> {
        let variable = self
            .variables
            .iter_mut()
            .find(|variable| variable.name == name)
            .ok_or_else(|| FieldError::UnknownVariable {
                name: name.to_string(),
            })?;
        if variable.kind == VariableKind::Geometric {
            return Err(FieldError::ImmutableVariable {
                name: name.to_string(),
            });
        }
        Ok(variable)
    }

    fn value_index(&self, variable: &Variable, node_id: usize, component: usize) -> Result<usize, FieldError> {
        let node_index = self
            .node_ids
            .index_of(node_id)
            .ok_or(FieldError::UnknownNode { node_id })?;
        if component >= variable.num_components {
            return Err(FieldError::ComponentOutOfRange {
                component,
                num_components: variable.num_components,
            });
        }
        Ok(variable.num_components * node_index + component)
    }

    pub fn value(&self, name: &str, node_id: usize, component: usize) -> Result<f64, FieldError> {
        let variable = self.try_variable(name)?;
        let index = self.value_index(variable, node_id, component)?;
        Ok(variable.values[index])
    }

    pub fn set_value(&mut self, name: &str, node_id: usize, component: usize, value: f64) -> Result<(), FieldError> {
        let index = {
            let variable = self.try_variable(name)?;
            self.value_index(variable, node_id, component)?
        };
        self.try_variable_mut(name)?.values[index] = value;
        Ok(())
    }

    /// The values of one component at all nodes, in node order.
    pub fn component_values(&self, name: &str, component: usize) -> Result<Vec<f64>, FieldError> {
        let variable = self.try_variable(name)?;
        let n = variable.num_components;
        if component >= n {
            return Err(FieldError::ComponentOutOfRange {
                component,
                num_components: n,
            });
        }
        Ok(variable.values.iter().skip(component).step_by(n).copied().collect())
    }

    /// Overwrites a variable from a vector with one entry per degree of freedom.
    ///
    /// Degree of freedom `num_components * node_index + component` holds the value of
    /// `component` at the node with dense index `node_index`.
    pub fn set_from_dof_vector(&mut self, name: &str, dofs: &DVector<f64>) -> Result<(), FieldError> {
        let variable = self.try_variable_mut(name)?;
        if dofs.len() != variable.values.len() {
            return Err(FieldError::NodeCountMismatch {
                expected: variable.values.len(),
                found: dofs.len(),
            });
        }
        variable.values.copy_from_slice(dofs.as_slice());
        Ok(())
    }

    /// The values of a variable as a degree of freedom vector.
    pub fn dof_vector(&self, name: &str) -> Result<DVector<f64>, FieldError> {
        let variable = self.try_variable(name)?;
        Ok(DVector::from_column_slice(&variable.values))
    }
}
