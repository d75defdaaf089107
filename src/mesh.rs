//! The mesh model: nodes, elements and their connectivity.
//!
//! Nodes and elements carry user-facing integer ids, which need not be contiguous. Internally,
//! both are stored densely, and every id is mapped to a dense index by an [`IdMap`].
//! Connectivity is stored in terms of dense node indices.
use crate::element::{min_jacobian_determinant, ElementType};
use crate::error::MeshError;
use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// A bijection between (arbitrary) integer ids and dense indices `0..len`.
///
/// Indices are assigned in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    ids: Vec<usize>,
    indices: BTreeMap<usize, usize>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an id and returns its dense index, or `None` if the id is already present.
    pub fn insert(&mut self, id: usize) -> Option<usize> {
        let index = self.ids.len();
        if self.indices.contains_key(&id) {
            return None;
        }
        self.indices.insert(id, index);
        self.ids.push(id);
        Some(index)
    }

    pub fn index_of(&self, id: usize) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn id_of(&self, index: usize) -> usize {
        self.ids[index]
    }

    pub fn contains(&self, id: usize) -> bool {
        self.indices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids ordered by dense index.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }
}

/// What to do with elements whose Jacobian determinant is non-positive when a mesh is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindingPolicy {
    /// Fail with [`MeshError::InvertedElement`].
    #[default]
    Reject,
    /// Reverse the orientation of inverted simplices and log a warning. Inverted tensor product
    /// elements and degenerate elements are still rejected.
    Reorient,
    /// Accept the elements as given. Inverted elements are then reported by assembly.
    Unchecked,
}

/// An immutable, validated finite element mesh with a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    dim: usize,
    element_type: ElementType,
    node_ids: IdMap,
    coordinates: Vec<f64>,
    num_node_attributes: usize,
    node_attributes: Vec<f64>,
    boundary_markers: Option<Vec<i64>>,
    element_ids: IdMap,
    connectivity: Vec<usize>,
    num_element_attributes: usize,
    element_attributes: Vec<f64>,
}

impl Mesh {
    /// Spatial dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn nodes_per_element(&self) -> usize {
        self.element_type.num_nodes()
    }

    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    pub fn num_elements(&self) -> usize {
        self.element_ids.len()
    }

    pub fn node_ids(&self) -> &IdMap {
        &self.node_ids
    }

    pub fn element_ids(&self) -> &IdMap {
        &self.element_ids
    }

    /// The dense index of the node with the given id.
    pub fn node_index(&self, node_id: usize) -> Option<usize> {
        self.node_ids.index_of(node_id)
    }

    pub fn node_id(&self, node_index: usize) -> usize {
        self.node_ids.id_of(node_index)
    }

    pub fn element_id(&self, element_index: usize) -> usize {
        self.element_ids.id_of(element_index)
    }

    /// All coordinates, stored node by node.
    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    pub fn node_coords(&self, node_index: usize) -> &[f64] {
        &self.coordinates[self.dim * node_index..self.dim * (node_index + 1)]
    }

    pub fn num_node_attributes(&self) -> usize {
        self.num_node_attributes
    }

    pub fn node_attributes(&self, node_index: usize) -> &[f64] {
        let n = self.num_node_attributes;
        &self.node_attributes[n * node_index..n * (node_index + 1)]
    }

    pub fn has_boundary_markers(&self) -> bool {
        self.boundary_markers.is_some()
    }

    pub fn boundary_marker(&self, node_index: usize) -> Option<i64> {
        self.boundary_markers
            .as_ref()
            .map(|markers| markers[node_index])
    }

    /// The dense node indices of an element.
    pub fn element_connectivity(&self, element_index: usize) -> &[usize] {
        let n = self.nodes_per_element();
        &self.connectivity[n * element_index..n * (element_index + 1)]
    }

    /// The node ids of an element, in local node order.
    pub fn element_node_ids(&self, element_index: usize) -> Vec<usize> {
        self.element_connectivity(element_index)
            .iter()
            .map(|&index| self.node_id(index))
            .collect()
    }

    /// Iterates over the dense connectivity of all elements.
    pub fn connectivity(&self) -> impl Iterator<Item = &[usize]> {
        self.connectivity.chunks_exact(self.nodes_per_element())
    }

    pub fn num_element_attributes(&self) -> usize {
        self.num_element_attributes
    }

    pub fn element_attributes(&self, element_index: usize) -> &[f64] {
        let n = self.num_element_attributes;
        &self.element_attributes[n * element_index..n * (element_index + 1)]
    }

    /// Node coordinates of an element, one column per local node.
    pub fn element_coordinates(&self, element_index: usize) -> DMatrix<f64> {
        let connectivity = self.element_connectivity(element_index);
        DMatrix::from_fn(self.dim, connectivity.len(), |i, j| {
            self.node_coords(connectivity[j])[i]
        })
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    id: usize,
    coords: Vec<f64>,
    attributes: Vec<f64>,
    marker: Option<i64>,
}

#[derive(Debug, Clone)]
struct ElementEntry {
    id: usize,
    node_ids: Vec<usize>,
    attributes: Vec<f64>,
}

/// Collects nodes and elements and validates them into a [`Mesh`].
///
/// Nothing is validated before [`MeshBuilder::build`], which either returns a complete mesh or
/// an error.
///
/// ```
/// use meshfem::element::ElementType;
/// use meshfem::mesh::MeshBuilder;
///
/// let mesh = MeshBuilder::new(2, ElementType::Tri3)
///     .node(1, &[0.0, 0.0])
///     .node(2, &[1.0, 0.0])
///     .node(3, &[0.0, 1.0])
///     .element(1, &[1, 2, 3])
///     .build()
///     .unwrap();
/// assert_eq!(mesh.num_nodes(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    dim: usize,
    element_type: ElementType,
    winding: WindingPolicy,
    nodes: Vec<NodeEntry>,
    elements: Vec<ElementEntry>,
}

impl MeshBuilder {
    pub fn new(dim: usize, element_type: ElementType) -> Self {
        Self {
            dim,
            element_type,
            winding: WindingPolicy::default(),
            nodes: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn winding(self, winding: WindingPolicy) -> Self {
        Self { winding, ..self }
    }

    pub fn node(self, id: usize, coords: &[f64]) -> Self {
        self.node_with_data(id, coords, &[], None)
    }

    pub fn node_with_data(mut self, id: usize, coords: &[f64], attributes: &[f64], marker: Option<i64>) -> Self {
        self.nodes.push(NodeEntry {
            id,
            coords: coords.to_vec(),
            attributes: attributes.to_vec(),
            marker,
        });
        self
    }

    pub fn element(self, id: usize, node_ids: &[usize]) -> Self {
        self.element_with_attributes(id, node_ids, &[])
    }

    pub fn element_with_attributes(mut self, id: usize, node_ids: &[usize], attributes: &[f64]) -> Self {
        self.elements.push(ElementEntry {
            id,
            node_ids: node_ids.to_vec(),
            attributes: attributes.to_vec(),
        });
        self
    }

    pub fn build(self) -> Result<Mesh, MeshError> {
        let dim = self.dim;
        let element_type = self.element_type;
        if dim != 2 && dim != 3 {
            return Err(MeshError::UnsupportedDimension { dim });
        }
        if element_type.reference_dim() != dim {
            return Err(MeshError::DimensionMismatch {
                expected: dim,
                found: element_type.reference_dim(),
            });
        }

        let num_node_attributes = self.nodes.first().map_or(0, |node| node.attributes.len());
        let has_markers = self.nodes.first().map_or(false, |node| node.marker.is_some());
        let mut node_ids = IdMap::new();
        let mut coordinates = Vec::with_capacity(dim * self.nodes.len());
        let mut node_attributes = Vec::with_capacity(num_node_attributes * self.nodes.len());
        let mut boundary_markers = Vec::new();
        for node in &self.nodes {
            if node.coords.len() != dim {
                return Err(MeshError::DimensionMismatch {
                    expected: dim,
                    found: node.coords.len(),
                });
            }
            if node.attributes.len() != num_node_attributes || node.marker.is_some() != has_markers {
                return Err(MeshError::InconsistentAttributes { id: node.id });
            }
            node_ids
                .insert(node.id)
                .ok_or(MeshError::DuplicateNodeId { node_id: node.id })?;
            coordinates.extend_from_slice(&node.coords);
            node_attributes.extend_from_slice(&node.attributes);
            boundary_markers.extend(node.marker);
        }

        let nodes_per_element = element_type.num_nodes();
        let num_element_attributes = self.elements.first().map_or(0, |element| element.attributes.len());
        let mut element_ids = IdMap::new();
        let mut connectivity = Vec::with_capacity(nodes_per_element * self.elements.len());
        let mut element_attributes = Vec::with_capacity(num_element_attributes * self.elements.len());
        for element in &self.elements {
            if element.node_ids.len() != nodes_per_element {
                return Err(MeshError::WrongNodeCount {
                    element_id: element.id,
                    expected: nodes_per_element,
                    found: element.node_ids.len(),
                });
            }
            if element.attributes.len() != num_element_attributes {
                return Err(MeshError::InconsistentAttributes { id: element.id });
            }
            element_ids
                .insert(element.id)
                .ok_or(MeshError::DuplicateElementId { element_id: element.id })?;
            for (i, &node_id) in element.node_ids.iter().enumerate() {
                if element.node_ids[..i].contains(&node_id) {
                    return Err(MeshError::RepeatedNode {
                        element_id: element.id,
                        node_id,
                    });
                }
                let index = node_ids
                    .index_of(node_id)
                    .ok_or(MeshError::DanglingNodeReference {
                        element_id: element.id,
                        node_id,
                    })?;
                connectivity.push(index);
            }
            element_attributes.extend_from_slice(&element.attributes);
        }

        let mut mesh = Mesh {
            dim,
            element_type,
            node_ids,
            coordinates,
            num_node_attributes,
            node_attributes,
            boundary_markers: has_markers.then_some(boundary_markers),
            element_ids,
            connectivity,
            num_element_attributes,
            element_attributes,
        };
        enforce_winding(&mut mesh, self.winding)?;

        debug!(
            "Built mesh with {} nodes and {} {} elements",
            mesh.num_nodes(),
            mesh.num_elements(),
            mesh.element_type
        );
        Ok(mesh)
    }
}

fn enforce_winding(mesh: &mut Mesh, policy: WindingPolicy) -> Result<(), MeshError> {
    if policy == WindingPolicy::Unchecked {
        return Ok(());
    }

    let n = mesh.nodes_per_element();
    let mut num_reoriented = 0;
    for element_index in 0..mesh.num_elements() {
        let determinant = min_jacobian_determinant(mesh.element_type, &mesh.element_coordinates(element_index));
        if determinant > 0.0 {
            continue;
        }

        let element_id = mesh.element_id(element_index);
        let inverted = MeshError::InvertedElement {
            element_id,
            determinant,
        };
        let permutation = match (policy, mesh.element_type.reorientation()) {
            (WindingPolicy::Reorient, Some(permutation)) if determinant < 0.0 => permutation,
            _ => return Err(inverted),
        };

        let old: Vec<usize> = mesh.element_connectivity(element_index).to_vec();
        let new = &mut mesh.connectivity[n * element_index..n * (element_index + 1)];
        for (new_index, &old_local) in new.iter_mut().zip(permutation) {
            *new_index = old[old_local];
        }

        let determinant = min_jacobian_determinant(mesh.element_type, &mesh.element_coordinates(element_index));
        if !(determinant > 0.0) {
            return Err(MeshError::InvertedElement {
                element_id,
                determinant,
            });
        }
        warn!("Reoriented inverted element {}", element_id);
        num_reoriented += 1;
    }

    if num_reoriented > 0 {
        warn!("Reoriented {} inverted elements", num_reoriented);
    }
    Ok(())
}
