//! Error types for mesh loading, assembly, boundary conditions and solving.
//!
//! Each stage of the pipeline has its own error type. [`Error`] wraps all of them so that
//! callers running the whole pipeline can use a single error type.
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::solver::ConvergenceError;

/// Identifies which of the two mesh files an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    Node,
    Element,
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node file"),
            Self::Element => write!(f, "element file"),
        }
    }
}

/// Errors that occur while reading node and element files.
///
/// Line numbers are 1-based and refer to physical lines, including comments and blank lines.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// The header could not be parsed, or an entity line does not have the number of tokens
    /// announced by the header.
    MalformedHeader { file: FileKind, line: usize, message: String },
    /// A token could not be parsed as the expected kind of number.
    InvalidToken { file: FileKind, line: usize, token: String },
    /// The file ends before all entities announced by the header have been read.
    TruncatedFile { file: FileKind, declared: usize, found: usize },
    /// An element refers to a node id that is not present in the node file.
    DanglingNodeReference { line: usize, element_id: usize, node_id: usize },
    /// The same node or element id appears twice.
    DuplicateId { file: FileKind, line: usize, id: usize },
    /// There is no element type with the given number of nodes in the given dimension.
    UnsupportedElement { dim: usize, nodes_per_element: usize },
    Io(std::io::Error),
    /// The parsed data does not form a valid mesh.
    Mesh(MeshError),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader { file, line, message } => {
                write!(f, "malformed {} at line {}: {}", file, line, message)
            }
            Self::InvalidToken { file, line, token } => {
                write!(f, "invalid token '{}' in {} at line {}", token, file, line)
            }
            Self::TruncatedFile { file, declared, found } => {
                write!(
                    f,
                    "truncated {}: header declares {} entries, but only {} were found",
                    file, declared, found
                )
            }
            Self::DanglingNodeReference {
                line,
                element_id,
                node_id,
            } => {
                write!(
                    f,
                    "element {} at line {} of the element file refers to unknown node {}",
                    element_id, line, node_id
                )
            }
            Self::DuplicateId { file, line, id } => {
                write!(f, "duplicate id {} in {} at line {}", id, file, line)
            }
            Self::UnsupportedElement { dim, nodes_per_element } => {
                write!(
                    f,
                    "unsupported element with {} nodes in {} dimensions",
                    nodes_per_element, dim
                )
            }
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Mesh(err) => write!(f, "invalid mesh: {}", err),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Mesh(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MeshError> for ParseError {
    fn from(err: MeshError) -> Self {
        Self::Mesh(err)
    }
}

/// Errors raised when a [`MeshBuilder`](crate::mesh::MeshBuilder) is finalized.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MeshError {
    UnsupportedDimension { dim: usize },
    /// The element type does not live in the spatial dimension of the mesh, or a node has the
    /// wrong number of coordinates.
    DimensionMismatch { expected: usize, found: usize },
    DuplicateNodeId { node_id: usize },
    DuplicateElementId { element_id: usize },
    DanglingNodeReference { element_id: usize, node_id: usize },
    WrongNodeCount { element_id: usize, expected: usize, found: usize },
    /// An element lists the same node more than once.
    RepeatedNode { element_id: usize, node_id: usize },
    /// Nodes or elements disagree on the number of attributes or on the presence of boundary
    /// markers.
    InconsistentAttributes { id: usize },
    /// An element has a non-positive Jacobian determinant in its reference configuration.
    InvertedElement { element_id: usize, determinant: f64 },
}

impl Display for MeshError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension { dim } => {
                write!(f, "unsupported spatial dimension {} (must be 2 or 3)", dim)
            }
            Self::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {}, found {}", expected, found)
            }
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate node id {}", node_id),
            Self::DuplicateElementId { element_id } => write!(f, "duplicate element id {}", element_id),
            Self::DanglingNodeReference { element_id, node_id } => {
                write!(f, "element {} refers to unknown node {}", element_id, node_id)
            }
            Self::WrongNodeCount {
                element_id,
                expected,
                found,
            } => write!(
                f,
                "element {} has {} nodes, but the element type requires {}",
                element_id, found, expected
            ),
            Self::RepeatedNode { element_id, node_id } => {
                write!(f, "element {} refers to node {} more than once", element_id, node_id)
            }
            Self::InconsistentAttributes { id } => {
                write!(f, "entity {} has attributes inconsistent with the rest of the mesh", id)
            }
            Self::InvertedElement {
                element_id,
                determinant,
            } => write!(
                f,
                "element {} is inverted or degenerate (Jacobian determinant {:e})",
                element_id, determinant
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// Errors raised while constructing a [`Basis`](crate::basis::Basis).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BasisError {
    /// The quadrature weights do not sum to the measure of the reference element.
    WeightSum { expected: f64, actual: f64 },
    /// A quadrature point does not have the dimension of the reference element.
    PointDimension { expected: usize, found: usize },
    /// The number of weights and points differ.
    RuleSize { weights: usize, points: usize },
    Quadrature(meshfem_quadrature::Error),
}

impl Display for BasisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightSum { expected, actual } => write!(
                f,
                "quadrature weights sum to {}, but the reference element has measure {}",
                actual, expected
            ),
            Self::PointDimension { expected, found } => write!(
                f,
                "quadrature point has dimension {}, expected {}",
                found, expected
            ),
            Self::RuleSize { weights, points } => {
                write!(f, "quadrature rule has {} weights but {} points", weights, points)
            }
            Self::Quadrature(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BasisError {}

impl From<meshfem_quadrature::Error> for BasisError {
    fn from(err: meshfem_quadrature::Error) -> Self {
        Self::Quadrature(err)
    }
}

/// Errors raised during global assembly.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssemblyError {
    /// The Jacobian determinant is non-positive (or not a number) at a quadrature point.
    InvertedElement { element_id: usize, determinant: f64 },
    /// The basis was built for a different element type than the one used by the mesh.
    BasisMismatch {
        mesh: crate::element::ElementType,
        basis: crate::element::ElementType,
    },
    /// The geometric field is missing or does not match the mesh.
    GeometryMismatch { message: String },
    /// A nodal source term does not have one value per node.
    SourceMismatch { expected: usize, found: usize },
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedElement {
                element_id,
                determinant,
            } => write!(
                f,
                "element {} is inverted or degenerate (Jacobian determinant {:e})",
                element_id, determinant
            ),
            Self::BasisMismatch { mesh, basis } => write!(
                f,
                "basis for {} elements cannot be used with a mesh of {} elements",
                basis, mesh
            ),
            Self::GeometryMismatch { message } => write!(f, "invalid geometric field: {}", message),
            Self::SourceMismatch { expected, found } => write!(
                f,
                "nodal source term has {} values, but the mesh has {} nodes",
                found, expected
            ),
        }
    }
}

impl std::error::Error for AssemblyError {}

/// Errors raised when recording or applying Dirichlet boundary conditions.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BoundaryConditionError {
    /// The degree of freedom is already fixed to a different value.
    ConflictingConstraint {
        node_id: usize,
        component: usize,
        existing: f64,
        requested: f64,
    },
    /// The node does not exist or the component is out of range.
    UnknownDof { node_id: usize, component: usize },
}

impl Display for BoundaryConditionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingConstraint {
                node_id,
                component,
                existing,
                requested,
            } => write!(
                f,
                "component {} of node {} is already fixed to {}, cannot fix it to {}",
                component, node_id, existing, requested
            ),
            Self::UnknownDof { node_id, component } => {
                write!(f, "no degree of freedom for component {} of node {}", component, node_id)
            }
        }
    }
}

impl std::error::Error for BoundaryConditionError {}

/// Errors raised by [`Field`](crate::field::Field) accessors.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldError {
    UnknownVariable { name: String },
    DuplicateVariable { name: String },
    /// Geometric variables cannot be modified after creation.
    ImmutableVariable { name: String },
    UnknownNode { node_id: usize },
    ComponentOutOfRange { component: usize, num_components: usize },
    /// A vector of values does not match the number of nodes times components.
    NodeCountMismatch { expected: usize, found: usize },
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { name } => write!(f, "unknown field variable '{}'", name),
            Self::DuplicateVariable { name } => write!(f, "field variable '{}' already exists", name),
            Self::ImmutableVariable { name } => write!(f, "field variable '{}' is immutable", name),
            Self::UnknownNode { node_id } => write!(f, "node {} is not part of the field", node_id),
            Self::ComponentOutOfRange {
                component,
                num_components,
            } => write!(
                f,
                "component {} is out of range for a variable with {} components",
                component, num_components
            ),
            Self::NodeCountMismatch { expected, found } => {
                write!(f, "expected {} values, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for FieldError {}

/// Any error produced by the library.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Parse(ParseError),
    Mesh(MeshError),
    Basis(BasisError),
    Assembly(AssemblyError),
    BoundaryCondition(BoundaryConditionError),
    Field(FieldError),
    Convergence(Box<ConvergenceError>),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{}", err),
            Self::Mesh(err) => write!(f, "{}", err),
            Self::Basis(err) => write!(f, "{}", err),
            Self::Assembly(err) => write!(f, "{}", err),
            Self::BoundaryCondition(err) => write!(f, "{}", err),
            Self::Field(err) => write!(f, "{}", err),
            Self::Convergence(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Mesh(err) => Some(err),
            Self::Basis(err) => Some(err),
            Self::Assembly(err) => Some(err),
            Self::BoundaryCondition(err) => Some(err),
            Self::Field(err) => Some(err),
            Self::Convergence(err) => Some(err.as_ref()),
        }
    }
}

macro_rules! impl_from_error {
    ($error:ty, $variant:ident) => {
        impl From<$error> for Error {
            fn from(err: $error) -> Self {
                Self::$variant(err)
            }
        }
    };
}

impl_from_error!(ParseError, Parse);
impl_from_error!(MeshError, Mesh);
impl_from_error!(BasisError, Basis);
impl_from_error!(AssemblyError, Assembly);
impl_from_error!(BoundaryConditionError, BoundaryCondition);
impl_from_error!(FieldError, Field);

impl From<ConvergenceError> for Error {
    fn from(err: ConvergenceError) -> Self {
        Self::Convergence(Box::new(err))
    }
}
