//! TetGen/Triangle style `.node` and `.ele` files.
//!
//! A node file starts with the header `<count> <dim> <num_attributes> <has_markers>`, followed by
//! one line per node: `<id> <x> <y> [<z>] [<attributes>...] [<marker>]`. An element file starts
//! with `<count> <nodes_per_element> <num_attributes>`, followed by one line per element:
//! `<id> <node ids>... [<attributes>...]`. Blank lines and everything following a `#` are
//! ignored.
//!
//! Element nodes are listed in the local order of the corresponding reference element
//! (see [`ElementType`]).
use crate::element::ElementType;
use crate::error::{FileKind, ParseError};
use crate::mesh::{Mesh, MeshBuilder, WindingPolicy};
use eyre::Context;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Options controlling how meshes are read.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshOptions {
    pub winding: WindingPolicy,
}

impl MeshOptions {
    pub fn with_winding(self, winding: WindingPolicy) -> Self {
        Self { winding, ..self }
    }
}

/// Iterates over the non-empty, comment-stripped lines of a reader together with their
/// 1-based line numbers.
struct ContentLines<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> ContentLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, Vec<String>)>, ParseError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let content = match self.buffer.find('#') {
                Some(comment_start) => &self.buffer[..comment_start],
                None => self.buffer.as_str(),
            };
            let tokens: Vec<String> = content.split_whitespace().map(str::to_string).collect();
            if !tokens.is_empty() {
                return Ok(Some((self.line_number, tokens)));
            }
        }
    }
}

fn parse_token<T: FromStr>(file: FileKind, line: usize, token: &str) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidToken {
        file,
        line,
        token: token.to_string(),
    })
}

fn parse_header<R: BufRead>(
    lines: &mut ContentLines<R>,
    file: FileKind,
    expected_tokens: usize,
) -> Result<(usize, Vec<usize>), ParseError> {
    let (line, tokens) = lines.next_line()?.ok_or_else(|| ParseError::MalformedHeader {
        file,
        line: lines.line_number.max(1),
        message: "missing header".to_string(),
    })?;
    if tokens.len() != expected_tokens {
        return Err(ParseError::MalformedHeader {
            file,
            line,
            message: format!("expected {} header entries, found {}", expected_tokens, tokens.len()),
        });
    }
    let values = tokens
        .iter()
        .map(|token| {
            token.parse::<usize>().map_err(|_| ParseError::MalformedHeader {
                file,
                line,
                message: format!("'{}' is not a non-negative integer", token),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((line, values))
}

/// Reads the entity lines following a header and checks their token counts.
fn read_entities<R: BufRead>(
    lines: &mut ContentLines<R>,
    file: FileKind,
    count: usize,
    tokens_per_line: usize,
    mut visit: impl FnMut(usize, &[String]) -> Result<(), ParseError>,
) -> Result<(), ParseError> {
    for found in 0..count {
        let (line, tokens) = lines.next_line()?.ok_or(ParseError::TruncatedFile {
            file,
            declared: count,
            found,
        })?;
        if tokens.len() != tokens_per_line {
            return Err(ParseError::MalformedHeader {
                file,
                line,
                message: format!(
                    "expected {} entries per line as declared by the header, found {}",
                    tokens_per_line,
                    tokens.len()
                ),
            });
        }
        visit(line, &tokens)?;
    }

    if let Some((line, _)) = lines.next_line()? {
        warn!(
            "Ignoring content after the {} declared entries in {} (starting at line {})",
            count, file, line
        );
    }
    Ok(())
}

/// Number of tokens on each entity line, as declared by the header on `line`.
fn declared_tokens_per_line(file: FileKind, line: usize, counts: &[usize]) -> Result<usize, ParseError> {
    counts
        .iter()
        .try_fold(0usize, |total, &count| total.checked_add(count))
        .ok_or_else(|| ParseError::MalformedHeader {
            file,
            line,
            message: "declared number of entries per line is too large".to_string(),
        })
}

/// Reads a mesh from a node file and an element file.
///
/// Every error identifies the file and, where applicable, the 1-based line it occurred on.
/// No mesh is returned unless both files are valid in their entirety.
pub fn read_mesh<N: BufRead, E: BufRead>(
    node_reader: N,
    element_reader: E,
    options: &MeshOptions,
) -> Result<Mesh, ParseError> {
    use FileKind::{Element, Node};

    let mut node_lines = ContentLines::new(node_reader);
    let (header_line, header) = parse_header(&mut node_lines, Node, 4)?;
    let (num_nodes, dim, num_node_attributes, has_markers) = (header[0], header[1], header[2], header[3]);
    if dim != 2 && dim != 3 {
        return Err(ParseError::MalformedHeader {
            file: Node,
            line: header_line,
            message: format!("dimension must be 2 or 3, found {}", dim),
        });
    }
    if has_markers > 1 {
        return Err(ParseError::MalformedHeader {
            file: Node,
            line: header_line,
            message: format!("boundary marker flag must be 0 or 1, found {}", has_markers),
        });
    }

    let mut element_lines = ContentLines::new(element_reader);
    let (element_header_line, header) = parse_header(&mut element_lines, Element, 3)?;
    let (num_elements, nodes_per_element, num_element_attributes) = (header[0], header[1], header[2]);
    let element_type = ElementType::from_dim_and_node_count(dim, nodes_per_element)
        .ok_or(ParseError::UnsupportedElement { dim, nodes_per_element })?;

    let node_tokens = declared_tokens_per_line(Node, header_line, &[1, dim, num_node_attributes, has_markers])?;
    let element_tokens =
        declared_tokens_per_line(Element, element_header_line, &[1, nodes_per_element, num_element_attributes])?;

    let mut nodes = Vec::new();
    let mut node_ids = BTreeSet::new();
    read_entities(&mut node_lines, Node, num_nodes, node_tokens, |line, tokens| {
        let id: usize = parse_token(Node, line, &tokens[0])?;
        if !node_ids.insert(id) {
            return Err(ParseError::DuplicateId { file: Node, line, id });
        }
        let coords = tokens[1..=dim]
            .iter()
            .map(|token| parse_token(Node, line, token))
            .collect::<Result<Vec<f64>, _>>()?;
        let attributes = tokens[1 + dim..1 + dim + num_node_attributes]
            .iter()
            .map(|token| parse_token(Node, line, token))
            .collect::<Result<Vec<f64>, _>>()?;
        let marker = match has_markers {
            1 => Some(parse_token::<i64>(Node, line, &tokens[node_tokens - 1])?),
            _ => None,
        };
        nodes.push((id, coords, attributes, marker));
        Ok(())
    })?;

    let mut elements = Vec::new();
    let mut element_ids = BTreeSet::new();
    read_entities(&mut element_lines, Element, num_elements, element_tokens, |line, tokens| {
        let id: usize = parse_token(Element, line, &tokens[0])?;
        if !element_ids.insert(id) {
            return Err(ParseError::DuplicateId { file: Element, line, id });
        }
        let element_node_ids = tokens[1..=nodes_per_element]
            .iter()
            .map(|token| parse_token(Element, line, token))
            .collect::<Result<Vec<usize>, _>>()?;
        if let Some(&node_id) = element_node_ids.iter().find(|id| !node_ids.contains(id)) {
            return Err(ParseError::DanglingNodeReference {
                line,
                element_id: id,
                node_id,
            });
        }
        let attributes = tokens[1 + nodes_per_element..]
            .iter()
            .map(|token| parse_token(Element, line, token))
            .collect::<Result<Vec<f64>, _>>()?;
        elements.push((id, element_node_ids, attributes));
        Ok(())
    })?;

    let builder = MeshBuilder::new(dim, element_type).winding(options.winding);
    let builder = nodes
        .iter()
        .fold(builder, |builder, (id, coords, attributes, marker)| {
            builder.node_with_data(*id, coords, attributes, *marker)
        });
    let mesh = elements
        .iter()
        .fold(builder, |builder, (id, node_ids, attributes)| {
            builder.element_with_attributes(*id, node_ids, attributes)
        })
        .build()?;
    info!(
        "Read mesh with {} nodes and {} {} elements",
        mesh.num_nodes(),
        mesh.num_elements(),
        mesh.element_type()
    );
    Ok(mesh)
}

/// Loads a mesh from a node file and an element file on disk.
pub fn load_tetgen_mesh(
    node_path: impl AsRef<Path>,
    element_path: impl AsRef<Path>,
    options: &MeshOptions,
) -> eyre::Result<Mesh> {
    let node_path = node_path.as_ref();
    let element_path = element_path.as_ref();
    let node_file = File::open(node_path).wrap_err_with(|| format!("failed to open node file {}", node_path.display()))?;
    let element_file = File::open(element_path)
        .wrap_err_with(|| format!("failed to open element file {}", element_path.display()))?;
    read_mesh(BufReader::new(node_file), BufReader::new(element_file), options).wrap_err_with(|| {
        format!(
            "failed to read mesh from {} and {}",
            node_path.display(),
            element_path.display()
        )
    })
}

/// Writes the nodes of the mesh, including attributes and boundary markers.
pub fn write_tetgen_nodes<W: Write>(mut writer: W, mesh: &Mesh) -> std::io::Result<()> {
    let has_markers = mesh.has_boundary_markers();
    writeln!(
        writer,
        "{} {} {} {}",
        mesh.num_nodes(),
        mesh.dim(),
        mesh.num_node_attributes(),
        usize::from(has_markers)
    )?;
    for node_index in 0..mesh.num_nodes() {
        let values = mesh
            .node_coords(node_index)
            .iter()
            .chain(mesh.node_attributes(node_index))
            .join(" ");
        write!(writer, "{} {}", mesh.node_id(node_index), values)?;
        if let Some(marker) = mesh.boundary_marker(node_index) {
            write!(writer, " {}", marker)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the elements of the mesh, including attributes.
pub fn write_tetgen_elements<W: Write>(mut writer: W, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {} {}",
        mesh.num_elements(),
        mesh.nodes_per_element(),
        mesh.num_element_attributes()
    )?;
    for element_index in 0..mesh.num_elements() {
        write!(
            writer,
            "{} {}",
            mesh.element_id(element_index),
            mesh.element_node_ids(element_index).iter().join(" ")
        )?;
        for attribute in mesh.element_attributes(element_index) {
            write!(writer, " {}", attribute)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Saves the mesh as a node file and an element file.
pub fn save_tetgen_mesh(mesh: &Mesh, node_path: impl AsRef<Path>, element_path: impl AsRef<Path>) -> eyre::Result<()> {
    let node_path = node_path.as_ref();
    let element_path = element_path.as_ref();
    let node_file =
        File::create(node_path).wrap_err_with(|| format!("failed to create node file {}", node_path.display()))?;
    let mut node_writer = BufWriter::new(node_file);
    write_tetgen_nodes(&mut node_writer, mesh)
        .and_then(|_| node_writer.flush())
        .wrap_err_with(|| format!("failed to write node file {}", node_path.display()))?;

    let element_file = File::create(element_path)
        .wrap_err_with(|| format!("failed to create element file {}", element_path.display()))?;
    let mut element_writer = BufWriter::new(element_file);
    write_tetgen_elements(&mut element_writer, mesh)
        .and_then(|_| element_writer.flush())
        .wrap_err_with(|| format!("failed to write element file {}", element_path.display()))?;
    Ok(())
}
