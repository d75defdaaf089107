//! Plain text node and element records.
//!
//! Node records are written as `<node_id>,<x>,<y>[,<z>],<values>...` and element records as
//! `<element_id>,<node_id>,...`, one record per line and without a header.
use crate::error::FieldError;
use crate::field::Field;
use crate::mesh::Mesh;
use eyre::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: usize,
    pub coordinates: Vec<f64>,
    /// The values of all components of the exported variable.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: usize,
    pub node_ids: Vec<usize>,
}

/// Collects one record per mesh node with its coordinates and the values of `variable`.
pub fn export_nodes(mesh: &Mesh, field: &Field, variable: &str) -> Result<Vec<NodeRecord>, FieldError> {
    let values = field.variable(variable).ok_or_else(|| FieldError::UnknownVariable {
        name: variable.to_string(),
    })?;
    (0..mesh.num_nodes())
        .map(|node_index| {
            let id = mesh.node_id(node_index);
            let field_index = field
                .node_ids()
                .index_of(id)
                .ok_or(FieldError::UnknownNode { node_id: id })?;
            Ok(NodeRecord {
                id,
                coordinates: mesh.node_coords(node_index).to_vec(),
                values: values.node_values(field_index).to_vec(),
            })
        })
        .collect()
}

/// Collects one record per element with its node ids.
pub fn export_elements(mesh: &Mesh) -> Vec<ElementRecord> {
    (0..mesh.num_elements())
        .map(|element_index| ElementRecord {
            id: mesh.element_id(element_index),
            node_ids: mesh.element_node_ids(element_index),
        })
        .collect()
}

pub fn write_node_records<W: Write>(mut writer: W, records: &[NodeRecord]) -> std::io::Result<()> {
    for record in records {
        let values = record.coordinates.iter().chain(&record.values).join(",");
        writeln!(writer, "{},{}", record.id, values)?;
    }
    Ok(())
}

pub fn write_element_records<W: Write>(mut writer: W, records: &[ElementRecord]) -> std::io::Result<()> {
    for record in records {
        writeln!(writer, "{},{}", record.id, record.node_ids.iter().join(","))?;
    }
    Ok(())
}

fn save_with(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) -> eyre::Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)
        .and_then(|_| writer.flush())
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

pub fn save_node_records(records: &[NodeRecord], path: impl AsRef<Path>) -> eyre::Result<()> {
    save_with(path.as_ref(), |writer| write_node_records(writer, records))
}

pub fn save_element_records(records: &[ElementRecord], path: impl AsRef<Path>) -> eyre::Result<()> {
    save_with(path.as_ref(), |writer| write_element_records(writer, records))
}
