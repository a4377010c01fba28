//! CSV export of a computed mapping

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use super::models::Mapping;
use crate::model::EntityGraph;

/// One exported line: an entity correspondence or one of its attribute matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingRow {
    pub source_entity: String,
    pub target_entity: String,
    pub source_feature: String,
    pub target_feature: String,
    pub match_type: String,
    pub score: f64,
}

/// Flatten a mapping into rows; each entity row is followed by its attribute rows
pub fn mapping_rows(graph: &EntityGraph, mapping: &Mapping) -> Vec<MappingRow> {
    let mut rows = Vec::new();
    for entity_match in mapping.iter() {
        let source_entity = graph.name(entity_match.source).to_string();
        let target_entity = graph.name(entity_match.target).to_string();

        rows.push(MappingRow {
            source_entity: source_entity.clone(),
            target_entity: target_entity.clone(),
            source_feature: String::new(),
            target_feature: String::new(),
            match_type: "[Entity]".to_string(),
            score: entity_match.score,
        });

        for m in &entity_match.attribute_matches {
            rows.push(MappingRow {
                source_entity: source_entity.clone(),
                target_entity: target_entity.clone(),
                source_feature: m.source.name.clone(),
                target_feature: m.target.name.clone(),
                match_type: m.match_type.label().to_string(),
                score: m.score,
            });
        }
    }
    rows
}

/// Write the mapping as CSV (with header) to any writer
pub fn write_mapping<W: Write>(
    graph: &EntityGraph,
    mapping: &Mapping,
    writer: W,
) -> Result<usize> {
    let mut wtr = Writer::from_writer(writer);
    let rows = mapping_rows(graph, mapping);

    for row in &rows {
        wtr.serialize(row).with_context(|| {
            format!(
                "Failed to write mapping row: {} -> {}",
                row.source_entity, row.target_entity
            )
        })?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(rows.len())
}

/// Export the mapping to a CSV file
pub fn export_mapping_to_csv(
    graph: &EntityGraph,
    mapping: &Mapping,
    file_path: &Path,
) -> Result<()> {
    let file = std::fs::File::create(file_path)
        .with_context(|| format!("Failed to create CSV file: {}", file_path.display()))?;
    let rows = write_mapping(graph, mapping, file)?;

    log::info!("CSV file exported to: {} ({} rows)", file_path.display(), rows);
    Ok(())
}
