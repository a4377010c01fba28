//! Command handlers

pub mod features;
pub mod flatten;
pub mod matching;

use anyhow::Result;
use colored::*;
use std::path::Path;

use modelmatch::model::Provenance;
use modelmatch::{Config, Diagnostic, Diagnostics, EntityGraph, EntityId, ModelDocument};

/// Load a model document into `graph` and return its entities in document order
pub fn load_model(
    graph: &mut EntityGraph,
    path: &Path,
    provenance: Provenance,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<EntityId>> {
    let document = ModelDocument::from_path(path)?;
    let ids = document.load_into(graph, provenance, diagnostics)?;
    log::info!("Loaded {} entities from {}", ids.len(), path.display());
    Ok(ids)
}

/// Entity of `ids` called `name`
pub fn find_entity(graph: &EntityGraph, ids: &[EntityId], name: &str) -> Result<EntityId> {
    match ids.iter().find(|id| graph.name(**id) == name) {
        Some(id) => Ok(*id),
        None => anyhow::bail!("Entity '{}' not found in model", name),
    }
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("{} ({})", "Diagnostics".yellow().bold(), diagnostics.len());
    for diagnostic in diagnostics.iter() {
        let kind = match diagnostic {
            Diagnostic::CycleDetected { .. } => diagnostic.kind().red(),
            Diagnostic::UnresolvedReference { .. } => diagnostic.kind().dimmed(),
            _ => diagnostic.kind().yellow(),
        };
        println!("  {} {}", kind, diagnostic);
    }
}

pub fn handle_config_command(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("{}", format!("# default location: {}", path.display()).dimmed());
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
