//! `match` command handler

use anyhow::Result;
use colored::*;

use super::{load_model, print_diagnostics};
use crate::cli::MatchArgs;
use modelmatch::model::Provenance;
use modelmatch::services::matching::export::{export_mapping_to_csv, mapping_rows};
use modelmatch::{Config, Diagnostics, EntityGraph, Mapping, SimilarityEngine};

pub fn handle_match_command(args: MatchArgs, config: &Config) -> Result<()> {
    let mut graph = EntityGraph::new();
    let mut diagnostics = Diagnostics::new();
    let sources = load_model(&mut graph, &args.source, Provenance::Source, &mut diagnostics)?;
    let targets = load_model(&mut graph, &args.target, Provenance::Target, &mut diagnostics)?;

    let mut options = config.match_options();
    if args.strict {
        options.strict = true;
    }
    if args.lenient {
        options.strict = false;
    }

    let thesaurus = config.thesaurus_table();
    let engine = SimilarityEngine::new(
        &graph,
        &thesaurus,
        sources.iter().chain(targets.iter()).copied(),
    )
    .with_options(options);

    let mut mapping = Mapping::new();
    let matched = engine.match_models(&sources, &targets, &mut mapping, &mut diagnostics);

    if let Some(path) = &args.csv {
        export_mapping_to_csv(&graph, &mapping, path)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mapping_rows(&graph, &mapping))?);
        return Ok(());
    }

    println!(
        "{} {} of {} source entities ({} mode)",
        "Matched".bold(),
        matched.to_string().bright_green().bold(),
        sources.len(),
        if options.strict { "strict" } else { "lenient" }
    );

    for entity_match in mapping.iter() {
        println!();
        println!(
            "{} -> {}  {}",
            graph.name(entity_match.source).bright_green().bold(),
            graph.name(entity_match.target).bright_green().bold(),
            format!("score {:.3}", entity_match.score).dimmed()
        );
        for m in &entity_match.attribute_matches {
            println!(
                "  {:<28} -> {:<28} {:<12} {:.3}",
                m.source.name,
                m.target.name,
                m.match_type.label().cyan(),
                m.score
            );
        }
    }

    let unmatched: Vec<&str> = sources
        .iter()
        .filter(|s| mapping.get(**s).is_none())
        .map(|s| graph.name(*s))
        .collect();
    if !unmatched.is_empty() {
        println!();
        println!("{} {}", "Unmatched:".yellow().bold(), unmatched.join(", "));
    }

    if let Some(path) = &args.csv {
        println!();
        println!("CSV written to {}", path.display().to_string().cyan());
    }
    print_diagnostics(&diagnostics);
    Ok(())
}
