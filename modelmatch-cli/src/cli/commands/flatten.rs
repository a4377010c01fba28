//! `flatten` command handler

use anyhow::Result;
use colored::*;
use serde::Serialize;

use super::{find_entity, load_model, print_diagnostics};
use crate::cli::FlattenArgs;
use modelmatch::model::Provenance;
use modelmatch::services::flatten::flatten_model;
use modelmatch::{Config, Diagnostics, EntityGraph};

#[derive(Serialize)]
struct FlatAttribute {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    declared_in: String,
}

#[derive(Serialize)]
struct FlatEntity {
    name: String,
    superclass: Option<String>,
    attributes: Vec<FlatAttribute>,
}

pub fn handle_flatten_command(args: FlattenArgs, config: &Config) -> Result<()> {
    let mut graph = EntityGraph::new();
    let mut diagnostics = Diagnostics::new();
    let ids = load_model(&mut graph, &args.model, Provenance::Shared, &mut diagnostics)?;

    let selected = match &args.entity {
        Some(name) => vec![find_entity(&graph, &ids, name)?],
        None => ids.clone(),
    };
    let depth = config.effective_depth(args.depth);
    let use_all_paths = args.all_paths || config.engine.use_all_paths;

    let copies = flatten_model(&mut graph, &selected, use_all_paths, depth, &mut diagnostics);

    let flattened: Vec<FlatEntity> = selected
        .iter()
        .filter_map(|original| copies.get(original))
        .map(|copy| {
            let entity = graph.entity(*copy);
            FlatEntity {
                name: entity.name.clone(),
                superclass: entity.superclass.map(|p| graph.name(p).to_string()),
                attributes: entity
                    .attributes
                    .iter()
                    .map(|a| {
                        let attribute = graph.attribute(*a);
                        FlatAttribute {
                            name: attribute.name.clone(),
                            ty: graph.type_name(&attribute.ty),
                            declared_in: graph.name(attribute.owner).to_string(),
                        }
                    })
                    .collect(),
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&flattened)?);
        return Ok(());
    }

    for entity in &flattened {
        match &entity.superclass {
            Some(parent) => println!(
                "{} {}",
                entity.name.bright_green().bold(),
                format!("< {}", parent).dimmed()
            ),
            None => println!("{}", entity.name.bright_green().bold()),
        }
        for attribute in &entity.attributes {
            println!(
                "  {:<32} {:<24} {}",
                attribute.name,
                attribute.ty.yellow(),
                attribute.declared_in.dimmed()
            );
        }
        println!();
    }
    print_diagnostics(&diagnostics);
    Ok(())
}
