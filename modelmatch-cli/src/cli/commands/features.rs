//! `features` and `subclasses` command handlers

use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::collections::HashSet;

use super::{find_entity, load_model, print_diagnostics};
use crate::cli::{FeaturesArgs, SubclassesArgs};
use modelmatch::model::{Feature, Provenance};
use modelmatch::services::features::{
    PathPolicy, composed_properties, define_local_features, define_nonlocal_features,
    path_feature,
};
use modelmatch::services::inheritance::{
    all_defined_associations, all_defined_attributes, all_defined_operations, ancestors,
    get_all_subclasses, get_principal_primary_key, get_principal_unique_key, leaf_subclasses,
};
use modelmatch::{Config, Diagnostics, EntityGraph};

#[derive(Serialize)]
struct FeatureRow {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    owner: String,
}

#[derive(Serialize)]
struct FeatureReport {
    entity: String,
    ancestors: Vec<String>,
    attributes: Vec<FeatureRow>,
    associations: Vec<FeatureRow>,
    operations: Vec<String>,
    local: Vec<FeatureRow>,
    nonlocal: Vec<FeatureRow>,
    composed: Vec<FeatureRow>,
    primary_key: Option<String>,
    unique_key: Option<String>,
    diagnostics: Diagnostics,
}

fn row(graph: &EntityGraph, feature: &Feature) -> FeatureRow {
    FeatureRow {
        name: feature.name.clone(),
        ty: graph.type_name(&feature.ty),
        owner: graph.name(feature.owner).to_string(),
    }
}

pub fn handle_features_command(args: FeaturesArgs, config: &Config) -> Result<()> {
    let mut graph = EntityGraph::new();
    let mut diagnostics = Diagnostics::new();
    let ids = load_model(&mut graph, &args.model, Provenance::Shared, &mut diagnostics)?;
    let e = find_entity(&graph, &ids, &args.entity)?;

    let depth = config.effective_depth(args.depth);
    let policy = PathPolicy::from_all_paths(args.all_paths || config.engine.use_all_paths);

    let ancestors = ancestors(&graph, e, &mut diagnostics)
        .into_iter()
        .map(|a| graph.name(a).to_string())
        .collect();
    let attributes = all_defined_attributes(&graph, e, &mut diagnostics)
        .into_iter()
        .map(|a| {
            let attribute = graph.attribute(a);
            FeatureRow {
                name: attribute.name.clone(),
                ty: graph.type_name(&attribute.ty),
                owner: graph.name(attribute.owner).to_string(),
            }
        })
        .collect();
    let associations = all_defined_associations(&graph, e, &mut diagnostics)
        .into_iter()
        .map(|r| {
            let association = graph.association(r);
            FeatureRow {
                name: association.role2.clone(),
                ty: graph.type_name(&association.far_type()),
                owner: graph.name(association.entity1).to_string(),
            }
        })
        .collect();
    let operations = all_defined_operations(&graph, e, &mut diagnostics)
        .into_iter()
        .map(|o| graph.operation(o).name.clone())
        .collect();

    let local = define_local_features(&mut graph, e);
    let nonlocal = define_nonlocal_features(&mut graph, e, &mut diagnostics);
    let composed: Vec<Feature> =
        composed_properties(&graph, e, &HashSet::new(), depth, policy, &mut diagnostics)
            .into_iter()
            .map(|path| path_feature(&graph, e, path))
            .collect();

    let primary_key = get_principal_primary_key(&graph, e, &mut diagnostics)
        .map(|a| graph.attribute(a).name.clone());
    let unique_key = get_principal_unique_key(&graph, e, &mut diagnostics)
        .map(|a| graph.attribute(a).name.clone());

    let report = FeatureReport {
        entity: args.entity.clone(),
        ancestors,
        attributes,
        associations,
        operations,
        local: local.iter().map(|f| row(&graph, f)).collect(),
        nonlocal: nonlocal.iter().map(|f| row(&graph, f)).collect(),
        composed: composed.iter().map(|f| row(&graph, f)).collect(),
        primary_key,
        unique_key,
        diagnostics,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "Entity".bold(), report.entity.bright_green().bold());
    if !report.ancestors.is_empty() {
        println!("  {} {}", "extends".dimmed(), report.ancestors.join(" < "));
    }
    print_rows("All defined attributes", &report.attributes);
    print_rows("All defined associations", &report.associations);
    if !report.operations.is_empty() {
        println!();
        println!("{}", "Operations".cyan().bold());
        for name in &report.operations {
            println!("  {}()", name);
        }
    }
    print_rows("Local features", &report.local);
    print_rows("Nonlocal features", &report.nonlocal);
    print_rows(
        &format!("Composed paths ({}, depth {})", policy.label(), depth),
        &report.composed,
    );

    println!();
    println!(
        "{} {}   {} {}",
        "Primary key:".bold(),
        report.primary_key.as_deref().unwrap_or("-"),
        "Unique key:".bold(),
        report.unique_key.as_deref().unwrap_or("-")
    );
    print_diagnostics(&report.diagnostics);
    Ok(())
}

fn print_rows(title: &str, rows: &[FeatureRow]) {
    println!();
    println!("{} ({})", title.cyan().bold(), rows.len());
    for row in rows {
        println!("  {:<32} {:<24} {}", row.name, row.ty.yellow(), row.owner.dimmed());
    }
}

pub fn handle_subclasses_command(args: SubclassesArgs, _config: &Config) -> Result<()> {
    let mut graph = EntityGraph::new();
    let mut diagnostics = Diagnostics::new();
    let ids = load_model(&mut graph, &args.model, Provenance::Shared, &mut diagnostics)?;
    let e = find_entity(&graph, &ids, &args.entity)?;

    let subclasses = if args.leaves {
        leaf_subclasses(&mut graph, e, &mut diagnostics)
    } else {
        get_all_subclasses(&mut graph, e, &mut diagnostics)
    };

    let title = if args.leaves { "Leaf subclasses of" } else { "Subclasses of" };
    println!("{} {} ({})", title.bold(), args.entity.bright_green().bold(), subclasses.len());
    for sub in subclasses {
        let entity = graph.entity(sub);
        let parent = entity
            .superclass
            .map(|p| graph.name(p).to_string())
            .unwrap_or_default();
        println!("  {:<32} {}", entity.name, format!("< {}", parent).dimmed());
    }
    print_diagnostics(&diagnostics);
    Ok(())
}
