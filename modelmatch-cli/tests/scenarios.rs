//! End-to-end scenarios over loaded model documents

use std::collections::HashSet;

use modelmatch::model::{
    EntityGraph, EntityId, ModelDocument, Multiplicity, Provenance, TypeDescriptor,
};
use modelmatch::services::features::{PathPolicy, composed_properties, define_nonlocal_features};
use modelmatch::services::flatten::flatten_model;
use modelmatch::services::inheritance::{all_defined_attributes, get_all_subclasses};
use modelmatch::services::matching::export::write_mapping;
use modelmatch::services::matching::{MatchType, identity_mapping};
use modelmatch::services::naming::NoThesaurus;
use modelmatch::{Config, Diagnostics, Mapping, SimilarityEngine};

fn load(graph: &mut EntityGraph, json: &str, provenance: Provenance) -> Vec<EntityId> {
    let document = ModelDocument::from_json_str(json).unwrap();
    document
        .load_into(graph, provenance, &mut Diagnostics::new())
        .unwrap()
}

fn named(graph: &EntityGraph, ids: &[EntityId], name: &str) -> EntityId {
    *ids.iter().find(|id| graph.name(**id) == name).unwrap()
}

const UNIVERSITY: &str = r#"{
    "entities": [
        { "name": "Person", "attributes": [ { "name": "name", "type": "String" },
                                            { "name": "age", "type": "int" } ] },
        { "name": "Student", "superclass": "Person",
          "attributes": [ { "name": "school", "type": "String" } ] }
    ]
}"#;

#[test]
fn test_inherited_attributes_come_after_own() {
    let mut graph = EntityGraph::new();
    let ids = load(&mut graph, UNIVERSITY, Provenance::Shared);
    let student = named(&graph, &ids, "Student");
    let mut diagnostics = Diagnostics::new();

    let names: Vec<String> = all_defined_attributes(&graph, student, &mut diagnostics)
        .into_iter()
        .map(|a| graph.attribute(a).name.clone())
        .collect();
    assert_eq!(names, vec!["school", "name", "age"]);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_nonlocal_features_skip_linked_inverse() {
    let mut graph = EntityGraph::new();
    let person = graph.add_entity("Person");
    let order = graph.add_entity("Order");
    graph.add_attribute(order, "total", TypeDescriptor::primitive("double"));
    let orders = graph.associate(person, "orders", order, Multiplicity::Many);
    let back = graph.associate(order, "ordersInverse", person, Multiplicity::One);
    graph.link_inverse(orders, back);
    let mut diagnostics = Diagnostics::new();

    let names: Vec<String> = define_nonlocal_features(&mut graph, person, &mut diagnostics)
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert!(names.contains(&"orders.total".to_string()));
    assert!(!names.contains(&"orders.ordersInverse".to_string()));
}

#[test]
fn test_shared_mapped_ancestor_gives_cotopy_similarity() {
    let mut graph = EntityGraph::new();
    let sources = load(
        &mut graph,
        r#"{ "entities": [
            { "name": "PartySRC", "attributes": [ { "name": "id", "type": "int" } ] },
            { "name": "CustomerSRC", "superclass": "PartySRC",
              "attributes": [ { "name": "name", "type": "String" } ] } ] }"#,
        Provenance::Source,
    );
    let targets = load(
        &mut graph,
        r#"{ "entities": [
            { "name": "PartyTRG", "attributes": [ { "name": "id", "type": "int" } ] },
            { "name": "ClientTRG", "superclass": "PartyTRG",
              "attributes": [ { "name": "label", "type": "String" } ] } ] }"#,
        Provenance::Target,
    );
    let party_src = named(&graph, &sources, "PartySRC");
    let customer = named(&graph, &sources, "CustomerSRC");
    let party_trg = named(&graph, &targets, "PartyTRG");
    let client = named(&graph, &targets, "ClientTRG");

    let engine =
        SimilarityEngine::new(&graph, &NoThesaurus, sources.iter().chain(&targets).copied());
    let mut mapping = Mapping::new();
    let mut diagnostics = Diagnostics::new();

    assert_eq!(engine.similarity(party_src, party_trg, &mut mapping, &mut diagnostics), 1.0);

    let pair = engine
        .pair_similarity(customer, client, &mapping, &mut diagnostics)
        .unwrap();
    let own: Vec<_> = pair
        .attribute_matches
        .iter()
        .filter(|m| m.match_type != MatchType::Inherited)
        .collect();
    assert!(!own.is_empty());
    assert!(own.iter().all(|m| m.score == 0.0));
    assert!(pair.attribute_matches.iter().any(|m| m.match_type == MatchType::Inherited));

    let cotopy = engine.cotopy_similarity(customer, client, &mapping, &mut diagnostics);
    assert!(cotopy >= 0.5);
}

#[test]
fn test_mutual_generalization_cycle_terminates() {
    let mut graph = EntityGraph::new();
    let a = graph.add_entity("A");
    let b = graph.add_entity("B");
    graph.set_superclass(a, Some(b));
    graph.set_superclass(b, Some(a));
    let mut diagnostics = Diagnostics::new();

    let subclasses = get_all_subclasses(&mut graph, a, &mut diagnostics);
    assert_eq!(subclasses, vec![b]);
    assert_eq!(diagnostics.cycles().len(), 1);

    // a second entity point of view, cycle already repaired
    assert!(get_all_subclasses(&mut graph, b, &mut diagnostics).is_empty());
    assert_eq!(diagnostics.cycles().len(), 1);
}

const SOURCE_SHOP: &str = r#"{
    "entities": [
        { "name": "Customer", "attributes": [ { "name": "name", "type": "String" },
                                              { "name": "email", "type": "String" } ] },
        { "name": "Order", "attributes": [ { "name": "total", "type": "double" } ] }
    ],
    "associations": [
        { "entity1": "Customer", "entity2": "Order", "role2": "orders", "card2": "*" }
    ]
}"#;

const TARGET_SHOP: &str = r#"{
    "entities": [
        { "name": "Client", "attributes": [ { "name": "name", "type": "String" },
                                            { "name": "mail", "type": "String" } ] },
        { "name": "Purchase", "attributes": [ { "name": "total", "type": "double" },
                                              { "name": "date", "type": "Date" } ] }
    ],
    "associations": [
        { "entity1": "Client", "entity2": "Purchase", "role2": "purchases", "card2": "*" }
    ]
}"#;

#[test]
fn test_match_models_end_to_end() {
    let mut graph = EntityGraph::new();
    let sources = load(&mut graph, SOURCE_SHOP, Provenance::Source);
    let targets = load(&mut graph, TARGET_SHOP, Provenance::Target);
    let config = Config::default();
    let thesaurus = config.thesaurus_table();

    let engine = SimilarityEngine::new(&graph, &thesaurus, sources.iter().chain(&targets).copied())
        .with_options(config.match_options());
    let mut mapping = Mapping::new();
    let mut diagnostics = Diagnostics::new();

    let matched = engine.match_models(&sources, &targets, &mut mapping, &mut diagnostics);
    assert_eq!(matched, 2);

    let customer = named(&graph, &sources, "Customer");
    let order = named(&graph, &sources, "Order");
    assert_eq!(mapping.target_of(customer), Some(named(&graph, &targets, "Client")));
    assert_eq!(mapping.target_of(order), Some(named(&graph, &targets, "Purchase")));

    let customer_match = mapping.get(customer).unwrap();
    let composed = customer_match
        .attribute_matches
        .iter()
        .find(|m| m.match_type == MatchType::ComposedType)
        .unwrap();
    assert_eq!(composed.source.name, "orders.total");
    assert_eq!(composed.target.name, "purchases.total");

    let mut buffer = Vec::new();
    let rows = write_mapping(&graph, &mapping, &mut buffer).unwrap();
    let expected_rows: usize = mapping.iter().map(|m| 1 + m.attribute_matches.len()).sum();
    assert_eq!(rows, expected_rows);
}

#[test]
fn test_identity_mapping_gives_full_esim() {
    let mut graph = EntityGraph::new();
    let entities = load(&mut graph, SOURCE_SHOP, Provenance::Shared);
    let mapping = identity_mapping(&graph, &entities);
    let engine = SimilarityEngine::new(&graph, &NoThesaurus, entities.iter().copied());
    let mut diagnostics = Diagnostics::new();

    for &e in &entities {
        assert_eq!(engine.esim_source(e, e, &mapping, &mut diagnostics), 1.0);
        assert_eq!(engine.esim_target(e, e, &mapping, &mut diagnostics), 1.0);
    }
}

#[test]
fn test_flatten_loaded_model() {
    let mut graph = EntityGraph::new();
    let entities = load(&mut graph, SOURCE_SHOP, Provenance::Shared);
    let config = Config::default();
    let mut diagnostics = Diagnostics::new();

    let copies = flatten_model(
        &mut graph,
        &entities,
        config.engine.use_all_paths,
        config.effective_depth(None),
        &mut diagnostics,
    );
    let customer = copies[&named(&graph, &entities, "Customer")];
    let names: Vec<String> = graph
        .entity(customer)
        .attributes
        .iter()
        .map(|a| graph.attribute(*a).name.clone())
        .collect();

    assert_eq!(names, vec!["name", "email", "orders", "orders.total"]);
}

#[test]
fn test_composed_paths_grow_with_depth() {
    let mut graph = EntityGraph::new();
    let entities = load(&mut graph, SOURCE_SHOP, Provenance::Shared);
    let customer = named(&graph, &entities, "Customer");
    let mut diagnostics = Diagnostics::new();

    let mut strict_paths = |depth| {
        composed_properties(
            &graph,
            customer,
            &HashSet::new(),
            depth,
            PathPolicy::Strict,
            &mut diagnostics,
        )
    };

    assert!(strict_paths(0).is_empty());
    let shallow = strict_paths(1);
    let deep = strict_paths(2);
    assert_eq!(shallow.len(), 3);
    assert_eq!(deep.len(), 4);
}
