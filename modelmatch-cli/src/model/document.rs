//! JSON model documents
//!
//! A thin serde format used to populate an [`EntityGraph`] from disk. Names
//! are resolved to ids and stereotype strings to the typed role/provenance
//! fields here, so nothing downstream compares stereotype strings.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::graph::EntityGraph;
use super::models::{
    Association, AssociationFlags, AttributeFlags, Cardinality, EntityId, Invariant, Multiplicity,
    Operation, Parameter, Provenance, TypeDescriptor,
};
use crate::diagnostics::Diagnostics;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub entities: Vec<EntityDoc>,
    #[serde(default)]
    pub associations: Vec<AssociationDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDoc {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    /// Additional parents (multiple inheritance)
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub stereotypes: Vec<String>,
    #[serde(default)]
    pub cardinality: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,
    #[serde(default)]
    pub operations: Vec<OperationDoc>,
    #[serde(default)]
    pub invariants: Vec<InvariantDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDoc {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParameterDoc>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantDoc {
    #[serde(default = "default_antecedent")]
    pub antecedent: String,
    pub consequent: String,
    #[serde(default)]
    pub local: bool,
}

fn default_antecedent() -> String {
    "true".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationDoc {
    pub entity1: String,
    pub entity2: String,
    #[serde(default)]
    pub role1: Option<String>,
    pub role2: String,
    #[serde(default = "default_card")]
    pub card1: String,
    #[serde(default = "default_card")]
    pub card2: String,
    #[serde(default)]
    pub flags: Vec<String>,
    /// role2 of the association running back from entity2 to entity1
    #[serde(default)]
    pub inverse: Option<String>,
}

fn default_card() -> String {
    "one".to_string()
}

/// Failure to resolve a document against itself
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    UnknownEntity { context: String, name: String },
    InvalidType { context: String, text: String },
    InvalidMultiplicity { context: String, text: String },
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::UnknownEntity { context, name } => {
                write!(f, "{}: unknown entity '{}'", context, name)
            }
            DocumentError::InvalidType { context, text } => {
                write!(f, "{}: invalid type '{}'", context, text)
            }
            DocumentError::InvalidMultiplicity { context, text } => {
                write!(f, "{}: invalid multiplicity '{}'", context, text)
            }
        }
    }
}

impl std::error::Error for DocumentError {}

impl ModelDocument {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse model document")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid model file: {}", path.display()))
    }

    /// Populate `graph` with this document's entities
    ///
    /// Entities without an explicit source/target/shared stereotype get
    /// `provenance`. Returns the created entity ids in document order.
    pub fn load_into(
        &self,
        graph: &mut EntityGraph,
        provenance: Provenance,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Vec<EntityId>, DocumentError> {
        let mut ids: HashMap<&str, EntityId> = HashMap::new();
        let mut created = Vec::new();

        // 1. Entities first so every reference can be resolved
        for doc in &self.entities {
            let id = graph.add_entity(doc.name.clone());
            let entity = graph.entity_mut(id);
            entity.provenance = provenance;
            for stereotype in &doc.stereotypes {
                entity.apply_stereotype(stereotype);
            }
            if let Some(card) = &doc.cardinality {
                entity.cardinality = Cardinality::parse(card);
                if entity.cardinality.is_none() {
                    log::warn!("Entity {} has unreadable cardinality '{}'", doc.name, card);
                }
            }
            ids.insert(doc.name.as_str(), id);
            created.push(id);
        }

        let resolve = |context: &str, name: &str| -> std::result::Result<EntityId, DocumentError> {
            ids.get(name).copied().ok_or_else(|| DocumentError::UnknownEntity {
                context: context.to_string(),
                name: name.to_string(),
            })
        };

        // 2. Generalization
        for doc in &self.entities {
            let id = ids[doc.name.as_str()];
            if let Some(parent) = &doc.superclass {
                let parent = resolve(&doc.name, parent)?;
                graph.set_superclass(id, Some(parent));
            }
            for parent in &doc.parents {
                let parent = resolve(&doc.name, parent)?;
                graph.add_parent(id, parent);
            }
        }

        // 3. Features
        for doc in &self.entities {
            let id = ids[doc.name.as_str()];
            for attr in &doc.attributes {
                let context = format!("{}.{}", doc.name, attr.name);
                let ty = parse_type(&attr.ty, &ids, &context)?;
                let attr_id = graph.add_attribute(id, attr.name.clone(), ty);
                let flags = &mut graph.attribute_mut(attr_id).flags;
                apply_attribute_flags(flags, &attr.flags, &context);
            }
            for op in &doc.operations {
                let context = format!("{}.{}", doc.name, op.name);
                let mut operation = Operation::new(id, op.name.clone());
                for param in &op.params {
                    operation.params.push(Parameter {
                        name: param.name.clone(),
                        ty: parse_type(&param.ty, &ids, &context)?,
                    });
                }
                operation.result = match &op.result {
                    Some(text) => Some(parse_type(text, &ids, &context)?),
                    None => None,
                };
                for flag in &op.flags {
                    match flag.to_lowercase().as_str() {
                        "query" => operation.flags.query = true,
                        "abstract" => operation.flags.is_abstract = true,
                        "static" => operation.flags.is_static = true,
                        other => log::warn!("{}: ignoring operation flag '{}'", context, other),
                    }
                }
                graph.add_operation(operation, diagnostics);
            }
            for inv in &doc.invariants {
                graph.add_invariant(Invariant {
                    antecedent: inv.antecedent.clone(),
                    consequent: inv.consequent.clone(),
                    owner: id,
                    local: inv.local,
                });
            }
        }

        // 4. Associations, then inverse links by role name
        let mut by_role: HashMap<(EntityId, String), crate::model::AssociationId> = HashMap::new();
        for doc in &self.associations {
            let context = format!("{}.{}", doc.entity1, doc.role2);
            let entity1 = resolve(&context, &doc.entity1)?;
            let entity2 = resolve(&context, &doc.entity2)?;
            let mut flags = AssociationFlags::default();
            for flag in &doc.flags {
                if !flags.set(flag) {
                    log::warn!("{}: ignoring association flag '{}'", context, flag);
                }
            }
            let association = Association {
                entity1,
                entity2,
                role1: doc.role1.clone(),
                role2: doc.role2.clone(),
                card1: parse_multiplicity(&doc.card1, &context)?,
                card2: parse_multiplicity(&doc.card2, &context)?,
                flags,
                inverse: None,
            };
            let assoc_id = graph.add_association(association);
            by_role.insert((entity1, doc.role2.clone()), assoc_id);
        }
        for doc in &self.associations {
            let Some(inverse_role) = &doc.inverse else {
                continue;
            };
            let context = format!("{}.{}", doc.entity1, doc.role2);
            let entity1 = resolve(&context, &doc.entity1)?;
            let entity2 = resolve(&context, &doc.entity2)?;
            let forward = by_role[&(entity1, doc.role2.clone())];
            match by_role.get(&(entity2, inverse_role.clone())) {
                Some(backward) => graph.link_inverse(forward, *backward),
                None => {
                    return Err(DocumentError::UnknownEntity {
                        context,
                        name: format!("{}.{}", doc.entity2, inverse_role),
                    });
                }
            }
        }

        log::info!(
            "Loaded {} entities and {} associations",
            created.len(),
            self.associations.len()
        );
        Ok(created)
    }
}

fn apply_attribute_flags(flags: &mut AttributeFlags, names: &[String], context: &str) {
    for name in names {
        if !flags.set(name) {
            log::warn!("{}: ignoring attribute flag '{}'", context, name);
        }
    }
}

fn parse_multiplicity(
    text: &str,
    context: &str,
) -> std::result::Result<Multiplicity, DocumentError> {
    Multiplicity::parse(text).ok_or_else(|| DocumentError::InvalidMultiplicity {
        context: context.to_string(),
        text: text.to_string(),
    })
}

/// Parse `String`, `Order`, `Set(Order)` or `Sequence(int)`
///
/// Names of entities in the same document become entity references, anything
/// else is a primitive label.
pub fn parse_type(
    text: &str,
    entities: &HashMap<&str, EntityId>,
    context: &str,
) -> std::result::Result<TypeDescriptor, DocumentError> {
    let text = text.trim();
    let invalid = || DocumentError::InvalidType {
        context: context.to_string(),
        text: text.to_string(),
    };

    if text.is_empty() {
        return Err(invalid());
    }

    if let Some(open) = text.find('(') {
        let inner = text[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
        let element = parse_type(inner, entities, context)?;
        return match &text[..open] {
            "Set" => Ok(TypeDescriptor::set_of(element)),
            "Sequence" => Ok(TypeDescriptor::sequence_of(element)),
            _ => Err(invalid()),
        };
    }

    if text.contains(')') {
        return Err(invalid());
    }

    Ok(match entities.get(text) {
        Some(id) => TypeDescriptor::Entity(*id),
        None => TypeDescriptor::primitive(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"{
        "entities": [
            { "name": "Person", "stereotypes": ["abstract"],
              "attributes": [ { "name": "name", "type": "String", "flags": ["identity"] } ] },
            { "name": "Customer", "superclass": "Person", "cardinality": "*" },
            { "name": "Order",
              "attributes": [ { "name": "total", "type": "double" },
                              { "name": "lines", "type": "Sequence(String)" } ],
              "operations": [ { "name": "pay", "params": [ { "name": "amount", "type": "double" } ],
                                "flags": ["query"] } ],
              "invariants": [ { "consequent": "total >= 0", "local": true } ] }
        ],
        "associations": [
            { "entity1": "Customer", "entity2": "Order", "role2": "orders", "card2": "*",
              "flags": ["ordered"], "inverse": "buyer" },
            { "entity1": "Order", "entity2": "Customer", "role2": "buyer", "card2": "one" }
        ]
    }"#;

    #[test]
    fn test_load_document() {
        let doc = ModelDocument::from_json_str(SHOP).unwrap();
        let mut graph = EntityGraph::new();
        let mut diagnostics = Diagnostics::new();
        let ids = doc
            .load_into(&mut graph, Provenance::Source, &mut diagnostics)
            .unwrap();

        assert_eq!(ids.len(), 3);
        let person = graph.entity_named("Person").unwrap();
        let customer = graph.entity_named("Customer").unwrap();
        let order = graph.entity_named("Order").unwrap();

        assert_eq!(graph.entity(customer).superclass, Some(person));
        assert_eq!(graph.entity(person).children, vec![customer]);
        assert_eq!(graph.entity(person).role, crate::model::EntityRole::Abstract);
        assert_eq!(graph.entity(order).provenance, Provenance::Source);
        assert_eq!(graph.entity(customer).cardinality, Some(Cardinality::Unbounded));

        let name = graph.entity(person).attributes[0];
        assert!(graph.attribute(name).flags.identity);

        let orders = graph.entity(customer).associations[0];
        let buyer = graph.entity(order).associations[0];
        assert_eq!(graph.association(orders).inverse, Some(buyer));
        assert_eq!(graph.association(buyer).inverse, Some(orders));
        assert!(graph.association(orders).flags.ordered);
        assert_eq!(graph.entity(order).operations.len(), 1);
        assert_eq!(graph.entity(order).invariants.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_superclass_is_reported() {
        let doc = ModelDocument::from_json_str(
            r#"{ "entities": [ { "name": "Student", "superclass": "Ghost" } ] }"#,
        )
        .unwrap();
        let mut graph = EntityGraph::new();
        let err = doc
            .load_into(&mut graph, Provenance::Shared, &mut Diagnostics::new())
            .unwrap_err();

        assert_eq!(
            err,
            DocumentError::UnknownEntity {
                context: "Student".into(),
                name: "Ghost".into()
            }
        );
    }

    #[test]
    fn test_parse_type_forms() {
        let mut names = HashMap::new();
        names.insert("Order", EntityId(7));

        assert_eq!(
            parse_type("Set(Order)", &names, "t").unwrap(),
            TypeDescriptor::set_of(TypeDescriptor::Entity(EntityId(7)))
        );
        assert_eq!(
            parse_type("int", &names, "t").unwrap(),
            TypeDescriptor::primitive("int")
        );
        assert!(parse_type("Bag(int)", &names, "t").is_err());
        assert!(parse_type("Set(int", &names, "t").is_err());
    }
}
