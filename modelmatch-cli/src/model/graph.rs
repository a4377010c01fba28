//! Arena holding every node of a modelling session
//!
//! Relations are id lists; nodes are never freed, removal only unlinks ids.
//! Structural edits do not touch the derived caches stored on entities.

use std::collections::HashMap;

use super::feature::{FeaturePath, Step};
use super::models::{
    Association, AssociationId, Attribute, AttributeId, Entity, EntityId, Invariant, InvariantId,
    Operation, OperationId, TypeDescriptor,
};
use crate::diagnostics::{Diagnostic, Diagnostics};

#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    attributes: Vec<Attribute>,
    associations: Vec<Association>,
    operations: Vec<Operation>,
    invariants: Vec<Invariant>,
    /// First entity registered under each name
    names: HashMap<String, EntityId>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity; copies may share a name with their original
    pub fn add_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.insert_entity(Entity::new(name))
    }

    pub fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.names.entry(entity.name.clone()).or_insert(id);
        self.entities.push(entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn entity_named(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len()).map(EntityId)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.entities[id.0].name
    }

    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id.0]
    }

    pub fn attribute_mut(&mut self, id: AttributeId) -> &mut Attribute {
        &mut self.attributes[id.0]
    }

    pub fn association(&self, id: AssociationId) -> &Association {
        &self.associations[id.0]
    }

    pub fn association_mut(&mut self, id: AssociationId) -> &mut Association {
        &mut self.associations[id.0]
    }

    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.0]
    }

    pub fn invariant(&self, id: InvariantId) -> &Invariant {
        &self.invariants[id.0]
    }

    // ----- structural edits -----

    /// Declare a new attribute owned by `owner`
    pub fn add_attribute(
        &mut self,
        owner: EntityId,
        name: impl Into<String>,
        ty: TypeDescriptor,
    ) -> AttributeId {
        self.attach_attribute(owner, Attribute::new(owner, name, ty))
    }

    /// Add `attribute` to `entity`'s feature list without touching its owner field
    pub fn attach_attribute(&mut self, entity: EntityId, attribute: Attribute) -> AttributeId {
        let id = AttributeId(self.attributes.len());
        self.attributes.push(attribute);
        self.entities[entity.0].attributes.push(id);
        id
    }

    /// Unlink an attribute from an entity; returns false when it was not there
    pub fn remove_attribute(&mut self, entity: EntityId, attribute: AttributeId) -> bool {
        let list = &mut self.entities[entity.0].attributes;
        let before = list.len();
        list.retain(|a| *a != attribute);
        before != list.len()
    }

    /// Add an association owned by its `entity1`
    pub fn add_association(&mut self, association: Association) -> AssociationId {
        let id = AssociationId(self.associations.len());
        let owner = association.entity1;
        self.associations.push(association);
        self.entities[owner.0].associations.push(id);
        id
    }

    /// Convenience for `add_association(Association::new(..))`
    pub fn associate(
        &mut self,
        entity1: EntityId,
        role2: impl Into<String>,
        entity2: EntityId,
        card2: super::models::Multiplicity,
    ) -> AssociationId {
        self.add_association(Association::new(entity1, role2, entity2, card2))
    }

    pub fn remove_association(&mut self, entity: EntityId, association: AssociationId) -> bool {
        let list = &mut self.entities[entity.0].associations;
        let before = list.len();
        list.retain(|a| *a != association);
        before != list.len()
    }

    /// Mark two associations as the two directions of one relationship
    pub fn link_inverse(&mut self, a: AssociationId, b: AssociationId) {
        self.associations[a.0].inverse = Some(b);
        self.associations[b.0].inverse = Some(a);
        let role_a = self.associations[a.0].role2.clone();
        let role_b = self.associations[b.0].role2.clone();
        if self.associations[a.0].role1.is_none() {
            self.associations[a.0].role1 = Some(role_b);
        }
        if self.associations[b.0].role1.is_none() {
            self.associations[b.0].role1 = Some(role_a);
        }
    }

    /// Add an operation; a redeclared signature replaces the earlier one
    pub fn add_operation(
        &mut self,
        operation: Operation,
        diagnostics: &mut Diagnostics,
    ) -> OperationId {
        let owner = operation.owner;
        let id = OperationId(self.operations.len());

        let existing = self.entities[owner.0]
            .operations
            .iter()
            .position(|op| self.operations[op.0].same_signature(&operation));

        if existing.is_some() {
            diagnostics.push(Diagnostic::StructuralWarning {
                entity: self.entities[owner.0].name.clone(),
                feature: operation.name.clone(),
                reason: "operation signature redeclared; new declaration wins".to_string(),
            });
        }

        self.operations.push(operation);
        let list = &mut self.entities[owner.0].operations;
        match existing {
            Some(index) => list[index] = id,
            None => list.push(id),
        }
        id
    }

    pub fn add_invariant(&mut self, invariant: Invariant) -> InvariantId {
        let id = InvariantId(self.invariants.len());
        let owner = invariant.owner;
        self.invariants.push(invariant);
        self.entities[owner.0].invariants.push(id);
        id
    }

    /// Replace the primary parent, keeping child lists consistent
    pub fn set_superclass(&mut self, child: EntityId, parent: Option<EntityId>) {
        if let Some(old) = self.entities[child.0].superclass.take() {
            if !self.entities[child.0].parents.contains(&old) {
                self.entities[old.0].children.retain(|c| *c != child);
            }
        }
        self.entities[child.0].superclass = parent;
        if let Some(parent) = parent {
            let children = &mut self.entities[parent.0].children;
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }

    /// Add a non-primary parent
    pub fn add_parent(&mut self, child: EntityId, parent: EntityId) {
        let entity = &mut self.entities[child.0];
        if entity.superclass == Some(parent) || entity.parents.contains(&parent) {
            return;
        }
        entity.parents.push(parent);
        let children = &mut self.entities[parent.0].children;
        if !children.contains(&child) {
            children.push(child);
        }
    }

    /// Cut the generalization edge between `parent` and `child` in both directions
    pub fn remove_generalization(&mut self, parent: EntityId, child: EntityId) {
        self.entities[parent.0].children.retain(|c| *c != child);
        let entity = &mut self.entities[child.0];
        if entity.superclass == Some(parent) {
            entity.superclass = None;
        }
        entity.parents.retain(|p| *p != parent);
    }

    /// Primary parent followed by any additional parents
    pub fn all_parents(&self, id: EntityId) -> Vec<EntityId> {
        let entity = &self.entities[id.0];
        entity
            .superclass
            .into_iter()
            .chain(entity.parents.iter().copied())
            .collect()
    }

    // ----- rendering -----

    /// Human-readable type name
    pub fn type_name(&self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Primitive(name) => name.clone(),
            TypeDescriptor::Entity(id) => self.name(*id).to_string(),
            TypeDescriptor::Collection { kind, element } => {
                format!("{}({})", kind.label(), self.type_name(element))
            }
        }
    }

    pub fn step_name(&self, step: Step) -> &str {
        match step {
            Step::Attribute(id) => &self.attribute(id).name,
            Step::Role(id) => &self.association(id).role2,
        }
    }

    /// Step names joined by '.'
    pub fn path_name(&self, path: &FeaturePath) -> String {
        path.steps()
            .iter()
            .map(|step| self.step_name(*step))
            .collect::<Vec<_>>()
            .join(".")
    }
}
