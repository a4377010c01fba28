//! Class model node types
//!
//! All nodes live in the [`EntityGraph`](super::EntityGraph) arena and refer to
//! each other through the copyable id newtypes defined here.

use serde::{Deserialize, Serialize};

use super::feature::{Feature, FeaturePath};

/// Arena index of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

/// Arena index of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(pub(crate) usize);

/// Arena index of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssociationId(pub(crate) usize);

/// Arena index of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub(crate) usize);

/// Arena index of an invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvariantId(pub(crate) usize);

/// Collection kinds a type descriptor can wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Set,
    Sequence,
}

impl CollectionKind {
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::Set => "Set",
            CollectionKind::Sequence => "Sequence",
        }
    }
}

/// Type of an attribute, parameter or feature path
///
/// The engine treats primitive types as opaque labels; entity references carry
/// the id of the referenced entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Primitive(String),
    Entity(EntityId),
    Collection {
        kind: CollectionKind,
        element: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>) -> Self {
        TypeDescriptor::Primitive(name.into())
    }

    pub fn set_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::Collection {
            kind: CollectionKind::Set,
            element: Box::new(element),
        }
    }

    pub fn sequence_of(element: TypeDescriptor) -> Self {
        TypeDescriptor::Collection {
            kind: CollectionKind::Sequence,
            element: Box::new(element),
        }
    }

    /// True for a direct reference to an entity
    pub fn is_entity_type(&self) -> bool {
        matches!(self, TypeDescriptor::Entity(_))
    }

    /// True for a collection whose elements are entity references
    pub fn is_entity_collection(&self) -> bool {
        match self {
            TypeDescriptor::Collection { element, .. } => element.is_entity_type(),
            _ => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDescriptor::Collection { .. })
    }

    /// Element type of a collection, or the type itself
    pub fn element_type(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Collection { element, .. } => element,
            other => other,
        }
    }

    /// Entity referenced directly or as collection element
    pub fn referenced_entity(&self) -> Option<EntityId> {
        match self.element_type() {
            TypeDescriptor::Entity(id) => Some(*id),
            _ => None,
        }
    }

    /// Same type with every entity reference passed through `f`
    pub fn map_entities(&self, f: &impl Fn(EntityId) -> EntityId) -> TypeDescriptor {
        match self {
            TypeDescriptor::Primitive(name) => TypeDescriptor::Primitive(name.clone()),
            TypeDescriptor::Entity(id) => TypeDescriptor::Entity(f(*id)),
            TypeDescriptor::Collection { kind, element } => TypeDescriptor::Collection {
                kind: *kind,
                element: Box::new(element.map_entities(f)),
            },
        }
    }
}

/// Multiplicity of one association end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Multiplicity {
    #[default]
    One,
    ZeroOne,
    Many,
}

impl Multiplicity {
    pub fn is_many(&self) -> bool {
        matches!(self, Multiplicity::Many)
    }

    /// Parse the usual textual forms ("one", "1", "0..1", "many", "*")
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "one" | "1" | "1..1" => Some(Multiplicity::One),
            "zero-or-one" | "zeroone" | "optional" | "0..1" => Some(Multiplicity::ZeroOne),
            "many" | "*" | "0..*" | "1..*" => Some(Multiplicity::Many),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Multiplicity::One => "1",
            Multiplicity::ZeroOne => "0..1",
            Multiplicity::Many => "*",
        }
    }
}

/// Instance-count bound of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    Exact(u32),
    Unbounded,
    UpTo(u32),
}

impl Cardinality {
    /// Parse "3", "*" or "0..n"
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "*" {
            return Some(Cardinality::Unbounded);
        }
        if let Some(upper) = text.strip_prefix("0..") {
            if upper == "*" {
                return Some(Cardinality::Unbounded);
            }
            return upper.parse().ok().map(Cardinality::UpTo);
        }
        text.parse().ok().map(Cardinality::Exact)
    }
}

/// Structural role of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityRole {
    #[default]
    Concrete,
    Abstract,
    Interface,
}

/// Which side of a model transformation an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provenance {
    #[default]
    Shared,
    Source,
    Target,
}

impl Provenance {
    /// True when a path from `self` into `other` crosses the source/target boundary
    pub fn crosses(&self, other: Provenance) -> bool {
        matches!(
            (self, other),
            (Provenance::Source, Provenance::Target) | (Provenance::Target, Provenance::Source)
        )
    }
}

/// Boolean capabilities that used to be free-form stereotypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub leaf: bool,
    pub active: bool,
    pub singleton: bool,
    pub external: bool,
    pub derived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttributeFlags {
    pub multiple: bool,
    pub unique: bool,
    pub identity: bool,
    pub frozen: bool,
    pub derived: bool,
    pub class_scope: bool,
}

impl AttributeFlags {
    /// Set the flag named by `flag`; returns false for unknown names
    pub fn set(&mut self, flag: &str) -> bool {
        match flag.trim().to_lowercase().as_str() {
            "multiple" => self.multiple = true,
            "unique" => self.unique = true,
            "identity" | "key" => {
                self.identity = true;
                self.unique = true;
            }
            "frozen" | "readonly" => self.frozen = true,
            "derived" => self.derived = true,
            "static" | "class" | "class-scope" => self.class_scope = true,
            _ => return false,
        }
        true
    }
}

/// A declared data feature, or a materialised view of an association end or path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub flags: AttributeFlags,
    /// Declaring entity (for flattened views: the original entity)
    pub owner: EntityId,
    /// Feature path this attribute stands for, when it is not a plain declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FeaturePath>,
}

impl Attribute {
    pub fn new(owner: EntityId, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: AttributeFlags::default(),
            owner,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssociationFlags {
    pub ordered: bool,
    pub sorted: bool,
    pub frozen: bool,
    pub add_only: bool,
    pub aggregation: bool,
    pub qualified: bool,
}

impl AssociationFlags {
    pub fn set(&mut self, flag: &str) -> bool {
        match flag.trim().to_lowercase().as_str() {
            "ordered" => self.ordered = true,
            "sorted" => self.sorted = true,
            "frozen" | "readonly" => self.frozen = true,
            "addonly" | "add-only" => self.add_only = true,
            "aggregation" | "composition" => self.aggregation = true,
            "qualified" => self.qualified = true,
            _ => return false,
        }
        true
    }
}

/// Directed association; `entity1` is the owning (source) end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub entity1: EntityId,
    pub entity2: EntityId,
    /// Name of the entity1 end as seen from entity2
    pub role1: Option<String>,
    /// Name of the entity2 end as seen from entity1
    pub role2: String,
    pub card1: Multiplicity,
    pub card2: Multiplicity,
    #[serde(default)]
    pub flags: AssociationFlags,
    /// Association representing the same relationship in the other direction
    pub inverse: Option<AssociationId>,
}

impl Association {
    pub fn new(
        entity1: EntityId,
        role2: impl Into<String>,
        entity2: EntityId,
        card2: Multiplicity,
    ) -> Self {
        Self {
            entity1,
            entity2,
            role1: None,
            role2: role2.into(),
            card1: Multiplicity::One,
            card2,
            flags: AssociationFlags::default(),
            inverse: None,
        }
    }

    pub fn is_many(&self) -> bool {
        self.card2.is_many()
    }

    /// Type of the far end when the role is read as an attribute
    pub fn far_type(&self) -> TypeDescriptor {
        let element = TypeDescriptor::Entity(self.entity2);
        if !self.is_many() {
            return element;
        }
        if self.flags.ordered {
            TypeDescriptor::sequence_of(element)
        } else {
            TypeDescriptor::set_of(element)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationFlags {
    pub query: bool,
    pub is_abstract: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub params: Vec<Parameter>,
    pub result: Option<TypeDescriptor>,
    #[serde(default)]
    pub flags: OperationFlags,
    pub owner: EntityId,
}

impl Operation {
    pub fn new(owner: EntityId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            result: None,
            flags: OperationFlags::default(),
            owner,
        }
    }

    /// Same name and same parameter types
    pub fn same_signature(&self, other: &Operation) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub antecedent: String,
    pub consequent: String,
    pub owner: EntityId,
    pub local: bool,
}

/// Recomputed-on-demand caches; never invalidated by structural edits
#[derive(Debug, Clone, Default)]
pub struct FeatureCache {
    pub local: Option<Vec<Feature>>,
    pub nonlocal: Option<Vec<Feature>>,
    pub leaf_subclasses: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Primary generalization parent
    pub superclass: Option<EntityId>,
    /// Additional parents for targets with multiple inheritance
    #[serde(default)]
    pub parents: Vec<EntityId>,
    #[serde(default)]
    pub children: Vec<EntityId>,
    #[serde(default)]
    pub attributes: Vec<AttributeId>,
    #[serde(default)]
    pub associations: Vec<AssociationId>,
    #[serde(default)]
    pub operations: Vec<OperationId>,
    #[serde(default)]
    pub invariants: Vec<InvariantId>,
    #[serde(default)]
    pub role: EntityRole,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Stereotypes with no typed counterpart, kept verbatim
    #[serde(default)]
    pub tags: Vec<String>,
    pub cardinality: Option<Cardinality>,
    /// Association this entity reifies (association class)
    pub linked_association: Option<AssociationId>,
    /// Original entity when this one is a flattened or target copy
    pub copy_of: Option<EntityId>,
    #[serde(skip)]
    pub cache: FeatureCache,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            parents: Vec::new(),
            children: Vec::new(),
            attributes: Vec::new(),
            associations: Vec::new(),
            operations: Vec::new(),
            invariants: Vec::new(),
            role: EntityRole::default(),
            provenance: Provenance::default(),
            capabilities: Capabilities::default(),
            tags: Vec::new(),
            cardinality: None,
            linked_association: None,
            copy_of: None,
            cache: FeatureCache::default(),
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.role == EntityRole::Concrete
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Apply a stereotype string; unknown stereotypes are kept as tags
    pub fn apply_stereotype(&mut self, stereotype: &str) {
        match stereotype.trim().to_lowercase().as_str() {
            "abstract" => self.role = EntityRole::Abstract,
            "interface" => self.role = EntityRole::Interface,
            "source" => self.provenance = Provenance::Source,
            "target" => self.provenance = Provenance::Target,
            "shared" => self.provenance = Provenance::Shared,
            "leaf" => self.capabilities.leaf = true,
            "active" => self.capabilities.active = true,
            "singleton" => self.capabilities.singleton = true,
            "external" => self.capabilities.external = true,
            "derived" => self.capabilities.derived = true,
            other => {
                log::debug!("Entity {} keeps untyped stereotype '{}'", self.name, other);
                if !self.tags.iter().any(|t| t == other) {
                    self.tags.push(other.to_string());
                }
            }
        }
    }

    /// Stereotype strings equivalent to the typed role/provenance/capabilities
    pub fn stereotypes(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self.role {
            EntityRole::Concrete => {}
            EntityRole::Abstract => out.push("abstract".to_string()),
            EntityRole::Interface => out.push("interface".to_string()),
        }
        match self.provenance {
            Provenance::Shared => {}
            Provenance::Source => out.push("source".to_string()),
            Provenance::Target => out.push("target".to_string()),
        }
        let caps = &self.capabilities;
        for (set, label) in [
            (caps.leaf, "leaf"),
            (caps.active, "active"),
            (caps.singleton, "singleton"),
            (caps.external, "external"),
            (caps.derived, "derived"),
        ] {
            if set {
                out.push(label.to_string());
            }
        }
        out.extend(self.tags.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity_parse() {
        assert_eq!(Multiplicity::parse("*"), Some(Multiplicity::Many));
        assert_eq!(Multiplicity::parse("0..1"), Some(Multiplicity::ZeroOne));
        assert_eq!(Multiplicity::parse("ONE"), Some(Multiplicity::One));
        assert_eq!(Multiplicity::parse("2..3"), None);
    }

    #[test]
    fn test_cardinality_parse() {
        assert_eq!(Cardinality::parse("*"), Some(Cardinality::Unbounded));
        assert_eq!(Cardinality::parse("0..5"), Some(Cardinality::UpTo(5)));
        assert_eq!(Cardinality::parse("1"), Some(Cardinality::Exact(1)));
        assert_eq!(Cardinality::parse("lots"), None);
    }

    #[test]
    fn test_stereotypes_map_to_typed_fields() {
        let mut entity = Entity::new("Customer");
        entity.apply_stereotype("abstract");
        entity.apply_stereotype("source");
        entity.apply_stereotype("singleton");
        entity.apply_stereotype("persistent");

        assert_eq!(entity.role, EntityRole::Abstract);
        assert_eq!(entity.provenance, Provenance::Source);
        assert!(entity.capabilities.singleton);
        assert_eq!(entity.tags, vec!["persistent".to_string()]);
        assert_eq!(
            entity.stereotypes(),
            vec!["abstract", "source", "singleton", "persistent"]
        );
    }

    #[test]
    fn test_provenance_boundary() {
        assert!(Provenance::Source.crosses(Provenance::Target));
        assert!(Provenance::Target.crosses(Provenance::Source));
        assert!(!Provenance::Source.crosses(Provenance::Shared));
        assert!(!Provenance::Target.crosses(Provenance::Target));
    }

    #[test]
    fn test_far_type_follows_multiplicity() {
        let mut assoc = Association::new(EntityId(0), "orders", EntityId(1), Multiplicity::Many);
        assert_eq!(assoc.far_type(), TypeDescriptor::set_of(TypeDescriptor::Entity(EntityId(1))));

        assoc.flags.ordered = true;
        assert_eq!(
            assoc.far_type(),
            TypeDescriptor::sequence_of(TypeDescriptor::Entity(EntityId(1)))
        );

        assoc.card2 = Multiplicity::ZeroOne;
        assert_eq!(assoc.far_type(), TypeDescriptor::Entity(EntityId(1)));
    }

    #[test]
    fn test_type_queries() {
        let orders = TypeDescriptor::set_of(TypeDescriptor::Entity(EntityId(4)));
        assert!(orders.is_entity_collection());
        assert!(!orders.is_entity_type());
        assert_eq!(orders.referenced_entity(), Some(EntityId(4)));
        assert_eq!(TypeDescriptor::primitive("int").referenced_entity(), None);
    }

    #[test]
    fn test_operation_signature() {
        let mut a = Operation::new(EntityId(0), "pay");
        a.params.push(Parameter { name: "amount".into(), ty: TypeDescriptor::primitive("double") });
        let mut b = a.clone();
        b.params[0].name = "value".into();
        assert!(a.same_signature(&b));

        b.params[0].ty = TypeDescriptor::primitive("int");
        assert!(!a.same_signature(&b));
    }
}
