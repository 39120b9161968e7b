//! Graph members: the shared base record and its variants.
//!
//! Every member of the graph (plain entity, attribute, relationship) is a
//! `GraphEntity`. Variant-specific data lives in `EntityVariant`. All
//! cross-references are identifiers; the owning `EntityGraph` resolves them.

use std::fmt;
use std::hash::{Hash, Hasher};

use things_core::{AttributeValue, EntityId, EntityKind};

/// Payload of an attribute: a named value describing its domain entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The entity this attribute describes. Non-owning.
    pub domain: EntityId,
    pub name: String,
    pub value: AttributeValue,
}

/// Payload of a relationship: a directed, typed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub source: EntityId,
    /// Free-form edge type, e.g. "related_to".
    pub relation_type: String,
    pub target: EntityId,
}

impl Relationship {
    /// Human-readable phrase for the edge type ("related_to" -> "related to").
    pub fn phrase(&self) -> String {
        self.relation_type.replace('_', " ")
    }
}

/// Discriminated variant data of a graph member.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityVariant {
    Base,
    Attribute(Attribute),
    Relationship(Relationship),
}

/// A member of the property graph.
///
/// Equality and hashing use `identifier` only: two entities with the same
/// identifier are the same entity regardless of their other fields.
#[derive(Debug, Clone)]
pub struct GraphEntity {
    identifier: EntityId,
    pub label: String,
    pub description: String,
    kind: EntityKind,
    variant: EntityVariant,
    attributes: Vec<EntityId>,
    outgoing: Vec<EntityId>,
    incoming: Vec<EntityId>,
}

impl GraphEntity {
    /// Create a detached plain entity. The label defaults to the identifier.
    pub fn new(identifier: impl Into<EntityId>) -> Self {
        Self::with_variant(identifier.into(), EntityKind::Entity, EntityVariant::Base)
    }

    /// Create an attribute of `domain`. It is attached to the domain when
    /// registered with `EntityGraph::add_entity`.
    pub fn attribute(
        identifier: impl Into<EntityId>,
        domain: impl Into<EntityId>,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self::with_variant(
            identifier.into(),
            EntityKind::Attribute,
            EntityVariant::Attribute(Attribute {
                domain: domain.into(),
                name: name.into(),
                value: value.into(),
            }),
        )
    }

    /// Create a relationship from `source` to `target`. It is indexed on both
    /// endpoints when registered with `EntityGraph::add_entity`.
    pub fn relationship(
        identifier: impl Into<EntityId>,
        source: impl Into<EntityId>,
        relation_type: impl Into<String>,
        target: impl Into<EntityId>,
    ) -> Self {
        Self::with_variant(
            identifier.into(),
            EntityKind::Relationship,
            EntityVariant::Relationship(Relationship {
                source: source.into(),
                relation_type: relation_type.into(),
                target: target.into(),
            }),
        )
    }

    fn with_variant(identifier: EntityId, kind: EntityKind, variant: EntityVariant) -> Self {
        Self {
            label: identifier.0.clone(),
            identifier,
            description: String::new(),
            kind,
            variant,
            attributes: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Retag a plain entity with a custom kind. Attributes and relationships
    /// keep their kind, and a plain entity never takes a member kind.
    pub fn with_kind(mut self, kind: impl Into<EntityKind>) -> Self {
        if matches!(self.variant, EntityVariant::Base) {
            // `Custom("Relationship")` and friends name a built-in kind.
            let kind = EntityKind::from(String::from(kind.into()));
            if !matches!(kind, EntityKind::Attribute | EntityKind::Relationship) {
                self.kind = kind;
            }
        }
        self
    }

    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn variant(&self) -> &EntityVariant {
        &self.variant
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match &self.variant {
            EntityVariant::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match &self.variant {
            EntityVariant::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Identifiers of the attributes owned by this entity, in insertion order.
    pub fn attribute_ids(&self) -> &[EntityId] {
        &self.attributes
    }

    /// Identifiers of relationships where this entity is the source.
    pub fn relationship_ids(&self) -> &[EntityId] {
        &self.outgoing
    }

    /// Identifiers of relationships where this entity is the target.
    pub fn incoming_relationship_ids(&self) -> &[EntityId] {
        &self.incoming
    }

    pub fn has_attribute(&self, identifier: &str) -> bool {
        self.attributes.iter().any(|id| id.as_str() == identifier)
    }

    // ── Index maintenance (graph-internal) ───────────────────────

    /// Append an attribute unless one with the same identifier is present.
    pub(crate) fn add_attribute(&mut self, id: EntityId) -> bool {
        push_unique(&mut self.attributes, id)
    }

    /// Remove an attribute by identifier. Absent is a no-op.
    pub(crate) fn remove_attribute(&mut self, id: &EntityId) -> bool {
        remove_id(&mut self.attributes, id)
    }

    pub(crate) fn add_relationship(&mut self, id: EntityId) -> bool {
        push_unique(&mut self.outgoing, id)
    }

    pub(crate) fn add_incoming_relationship(&mut self, id: EntityId) -> bool {
        push_unique(&mut self.incoming, id)
    }

    pub(crate) fn remove_relationship(&mut self, id: &EntityId) -> bool {
        remove_id(&mut self.outgoing, id)
    }

    pub(crate) fn remove_incoming_relationship(&mut self, id: &EntityId) -> bool {
        remove_id(&mut self.incoming, id)
    }

    pub(crate) fn clear_indices(&mut self) {
        self.attributes.clear();
        self.outgoing.clear();
        self.incoming.clear();
    }

    /// Rebuild a detached entity from decoded fields.
    pub(crate) fn from_parts(
        identifier: EntityId,
        label: String,
        description: String,
        kind: EntityKind,
        variant: EntityVariant,
        attributes: Vec<EntityId>,
        outgoing: Vec<EntityId>,
    ) -> Self {
        let mut entity = Self::with_variant(identifier, kind, variant);
        entity.label = label;
        entity.description = description;
        for id in attributes {
            entity.add_attribute(id);
        }
        for id in outgoing {
            entity.add_relationship(id);
        }
        entity
    }
}

fn push_unique(list: &mut Vec<EntityId>, id: EntityId) -> bool {
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    true
}

fn remove_id(list: &mut Vec<EntityId>, id: &EntityId) -> bool {
    let before = list.len();
    list.retain(|existing| existing != id);
    list.len() != before
}

impl PartialEq for GraphEntity {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for GraphEntity {}

impl Hash for GraphEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl fmt::Display for GraphEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {} ({})>", self.kind, self.label, self.identifier)
    }
}
