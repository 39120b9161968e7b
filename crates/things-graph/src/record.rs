//! Structured-map serialization of graph members.
//!
//! Every member serializes to a JSON object with `identifier`, `label`,
//! `description`, `kind`, `attributes` and `relationships`. Attributes add
//! `domain`, `name` and `value`; relationships add `source`,
//! `relation_type` and `target`. Domains and endpoints are always written as
//! bare identifiers. Expansion of the member lists is bounded by a depth and
//! a set of identifiers already being expanded on the current path.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use things_core::{AttributeValue, EntityId, EntityKind};

use crate::entity::{Attribute, EntityVariant, GraphEntity, Relationship};
use crate::error::{GraphError, Result};
use crate::graph::{EntityGraph, EntityRef};

impl GraphEntity {
    /// Serialize with attributes and relationships as bare identifiers.
    pub fn serialize(&self) -> Value {
        serialize_member(self, None, 0, &mut HashSet::new())
    }
}

impl EntityRef<'_> {
    /// Serialize this entity.
    ///
    /// With `expand`, attributes and relationships are inlined one level deep,
    /// each serialized without expansion. Without it they are identifiers.
    pub fn serialize(&self, expand: bool) -> Value {
        self.serialize_depth(usize::from(expand))
    }

    /// Serialize, inlining member lists up to `depth` levels.
    ///
    /// Depth 0 and 1 match `serialize(false)` and `serialize(true)`. A member
    /// already being expanded higher up is written as its identifier.
    pub fn serialize_depth(&self, depth: usize) -> Value {
        serialize_member(self.entity(), Some(self.graph()), depth, &mut HashSet::new())
    }
}

impl EntityGraph {
    /// Serialize the entity with `identifier`, if present.
    pub fn serialize_entity(&self, identifier: &str, expand: bool) -> Option<Value> {
        self.get_entity(identifier).map(|e| e.serialize(expand))
    }
}

fn serialize_member(
    entity: &GraphEntity,
    graph: Option<&EntityGraph>,
    depth: usize,
    path: &mut HashSet<EntityId>,
) -> Value {
    path.insert(entity.identifier().clone());
    let attributes = serialize_members(entity.attribute_ids(), graph, depth, path);
    let relationships = serialize_members(entity.relationship_ids(), graph, depth, path);
    path.remove(entity.identifier());

    let mut map = Map::new();
    map.insert("identifier".into(), Value::String(entity.identifier().to_string()));
    map.insert("label".into(), Value::String(entity.label.clone()));
    map.insert("description".into(), Value::String(entity.description.clone()));
    map.insert("kind".into(), Value::String(entity.kind().to_string()));
    map.insert("attributes".into(), Value::Array(attributes));
    map.insert("relationships".into(), Value::Array(relationships));

    match entity.variant() {
        EntityVariant::Base => {}
        EntityVariant::Attribute(attr) => {
            map.insert("domain".into(), Value::String(attr.domain.to_string()));
            map.insert("name".into(), Value::String(attr.name.clone()));
            map.insert("value".into(), attr.value.to_json());
        }
        EntityVariant::Relationship(rel) => {
            map.insert("source".into(), Value::String(rel.source.to_string()));
            map.insert("relation_type".into(), Value::String(rel.relation_type.clone()));
            map.insert("target".into(), Value::String(rel.target.to_string()));
        }
    }

    Value::Object(map)
}

fn serialize_members(
    ids: &[EntityId],
    graph: Option<&EntityGraph>,
    depth: usize,
    path: &mut HashSet<EntityId>,
) -> Vec<Value> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let child = match graph {
            Some(graph) if depth > 0 && !path.contains(id) => graph.entity(id.as_str()),
            _ => None,
        };
        out.push(match child {
            Some(child) => serialize_member(child, graph, depth - 1, path),
            None => Value::String(id.to_string()),
        });
    }
    out
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decoded form of a serialized member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub identifier: EntityId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub attributes: Vec<Member>,
    #[serde(default)]
    pub relationships: Vec<Member>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
}

/// A member list entry: a bare identifier or an expanded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Member {
    Identifier(EntityId),
    Record(Box<EntityRecord>),
}

impl Member {
    pub fn identifier(&self) -> &EntityId {
        match self {
            Self::Identifier(id) => id,
            Self::Record(record) => &record.identifier,
        }
    }
}

impl EntityRecord {
    fn require<T>(field: Option<T>, name: &str, identifier: &EntityId) -> Result<T> {
        field.ok_or_else(|| {
            GraphError::InvalidRecord(format!("{identifier}: missing field `{name}`"))
        })
    }
}

impl TryFrom<EntityRecord> for GraphEntity {
    type Error = GraphError;

    fn try_from(record: EntityRecord) -> Result<Self> {
        let id = record.identifier;
        let variant = match record.kind {
            EntityKind::Attribute => EntityVariant::Attribute(Attribute {
                domain: EntityRecord::require(record.domain, "domain", &id)?,
                name: EntityRecord::require(record.name, "name", &id)?,
                value: record.value.unwrap_or(AttributeValue::Null),
            }),
            EntityKind::Relationship => EntityVariant::Relationship(Relationship {
                source: EntityRecord::require(record.source, "source", &id)?,
                relation_type: EntityRecord::require(record.relation_type, "relation_type", &id)?,
                target: EntityRecord::require(record.target, "target", &id)?,
            }),
            _ => EntityVariant::Base,
        };

        let label = record.label.unwrap_or_else(|| id.to_string());
        let attributes = record.attributes.iter().map(|m| m.identifier().clone()).collect();
        let relationships = record
            .relationships
            .iter()
            .map(|m| m.identifier().clone())
            .collect();

        Ok(GraphEntity::from_parts(
            id,
            label,
            record.description,
            record.kind,
            variant,
            attributes,
            relationships,
        ))
    }
}

/// Rebuild a detached entity from its serialized form.
///
/// Scalar fields, variant data and the attribute and relationship
/// identifier lists are restored in order. Expanded members contribute
/// only their identifiers.
pub fn deserialize(value: Value) -> Result<GraphEntity> {
    let record: EntityRecord = serde_json::from_value(value)?;
    GraphEntity::try_from(record)
}
