//! JSON graph documents.
//!
//! A document declares plain entities, attributes and relationships. Building
//! it registers them in that order, so declarations may reference any entity
//! declared earlier in the same document.

use serde::{Deserialize, Serialize};

use things_core::{AttributeValue, EntityId, EntityKind};

use crate::entity::GraphEntity;
use crate::error::Result;
use crate::graph::EntityGraph;

/// Declarative description of a graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub entities: Vec<EntityDecl>,
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDecl>,
}

/// A plain entity. A missing identifier is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDecl {
    #[serde(default = "EntityId::generate")]
    pub identifier: EntityId,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Custom kind tag, e.g. "Place". Defaults to "Entity".
    pub kind: Option<EntityKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDecl {
    #[serde(default = "EntityId::generate")]
    pub identifier: EntityId,
    pub domain: EntityId,
    pub name: String,
    /// Absent means `null`.
    pub value: Option<AttributeValue>,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDecl {
    #[serde(default = "EntityId::generate")]
    pub identifier: EntityId,
    pub source: EntityId,
    pub relation_type: String,
    pub target: EntityId,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl GraphDocument {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Register every declaration into a fresh graph, stopping at the first
    /// invariant violation.
    pub fn build(self) -> Result<EntityGraph> {
        let mut graph = EntityGraph::new();

        for decl in self.entities {
            let mut entity = GraphEntity::new(decl.identifier);
            if let Some(kind) = decl.kind {
                entity = entity.with_kind(kind);
            }
            graph.add_entity(annotate(entity, decl.label, decl.description))?;
        }

        for decl in self.attributes {
            let entity = GraphEntity::attribute(
                decl.identifier,
                decl.domain,
                decl.name,
                decl.value.unwrap_or(AttributeValue::Null),
            );
            graph.add_entity(annotate(entity, decl.label, decl.description))?;
        }

        for decl in self.relationships {
            let entity = GraphEntity::relationship(
                decl.identifier,
                decl.source,
                decl.relation_type,
                decl.target,
            );
            graph.add_entity(annotate(entity, decl.label, decl.description))?;
        }

        tracing::info!(members = graph.len(), "Graph document built");
        Ok(graph)
    }
}

fn annotate(
    mut entity: GraphEntity,
    label: Option<String>,
    description: Option<String>,
) -> GraphEntity {
    if let Some(label) = label {
        entity = entity.with_label(label);
    }
    if let Some(description) = description {
        entity = entity.with_description(description);
    }
    entity
}
