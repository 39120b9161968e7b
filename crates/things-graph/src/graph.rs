//! The owning entity registry and borrowed traversal views.
//!
//! `EntityGraph` is the single owner of every `GraphEntity`. Attributes and
//! relationships refer to their domain and endpoints by identifier, so the
//! entity <-> relationship cycles never become ownership cycles. Traversal
//! goes through `EntityRef`, a view that borrows the graph for its lifetime.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Deref;

use serde::Serialize;
use things_core::EntityId;

use crate::entity::{Attribute, EntityVariant, GraphEntity, Relationship};
use crate::error::{GraphError, Result};

/// Internal outcome of a two-sided relationship registration. Never leaves
/// this module: the caller sees either success or `InvalidEndpoint`.
enum Registration {
    Complete,
    RolledBack { endpoint: EntityId },
}

/// Which index of an entity a member is listed in.
enum Slot {
    Attribute,
    Outgoing,
    Incoming,
}

/// Member counts by variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub total_members: usize,
    pub entities: usize,
    pub attributes: usize,
    pub relationships: usize,
}

/// In-memory typed property graph.
///
/// Iteration is ordered by identifier so output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: BTreeMap<EntityId, GraphEntity>,
}

impl EntityGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity.
    ///
    /// Attributes are attached to their domain and relationships are indexed
    /// on both endpoints as part of the same call. On failure nothing is
    /// retained. Any attribute or relationship identifiers carried by a
    /// detached entity are dropped: members attach themselves when they are
    /// registered.
    pub fn add_entity(&mut self, mut entity: GraphEntity) -> Result<EntityId> {
        let id = entity.identifier().clone();
        if self.entities.contains_key(id.as_str()) {
            tracing::warn!(identifier = %id, "Rejected duplicate identifier");
            return Err(GraphError::IdentifierConflict {
                identifier: id.to_string(),
            });
        }

        entity.clear_indices();

        match entity.variant() {
            EntityVariant::Base => {}
            EntityVariant::Attribute(attr) => {
                let domain = self.entities.get_mut(attr.domain.as_str()).ok_or_else(|| {
                    GraphError::MissingDomain {
                        attribute: id.to_string(),
                        domain: attr.domain.to_string(),
                    }
                })?;
                domain.add_attribute(id.clone());
            }
            EntityVariant::Relationship(rel) => {
                if !self.entities.contains_key(rel.source.as_str()) {
                    return Err(GraphError::InvalidEndpoint {
                        relationship: id.to_string(),
                        endpoint: rel.source.to_string(),
                    });
                }
                if let Registration::RolledBack { endpoint } =
                    self.register_relationship(&id, &rel.source, &rel.target)
                {
                    tracing::warn!(
                        identifier = %id,
                        endpoint = %endpoint,
                        "Relationship registration rolled back"
                    );
                    return Err(GraphError::InvalidEndpoint {
                        relationship: id.to_string(),
                        endpoint: endpoint.to_string(),
                    });
                }
            }
        }

        tracing::debug!(identifier = %id, kind = %entity.kind(), "Entity registered");
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Index `rel` on `source.outgoing` and `target.incoming`, undoing the
    /// first step if the second cannot be made.
    fn register_relationship(
        &mut self,
        rel: &EntityId,
        source: &EntityId,
        target: &EntityId,
    ) -> Registration {
        let Some(src) = self.entities.get_mut(source.as_str()) else {
            return Registration::RolledBack {
                endpoint: source.clone(),
            };
        };
        let added = src.add_relationship(rel.clone());

        match self.entities.get_mut(target.as_str()) {
            Some(tgt) => {
                tgt.add_incoming_relationship(rel.clone());
                Registration::Complete
            }
            None => {
                if added {
                    if let Some(src) = self.entities.get_mut(source.as_str()) {
                        src.remove_relationship(rel);
                    }
                }
                Registration::RolledBack {
                    endpoint: target.clone(),
                }
            }
        }
    }

    /// Look up an entity. A miss is `None`, never an error.
    pub fn get_entity(&self, identifier: &str) -> Option<EntityRef<'_>> {
        self.entities.get(identifier).map(|entity| EntityRef {
            graph: self,
            entity,
        })
    }

    /// Look up the raw entity record.
    pub fn entity(&self, identifier: &str) -> Option<&GraphEntity> {
        self.entities.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entities.contains_key(identifier)
    }

    /// Number of registered members (entities, attributes and relationships).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            total_members: self.entities.len(),
            ..Default::default()
        };
        for entity in self.entities.values() {
            match entity.variant() {
                EntityVariant::Base => summary.entities += 1,
                EntityVariant::Attribute(_) => summary.attributes += 1,
                EntityVariant::Relationship(_) => summary.relationships += 1,
            }
        }
        summary
    }

    /// All members, ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.entities.values().map(move |entity| EntityRef {
            graph: self,
            entity,
        })
    }

    /// All relationships, optionally filtered by exact `relation_type`.
    ///
    /// Only outgoing indices are scanned; each relationship is listed on
    /// exactly one source, so no relationship is returned twice.
    pub fn find_relationships(&self, relation_type: Option<&str>) -> Vec<EntityRef<'_>> {
        self.entities
            .values()
            .flat_map(|entity| entity.relationship_ids())
            .filter_map(|id| self.get_entity(id.as_str()))
            .filter(|rel| matches_type(rel.entity, relation_type))
            .collect()
    }

    /// Detach and drop `attribute` from `domain`, with everything it owns.
    ///
    /// Returns `None` if `domain` does not list the attribute.
    pub fn remove_attribute(&mut self, domain: &str, attribute: &str) -> Option<GraphEntity> {
        let listed = self
            .entities
            .get(domain)
            .is_some_and(|d| d.has_attribute(attribute));
        if !listed {
            return None;
        }
        self.remove_entity(attribute).into_iter().next()
    }

    /// Unindex and drop a relationship. Returns `None` if `identifier` is not
    /// a registered relationship.
    pub fn remove_relationship(&mut self, identifier: &str) -> Option<GraphEntity> {
        self.entities.get(identifier)?.as_relationship()?;
        self.remove_entity(identifier).into_iter().next()
    }

    /// Remove an entity together with its attributes and every relationship
    /// incident to it, transitively.
    ///
    /// Surviving members are unlinked before anything leaves the identifier
    /// map. The requested entity is the first element of the result; an
    /// unknown identifier yields an empty vector.
    pub fn remove_entity(&mut self, identifier: &str) -> Vec<GraphEntity> {
        let Some(root) = self.entities.get(identifier) else {
            return Vec::new();
        };

        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut doomed: Vec<EntityId> = Vec::new();
        let mut stack = vec![root.identifier().clone()];

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(entity) = self.entities.get(id.as_str()) {
                stack.extend(entity.attribute_ids().iter().cloned());
                stack.extend(entity.relationship_ids().iter().cloned());
                stack.extend(entity.incoming_relationship_ids().iter().cloned());
                doomed.push(id);
            }
        }

        let unlinks: Vec<(EntityId, EntityId, Slot)> = doomed
            .iter()
            .filter_map(|id| self.entities.get(id.as_str()))
            .flat_map(|entity| {
                let id = entity.identifier().clone();
                match entity.variant() {
                    EntityVariant::Base => Vec::new(),
                    EntityVariant::Attribute(attr) => {
                        vec![(attr.domain.clone(), id, Slot::Attribute)]
                    }
                    EntityVariant::Relationship(rel) => vec![
                        (rel.source.clone(), id.clone(), Slot::Outgoing),
                        (rel.target.clone(), id, Slot::Incoming),
                    ],
                }
            })
            .collect();

        for (owner, member, slot) in unlinks {
            if let Some(owner) = self.entities.get_mut(owner.as_str()) {
                match slot {
                    Slot::Attribute => owner.remove_attribute(&member),
                    Slot::Outgoing => owner.remove_relationship(&member),
                    Slot::Incoming => owner.remove_incoming_relationship(&member),
                };
            }
        }

        let removed: Vec<GraphEntity> = doomed
            .iter()
            .filter_map(|id| self.entities.remove(id.as_str()))
            .collect();

        tracing::debug!(identifier, removed = removed.len(), "Entity removed");
        removed
    }
}

fn matches_type(entity: &GraphEntity, relation_type: Option<&str>) -> bool {
    match (entity.as_relationship(), relation_type) {
        (Some(_), None) => true,
        (Some(rel), Some(wanted)) => rel.relation_type == wanted,
        (None, _) => false,
    }
}

// ── Borrowed views ───────────────────────────────────────────────

/// An entity borrowed from its graph, able to resolve its references.
#[derive(Clone, Copy)]
pub struct EntityRef<'g> {
    graph: &'g EntityGraph,
    entity: &'g GraphEntity,
}

impl<'g> EntityRef<'g> {
    pub fn graph(&self) -> &'g EntityGraph {
        self.graph
    }

    pub fn entity(&self) -> &'g GraphEntity {
        self.entity
    }

    fn resolve(&self, ids: &'g [EntityId]) -> Vec<EntityRef<'g>> {
        ids.iter()
            .filter_map(|id| self.graph.get_entity(id.as_str()))
            .collect()
    }

    /// Attributes owned by this entity, in insertion order.
    pub fn attributes(&self) -> Vec<EntityRef<'g>> {
        self.resolve(self.entity.attribute_ids())
    }

    /// Outgoing relationships, optionally filtered by exact `relation_type`.
    pub fn relationships(&self, relation_type: Option<&str>) -> Vec<EntityRef<'g>> {
        self.resolve(self.entity.relationship_ids())
            .into_iter()
            .filter(|rel| matches_type(rel.entity, relation_type))
            .collect()
    }

    /// Incoming relationships, optionally filtered by exact `relation_type`.
    pub fn incoming_relationships(&self, relation_type: Option<&str>) -> Vec<EntityRef<'g>> {
        self.resolve(self.entity.incoming_relationship_ids())
            .into_iter()
            .filter(|rel| matches_type(rel.entity, relation_type))
            .collect()
    }

    /// Attribute payload, borrowed from the graph rather than the view.
    pub fn as_attribute(&self) -> Option<&'g Attribute> {
        self.entity.as_attribute()
    }

    /// Relationship payload, borrowed from the graph rather than the view.
    pub fn as_relationship(&self) -> Option<&'g Relationship> {
        self.entity.as_relationship()
    }

    /// The entity an attribute describes.
    pub fn domain(&self) -> Option<EntityRef<'g>> {
        let attr = self.as_attribute()?;
        self.graph.get_entity(attr.domain.as_str())
    }

    pub fn source(&self) -> Option<EntityRef<'g>> {
        let rel = self.as_relationship()?;
        self.graph.get_entity(rel.source.as_str())
    }

    pub fn target(&self) -> Option<EntityRef<'g>> {
        let rel = self.as_relationship()?;
        self.graph.get_entity(rel.target.as_str())
    }

    /// "Entity One related to Entity Two" for a relationship.
    pub fn sentence(&self) -> Option<String> {
        let rel = self.as_relationship()?;
        let source = self.source()?;
        let target = self.target()?;
        Some(format!("{} {} {}", source.label, rel.phrase(), target.label))
    }
}

impl Deref for EntityRef<'_> {
    type Target = GraphEntity;

    fn deref(&self) -> &GraphEntity {
        self.entity
    }
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(self.entity).finish()
    }
}

impl fmt::Display for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.entity, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use things_core::AttributeValue;

    fn ids(refs: &[EntityRef<'_>]) -> Vec<String> {
        refs.iter().map(|r| r.identifier().to_string()).collect()
    }

    /// E1 -related_to-> E2, E1 -owns-> E3, E2 -related_to-> E3, A1 on E1.
    fn build_triangle() -> EntityGraph {
        let mut graph = EntityGraph::new();
        for id in ["E1", "E2", "E3"] {
            graph.add_entity(GraphEntity::new(id)).unwrap();
        }
        graph
            .add_entity(GraphEntity::attribute("A1", "E1", "color", "red"))
            .unwrap();
        graph
            .add_entity(GraphEntity::relationship("R1", "E1", "related_to", "E2"))
            .unwrap();
        graph
            .add_entity(GraphEntity::relationship("R2", "E1", "owns", "E3"))
            .unwrap();
        graph
            .add_entity(GraphEntity::relationship("R3", "E2", "related_to", "E3"))
            .unwrap();
        graph
    }

    #[test]
    fn test_add_and_get_entity() {
        let mut graph = EntityGraph::new();
        let id = graph
            .add_entity(GraphEntity::new("E1").with_label("Entity One"))
            .unwrap();
        assert_eq!(id, EntityId::from("E1"));

        let e1 = graph.get_entity("E1").unwrap();
        assert_eq!(e1.label, "Entity One");
        assert!(graph.get_entity("missing").is_none());
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut graph = EntityGraph::new();
        graph
            .add_entity(GraphEntity::new("E1").with_label("first"))
            .unwrap();
        let err = graph
            .add_entity(GraphEntity::new("E1").with_label("second"))
            .unwrap_err();

        assert!(matches!(
            err,
            GraphError::IdentifierConflict { ref identifier } if identifier == "E1"
        ));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get_entity("E1").unwrap().label, "first");
    }

    #[test]
    fn test_attribute_attaches_to_domain() {
        let graph = build_triangle();
        let e1 = graph.get_entity("E1").unwrap();
        assert_eq!(ids(&e1.attributes()), vec!["A1"]);

        let attr = graph.get_entity("A1").unwrap();
        assert_eq!(attr.domain().unwrap().identifier().as_str(), "E1");
    }

    #[test]
    fn test_payloads_outlive_the_view() {
        let graph = build_triangle();
        let e1 = graph.get_entity("E1").unwrap();

        let color = &e1.attributes()[0].as_attribute().unwrap().value;
        let owns = e1.relationships(Some("owns"))[0].as_relationship().unwrap();

        assert_eq!(color, &AttributeValue::from("red"));
        assert_eq!(owns.target.as_str(), "E3");
        assert!(graph.get_entity("E2").unwrap().as_attribute().is_none());
    }

    #[test]
    fn test_attribute_with_missing_domain_rejected() {
        let mut graph = EntityGraph::new();
        let err = graph
            .add_entity(GraphEntity::attribute("A1", "ghost", "color", "red"))
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingDomain { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_relationship_indexed_on_both_endpoints() {
        let graph = build_triangle();
        let e1 = graph.get_entity("E1").unwrap();
        let e2 = graph.get_entity("E2").unwrap();

        assert_eq!(ids(&e1.relationships(None)), vec!["R1", "R2"]);
        assert_eq!(ids(&e2.incoming_relationships(None)), vec!["R1"]);
        assert!(e1.incoming_relationships(None).is_empty());
        assert_eq!(ids(&e2.relationships(None)), vec!["R3"]);
    }

    #[test]
    fn test_relationship_filter_is_exact() {
        let graph = build_triangle();
        let e1 = graph.get_entity("E1").unwrap();
        assert_eq!(ids(&e1.relationships(Some("owns"))), vec!["R2"]);
        assert!(e1.relationships(Some("own")).is_empty());
    }

    #[test]
    fn test_missing_target_rolls_back_source() {
        let mut graph = EntityGraph::new();
        graph.add_entity(GraphEntity::new("E1")).unwrap();

        let err = graph
            .add_entity(GraphEntity::relationship("R1", "E1", "related_to", "ghost"))
            .unwrap_err();

        assert!(
            matches!(err, GraphError::InvalidEndpoint { ref endpoint, .. } if endpoint == "ghost")
        );
        assert!(graph.get_entity("E1").unwrap().relationship_ids().is_empty());
        assert!(!graph.contains("R1"));
    }

    #[test]
    fn test_missing_source_rejected() {
        let mut graph = EntityGraph::new();
        graph.add_entity(GraphEntity::new("E2")).unwrap();

        let err = graph
            .add_entity(GraphEntity::relationship("R1", "ghost", "related_to", "E2"))
            .unwrap_err();

        assert!(
            matches!(err, GraphError::InvalidEndpoint { ref endpoint, .. } if endpoint == "ghost")
        );
        assert!(graph
            .get_entity("E2")
            .unwrap()
            .incoming_relationship_ids()
            .is_empty());
    }

    #[test]
    fn test_self_loop() {
        let mut graph = EntityGraph::new();
        graph.add_entity(GraphEntity::new("E1")).unwrap();
        graph
            .add_entity(GraphEntity::relationship("R1", "E1", "knows", "E1"))
            .unwrap();

        let e1 = graph.get_entity("E1").unwrap();
        assert_eq!(ids(&e1.relationships(None)), vec!["R1"]);
        assert_eq!(ids(&e1.incoming_relationships(None)), vec!["R1"]);
    }

    #[test]
    fn test_find_relationships_counts_each_once() {
        let graph = build_triangle();
        assert_eq!(ids(&graph.find_relationships(Some("related_to"))), vec!["R1", "R3"]);
        assert_eq!(ids(&graph.find_relationships(None)), vec!["R1", "R2", "R3"]);
        assert!(graph.find_relationships(Some("unknown")).is_empty());
    }

    #[test]
    fn test_relationship_between_relationships() {
        let mut graph = build_triangle();
        graph
            .add_entity(GraphEntity::relationship("R4", "R1", "implies", "R3"))
            .unwrap();

        let r1 = graph.get_entity("R1").unwrap();
        assert_eq!(ids(&r1.relationships(None)), vec!["R4"]);
        assert_eq!(graph.find_relationships(Some("implies")).len(), 1);
    }

    #[test]
    fn test_remove_attribute() {
        let mut graph = build_triangle();
        let removed = graph.remove_attribute("E1", "A1").unwrap();
        assert_eq!(removed.identifier().as_str(), "A1");
        assert!(graph.get_entity("E1").unwrap().attribute_ids().is_empty());
        assert!(!graph.contains("A1"));
    }

    #[test]
    fn test_remove_missing_attribute_is_noop() {
        let mut graph = build_triangle();
        assert!(graph.remove_attribute("E1", "A9").is_none());
        assert!(graph.remove_attribute("E2", "A1").is_none());
        assert!(graph.contains("A1"));
        assert_eq!(graph.len(), 7);
    }

    #[test]
    fn test_remove_relationship_unindexes_both_sides() {
        let mut graph = build_triangle();
        let removed = graph.remove_relationship("R1").unwrap();
        assert_eq!(removed.identifier().as_str(), "R1");

        assert_eq!(graph.get_entity("E1").unwrap().relationship_ids().len(), 1);
        assert!(graph
            .get_entity("E2")
            .unwrap()
            .incoming_relationship_ids()
            .is_empty());
        assert!(graph.remove_relationship("R1").is_none());
        assert!(graph.remove_relationship("E1").is_none());
    }

    #[test]
    fn test_remove_entity_cascades() {
        let mut graph = build_triangle();
        let removed = graph.remove_entity("E1");

        assert_eq!(removed[0].identifier().as_str(), "E1");
        let mut gone: Vec<String> = removed.iter().map(|e| e.identifier().to_string()).collect();
        gone.sort();
        assert_eq!(gone, vec!["A1", "E1", "R1", "R2"]);

        let e2 = graph.get_entity("E2").unwrap();
        assert!(e2.incoming_relationship_ids().is_empty());
        assert_eq!(ids(&e2.relationships(None)), vec!["R3"]);
        let e3 = graph.get_entity("E3").unwrap();
        assert_eq!(ids(&e3.incoming_relationships(None)), vec!["R3"]);
        assert_eq!(graph.find_relationships(None).len(), 1);
    }

    #[test]
    fn test_remove_unknown_entity() {
        let mut graph = build_triangle();
        assert!(graph.remove_entity("nope").is_empty());
        assert_eq!(graph.len(), 7);
    }

    #[test]
    fn test_registration_drops_carried_indices() {
        let mut detached = GraphEntity::new("E9");
        detached.add_attribute("dangling".into());

        let mut graph = EntityGraph::new();
        graph.add_entity(detached).unwrap();
        assert!(graph.get_entity("E9").unwrap().attribute_ids().is_empty());
    }

    #[test]
    fn test_summary() {
        let graph = build_triangle();
        assert_eq!(
            graph.summary(),
            GraphSummary {
                total_members: 7,
                entities: 3,
                attributes: 1,
                relationships: 3,
            }
        );
    }

    #[test]
    fn test_sentence() {
        let mut graph = EntityGraph::new();
        graph
            .add_entity(GraphEntity::new("E1").with_label("Entity One"))
            .unwrap();
        graph
            .add_entity(GraphEntity::new("E2").with_label("Entity Two"))
            .unwrap();
        graph
            .add_entity(GraphEntity::relationship("R1", "E1", "related_to", "E2"))
            .unwrap();

        let rel = graph.get_entity("R1").unwrap();
        assert_eq!(rel.sentence().unwrap(), "Entity One related to Entity Two");
        assert!(graph.get_entity("E1").unwrap().sentence().is_none());
    }
}
