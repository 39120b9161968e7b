//! things-graph: In-memory typed property graph.
//!
//! Entities are connected by directed, typed relationships, and attributes
//! are first-class graph members rather than plain key/value pairs. The
//! `EntityGraph` arena owns every member; attributes and relationships refer
//! to their domain and endpoints by identifier, which keeps the
//! entity <-> relationship back-references free of ownership cycles.
//! Serialization expands member lists to a bounded depth.

pub mod document;
pub mod entity;
pub mod error;
pub mod graph;
pub mod record;
pub mod shared;

pub use document::GraphDocument;
pub use entity::{Attribute, EntityVariant, GraphEntity, Relationship};
pub use error::GraphError;
pub use graph::{EntityGraph, EntityRef, GraphSummary};
pub use record::{deserialize, EntityRecord, Member};
pub use shared::SharedGraph;
pub use things_core::{AttributeValue, EntityId, EntityKind};
