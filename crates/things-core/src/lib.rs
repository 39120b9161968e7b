//! things-core: Shared types, configuration, and error handling for the Things property graph.
//!
//! This crate provides the foundational types used by the graph crate:
//! - Entity identifiers and kind tags
//! - Attribute value payloads
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::{GraphSettings, ThingsConfig};
pub use error::ThingsError;
pub use types::{AttributeValue, EntityId, EntityKind};
