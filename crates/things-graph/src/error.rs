//! Error types for the things-graph crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Identifier conflict: {identifier} is already registered")]
    IdentifierConflict { identifier: String },

    #[error("Invalid endpoint for relationship {relationship}: {endpoint} is not in the graph")]
    InvalidEndpoint {
        relationship: String,
        endpoint: String,
    },

    #[error("Attribute {attribute} describes {domain}, which is not in the graph")]
    MissingDomain { attribute: String, domain: String },

    #[error("Invalid entity record: {0}")]
    InvalidRecord(String),

    #[error("Graph lock poisoned")]
    LockPoisoned,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
