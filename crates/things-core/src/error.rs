use thiserror::Error;

/// Top-level error type for the Things platform.
#[derive(Error, Debug)]
pub enum ThingsError {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ThingsError>;
