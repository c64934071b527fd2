use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreError {
    #[error("Invalid type definition: {0}")]
    InvalidType(String),

    #[error("Invalid substitution: {0}")]
    InvalidSubstitution(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
