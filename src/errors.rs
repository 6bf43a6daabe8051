use thiserror::Error;

/// Errors raised for caller-side precondition violations.
///
/// Expected interaction failures (expanding a fully expanded module, moving a
/// module past a boundary) are not errors; those return `Ok(false)` and log a
/// warning instead.
#[derive(Error, Debug)]
pub enum AlluvialError {
    #[error("duplicate network id: {0}")]
    DuplicateNetwork(String),

    #[error("network not found: {0}")]
    NetworkNotFound(String),

    #[error("module not found in network {network}: {module}")]
    ModuleNotFound { network: String, module: String },

    #[error("leaf node not found in network {network}: {identifier}")]
    LeafNotFound {
        network: String,
        identifier: String,
    },

    #[error("invalid tree path: {0}")]
    InvalidPath(String),

    #[error("internal tree operation failed: {0}")]
    Internal(String),
}

pub type AlluvialResult<T> = Result<T, AlluvialError>;
