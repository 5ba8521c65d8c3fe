//! Error types for net-tree construction and verification.

use crate::node::NodeId;
use crate::point::PointId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetTreeError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetTreeError {
    /// An operation that needs at least one argument was given none.
    #[error("insufficient arguments: {0}")]
    InsufficientArguments(String),

    #[error("dimension mismatch: expected {expected} coordinates, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Tree constants that violate `tau > 1`, `cp > 0`, `cc > 0` or yield a
    /// non-positive or infinite relative constant.
    #[error("invalid constant: {0}")]
    InvalidConstant(String),

    #[error("unknown point handle {0}")]
    UnknownPoint(PointId),

    #[error("unknown or removed node handle {0}")]
    UnknownNode(NodeId),

    #[error("tree has no root; call set_root or construct first")]
    NoRoot,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for NetTreeError {
    fn from(err: serde_json::Error) -> Self {
        NetTreeError::Config(err.to_string())
    }
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for NetTreeError {
    fn from(err: toml::de::Error) -> Self {
        NetTreeError::Config(err.to_string())
    }
}
