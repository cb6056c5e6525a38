//! Error types for building the occlusion tree.

use thiserror::Error;

/// Errors that abort a tree build.
#[derive(Error, Debug)]
pub enum OccluderError {
    /// Clipping produced a polygon with more vertices than a winding holds.
    #[error("trace winding exceeded {max} vertices")]
    VertexOverflow {
        /// Configured vertex cap.
        max: usize,
    },

    /// A decision node refers to a node that does not exist.
    #[error("invalid trace node: {0}")]
    InvalidNode(usize),

    /// The level's BSP refers to a plane, node or leaf it does not contain.
    #[error("bsp {kind} {index} is out of range")]
    InvalidBspReference {
        /// Which lump the reference points into.
        kind: &'static str,
        /// The offending index.
        index: usize,
    },

    /// Invalid build settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings text could not be parsed.
    #[error("failed to parse settings: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for occluder operations.
pub type Result<T> = std::result::Result<T, OccluderError>;
