use thiserror::Error;

use crate::types::UvChannel;

/// Errors that abort a bake. No partial texture is produced when one is returned.
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("mesh '{mesh}' is missing {channel} data")]
    MissingUvChannel { mesh: String, channel: UvChannel },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("invalid quality parameters: {0}")]
    InvalidQuality(String),

    #[error("{what} exceeds the bake limit ({requested} requested, limit {limit})")]
    ResourceExhausted {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    #[error("bake aborted by caller")]
    Aborted,
}

/// Non-fatal conditions collected during a bake.
#[derive(Debug, Clone, PartialEq)]
pub enum BakeWarning {
    /// No occluders were supplied; the bake only accounts for self-occlusion.
    EmptyOccluderSet,
    /// Triangles skipped because their UV or world area is zero.
    DegenerateTriangles { count: usize, total: usize },
    /// A quality value was clamped or is known to be wasteful.
    Quality(String),
    /// Occluders dropped by the LOD policy or because they duplicate the target.
    OccludersExcluded { count: usize },
}

impl std::fmt::Display for BakeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BakeWarning::EmptyOccluderSet => {
                write!(f, "no occluders supplied, baking self-occlusion only")
            }
            BakeWarning::DegenerateTriangles { count, total } => {
                write!(f, "{count} of {total} triangles are degenerate and were skipped")
            }
            BakeWarning::Quality(msg) => write!(f, "{msg}"),
            BakeWarning::OccludersExcluded { count } => {
                write!(f, "{count} occluders excluded (LOD siblings or duplicates)")
            }
        }
    }
}
