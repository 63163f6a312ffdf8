//! Error types for the shell FEA engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for FEA operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Node '{0}' not found in model")]
    NodeNotFound(String),

    #[error("Shell element '{0}' not found in model")]
    ShellNotFound(String),

    #[error("Material '{0}' not found in model")]
    MaterialNotFound(String),

    #[error("Mesh '{0}' not found in model")]
    MeshNotFound(String),

    #[error("Load combination '{0}' not found in model")]
    LoadCombinationNotFound(String),

    #[error("Duplicate name '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Degenerate shell element '{element}': {reason}")]
    DegenerateElement { element: String, reason: String },

    #[error(
        "Singular stiffness matrix at node '{node}' {dof} (pivot {pivot:.3e}) - \
         model may be unstable or have insufficient supports"
    )]
    SingularMatrix { node: String, dof: String, pivot: f64 },

    #[error("Model not analyzed for load combination '{0}' - run analyze() first")]
    NotAnalyzed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for FEA operations
pub type FEAResult<T> = Result<T, FEAError>;

/// Non-fatal conditions found during an analysis.
///
/// These are collected into the analysis report and never abort a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericalWarning {
    /// Longest edge over shortest edge exceeds the configured limit
    PoorAspectRatio { element: String, ratio: f64 },
    /// Corners deviate from the element's mean plane
    WarpedElement { element: String, warp: f64 },
    /// Reactions and applied loads do not balance
    EquilibriumImbalance { combo: String, residual: f64 },
}

impl std::fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoorAspectRatio { element, ratio } => {
                write!(f, "element '{}' has aspect ratio {:.2}", element, ratio)
            }
            Self::WarpedElement { element, warp } => {
                write!(f, "element '{}' is warped ({:.3e})", element, warp)
            }
            Self::EquilibriumImbalance { combo, residual } => {
                write!(f, "combination '{}' is out of balance ({:.3e})", combo, residual)
            }
        }
    }
}
