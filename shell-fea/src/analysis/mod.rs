//! Analysis options and per-combination reports

use serde::{Deserialize, Serialize};

use crate::error::NumericalWarning;

/// Options for linear static analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Relative pivot below which the stiffness matrix is treated as singular
    pub pivot_tolerance: f64,
    /// Check static equilibrium after analysis
    pub check_statics: bool,
    /// Allowed imbalance relative to the applied load magnitude
    pub statics_tolerance: f64,
    /// Compute element contributions on the rayon thread pool
    pub parallel: bool,
    /// Longest over shortest edge above which an element is flagged
    pub aspect_ratio_limit: f64,
    /// Warping above which an element is flagged
    pub warp_tolerance: f64,
    /// Enable logging/progress output
    pub log: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            pivot_tolerance: 1e-9,
            check_statics: false,
            statics_tolerance: 1e-6,
            parallel: true,
            aspect_ratio_limit: 10.0,
            warp_tolerance: 0.01,
            log: false,
        }
    }
}

impl AnalysisOptions {
    /// Create options for linear analysis
    pub fn linear() -> Self {
        Self::default()
    }

    /// Enable logging
    pub fn with_logging(mut self) -> Self {
        self.log = true;
        self
    }

    /// Check reactions against applied loads, flagging imbalance above `tolerance`
    pub fn with_statics_check(mut self, tolerance: f64) -> Self {
        self.check_statics = true;
        self.statics_tolerance = tolerance;
        self
    }

    /// Set the singular pivot tolerance
    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tolerance = tol;
        self
    }

    /// Run the element pass on a single thread
    pub fn serial(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set element quality limits
    pub fn with_quality_limits(mut self, aspect_ratio_limit: f64, warp_tolerance: f64) -> Self {
        self.aspect_ratio_limit = aspect_ratio_limit;
        self.warp_tolerance = warp_tolerance;
        self
    }
}

/// Outcome of analyzing one load combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Load combination name
    pub combo: String,
    /// Total number of DOFs
    pub total_dofs: usize,
    /// Free DOFs (unknown)
    pub free_dofs: usize,
    /// Stored entries of the factorized profile
    pub profile_size: usize,
    /// Maximum translation over all nodes
    pub max_displacement: f64,
    /// Node with maximum translation
    pub max_disp_node: String,
    /// Largest force or moment imbalance, when statics were checked
    pub statics_residual: Option<f64>,
    /// Non-fatal conditions found during the analysis
    pub warnings: Vec<NumericalWarning>,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
