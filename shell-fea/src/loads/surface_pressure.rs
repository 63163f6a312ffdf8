//! Shell surface loads

use serde::{Deserialize, Serialize};

/// A uniform pressure on a shell element
///
/// Positive pressure acts on the element's +z face and pushes toward -z.
/// Generated cylinder walls have +z pointing at the axis, so a positive
/// liquid pressure pushes the wall outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePressure {
    /// Pressure magnitude (force per unit area)
    pub pressure: f64,
    /// Load case
    pub case: String,
}

impl SurfacePressure {
    /// Create a new pressure load
    pub fn new(pressure: f64, case: &str) -> Self {
        Self {
            pressure,
            case: case.to_string(),
        }
    }

    /// Hydrostatic pressure at `depth` below a free surface
    pub fn hydrostatic(unit_weight: f64, depth: f64, case: &str) -> Self {
        Self::new(unit_weight * depth.max(0.0), case)
    }

    /// Scale the load by a factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            pressure: self.pressure * factor,
            case: self.case.clone(),
        }
    }
}
