//! Material properties

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Elastic material properties referenced by name from shell elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Modulus of elasticity
    pub e: f64,
    /// Shear modulus (drives transverse shear rigidity)
    pub g: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density
    pub rho: f64,
}

impl Material {
    /// Create a new material with given properties
    pub fn new(e: f64, g: f64, nu: f64, rho: f64) -> Self {
        Self { e, g, nu, rho }
    }

    /// Create a new isotropic material from E and nu
    /// G is calculated as E / (2 * (1 + nu))
    pub fn isotropic(e: f64, nu: f64, rho: f64) -> Self {
        let g = e / (2.0 * (1.0 + nu));
        Self::new(e, g, nu, rho)
    }

    /// Normal-weight concrete in US customary units (psf, pcf)
    ///
    /// `fc_psi` is the compressive strength in psi; E = 57000 sqrt(f'c) psi.
    pub fn concrete_us(fc_psi: f64) -> Self {
        let e = 57000.0 * fc_psi.sqrt() * 144.0;
        Self::new(e, 0.4 * e, 0.25, 150.0)
    }

    /// Reject properties the element formulation cannot use
    pub(crate) fn validate(&self, name: &str) -> FEAResult<()> {
        let ok = self.e.is_finite()
            && self.e > 0.0
            && self.g.is_finite()
            && self.g > 0.0
            && self.nu > -1.0
            && self.nu < 0.5;
        if ok {
            Ok(())
        } else {
            Err(FEAError::InvalidInput(format!(
                "material '{}' needs E > 0, G > 0 and -1 < nu < 0.5",
                name
            )))
        }
    }
}
