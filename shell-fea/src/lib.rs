//! Shell FEA - A native Rust finite element engine for thin shells and plates
//!
//! This library provides a linear static analysis pipeline for shell structures,
//! inspired by PyNite, supporting:
//! - Flat four-node shell elements (Q4 membrane + DKMQ bending + drilling)
//! - Structured cylinder mesh generation (tank walls)
//! - Sparse assembly and RCM-ordered skyline Cholesky solution
//! - Support reactions, membrane stresses and moment resultants
//!
//! ## Example
//! ```rust,no_run
//! use shell_fea::prelude::*;
//!
//! let mut model = FEModel::new();
//!
//! // Add material
//! model.add_material("Concrete", Material::concrete_us(4000.0)).unwrap();
//!
//! // Add a 20 ft high, 27 ft radius tank wall meshed at 1 ft
//! model
//!     .add_cylinder_mesh("Tank", CylinderMesh::new(1.0, 27.0, 20.0, 10.0 / 12.0, "Concrete"))
//!     .unwrap();
//! let mesh = model.generate_mesh("Tank").unwrap().clone();
//!
//! // Fix the base
//! for id in mesh.base_nodes() {
//!     let name = model.nodes()[id.0].name.clone();
//!     model.add_support(&name, Support::fixed()).unwrap();
//! }
//!
//! // Hydrostatic pressure on every element
//! for id in mesh.element_ids() {
//!     let shell = &model.shells()[id.0];
//!     let depth = 20.0 - shell.node_ids().iter().map(|n| model.nodes()[n.0].y).sum::<f64>() / 4.0;
//!     let name = shell.name.clone();
//!     model.add_surface_pressure(&name, SurfacePressure::hydrostatic(62.5, depth, "Case 1")).unwrap();
//! }
//!
//! // Analyze
//! model.analyze_linear().unwrap();
//!
//! // Get results
//! let results = model.mesh_results("Tank", "Combo 1").unwrap();
//! let max_my = results.max_moment(MomentComponent::My);
//! ```

pub mod analysis;
pub mod assembly;
pub mod elements;
pub mod error;
pub mod loads;
pub mod math;
pub mod mesh;
pub mod model;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{AnalysisOptions, AnalysisReport};
    pub use crate::elements::{Dof, Material, Node, NodeId, Shell, ShellId, Support};
    pub use crate::error::{FEAError, FEAResult, NumericalWarning};
    pub use crate::loads::{LoadCombination, SurfacePressure};
    pub use crate::mesh::{Axis, CylinderMesh, ElementKind};
    pub use crate::model::FEModel;
    pub use crate::results::{
        MembraneComponent, MembraneStress, MeshResults, MomentComponent, NodeDisplacement,
        Reactions, ShellMoments, ShellResults, ShellShear,
    };
}
