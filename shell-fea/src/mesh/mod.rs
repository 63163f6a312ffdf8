//! Structured mesh generation

mod cylinder;

pub use cylinder::{Axis, CylinderMesh, ElementKind, MeshLayout};
