//! Mathematical utilities for FEA calculations

pub mod shell;
pub mod sparse;

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

pub use sparse::{
    apply_permutation, inverse_permutation, permute_symmetric, reverse_cuthill_mckee, PivotError,
    SkylineCholesky, SparseMatrixBuilder,
};

pub use shell::{
    shell_local_stiffness, shell_membrane_stress, shell_moments, shell_pressure_load,
    shell_transformation_matrix, shell_transverse_shear, ShellGeometry, ShellProperties,
};

pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// 24x24 matrix for shell stiffness
pub type Mat24 = SMatrix<f64, 24, 24>;
/// 24-element vector for shell forces/displacements
pub type Vec24 = SVector<f64, 24>;
