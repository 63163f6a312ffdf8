//! Global assembly of shell element contributions
//!
//! Element stiffness and unit-pressure loads are computed independently per
//! element (in parallel when enabled) and then scattered into COO triplets in
//! element order. Global DOF numbering is `6 * node_index + dof`.

use std::collections::HashMap;

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;

use crate::elements::{Material, Node, Shell};
use crate::error::{FEAError, FEAResult};
use crate::math::{
    shell_local_stiffness, shell_pressure_load, shell_transformation_matrix, Mat24,
    SparseMatrixBuilder, Vec24,
};

/// Global stiffness and unit-pressure load of one shell, in global axes
#[derive(Debug, Clone)]
pub struct ElementContribution {
    /// Global DOF index of each of the 24 element DOFs
    pub dofs: [usize; 24],
    pub stiffness: Mat24,
    /// Nodal loads for a pressure of 1.0
    pub unit_load: Vec24,
    pub aspect_ratio: f64,
    pub warp: f64,
}

/// Compute the contribution of a single shell
pub fn element_contribution(
    shell: &Shell,
    nodes: &[Node],
    materials: &HashMap<String, Material>,
) -> FEAResult<ElementContribution> {
    let material = materials
        .get(&shell.material)
        .ok_or_else(|| FEAError::MaterialNotFound(shell.material.clone()))?;

    let geom = shell.geometry(nodes)?;
    let props = shell.properties(material);

    let t = shell_transformation_matrix(&geom);
    let k_local = shell_local_stiffness(&geom, &props);
    let f_local = shell_pressure_load(&geom, 1.0);

    let ids = shell.node_ids();
    let dofs = std::array::from_fn(|i| 6 * ids[i / 6].0 + i % 6);

    Ok(ElementContribution {
        dofs,
        stiffness: t.transpose() * k_local * t,
        unit_load: t.transpose() * f_local,
        aspect_ratio: geom.aspect_ratio,
        warp: geom.warp,
    })
}

/// Compute every shell's contribution, preserving element order
pub fn element_contributions(
    shells: &[Shell],
    nodes: &[Node],
    materials: &HashMap<String, Material>,
    parallel: bool,
) -> FEAResult<Vec<ElementContribution>> {
    if parallel {
        shells
            .par_iter()
            .map(|shell| element_contribution(shell, nodes, materials))
            .collect()
    } else {
        shells
            .iter()
            .map(|shell| element_contribution(shell, nodes, materials))
            .collect()
    }
}

/// Scatter element stiffness matrices into a global CSR matrix
pub fn assemble_stiffness<'a>(
    n_dofs: usize,
    contributions: impl IntoIterator<Item = &'a ElementContribution>,
) -> CsrMatrix<f64> {
    let mut builder = SparseMatrixBuilder::new(n_dofs);
    for c in contributions {
        builder.add_element_matrix(&c.dofs, &c.stiffness);
    }
    builder.to_csr()
}

/// Global load vector for the given per-element net pressures
pub fn assemble_loads<'a>(
    n_dofs: usize,
    contributions: impl IntoIterator<Item = (&'a ElementContribution, f64)>,
) -> DVector<f64> {
    let mut f = DVector::zeros(n_dofs);
    for (c, pressure) in contributions {
        if pressure == 0.0 {
            continue;
        }
        for (i, &dof) in c.dofs.iter().enumerate() {
            f[dof] += pressure * c.unit_load[i];
        }
    }
    f
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free(usize),
    Restrained(usize),
}

/// Split of the global DOFs into free and restrained sets
#[derive(Debug, Clone)]
pub struct DofPartition {
    free: Vec<usize>,
    restrained: Vec<usize>,
    slots: Vec<Slot>,
}

impl DofPartition {
    /// Partition from per-node restraint flags in DOF order
    pub fn new(restraints: &[[bool; 6]]) -> Self {
        let mut free = Vec::new();
        let mut restrained = Vec::new();
        let mut slots = Vec::with_capacity(restraints.len() * 6);

        for flags in restraints {
            for &fixed in flags {
                let dof = slots.len();
                if fixed {
                    slots.push(Slot::Restrained(restrained.len()));
                    restrained.push(dof);
                } else {
                    slots.push(Slot::Free(free.len()));
                    free.push(dof);
                }
            }
        }

        Self {
            free,
            restrained,
            slots,
        }
    }

    pub fn n_dofs(&self) -> usize {
        self.slots.len()
    }

    /// Global indices of the free DOFs
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Global indices of the restrained DOFs
    pub fn restrained(&self) -> &[usize] {
        &self.restrained
    }

    /// Position of a global DOF within the free set
    pub fn free_index(&self, dof: usize) -> Option<usize> {
        match self.slots.get(dof) {
            Some(Slot::Free(i)) => Some(*i),
            _ => None,
        }
    }

    /// Extract the free-free block K_ff
    pub fn free_block(&self, k: &CsrMatrix<f64>) -> CsrMatrix<f64> {
        let n = self.free.len();
        let mut coo = CooMatrix::new(n, n);
        for (i, &row) in self.free.iter().enumerate() {
            let lane = k.row(row);
            for (&col, &val) in lane.col_indices().iter().zip(lane.values()) {
                if let Slot::Free(j) = self.slots[col] {
                    coo.push(i, j, val);
                }
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Gather the free entries of a global vector
    pub fn gather_free(&self, v: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(self.free.len(), self.free.iter().map(|&d| v[d]))
    }

    /// Expand free-DOF values to a global vector (restrained DOFs are zero)
    pub fn scatter_free(&self, u_free: &DVector<f64>) -> DVector<f64> {
        let mut u = DVector::zeros(self.n_dofs());
        for (i, &d) in self.free.iter().enumerate() {
            u[d] = u_free[i];
        }
        u
    }

    /// Support reactions R = K_rf u_f - F_r, scattered to a global vector
    pub fn reactions(&self, k: &CsrMatrix<f64>, u: &DVector<f64>, f: &DVector<f64>) -> DVector<f64> {
        let mut r = DVector::zeros(self.n_dofs());
        for &row in &self.restrained {
            let lane = k.row(row);
            let ku: f64 = lane
                .col_indices()
                .iter()
                .zip(lane.values())
                .map(|(&col, &val)| val * u[col])
                .sum();
            r[row] = ku - f[row];
        }
        r
    }
}
