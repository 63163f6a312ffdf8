//! Shell element - flat four-node quadrilateral with membrane, bending and drilling DOFs

use serde::{Deserialize, Serialize};

use super::{Material, Node, NodeId};
use crate::error::FEAResult;
use crate::loads::{LoadCombination, SurfacePressure};
use crate::math::{ShellGeometry, ShellProperties};

/// Index of a shell in the model's element arena
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ShellId(pub usize);

/// A quadrilateral shell element
/// Uses a 4-node element with 6 DOFs per node (DX, DY, DZ, RX, RY, RZ)
///
/// Corners i -> j -> m -> n run around the perimeter. The local z axis
/// follows the right-hand rule over that ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    /// Name assigned when the shell is added to a model
    #[serde(default)]
    pub name: String,
    /// i-node name (corner 1)
    pub i_node: String,
    /// j-node name (corner 2)
    pub j_node: String,
    /// m-node name (corner 3)
    pub m_node: String,
    /// n-node name (corner 4)
    pub n_node: String,
    /// Thickness
    pub thickness: f64,
    /// Material name
    pub material: String,
    /// Local x stiffness modifier
    pub kx_mod: f64,
    /// Local y stiffness modifier
    pub ky_mod: f64,

    /// Corner ids, resolved when the shell is added to a model
    #[serde(default)]
    pub(crate) nodes: [NodeId; 4],

    /// Surface pressures by load case
    #[serde(default)]
    pub(crate) pressures: Vec<SurfacePressure>,
}

impl Shell {
    /// Create a new shell element
    pub fn new(
        i_node: &str,
        j_node: &str,
        m_node: &str,
        n_node: &str,
        thickness: f64,
        material: &str,
    ) -> Self {
        Self {
            name: String::new(),
            i_node: i_node.to_string(),
            j_node: j_node.to_string(),
            m_node: m_node.to_string(),
            n_node: n_node.to_string(),
            thickness,
            material: material.to_string(),
            kx_mod: 1.0,
            ky_mod: 1.0,
            nodes: [NodeId::default(); 4],
            pressures: Vec::new(),
        }
    }

    /// Set stiffness modifiers along local x and y
    pub fn with_modifiers(mut self, kx_mod: f64, ky_mod: f64) -> Self {
        self.kx_mod = kx_mod;
        self.ky_mod = ky_mod;
        self
    }

    /// Corner names in i, j, m, n order
    pub fn node_names(&self) -> [&str; 4] {
        [&self.i_node, &self.j_node, &self.m_node, &self.n_node]
    }

    /// Corner ids in i, j, m, n order
    pub fn node_ids(&self) -> [NodeId; 4] {
        self.nodes
    }

    /// Pressures attached to this element
    pub fn pressures(&self) -> &[SurfacePressure] {
        &self.pressures
    }

    /// Net pressure for a load combination: sum of factor x pressure
    pub fn combined_pressure(&self, combo: &LoadCombination) -> f64 {
        self.pressures
            .iter()
            .filter(|p| combo.includes(&p.case))
            .map(|p| combo.factor(&p.case) * p.pressure)
            .sum()
    }

    pub(crate) fn corner_coords(&self, nodes: &[Node]) -> [[f64; 3]; 4] {
        self.nodes.map(|id| nodes[id.0].coords())
    }

    /// Local frame for the current node positions
    pub(crate) fn geometry(&self, nodes: &[Node]) -> FEAResult<ShellGeometry> {
        ShellGeometry::new(&self.name, &self.corner_coords(nodes))
    }

    pub(crate) fn properties(&self, material: &Material) -> ShellProperties {
        ShellProperties {
            e: material.e,
            g: material.g,
            nu: material.nu,
            thickness: self.thickness,
            kx_mod: self.kx_mod,
            ky_mod: self.ky_mod,
        }
    }
}
