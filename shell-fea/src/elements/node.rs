//! Node element - represents a point in 3D space

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a node in the model's node arena
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

/// The six classical degrees of freedom at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dof {
    DX,
    DY,
    DZ,
    RX,
    RY,
    RZ,
}

impl Dof {
    pub const ALL: [Dof; 6] = [Dof::DX, Dof::DY, Dof::DZ, Dof::RX, Dof::RY, Dof::RZ];

    /// Offset of this DOF within a node's block of six
    pub fn index(self) -> usize {
        match self {
            Dof::DX => 0,
            Dof::DY => 1,
            Dof::DZ => 2,
            Dof::RX => 3,
            Dof::RY => 4,
            Dof::RZ => 5,
        }
    }

    pub fn from_index(i: usize) -> Option<Dof> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Dof::DX => "DX",
            Dof::DY => "DY",
            Dof::DZ => "DZ",
            Dof::RX => "RX",
            Dof::RY => "RY",
            Dof::RZ => "RZ",
        }
    }
}

/// A 3D node in the finite element model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Name assigned when the node is added to a model
    #[serde(default)]
    pub name: String,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,

    /// Displacement results by load combination
    #[serde(default)]
    pub(crate) displacements: HashMap<String, [f64; 6]>,

    /// Reaction forces by load combination
    #[serde(default)]
    pub(crate) reactions: HashMap<String, [f64; 6]>,
}

impl Node {
    /// Create a new node at the given coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            name: String::new(),
            x,
            y,
            z,
            displacements: HashMap::new(),
            reactions: HashMap::new(),
        }
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Get displacement for a load combination
    /// Returns [DX, DY, DZ, RX, RY, RZ]
    pub fn displacement(&self, combo_name: &str) -> Option<[f64; 6]> {
        self.displacements.get(combo_name).copied()
    }

    /// Get reactions for a load combination
    /// Returns [FX, FY, FZ, MX, MY, MZ]
    pub fn reaction(&self, combo_name: &str) -> Option<[f64; 6]> {
        self.reactions.get(combo_name).copied()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}
