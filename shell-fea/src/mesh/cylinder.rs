//! Cylindrical shell mesh generator
//!
//! Nodes sit in rings around the axis, stacked along it from the base
//! (ring 0) to the top (ring `nv`). Element `(k, c)` spans rings `k` and
//! `k + 1` between columns `c` and `c + 1`, with the last column closing
//! back onto the first. Corner ordering puts every element's local z axis
//! toward the axis of revolution.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::elements::{Node, NodeId, Shell, ShellId};
use crate::error::{FEAError, FEAResult};

/// Axis of revolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    /// Unit vector along the axis
    pub fn direction(self) -> [f64; 3] {
        match self {
            Axis::X => [1.0, 0.0, 0.0],
            Axis::Y => [0.0, 1.0, 0.0],
            Axis::Z => [0.0, 0.0, 1.0],
        }
    }

    /// In-plane basis (e1, e2) used to place ring nodes
    fn ring_basis(self) -> ([f64; 3], [f64; 3]) {
        match self {
            Axis::Y => ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            Axis::Z => ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            Axis::X => ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        }
    }
}

/// Element topology for the generated wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElementKind {
    /// Circumferential spacing matched to the vertical spacing (near-square elements)
    #[default]
    Quad,
    /// Literal angle x height grid at the target size
    Rect,
}

/// Nodes and shells produced by one generation request, in ring-major order
#[derive(Debug, Clone)]
pub struct MeshLayout {
    pub nodes: Vec<(String, Node)>,
    pub shells: Vec<(String, Shell)>,
}

/// A cylindrical wall mesh definition plus its generation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CylinderMesh {
    /// Name assigned when the mesh is added to a model
    #[serde(default)]
    pub name: String,
    /// Target element size
    pub element_size: f64,
    /// Radius to the wall mid-surface
    pub radius: f64,
    /// Height along the axis
    pub height: f64,
    /// Wall thickness
    pub thickness: f64,
    /// Material name
    pub material: String,
    /// Local x stiffness modifier
    pub kx_mod: f64,
    /// Local y stiffness modifier
    pub ky_mod: f64,
    /// Center of the base ring
    pub center: [f64; 3],
    pub axis: Axis,
    pub kind: ElementKind,
    /// Circumferential division override
    pub circ_divisions: Option<usize>,
    /// Vertical division override
    pub vert_divisions: Option<usize>,

    #[serde(default)]
    pub(crate) generated: bool,
    #[serde(default)]
    pub(crate) node_ids: Vec<NodeId>,
    #[serde(default)]
    pub(crate) element_ids: Vec<ShellId>,
}

impl CylinderMesh {
    /// Create a new cylinder mesh definition about the global Y axis
    pub fn new(element_size: f64, radius: f64, height: f64, thickness: f64, material: &str) -> Self {
        Self {
            name: String::new(),
            element_size,
            radius,
            height,
            thickness,
            material: material.to_string(),
            kx_mod: 1.0,
            ky_mod: 1.0,
            center: [0.0, 0.0, 0.0],
            axis: Axis::Y,
            kind: ElementKind::Quad,
            circ_divisions: None,
            vert_divisions: None,
            generated: false,
            node_ids: Vec::new(),
            element_ids: Vec::new(),
        }
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_center(mut self, center: [f64; 3]) -> Self {
        self.center = center;
        self
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the size-derived circumferential and/or vertical division counts
    pub fn with_divisions(mut self, circ: Option<usize>, vert: Option<usize>) -> Self {
        self.circ_divisions = circ;
        self.vert_divisions = vert;
        self
    }

    /// Set stiffness modifiers for every generated element
    pub fn with_modifiers(mut self, kx_mod: f64, ky_mod: f64) -> Self {
        self.kx_mod = kx_mod;
        self.ky_mod = ky_mod;
        self
    }

    /// Check the parameters generation depends on
    pub fn validate(&self) -> FEAResult<()> {
        let positive = [
            ("element size", self.element_size),
            ("radius", self.radius),
            ("height", self.height),
            ("thickness", self.thickness),
        ];
        for (label, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(FEAError::InvalidGeometry(format!(
                    "cylinder mesh '{}' needs a positive {} (got {})",
                    self.name, label, value
                )));
            }
        }
        if self.center.iter().any(|c| !c.is_finite()) {
            return Err(FEAError::InvalidGeometry(format!(
                "cylinder mesh '{}' has a non-finite center",
                self.name
            )));
        }
        if self.vert_divisions == Some(0) {
            return Err(FEAError::InvalidGeometry(format!(
                "cylinder mesh '{}' needs at least one vertical division",
                self.name
            )));
        }
        Ok(())
    }

    /// Circumferential and vertical division counts `(nc, nv)`
    pub fn divisions(&self) -> (usize, usize) {
        let nv = self
            .vert_divisions
            .unwrap_or_else(|| ((self.height / self.element_size).round() as usize).max(1));

        let circumference = 2.0 * PI * self.radius;
        let nc = self.circ_divisions.unwrap_or_else(|| {
            let spacing = match self.kind {
                ElementKind::Quad => self.height / nv as f64,
                ElementKind::Rect => self.element_size,
            };
            (circumference / spacing).round() as usize
        });

        (nc.max(3), nv)
    }

    /// Node and shell definitions for this mesh, without touching a model
    pub fn layout(&self) -> FEAResult<MeshLayout> {
        self.validate()?;
        let (nc, nv) = self.divisions();

        let axis = self.axis.direction();
        let (e1, e2) = self.axis.ring_basis();
        let dh = self.height / nv as f64;

        let mut nodes = Vec::with_capacity((nv + 1) * nc);
        for k in 0..=nv {
            let h = k as f64 * dh;
            for c in 0..nc {
                let theta = 2.0 * PI * c as f64 / nc as f64;
                let (s, co) = theta.sin_cos();
                let p: [f64; 3] = std::array::from_fn(|d| {
                    self.center[d] + self.radius * (co * e1[d] + s * e2[d]) + h * axis[d]
                });
                let name = format!("{}-N{}", self.name, nodes.len());
                nodes.push((name, Node::new(p[0], p[1], p[2])));
            }
        }

        let mut shells = Vec::with_capacity(nv * nc);
        for k in 0..nv {
            for c in 0..nc {
                let next = (c + 1) % nc;
                let i = &nodes[k * nc + c].0;
                let j = &nodes[k * nc + next].0;
                let m = &nodes[(k + 1) * nc + next].0;
                let n = &nodes[(k + 1) * nc + c].0;
                let shell = Shell::new(i, j, m, n, self.thickness, &self.material)
                    .with_modifiers(self.kx_mod, self.ky_mod);
                let name = format!("{}-E{}", self.name, shells.len());
                shells.push((name, shell));
            }
        }

        Ok(MeshLayout { nodes, shells })
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Generated node ids in ring-major order
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Generated element ids in ring-major order
    pub fn element_ids(&self) -> &[ShellId] {
        &self.element_ids
    }

    /// Node ids of ring `k` (0 is the base), empty before generation
    pub fn ring(&self, k: usize) -> &[NodeId] {
        if !self.generated {
            return &[];
        }
        let (nc, nv) = self.divisions();
        if k > nv {
            return &[];
        }
        &self.node_ids[k * nc..(k + 1) * nc]
    }

    pub fn base_nodes(&self) -> &[NodeId] {
        self.ring(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ShellGeometry;
    use approx::assert_relative_eq;

    fn pca_tank(size: f64, kind: ElementKind) -> CylinderMesh {
        let mut mesh = CylinderMesh::new(size, 27.0, 20.0, 10.0 / 12.0, "Concrete").with_kind(kind);
        mesh.name = "Tank".to_string();
        mesh
    }

    #[test]
    fn test_division_rules() {
        assert_eq!(pca_tank(1.0, ElementKind::Quad).divisions(), (170, 20));
        assert_eq!(pca_tank(2.0, ElementKind::Quad).divisions(), (85, 10));
        assert_eq!(pca_tank(4.0, ElementKind::Quad).divisions(), (42, 5));
        assert_eq!(pca_tank(2.0, ElementKind::Rect).divisions(), (85, 10));

        // H / size not an integer: quad matches the vertical spacing, rect keeps the size
        assert_eq!(pca_tank(3.0, ElementKind::Quad).divisions(), (59, 7));
        assert_eq!(pca_tank(3.0, ElementKind::Rect).divisions(), (57, 7));
    }

    #[test]
    fn test_division_overrides() {
        let mesh = pca_tank(1.0, ElementKind::Quad).with_divisions(Some(2), Some(4));
        assert_eq!(mesh.divisions(), (3, 4));

        let mesh = pca_tank(1.0, ElementKind::Rect).with_divisions(None, Some(5));
        assert_eq!(mesh.divisions(), (170, 5));

        let mesh = pca_tank(1.0, ElementKind::Quad).with_divisions(None, Some(0));
        assert!(matches!(mesh.validate(), Err(FEAError::InvalidGeometry(_))));
    }

    #[test]
    fn test_layout_counts_and_names() {
        let mesh = pca_tank(4.0, ElementKind::Quad);
        let layout = mesh.layout().unwrap();
        assert_eq!(layout.nodes.len(), 6 * 42);
        assert_eq!(layout.shells.len(), 5 * 42);
        assert_eq!(layout.nodes[0].0, "Tank-N0");
        assert_eq!(layout.shells[209].0, "Tank-E209");

        for (_, node) in &layout.nodes {
            let r = (node.x * node.x + node.z * node.z).sqrt();
            assert_relative_eq!(r, 27.0, epsilon = 1e-9);
        }
        assert_relative_eq!(layout.nodes.last().unwrap().1.y, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_last_column_closes_ring() {
        let mesh = pca_tank(4.0, ElementKind::Quad);
        let layout = mesh.layout().unwrap();
        let last = &layout.shells[41].1;
        assert_eq!(last.i_node, "Tank-N41");
        assert_eq!(last.j_node, "Tank-N0");
        assert_eq!(last.m_node, "Tank-N42");
        assert_eq!(last.n_node, "Tank-N83");
    }

    #[test]
    fn test_local_z_points_at_axis() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let mut mesh = CylinderMesh::new(1.0, 5.0, 2.0, 0.25, "Steel")
                .with_axis(axis)
                .with_center([1.0, -2.0, 3.0]);
            mesh.name = "Wall".to_string();
            let layout = mesh.layout().unwrap();
            let coords: std::collections::HashMap<&str, [f64; 3]> = layout
                .nodes
                .iter()
                .map(|(name, node)| (name.as_str(), node.coords()))
                .collect();
            let dir = axis.direction();

            for (name, shell) in &layout.shells {
                let corners = shell.node_names().map(|n| coords[n]);
                let geom = ShellGeometry::new(name, &corners).unwrap();
                let c = geom.centroid;
                let rel: [f64; 3] = std::array::from_fn(|d| c[d] - mesh.center[d]);
                let along: f64 = (0..3).map(|d| rel[d] * dir[d]).sum();
                let radial: [f64; 3] = std::array::from_fn(|d| rel[d] - along * dir[d]);
                let z = geom.normal();
                let dot: f64 = (0..3).map(|d| radial[d] * z[d]).sum();
                assert!(dot < 0.0, "{:?} element {} faces outward", axis, name);
            }
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        for (size, radius, height, thickness) in [
            (0.0, 27.0, 20.0, 0.8),
            (1.0, -27.0, 20.0, 0.8),
            (1.0, 27.0, 0.0, 0.8),
            (1.0, 27.0, 20.0, -0.1),
            (f64::NAN, 27.0, 20.0, 0.8),
        ] {
            let mesh = CylinderMesh::new(size, radius, height, thickness, "Concrete");
            assert!(matches!(mesh.layout(), Err(FEAError::InvalidGeometry(_))));
        }
    }

    #[test]
    fn test_ring_before_generation_is_empty() {
        let mesh = pca_tank(2.0, ElementKind::Quad);
        assert!(mesh.base_nodes().is_empty());
        assert!(!mesh.is_generated());
    }
}
