//! Result types for FEA analysis

use serde::{Deserialize, Serialize};

use crate::math::{
    shell_membrane_stress, shell_moments, shell_transverse_shear, ShellGeometry, ShellProperties,
    Vec24,
};

/// Displacement results at a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    /// Displacement in X direction
    pub dx: f64,
    /// Displacement in Y direction
    pub dy: f64,
    /// Displacement in Z direction
    pub dz: f64,
    /// Rotation about X axis
    pub rx: f64,
    /// Rotation about Y axis
    pub ry: f64,
    /// Rotation about Z axis
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    /// Get translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }
}

/// Reaction forces at a supported node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    /// Reaction force in X direction
    pub fx: f64,
    /// Reaction force in Y direction
    pub fy: f64,
    /// Reaction force in Z direction
    pub fz: f64,
    /// Reaction moment about X axis
    pub mx: f64,
    /// Reaction moment about Y axis
    pub my: f64,
    /// Reaction moment about Z axis
    pub mz: f64,
}

impl Reactions {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }

    /// Get total force magnitude
    pub fn force_magnitude(&self) -> f64 {
        (self.fx.powi(2) + self.fy.powi(2) + self.fz.powi(2)).sqrt()
    }
}

/// In-plane (membrane) stress in a shell element, force per unit area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MembraneStress {
    /// Normal stress along local x
    pub sx: f64,
    /// Normal stress along local y
    pub sy: f64,
    /// In-plane shear stress
    pub txy: f64,
}

impl MembraneStress {
    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            sx: arr[0],
            sy: arr[1],
            txy: arr[2],
        }
    }

    pub fn component(&self, c: MembraneComponent) -> f64 {
        match c {
            MembraneComponent::Sx => self.sx,
            MembraneComponent::Sy => self.sy,
            MembraneComponent::Txy => self.txy,
        }
    }

    /// Von Mises equivalent stress
    pub fn von_mises(&self) -> f64 {
        (self.sx.powi(2) - self.sx * self.sy + self.sy.powi(2) + 3.0 * self.txy.powi(2)).sqrt()
    }

    /// Principal stresses (s1 >= s2)
    pub fn principal(&self) -> (f64, f64) {
        let s_avg = (self.sx + self.sy) / 2.0;
        let r = ((self.sx - self.sy).powi(2) / 4.0 + self.txy.powi(2)).sqrt();
        (s_avg + r, s_avg - r)
    }

    /// Multiply through by a thickness to get force per unit length
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            sx: self.sx * factor,
            sy: self.sy * factor,
            txy: self.txy * factor,
        }
    }
}

/// Bending moment resultants per unit length
///
/// Positive moments put the element's +z face in tension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShellMoments {
    /// Moment producing normal stress along local x
    pub mx: f64,
    /// Moment producing normal stress along local y
    pub my: f64,
    /// Twisting moment
    pub mxy: f64,
}

impl ShellMoments {
    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            mx: arr[0],
            my: arr[1],
            mxy: arr[2],
        }
    }

    pub fn component(&self, c: MomentComponent) -> f64 {
        match c {
            MomentComponent::Mx => self.mx,
            MomentComponent::My => self.my,
            MomentComponent::Mxy => self.mxy,
        }
    }
}

/// Transverse shear resultants per unit length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShellShear {
    pub qx: f64,
    pub qy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MomentComponent {
    Mx,
    My,
    Mxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembraneComponent {
    Sx,
    Sy,
    Txy,
}

/// Points each element is sampled at for mesh-wide extremes: corners i, j, m, n and center
pub const SAMPLE_POINTS: [(f64, f64); 5] = [
    (-1.0, -1.0),
    (1.0, -1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
    (0.0, 0.0),
];

/// Solved state of one shell element for one load combination
///
/// Queries take natural coordinates (xi, eta) in [-1, 1] x [-1, 1], with
/// corners i(-1,-1), j(1,-1), m(1,1), n(-1,1).
#[derive(Debug, Clone)]
pub struct ShellResults {
    name: String,
    geometry: ShellGeometry,
    properties: ShellProperties,
    displacements: Vec24,
}

impl ShellResults {
    /// `displacements` are the element's nodal displacements in local axes
    pub fn new(
        name: &str,
        geometry: ShellGeometry,
        properties: ShellProperties,
        displacements: Vec24,
    ) -> Self {
        Self {
            name: name.to_string(),
            geometry,
            properties,
            displacements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &ShellGeometry {
        &self.geometry
    }

    /// In-plane stresses (force/area)
    pub fn membrane(&self, xi: f64, eta: f64) -> MembraneStress {
        MembraneStress::from_array(shell_membrane_stress(
            &self.geometry,
            &self.properties,
            &self.displacements,
            xi,
            eta,
        ))
    }

    /// In-plane force resultants (force/length)
    pub fn membrane_forces(&self, xi: f64, eta: f64) -> MembraneStress {
        self.membrane(xi, eta).scaled(self.properties.thickness)
    }

    /// Moment resultants (moment/length)
    pub fn moment(&self, xi: f64, eta: f64) -> ShellMoments {
        ShellMoments::from_array(shell_moments(
            &self.geometry,
            &self.properties,
            &self.displacements,
            xi,
            eta,
        ))
    }

    /// Transverse shear resultants (force/length)
    pub fn shear(&self, xi: f64, eta: f64) -> ShellShear {
        let [qx, qy] = shell_transverse_shear(
            &self.geometry,
            &self.properties,
            &self.displacements,
            xi,
            eta,
        );
        ShellShear { qx, qy }
    }
}

/// Solved state of every element of a mesh for one load combination
#[derive(Debug, Clone)]
pub struct MeshResults {
    elements: Vec<ShellResults>,
}

impl MeshResults {
    pub fn new(elements: Vec<ShellResults>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[ShellResults] {
        &self.elements
    }

    fn sampled<'a>(
        &'a self,
        points: &'a [(f64, f64)],
    ) -> impl Iterator<Item = (&'a ShellResults, f64, f64)> + 'a {
        self.elements
            .iter()
            .flat_map(move |e| points.iter().map(move |&(xi, eta)| (e, xi, eta)))
    }

    fn moments_at<'a>(&'a self, c: MomentComponent, points: &'a [(f64, f64)]) -> impl Iterator<Item = f64> + 'a {
        self.sampled(points)
            .map(move |(e, xi, eta)| e.moment(xi, eta).component(c))
    }

    fn membrane_at<'a>(
        &'a self,
        c: MembraneComponent,
        points: &'a [(f64, f64)],
    ) -> impl Iterator<Item = f64> + 'a {
        self.sampled(points)
            .map(move |(e, xi, eta)| e.membrane(xi, eta).component(c))
    }

    /// Largest moment component over corners and centers of every element
    pub fn max_moment(&self, c: MomentComponent) -> f64 {
        self.moments_at(c, &SAMPLE_POINTS).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest moment component over corners and centers of every element
    pub fn min_moment(&self, c: MomentComponent) -> f64 {
        self.moments_at(c, &SAMPLE_POINTS).fold(f64::INFINITY, f64::min)
    }

    pub fn max_membrane(&self, c: MembraneComponent) -> f64 {
        self.membrane_at(c, &SAMPLE_POINTS).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_membrane(&self, c: MembraneComponent) -> f64 {
        self.membrane_at(c, &SAMPLE_POINTS).fold(f64::INFINITY, f64::min)
    }

    /// Largest moment component at one natural-coordinate point of every element
    pub fn max_moment_at(&self, c: MomentComponent, point: (f64, f64)) -> f64 {
        let points = [point];
        self.moments_at(c, &points).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_moment_at(&self, c: MomentComponent, point: (f64, f64)) -> f64 {
        let points = [point];
        self.moments_at(c, &points).fold(f64::INFINITY, f64::min)
    }

    pub fn max_membrane_at(&self, c: MembraneComponent, point: (f64, f64)) -> f64 {
        let points = [point];
        self.membrane_at(c, &points).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_membrane_at(&self, c: MembraneComponent, point: (f64, f64)) -> f64 {
        let points = [point];
        self.membrane_at(c, &points).fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(name: &str, d: Vec24) -> ShellResults {
        let geom = ShellGeometry::new(
            name,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        )
        .unwrap();
        let props = ShellProperties {
            e: 1000.0,
            g: 400.0,
            nu: 0.0,
            thickness: 0.1,
            kx_mod: 1.0,
            ky_mod: 1.0,
        };
        ShellResults::new(name, geom, props, d)
    }

    #[test]
    fn test_membrane_stress_helpers() {
        let s = MembraneStress::from_array([100.0, 0.0, 0.0]);
        assert_relative_eq!(s.von_mises(), 100.0, epsilon = 1e-12);
        assert_eq!(s.principal(), (100.0, 0.0));
        assert_eq!(s.scaled(0.5).sx, 50.0);
        assert_eq!(s.component(MembraneComponent::Sx), 100.0);
    }

    #[test]
    fn test_membrane_forces_scale_by_thickness() {
        // Uniform stretch along x: u = 0.001 x
        let mut d = Vec24::zeros();
        d[6] = 0.001;
        d[12] = 0.001;
        let e = square("E1", d);
        let s = e.membrane(0.3, -0.2);
        assert_relative_eq!(s.sx, 1.0, epsilon = 1e-9);
        assert_relative_eq!(e.membrane_forces(0.0, 0.0).sx, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_mesh_extremes() {
        let mut stretched = Vec24::zeros();
        stretched[6] = 0.002;
        stretched[12] = 0.002;
        let mut compressed = Vec24::zeros();
        compressed[6] = -0.001;
        compressed[12] = -0.001;

        let mesh = MeshResults::new(vec![square("A", stretched), square("B", compressed)]);
        assert_relative_eq!(mesh.max_membrane(MembraneComponent::Sx), 2.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.min_membrane(MembraneComponent::Sx), -1.0, epsilon = 1e-9);
        assert_relative_eq!(
            mesh.max_membrane_at(MembraneComponent::Sx, (0.0, 0.0)),
            2.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(mesh.max_moment(MomentComponent::My), 0.0, epsilon = 1e-9);
        assert_eq!(mesh.elements().len(), 2);
    }
}
