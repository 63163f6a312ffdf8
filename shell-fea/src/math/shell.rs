//! Flat four-node shell element math
//!
//! References:
//! - "A Comparative Formulation of DKMQ, DSQ and MITC4 Quadrilateral Plate Elements", Irwan Katili
//! - "Finite Element Procedures, 2nd Edition", Klaus-Jurgen Bathe
//!
//! The element combines:
//! - Bilinear isoparametric membrane (Q4), 2x2 Gauss integration
//! - DKMQ plate bending with transverse shear, 2x2 Gauss integration
//! - A weak drilling spring on the local RZ DOFs, self-equilibrated apart from a small grounded share
//!
//! Local DOF ordering is [DX, DY, DZ, RX, RY, RZ] for nodes i, j, m, n.
//! Natural coordinates of the corners are i(-1,-1), j(1,-1), m(1,1), n(-1,1).
//!
//! Sign conventions:
//! - Rotations about local x and y map to plate rotations as beta_x = RY, beta_y = -RX
//! - Positive pressure acts on the +z face and pushes toward -z
//! - Positive moments put the +z face in tension

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

use super::{Mat24, Mat3, Vec24, Vec3};
use crate::error::{FEAError, FEAResult};

type Mat3x8 = SMatrix<f64, 3, 8>;
type Mat3x12 = SMatrix<f64, 3, 12>;
type Mat2x12 = SMatrix<f64, 2, 12>;
type Mat8 = SMatrix<f64, 8, 8>;
type Mat12 = SMatrix<f64, 12, 12>;

/// Membrane DOFs (u, v per node) within the 24-DOF local vector
pub const MEMBRANE_DOFS: [usize; 8] = [0, 1, 6, 7, 12, 13, 18, 19];
/// Bending DOFs (w, rx, ry per node) within the 24-DOF local vector
pub const BENDING_DOFS: [usize; 12] = [2, 3, 4, 8, 9, 10, 14, 15, 16, 20, 21, 22];
/// Drilling DOFs (rz per node)
const DRILLING_DOFS: [usize; 4] = [5, 11, 17, 23];

/// Fraction of the drilling spring placed directly on each RZ diagonal
const DRILLING_GROUND: f64 = 1e-3;

const CORNER_XI: [f64; 4] = [-1.0, 1.0, 1.0, -1.0];
const CORNER_ETA: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];

/// Edges i-j, j-m, m-n, n-i
const EDGES: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];

/// Shear correction factor for a homogeneous section
const SHEAR_CORRECTION: f64 = 5.0 / 6.0;

/// Relative size below which an edge or corner is treated as degenerate
const DEGENERACY_TOL: f64 = 1e-9;

/// 2x2 Gauss points (weights are all 1.0)
fn gauss_points() -> [(f64, f64); 4] {
    let gp = 1.0 / 3.0_f64.sqrt();
    [(-gp, -gp), (gp, -gp), (gp, gp), (-gp, gp)]
}

/// Section and material data the element formulation needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShellProperties {
    pub e: f64,
    pub g: f64,
    pub nu: f64,
    pub thickness: f64,
    pub kx_mod: f64,
    pub ky_mod: f64,
}

impl ShellProperties {
    /// Plane stress constitutive matrix per unit thickness (orthotropic modifiers)
    ///
    /// The coupling term uses the geometric mean of the modified moduli so the
    /// matrix stays symmetric when kx_mod != ky_mod.
    pub fn membrane_matrix(&self) -> Mat3 {
        let ex = self.e * self.kx_mod;
        let ey = self.e * self.ky_mod;
        let g = self.e / (2.0 * (1.0 + self.nu));
        let denom = 1.0 - self.nu * self.nu;
        let exy = self.nu * (ex * ey).sqrt() / denom;

        Mat3::new(
            ex / denom, exy, 0.0,
            exy, ey / denom, 0.0,
            0.0, 0.0, g,
        )
    }

    /// Plate bending constitutive matrix [Db] = t^3/12 [Dm]
    pub fn bending_matrix(&self) -> Mat3 {
        self.membrane_matrix() * (self.thickness.powi(3) / 12.0)
    }

    /// Isotropic flexural rigidity D = E t^3 / (12 (1 - nu^2))
    pub fn flexural_rigidity(&self) -> f64 {
        self.e * self.thickness.powi(3) / (12.0 * (1.0 - self.nu * self.nu))
    }

    /// Transverse shear rigidity k G t
    pub fn shear_rigidity(&self) -> f64 {
        SHEAR_CORRECTION * self.g * self.thickness
    }
}

/// Local frame and projected corner coordinates of a flat shell element
#[derive(Debug, Clone)]
pub struct ShellGeometry {
    /// Direction cosines, rows are local x, y, z in global components
    pub axes: Mat3,
    /// Corner coordinates in the local x-y plane, relative to the centroid
    pub local: [[f64; 2]; 4],
    /// Centroid of the four corners
    pub centroid: [f64; 3],
    /// Longest edge over shortest edge
    pub aspect_ratio: f64,
    /// Mean out-of-plane corner offset over the shortest diagonal
    pub warp: f64,
}

fn degenerate(element: &str, reason: String) -> FEAError {
    FEAError::DegenerateElement {
        element: element.to_string(),
        reason,
    }
}

impl ShellGeometry {
    /// Build the best-fit local frame for four corners ordered i, j, m, n
    ///
    /// Fails fast for zero-length edges, zero area and collinear or reflex corners.
    pub fn new(element: &str, corners: &[[f64; 3]; 4]) -> FEAResult<Self> {
        let p: [Vec3; 4] = corners.map(|c| Vec3::new(c[0], c[1], c[2]));
        if p.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(degenerate(element, "non-finite corner coordinate".to_string()));
        }

        let edge_lengths: [f64; 4] = EDGES.map(|(a, b)| (p[b] - p[a]).norm());
        let max_edge = edge_lengths.iter().cloned().fold(0.0, f64::max);
        let min_edge = edge_lengths.iter().cloned().fold(f64::MAX, f64::min);
        for (k, &(a, b)) in EDGES.iter().enumerate() {
            if !(edge_lengths[k] > DEGENERACY_TOL * max_edge) {
                return Err(degenerate(
                    element,
                    format!("zero-length edge between corners {} and {}", a, b),
                ));
            }
        }

        // Normal from the diagonals gives the best-fit plane of a warped quad
        let d1 = p[2] - p[0];
        let d2 = p[3] - p[1];
        let normal = d1.cross(&d2);
        if !(normal.norm() > DEGENERACY_TOL * max_edge * max_edge) {
            return Err(degenerate(element, "corners enclose zero area".to_string()));
        }
        let z = normal.normalize();

        let x_dir = (p[1] - p[0]) + (p[2] - p[3]);
        let x_dir = x_dir - z * x_dir.dot(&z);
        if !(x_dir.norm() > DEGENERACY_TOL * max_edge) {
            return Err(degenerate(element, "cannot orient local x axis".to_string()));
        }
        let x = x_dir.normalize();
        let y = z.cross(&x);

        let c = (p[0] + p[1] + p[2] + p[3]) / 4.0;
        let local = p.map(|v| [(v - c).dot(&x), (v - c).dot(&y)]);

        // Every projected corner must turn counterclockwise about +z
        for a in 0..4 {
            let next = local[(a + 1) % 4];
            let prev = local[(a + 3) % 4];
            let cross = (next[0] - local[a][0]) * (prev[1] - local[a][1])
                - (next[1] - local[a][1]) * (prev[0] - local[a][0]);
            if !(cross > DEGENERACY_TOL * max_edge * max_edge) {
                return Err(degenerate(
                    element,
                    format!("collinear or reflex corner at node {}", a),
                ));
            }
        }

        let offset = p.iter().map(|v| (v - c).dot(&z).abs()).sum::<f64>() / 4.0;
        let warp = offset / d1.norm().min(d2.norm());

        Ok(Self {
            axes: Mat3::new(
                x[0], x[1], x[2],
                y[0], y[1], y[2],
                z[0], z[1], z[2],
            ),
            local,
            centroid: [c[0], c[1], c[2]],
            aspect_ratio: max_edge / min_edge,
            warp,
        })
    }

    /// Element area in the local plane
    pub fn area(&self) -> f64 {
        gauss_points()
            .iter()
            .map(|&(xi, eta)| self.gradients(xi, eta).det)
            .sum()
    }

    /// Local unit normal in global components
    pub fn normal(&self) -> [f64; 3] {
        [self.axes[(2, 0)], self.axes[(2, 1)], self.axes[(2, 2)]]
    }

    /// Bilinear shape function gradients at natural coordinates (xi, eta)
    fn gradients(&self, xi: f64, eta: f64) -> Gradients {
        let dn_dxi: [f64; 4] =
            std::array::from_fn(|a| 0.25 * CORNER_XI[a] * (1.0 + CORNER_ETA[a] * eta));
        let dn_deta: [f64; 4] =
            std::array::from_fn(|a| 0.25 * CORNER_ETA[a] * (1.0 + CORNER_XI[a] * xi));

        // J = [dx/dxi  dy/dxi]
        //     [dx/deta dy/deta]
        let mut j = [[0.0; 2]; 2];
        for a in 0..4 {
            j[0][0] += dn_dxi[a] * self.local[a][0];
            j[0][1] += dn_dxi[a] * self.local[a][1];
            j[1][0] += dn_deta[a] * self.local[a][0];
            j[1][1] += dn_deta[a] * self.local[a][1];
        }
        let det = j[0][0] * j[1][1] - j[0][1] * j[1][0];
        let inv = [
            [j[1][1] / det, -j[0][1] / det],
            [-j[1][0] / det, j[0][0] / det],
        ];

        let dn_dx = std::array::from_fn(|a| inv[0][0] * dn_dxi[a] + inv[0][1] * dn_deta[a]);
        let dn_dy = std::array::from_fn(|a| inv[1][0] * dn_dxi[a] + inv[1][1] * dn_deta[a]);

        Gradients { inv, det, dn_dx, dn_dy }
    }

    /// Edge directions, lengths and DKMQ bubble amplitudes
    fn edges(&self, props: &ShellProperties) -> EdgeData {
        let d = props.flexural_rigidity();
        let ds = props.shear_rigidity();

        let mut edges = EdgeData {
            cos: [0.0; 4],
            sin: [0.0; 4],
            len: [0.0; 4],
            phi: [0.0; 4],
            bubble: [[0.0; 12]; 4],
        };

        for (k, &(i, j)) in EDGES.iter().enumerate() {
            let dx = self.local[j][0] - self.local[i][0];
            let dy = self.local[j][1] - self.local[i][1];
            let len = (dx * dx + dy * dy).sqrt();
            let (c, s) = (dx / len, dy / len);
            let phi = 12.0 * d / (ds * len * len);
            let f = 1.0 / (1.0 + phi);

            // Edge constraint: bubble = f * (-3/(2L) (w_j - w_i) - 3/4 (bs_i + bs_j))
            // with the tangential rotation bs = c * RY - s * RX
            let row = &mut edges.bubble[k];
            for (node, sign) in [(i, 1.0), (j, -1.0)] {
                row[3 * node] += sign * f * 1.5 / len;
                row[3 * node + 1] += f * 0.75 * s;
                row[3 * node + 2] -= f * 0.75 * c;
            }

            edges.cos[k] = c;
            edges.sin[k] = s;
            edges.len[k] = len;
            edges.phi[k] = phi;
        }

        edges
    }

    /// Membrane strain-displacement matrix (3x8)
    fn membrane_b(&self, grad: &Gradients) -> Mat3x8 {
        let mut b = Mat3x8::zeros();
        for a in 0..4 {
            b[(0, 2 * a)] = grad.dn_dx[a];
            b[(1, 2 * a + 1)] = grad.dn_dy[a];
            b[(2, 2 * a)] = grad.dn_dy[a];
            b[(2, 2 * a + 1)] = grad.dn_dx[a];
        }
        b
    }

    /// DKMQ curvature-displacement matrix (3x12) over [w, rx, ry] per node
    fn bending_b(&self, edges: &EdgeData, grad: &Gradients, xi: f64, eta: f64) -> Mat3x12 {
        let mut b = Mat3x12::zeros();

        // Corner rotations, bilinear
        for a in 0..4 {
            let (rx, ry) = (3 * a + 1, 3 * a + 2);
            b[(0, ry)] += grad.dn_dx[a];
            b[(1, rx)] -= grad.dn_dy[a];
            b[(2, ry)] += grad.dn_dy[a];
            b[(2, rx)] -= grad.dn_dx[a];
        }

        // Edge bubbles, quadratic along their edge
        let dp_dxi = [
            -xi * (1.0 - eta),
            0.5 * (1.0 - eta * eta),
            -xi * (1.0 + eta),
            -0.5 * (1.0 - eta * eta),
        ];
        let dp_deta = [
            -0.5 * (1.0 - xi * xi),
            -eta * (1.0 + xi),
            0.5 * (1.0 - xi * xi),
            -eta * (1.0 - xi),
        ];

        for k in 0..4 {
            let dp_dx = grad.inv[0][0] * dp_dxi[k] + grad.inv[0][1] * dp_deta[k];
            let dp_dy = grad.inv[1][0] * dp_dxi[k] + grad.inv[1][1] * dp_deta[k];
            let (c, s) = (edges.cos[k], edges.sin[k]);
            for q in 0..12 {
                let amp = edges.bubble[k][q];
                if amp == 0.0 {
                    continue;
                }
                b[(0, q)] += dp_dx * c * amp;
                b[(1, q)] += dp_dy * s * amp;
                b[(2, q)] += (dp_dy * c + dp_dx * s) * amp;
            }
        }

        b
    }

    /// DKMQ transverse shear strain matrix (2x12) over [w, rx, ry] per node
    ///
    /// Tangential shear is constant along each edge; the covariant components
    /// are interpolated across the element and mapped to local x-y.
    fn shear_b(&self, edges: &EdgeData, grad: &Gradients, xi: f64, eta: f64) -> Mat2x12 {
        // gamma_k = -2/3 phi_k * bubble_k, scaled to covariant components
        let gamma = |k: usize, q: usize| -2.0 / 3.0 * edges.phi[k] * edges.bubble[k][q];

        let mut b = Mat2x12::zeros();
        for q in 0..12 {
            let g_xi = 0.5 * (1.0 - eta) * 0.5 * edges.len[0] * gamma(0, q)
                - 0.5 * (1.0 + eta) * 0.5 * edges.len[2] * gamma(2, q);
            let g_eta = 0.5 * (1.0 + xi) * 0.5 * edges.len[1] * gamma(1, q)
                - 0.5 * (1.0 - xi) * 0.5 * edges.len[3] * gamma(3, q);
            b[(0, q)] = grad.inv[0][0] * g_xi + grad.inv[0][1] * g_eta;
            b[(1, q)] = grad.inv[1][0] * g_xi + grad.inv[1][1] * g_eta;
        }
        b
    }
}

/// Shape function gradients and Jacobian data at one point
struct Gradients {
    inv: [[f64; 2]; 2],
    det: f64,
    dn_dx: [f64; 4],
    dn_dy: [f64; 4],
}

/// Per-edge data for the DKMQ formulation
struct EdgeData {
    cos: [f64; 4],
    sin: [f64; 4],
    len: [f64; 4],
    phi: [f64; 4],
    /// Edge bubble amplitude as a row over the 12 bending DOFs
    bubble: [[f64; 12]; 4],
}

/// Compute the 24x24 local stiffness matrix of a shell element
pub fn shell_local_stiffness(geom: &ShellGeometry, props: &ShellProperties) -> Mat24 {
    let dm = props.membrane_matrix();
    let db = props.bending_matrix();
    let ds = props.shear_rigidity();
    let edges = geom.edges(props);

    let mut k_m = Mat8::zeros();
    let mut k_b = Mat12::zeros();

    for (xi, eta) in gauss_points() {
        let grad = geom.gradients(xi, eta);

        let b_m = geom.membrane_b(&grad);
        k_m += b_m.transpose() * dm * b_m * (props.thickness * grad.det);

        let b_b = geom.bending_b(&edges, &grad, xi, eta);
        k_b += b_b.transpose() * db * b_b * grad.det;

        let b_s = geom.shear_b(&edges, &grad, xi, eta);
        k_b += b_s.transpose() * b_s * (ds * grad.det);
    }

    let mut k = Mat24::zeros();
    for (i, &mi) in MEMBRANE_DOFS.iter().enumerate() {
        for (j, &mj) in MEMBRANE_DOFS.iter().enumerate() {
            k[(mi, mj)] = k_m[(i, j)];
        }
    }
    for (i, &bi) in BENDING_DOFS.iter().enumerate() {
        for (j, &bj) in BENDING_DOFS.iter().enumerate() {
            k[(bi, bj)] = k_b[(i, j)];
        }
    }

    // Weak drilling spring. The self-equilibrated part leaves a common RZ
    // rotation free, so a small diagonal share grounds it for coplanar meshes.
    let min_rot = [1, 2, 4, 5, 7, 8, 10, 11]
        .iter()
        .map(|&i| k_b[(i, i)])
        .fold(f64::MAX, f64::min);
    let k_rz = min_rot / 1000.0;
    for (a, &ra) in DRILLING_DOFS.iter().enumerate() {
        for (b, &rb) in DRILLING_DOFS.iter().enumerate() {
            let delta = if a == b { 1.0 } else { 0.0 };
            k[(ra, rb)] += k_rz * (delta - 0.25);
        }
        k[(ra, ra)] += k_rz * DRILLING_GROUND;
    }

    k
}

/// Consistent nodal loads for a uniform pressure (positive pushes toward -z)
pub fn shell_pressure_load(geom: &ShellGeometry, pressure: f64) -> Vec24 {
    let mut f = Vec24::zeros();
    for (xi, eta) in gauss_points() {
        let det = geom.gradients(xi, eta).det;
        for a in 0..4 {
            let n = 0.25 * (1.0 + CORNER_XI[a] * xi) * (1.0 + CORNER_ETA[a] * eta);
            f[6 * a + 2] -= pressure * n * det;
        }
    }
    f
}

/// Compute the 24x24 transformation matrix (global to local)
///
/// Eight diagonal 3x3 blocks of the element direction cosines.
pub fn shell_transformation_matrix(geom: &ShellGeometry) -> Mat24 {
    let mut t = Mat24::zeros();
    for block in 0..8 {
        let offset = block * 3;
        for row in 0..3 {
            for col in 0..3 {
                t[(offset + row, offset + col)] = geom.axes[(row, col)];
            }
        }
    }
    t
}

/// In-plane stresses [sx, sy, txy] at natural coordinates (xi, eta)
pub fn shell_membrane_stress(
    geom: &ShellGeometry,
    props: &ShellProperties,
    d_local: &Vec24,
    xi: f64,
    eta: f64,
) -> [f64; 3] {
    let grad = geom.gradients(xi, eta);
    let b = geom.membrane_b(&grad);
    let d = SMatrix::<f64, 8, 1>::from_fn(|i, _| d_local[MEMBRANE_DOFS[i]]);
    let stress = props.membrane_matrix() * (b * d);
    [stress[0], stress[1], stress[2]]
}

/// Moment resultants [mx, my, mxy] per unit length at natural coordinates (xi, eta)
pub fn shell_moments(
    geom: &ShellGeometry,
    props: &ShellProperties,
    d_local: &Vec24,
    xi: f64,
    eta: f64,
) -> [f64; 3] {
    let edges = geom.edges(props);
    let grad = geom.gradients(xi, eta);
    let b = geom.bending_b(&edges, &grad, xi, eta);
    let d = SMatrix::<f64, 12, 1>::from_fn(|i, _| d_local[BENDING_DOFS[i]]);
    let m = props.bending_matrix() * (b * d);
    [m[0], m[1], m[2]]
}

/// Transverse shear resultants [qx, qy] per unit length at natural coordinates (xi, eta)
pub fn shell_transverse_shear(
    geom: &ShellGeometry,
    props: &ShellProperties,
    d_local: &Vec24,
    xi: f64,
    eta: f64,
) -> [f64; 2] {
    let edges = geom.edges(props);
    let grad = geom.gradients(xi, eta);
    let b = geom.shear_b(&edges, &grad, xi, eta);
    let d = SMatrix::<f64, 12, 1>::from_fn(|i, _| d_local[BENDING_DOFS[i]]);
    let gamma = b * d;
    let ds = props.shear_rigidity();
    [ds * gamma[0], ds * gamma[1]]
}
