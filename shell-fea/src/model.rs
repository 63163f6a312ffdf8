//! FE Model - Main structural model container

use std::collections::HashMap;

use log::{debug, info, warn};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisOptions, AnalysisReport};
use crate::assembly::{self, DofPartition, ElementContribution};
use crate::elements::{Dof, Material, Node, NodeId, Shell, ShellId, Support};
use crate::error::{FEAError, FEAResult, NumericalWarning};
use crate::loads::{LoadCombination, SurfacePressure};
use crate::math::{
    self, apply_permutation, permute_symmetric, reverse_cuthill_mckee, SkylineCholesky, Vec24,
    Vec3,
};
use crate::mesh::CylinderMesh;
use crate::results::{MeshResults, NodeDisplacement, Reactions, ShellResults};

/// The main 3D finite element model
///
/// Nodes and shells live in arenas indexed by [`NodeId`] and [`ShellId`];
/// everything else is keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FEModel {
    /// Nodes in insertion order
    nodes: Vec<Node>,
    /// Shell elements in insertion order
    shells: Vec<Shell>,
    /// Materials in the model
    pub materials: HashMap<String, Material>,
    /// Cylinder meshes in the model
    pub meshes: HashMap<String, CylinderMesh>,
    /// Support conditions at nodes
    pub supports: HashMap<String, Support>,
    /// Load combinations
    pub load_combos: HashMap<String, LoadCombination>,

    #[serde(skip)]
    node_index: HashMap<String, NodeId>,
    #[serde(skip)]
    shell_index: HashMap<String, ShellId>,
}

/// Assembled and factorized system shared by the combinations of one analysis
struct System {
    contributions: Vec<ElementContribution>,
    stiffness: CsrMatrix<f64>,
    partition: DofPartition,
    /// RCM order of the free DOFs (`perm[new] = free index`)
    perm: Vec<usize>,
    factor: SkylineCholesky,
    warnings: Vec<NumericalWarning>,
}

impl FEModel {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Model Building Methods
    // ========================

    /// Add a node to the model
    pub fn add_node(&mut self, name: &str, node: Node) -> FEAResult<NodeId> {
        if self.node_index.contains_key(name) {
            return Err(FEAError::DuplicateName(name.to_string()));
        }
        if !node.coords().iter().all(|c| c.is_finite()) {
            return Err(FEAError::InvalidGeometry(format!(
                "node '{}' has non-finite coordinates",
                name
            )));
        }
        Ok(self.insert_node(name, node))
    }

    fn insert_node(&mut self, name: &str, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.name = name.to_string();
        self.nodes.push(node);
        self.node_index.insert(name.to_string(), id);
        id
    }

    /// Add a material to the model
    pub fn add_material(&mut self, name: &str, material: Material) -> FEAResult<()> {
        if self.materials.contains_key(name) {
            return Err(FEAError::DuplicateName(name.to_string()));
        }
        material.validate(name)?;
        self.materials.insert(name.to_string(), material);
        Ok(())
    }

    /// Add a shell element to the model
    ///
    /// Corner nodes and the material must already exist. The corner geometry
    /// is checked here so degenerate elements never reach assembly.
    pub fn add_shell(&mut self, name: &str, shell: Shell) -> FEAResult<ShellId> {
        if self.shell_index.contains_key(name) {
            return Err(FEAError::DuplicateName(name.to_string()));
        }
        let mut shell = shell;
        shell.name = name.to_string();
        self.resolve_shell(&mut shell)?;
        self.check_shell(&shell)?;
        shell.geometry(&self.nodes)?;
        Ok(self.insert_shell(shell))
    }

    fn resolve_shell(&self, shell: &mut Shell) -> FEAResult<()> {
        let mut ids = [NodeId::default(); 4];
        for (slot, node_name) in ids.iter_mut().zip(shell.node_names()) {
            *slot = self
                .node_index
                .get(node_name)
                .copied()
                .ok_or_else(|| FEAError::NodeNotFound(node_name.to_string()))?;
        }
        shell.nodes = ids;
        Ok(())
    }

    fn check_shell(&self, shell: &Shell) -> FEAResult<()> {
        if !self.materials.contains_key(&shell.material) {
            return Err(FEAError::MaterialNotFound(shell.material.clone()));
        }
        if !shell.thickness.is_finite() || shell.thickness <= 0.0 {
            return Err(FEAError::InvalidGeometry(format!(
                "shell '{}' needs a positive thickness (got {})",
                shell.name, shell.thickness
            )));
        }
        if !(shell.kx_mod > 0.0 && shell.ky_mod > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "shell '{}' needs positive stiffness modifiers",
                shell.name
            )));
        }
        Ok(())
    }

    fn insert_shell(&mut self, shell: Shell) -> ShellId {
        let id = ShellId(self.shells.len());
        self.shell_index.insert(shell.name.clone(), id);
        self.shells.push(shell);
        id
    }

    /// Register a cylinder mesh; nodes and elements are created by [`FEModel::generate_mesh`]
    /// or at the start of the next analysis
    pub fn add_cylinder_mesh(&mut self, name: &str, mesh: CylinderMesh) -> FEAResult<()> {
        if self.meshes.contains_key(name) {
            return Err(FEAError::DuplicateName(name.to_string()));
        }
        let mut mesh = mesh;
        mesh.name = name.to_string();
        mesh.generated = false;
        mesh.node_ids.clear();
        mesh.element_ids.clear();
        mesh.validate()?;
        if !self.materials.contains_key(&mesh.material) {
            return Err(FEAError::MaterialNotFound(mesh.material.clone()));
        }
        self.meshes.insert(name.to_string(), mesh);
        Ok(())
    }

    /// Create the nodes and elements of a registered mesh
    ///
    /// Everything is validated before the first insert, so a failure leaves
    /// the model untouched. Generating twice is a no-op.
    pub fn generate_mesh(&mut self, name: &str) -> FEAResult<&CylinderMesh> {
        let mesh = self
            .meshes
            .get(name)
            .ok_or_else(|| FEAError::MeshNotFound(name.to_string()))?;

        if !mesh.generated {
            let layout = mesh.layout()?;

            for (node_name, _) in &layout.nodes {
                if self.node_index.contains_key(node_name) {
                    return Err(FEAError::DuplicateName(node_name.clone()));
                }
            }
            for (shell_name, _) in &layout.shells {
                if self.shell_index.contains_key(shell_name) {
                    return Err(FEAError::DuplicateName(shell_name.clone()));
                }
            }

            // Resolve against the ids the nodes are about to receive
            let base = self.nodes.len();
            let local: HashMap<&str, usize> = layout
                .nodes
                .iter()
                .enumerate()
                .map(|(i, (n, _))| (n.as_str(), i))
                .collect();
            let mut shells = Vec::with_capacity(layout.shells.len());
            for (shell_name, shell) in &layout.shells {
                let mut shell = shell.clone();
                shell.name = shell_name.clone();
                let corner_index = shell.node_names().map(|n| local[n]);
                shell.nodes = corner_index.map(|i| NodeId(base + i));
                let corners = corner_index.map(|i| layout.nodes[i].1.coords());
                self.check_shell(&shell)?;
                math::ShellGeometry::new(shell_name, &corners)?;
                shells.push(shell);
            }

            let node_ids: Vec<NodeId> = layout
                .nodes
                .into_iter()
                .map(|(node_name, node)| self.insert_node(&node_name, node))
                .collect();
            let element_ids: Vec<ShellId> =
                shells.into_iter().map(|shell| self.insert_shell(shell)).collect();

            info!(
                "Generated mesh '{}': {} nodes, {} elements",
                name,
                node_ids.len(),
                element_ids.len()
            );

            if let Some(mesh) = self.meshes.get_mut(name) {
                mesh.node_ids = node_ids;
                mesh.element_ids = element_ids;
                mesh.generated = true;
            }
        }

        self.meshes
            .get(name)
            .ok_or_else(|| FEAError::MeshNotFound(name.to_string()))
    }

    /// Add a surface pressure to a shell element
    pub fn add_surface_pressure(&mut self, shell_name: &str, load: SurfacePressure) -> FEAResult<()> {
        let id = self
            .shell_index
            .get(shell_name)
            .copied()
            .ok_or_else(|| FEAError::ShellNotFound(shell_name.to_string()))?;
        if !load.pressure.is_finite() {
            return Err(FEAError::InvalidInput(format!(
                "pressure on '{}' is not finite",
                shell_name
            )));
        }
        self.shells[id.0].pressures.push(load);
        Ok(())
    }

    /// Add a support condition (replaces any earlier support at the node)
    pub fn add_support(&mut self, node_name: &str, support: Support) -> FEAResult<()> {
        if !self.node_index.contains_key(node_name) {
            return Err(FEAError::NodeNotFound(node_name.to_string()));
        }
        self.supports.insert(node_name.to_string(), support);
        Ok(())
    }

    /// Add a load combination
    pub fn add_load_combo(&mut self, combo: LoadCombination) -> FEAResult<()> {
        let name = combo.name.clone();
        if self.load_combos.contains_key(&name) {
            return Err(FEAError::DuplicateName(name));
        }
        self.load_combos.insert(name, combo);
        Ok(())
    }

    // ========================
    // Lookup Methods
    // ========================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_index.get(name).copied()
    }

    pub fn shell_id(&self, name: &str) -> Option<ShellId> {
        self.shell_index.get(name).copied()
    }

    pub fn node(&self, name: &str) -> FEAResult<&Node> {
        self.node_id(name)
            .map(|id| &self.nodes[id.0])
            .ok_or_else(|| FEAError::NodeNotFound(name.to_string()))
    }

    pub fn shell(&self, name: &str) -> FEAResult<&Shell> {
        self.shell_id(name)
            .map(|id| &self.shells[id.0])
            .ok_or_else(|| FEAError::ShellNotFound(name.to_string()))
    }

    pub fn mesh(&self, name: &str) -> FEAResult<&CylinderMesh> {
        self.meshes
            .get(name)
            .ok_or_else(|| FEAError::MeshNotFound(name.to_string()))
    }

    // ========================
    // Analysis Methods
    // ========================

    /// Run linear static analysis for every load combination
    pub fn analyze_linear(&mut self) -> FEAResult<Vec<AnalysisReport>> {
        self.analyze(AnalysisOptions::linear())
    }

    /// Run analysis for every load combination, factorizing the stiffness once
    pub fn analyze(&mut self, options: AnalysisOptions) -> FEAResult<Vec<AnalysisReport>> {
        self.ensure_default_combo();
        self.prepare_model()?;

        let system = self.build_system(&options)?;

        let mut combo_names: Vec<String> = self.load_combos.keys().cloned().collect();
        combo_names.sort();

        combo_names
            .iter()
            .map(|combo_name| self.solve_combo(&system, combo_name, &options))
            .collect()
    }

    /// Run analysis for a single load combination
    pub fn analyze_combo(
        &mut self,
        combo_name: &str,
        options: &AnalysisOptions,
    ) -> FEAResult<AnalysisReport> {
        self.ensure_default_combo();
        if !self.load_combos.contains_key(combo_name) {
            return Err(FEAError::LoadCombinationNotFound(combo_name.to_string()));
        }
        self.prepare_model()?;

        let system = self.build_system(options)?;
        self.solve_combo(&system, combo_name, options)
    }

    fn ensure_default_combo(&mut self) {
        if self.load_combos.is_empty() {
            let combo = LoadCombination::default();
            self.load_combos.insert(combo.name.clone(), combo);
        }
    }

    /// Generate pending meshes
    fn prepare_model(&mut self) -> FEAResult<()> {
        let mut pending: Vec<String> = self
            .meshes
            .iter()
            .filter(|(_, mesh)| !mesh.generated)
            .map(|(name, _)| name.clone())
            .collect();
        pending.sort();

        for name in pending {
            self.generate_mesh(&name)?;
        }

        if self.shells.is_empty() {
            return Err(FEAError::InvalidInput(
                "model has no shell elements to analyze".to_string(),
            ));
        }
        Ok(())
    }

    /// Restraint flags per node, in arena order
    fn restraints(&self) -> Vec<[bool; 6]> {
        let mut flags = vec![[false; 6]; self.nodes.len()];
        for (node_name, support) in self.supports.iter().filter(|(_, s)| s.is_supported()) {
            if let Some(id) = self.node_index.get(node_name) {
                flags[id.0] = support.as_array();
            }
        }
        flags
    }

    /// Assemble, partition, reorder and factorize
    fn build_system(&self, options: &AnalysisOptions) -> FEAResult<System> {
        let n_dofs = self.nodes.len() * 6;
        if options.log {
            info!(
                "Assembling {} elements, {} nodes ({} DOFs)",
                self.shells.len(),
                self.nodes.len(),
                n_dofs
            );
        }

        let contributions =
            assembly::element_contributions(&self.shells, &self.nodes, &self.materials, options.parallel)?;
        let warnings = self.quality_warnings(&contributions, options);

        let stiffness = assembly::assemble_stiffness(n_dofs, &contributions);
        debug!("Global stiffness: {} stored entries", stiffness.nnz());

        let partition = DofPartition::new(&self.restraints());
        let k_ff = partition.free_block(&stiffness);
        let perm = reverse_cuthill_mckee(&k_ff);
        let k_perm = permute_symmetric(&k_ff, &perm);

        let skyline = SkylineCholesky::new(&k_perm);
        if options.log {
            info!(
                "Factorizing {} free DOFs ({} restrained), profile {} entries",
                partition.free().len(),
                partition.restrained().len(),
                skyline.profile_size()
            );
        }

        let factor = skyline.factorize(options.pivot_tolerance).map_err(|e| {
            let dof = partition.free()[perm[e.index]];
            let node = &self.nodes[dof / 6];
            let label = Dof::from_index(dof % 6).map(Dof::label).unwrap_or("?");
            warn!("Singular stiffness at node '{}' {}", node.name, label);
            FEAError::SingularMatrix {
                node: node.name.clone(),
                dof: label.to_string(),
                pivot: e.pivot,
            }
        })?;

        Ok(System {
            contributions,
            stiffness,
            partition,
            perm,
            factor,
            warnings,
        })
    }

    fn quality_warnings(
        &self,
        contributions: &[ElementContribution],
        options: &AnalysisOptions,
    ) -> Vec<NumericalWarning> {
        let mut warnings = Vec::new();
        for (shell, c) in self.shells.iter().zip(contributions) {
            if c.aspect_ratio > options.aspect_ratio_limit {
                warnings.push(NumericalWarning::PoorAspectRatio {
                    element: shell.name.clone(),
                    ratio: c.aspect_ratio,
                });
            }
            if c.warp > options.warp_tolerance {
                warnings.push(NumericalWarning::WarpedElement {
                    element: shell.name.clone(),
                    warp: c.warp,
                });
            }
        }
        warnings
    }

    /// Solve one combination against a factorized system and store the results
    fn solve_combo(
        &mut self,
        system: &System,
        combo_name: &str,
        options: &AnalysisOptions,
    ) -> FEAResult<AnalysisReport> {
        let combo = self
            .load_combos
            .get(combo_name)
            .ok_or_else(|| FEAError::LoadCombinationNotFound(combo_name.to_string()))?;

        let n_dofs = self.nodes.len() * 6;
        let loads = assembly::assemble_loads(
            n_dofs,
            system
                .contributions
                .iter()
                .zip(self.shells.iter().map(|s| s.combined_pressure(combo))),
        );

        let partition = &system.partition;
        let f_free = partition.gather_free(&loads);
        let f_perm = DVector::from_vec(apply_permutation(f_free.as_slice(), &system.perm));
        let x_perm = system.factor.solve(&f_perm);

        let mut u_free = DVector::zeros(f_free.len());
        for (new, &old) in system.perm.iter().enumerate() {
            u_free[old] = x_perm[new];
        }
        let u = partition.scatter_free(&u_free);
        let reactions = partition.reactions(&system.stiffness, &u, &loads);

        if options.log {
            info!("Solved load combination '{}'", combo_name);
        }

        let mut max_displacement = 0.0;
        let mut max_disp_node = String::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let disp: [f64; 6] = std::array::from_fn(|d| u[6 * i + d]);
            let rxn: [f64; 6] = std::array::from_fn(|d| reactions[6 * i + d]);
            node.displacements.insert(combo_name.to_string(), disp);
            node.reactions.insert(combo_name.to_string(), rxn);

            let mag = NodeDisplacement::from_array(disp).translation_magnitude();
            if mag > max_displacement {
                max_displacement = mag;
                max_disp_node = node.name.clone();
            }
        }

        let mut warnings = system.warnings.clone();
        let statics_residual = if options.check_statics {
            let residual = self.statics_residual(&loads, &reactions);
            if residual > options.statics_tolerance {
                warnings.push(NumericalWarning::EquilibriumImbalance {
                    combo: combo_name.to_string(),
                    residual,
                });
            }
            Some(residual)
        } else {
            None
        };

        for w in &warnings {
            warn!("{}", w);
        }

        Ok(AnalysisReport {
            combo: combo_name.to_string(),
            total_dofs: n_dofs,
            free_dofs: partition.free().len(),
            profile_size: system.factor.profile_size(),
            max_displacement,
            max_disp_node,
            statics_residual,
            warnings,
        })
    }

    /// Largest of the force and moment imbalances, relative to the applied load
    fn statics_residual(&self, loads: &DVector<f64>, reactions: &DVector<f64>) -> f64 {
        let mut force = Vec3::zeros();
        let mut moment = Vec3::zeros();
        let mut force_scale = 0.0;
        let mut moment_scale = 0.0;

        for (i, node) in self.nodes.iter().enumerate() {
            let p = Vec3::from(node.coords());
            let applied = loads.fixed_rows::<3>(6 * i).into_owned();
            let applied_moment = loads.fixed_rows::<3>(6 * i + 3).into_owned();
            let f = applied + reactions.fixed_rows::<3>(6 * i);
            let m = applied_moment + reactions.fixed_rows::<3>(6 * i + 3);

            force += f;
            moment += p.cross(&f) + m;

            force_scale += applied.norm();
            moment_scale += p.cross(&applied).norm() + applied_moment.norm();
        }

        let relative = |value: f64, scale: f64| if scale > 0.0 { value / scale } else { value };
        relative(force.norm(), force_scale).max(relative(moment.norm(), moment_scale))
    }

    // ========================
    // Result Access Methods
    // ========================

    /// Get node displacement
    pub fn node_displacement(&self, node_name: &str, combo_name: &str) -> FEAResult<NodeDisplacement> {
        let disp = self
            .node(node_name)?
            .displacement(combo_name)
            .ok_or_else(|| FEAError::NotAnalyzed(combo_name.to_string()))?;
        Ok(NodeDisplacement::from_array(disp))
    }

    /// Get node reactions (zero at unrestrained DOFs)
    pub fn node_reactions(&self, node_name: &str, combo_name: &str) -> FEAResult<Reactions> {
        let rxn = self
            .node(node_name)?
            .reaction(combo_name)
            .ok_or_else(|| FEAError::NotAnalyzed(combo_name.to_string()))?;
        Ok(Reactions::from_array(rxn))
    }

    /// Get a single reaction component
    pub fn node_reaction(&self, node_name: &str, dof: Dof, combo_name: &str) -> FEAResult<f64> {
        let rxn = self
            .node(node_name)?
            .reaction(combo_name)
            .ok_or_else(|| FEAError::NotAnalyzed(combo_name.to_string()))?;
        Ok(rxn[dof.index()])
    }

    /// Solved state of a shell element for a load combination
    pub fn shell_results(&self, shell_name: &str, combo_name: &str) -> FEAResult<ShellResults> {
        let shell = self.shell(shell_name)?;
        self.results_for(shell, combo_name)
    }

    fn results_for(&self, shell: &Shell, combo_name: &str) -> FEAResult<ShellResults> {
        let material = self
            .materials
            .get(&shell.material)
            .ok_or_else(|| FEAError::MaterialNotFound(shell.material.clone()))?;
        let geometry = shell.geometry(&self.nodes)?;

        let mut d_global = Vec24::zeros();
        for (a, id) in shell.node_ids().iter().enumerate() {
            let disp = self.nodes[id.0]
                .displacement(combo_name)
                .ok_or_else(|| FEAError::NotAnalyzed(combo_name.to_string()))?;
            for (d, value) in disp.iter().enumerate() {
                d_global[6 * a + d] = *value;
            }
        }
        let d_local = math::shell_transformation_matrix(&geometry) * d_global;

        Ok(ShellResults::new(
            &shell.name,
            geometry,
            shell.properties(material),
            d_local,
        ))
    }

    /// Solved state of every element of a mesh for a load combination
    pub fn mesh_results(&self, mesh_name: &str, combo_name: &str) -> FEAResult<MeshResults> {
        let mesh = self.mesh(mesh_name)?;
        if !mesh.is_generated() {
            return Err(FEAError::NotAnalyzed(combo_name.to_string()));
        }
        let elements = mesh
            .element_ids()
            .iter()
            .map(|id| self.results_for(&self.shells[id.0], combo_name))
            .collect::<FEAResult<Vec<_>>>()?;
        Ok(MeshResults::new(elements))
    }

    /// Check if a load combination has results
    pub fn is_analyzed(&self, combo_name: &str) -> bool {
        self.nodes
            .first()
            .is_some_and(|n| n.displacement(combo_name).is_some())
    }

    /// Get all load combination names
    pub fn combo_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.load_combos.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all load case names
    pub fn load_cases(&self) -> Vec<String> {
        let mut cases: Vec<String> = Vec::new();
        for shell in &self.shells {
            for load in &shell.pressures {
                if !cases.contains(&load.case) {
                    cases.push(load.case.clone());
                }
            }
        }
        cases.sort();
        cases
    }

    // ========================
    // Persistence
    // ========================

    /// Serialize the model definition and any stored results
    pub fn to_json(&self) -> FEAResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a model from [`FEModel::to_json`] output
    pub fn from_json(json: &str) -> FEAResult<Self> {
        let mut model: FEModel = serde_json::from_str(json)?;
        model.reindex()?;
        Ok(model)
    }

    fn reindex(&mut self) -> FEAResult<()> {
        self.node_index.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            if self.node_index.insert(node.name.clone(), NodeId(i)).is_some() {
                return Err(FEAError::DuplicateName(node.name.clone()));
            }
        }

        self.shell_index.clear();
        let mut shells = std::mem::take(&mut self.shells);
        for (i, shell) in shells.iter_mut().enumerate() {
            if self.shell_index.insert(shell.name.clone(), ShellId(i)).is_some() {
                return Err(FEAError::DuplicateName(shell.name.clone()));
            }
            self.resolve_shell(shell)?;
        }
        self.shells = shells;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ElementKind;
    use approx::assert_relative_eq;

    /// Square plate in the XY plane, `n x n` elements of size 1
    fn flat_plate(n: usize) -> FEModel {
        let mut model = FEModel::new();
        model
            .add_material("Steel", Material::isotropic(29e6, 0.3, 0.0))
            .unwrap();
        for j in 0..=n {
            for i in 0..=n {
                model
                    .add_node(&format!("N{}_{}", i, j), Node::new(i as f64, j as f64, 0.0))
                    .unwrap();
            }
        }
        for j in 0..n {
            for i in 0..n {
                let shell = Shell::new(
                    &format!("N{}_{}", i, j),
                    &format!("N{}_{}", i + 1, j),
                    &format!("N{}_{}", i + 1, j + 1),
                    &format!("N{}_{}", i, j + 1),
                    0.1,
                    "Steel",
                );
                model.add_shell(&format!("P{}_{}", i, j), shell).unwrap();
            }
        }
        model
    }

    #[test]
    fn test_add_shell_validation() {
        let mut model = flat_plate(1);
        let err = model
            .add_shell("Bad", Shell::new("N0_0", "N1_0", "Missing", "N0_1", 0.1, "Steel"))
            .unwrap_err();
        assert!(matches!(err, FEAError::NodeNotFound(n) if n == "Missing"));

        let err = model
            .add_shell("Bad", Shell::new("N0_0", "N1_0", "N1_1", "N0_1", 0.1, "Wood"))
            .unwrap_err();
        assert!(matches!(err, FEAError::MaterialNotFound(_)));

        let err = model
            .add_shell("P0_0", Shell::new("N0_0", "N1_0", "N1_1", "N0_1", 0.1, "Steel"))
            .unwrap_err();
        assert!(matches!(err, FEAError::DuplicateName(_)));

        // Repeated corner gives a zero-length edge
        let err = model
            .add_shell("Bad", Shell::new("N0_0", "N0_0", "N1_1", "N0_1", 0.1, "Steel"))
            .unwrap_err();
        assert!(matches!(err, FEAError::DegenerateElement { .. }));

        assert_eq!(model.shells().len(), 1);
    }

    #[test]
    fn test_collinear_element_rejected() {
        let mut model = FEModel::new();
        model
            .add_material("Steel", Material::isotropic(29e6, 0.3, 0.0))
            .unwrap();
        for (name, x) in [("A", 0.0), ("B", 1.0), ("C", 2.0)] {
            model.add_node(name, Node::new(x, 0.0, 0.0)).unwrap();
        }
        model.add_node("D", Node::new(0.0, 1.0, 0.0)).unwrap();
        let err = model
            .add_shell("S", Shell::new("A", "B", "C", "D", 0.1, "Steel"))
            .unwrap_err();
        assert!(matches!(err, FEAError::DegenerateElement { element, .. } if element == "S"));
    }

    #[test]
    fn test_unsupported_model_is_singular() {
        let mut model = flat_plate(2);
        model
            .add_surface_pressure("P0_0", SurfacePressure::new(1.0, "Case 1"))
            .unwrap();
        let err = model.analyze_linear().unwrap_err();
        assert!(matches!(err, FEAError::SingularMatrix { .. }), "{:?}", err);
    }

    #[test]
    fn test_free_unconnected_node_is_singular() {
        let mut model = flat_plate(1);
        model.add_node("Loose", Node::new(5.0, 5.0, 5.0)).unwrap();
        for name in ["N0_0", "N1_0", "N1_1", "N0_1"] {
            model.add_support(name, Support::fixed()).unwrap();
        }
        match model.analyze_linear().unwrap_err() {
            FEAError::SingularMatrix { node, .. } => assert_eq!(node, "Loose"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_cantilever_plate_statics() {
        // Fixed along y = 0, uniform pressure on the +z face
        let mut model = flat_plate(4);
        for i in 0..=4 {
            model.add_support(&format!("N{}_0", i), Support::fixed()).unwrap();
        }
        let names: Vec<String> = model.shells().iter().map(|s| s.name.clone()).collect();
        for name in &names {
            model
                .add_surface_pressure(name, SurfacePressure::new(2.0, "Case 1"))
                .unwrap();
        }

        let reports = model
            .analyze(AnalysisOptions::linear().with_statics_check(1e-8))
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].statics_residual.unwrap() < 1e-8);
        assert!(reports[0].is_clean());

        // Total load 2.0 * 16 toward -z is carried by +z reactions
        let total_fz: f64 = (0..=4)
            .map(|i| model.node_reaction(&format!("N{}_0", i), Dof::DZ, "Combo 1").unwrap())
            .sum();
        assert_relative_eq!(total_fz, 32.0, max_relative = 1e-9);

        // Tip deflects toward -z
        assert!(model.node_displacement("N2_4", "Combo 1").unwrap().dz < 0.0);

        // Unrestrained nodes carry no reaction
        assert_eq!(
            model.node_reactions("N2_2", "Combo 1").unwrap().force_magnitude(),
            0.0
        );
    }

    #[test]
    fn test_corner_pinned_plate_solves() {
        let mut model = flat_plate(4);
        for name in ["N0_0", "N4_0", "N4_4", "N0_4"] {
            model.add_support(name, Support::pinned()).unwrap();
        }
        let names: Vec<String> = model.shells().iter().map(|s| s.name.clone()).collect();
        for name in &names {
            model
                .add_surface_pressure(name, SurfacePressure::new(1.0, "Case 1"))
                .unwrap();
        }

        let reports = model
            .analyze(AnalysisOptions::linear().with_statics_check(1e-8))
            .unwrap();
        assert!(reports[0].statics_residual.unwrap() < 1e-8);

        let center = model.node_displacement("N2_2", "Combo 1").unwrap();
        assert!(center.dz.is_finite() && center.dz < 0.0);
        let edge = model.node_displacement("N2_0", "Combo 1").unwrap();
        assert!(center.dz < edge.dz);

        let total_fz: f64 = ["N0_0", "N4_0", "N4_4", "N0_4"]
            .iter()
            .map(|n| model.node_reaction(n, Dof::DZ, "Combo 1").unwrap())
            .sum();
        assert_relative_eq!(total_fz, 16.0, max_relative = 1e-9);
    }

    /// One shell on four named corners, fixed along its i-j edge and loaded
    fn single_shell(corners: [[f64; 3]; 4]) -> FEModel {
        let mut model = FEModel::new();
        model
            .add_material("Steel", Material::isotropic(29e6, 0.3, 0.0))
            .unwrap();
        for (name, c) in ["A", "B", "C", "D"].iter().zip(corners) {
            model.add_node(name, Node::new(c[0], c[1], c[2])).unwrap();
        }
        model
            .add_shell("S", Shell::new("A", "B", "C", "D", 0.1, "Steel"))
            .unwrap();
        model.add_support("A", Support::fixed()).unwrap();
        model.add_support("D", Support::fixed()).unwrap();
        model
            .add_surface_pressure("S", SurfacePressure::new(1.0, "Case 1"))
            .unwrap();
        model
    }

    #[test]
    fn test_slender_element_warns_and_solves() {
        let mut model = single_shell([
            [0.0, 0.0, 0.0],
            [20.0, 0.0, 0.0],
            [20.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let reports = model.analyze_linear().unwrap();
        let warnings = &reports[0].warnings;
        assert!(!reports[0].is_clean());
        assert!(warnings.iter().any(|w| matches!(
            w,
            NumericalWarning::PoorAspectRatio { element, ratio } if element == "S" && *ratio > 19.0
        )));
        assert!(!warnings
            .iter()
            .any(|w| matches!(w, NumericalWarning::WarpedElement { .. })));
        assert!(model.node_displacement("B", "Combo 1").unwrap().dz < 0.0);
    }

    #[test]
    fn test_twisted_element_warns_and_solves() {
        let mut model = single_shell([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.2],
            [0.0, 1.0, 0.0],
        ]);
        let reports = model.analyze_linear().unwrap();
        let warnings = &reports[0].warnings;
        assert!(warnings.iter().any(|w| matches!(
            w,
            NumericalWarning::WarpedElement { element, warp } if element == "S" && *warp > 0.01
        )));
        assert!(!warnings
            .iter()
            .any(|w| matches!(w, NumericalWarning::PoorAspectRatio { .. })));
        assert!(model
            .node_displacement("C", "Combo 1")
            .unwrap()
            .dz
            .is_finite());

        // Raising the limit silences it
        let reports = model
            .analyze(AnalysisOptions::linear().with_quality_limits(10.0, 0.1))
            .unwrap();
        assert!(reports[0].is_clean());
    }

    #[test]
    fn test_reapplied_support_is_idempotent() {
        let mut model = flat_plate(2);
        for i in 0..=2 {
            model.add_support(&format!("N{}_0", i), Support::fixed()).unwrap();
        }
        model
            .add_surface_pressure("P1_1", SurfacePressure::new(3.0, "Case 1"))
            .unwrap();
        let first = model.analyze_linear().unwrap().remove(0);
        let dz = model.node_displacement("N2_2", "Combo 1").unwrap().dz;

        model.add_support("N1_0", Support::fixed()).unwrap();
        let second = model.analyze_linear().unwrap().remove(0);

        assert_eq!(second.total_dofs, first.total_dofs);
        assert_eq!(second.free_dofs, first.free_dofs);
        assert_eq!(first.free_dofs, first.total_dofs - 3 * 6);
        assert_eq!(model.supports.len(), 3);
        assert_relative_eq!(
            model.node_displacement("N2_2", "Combo 1").unwrap().dz,
            dz,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_combinations_share_factorization() {
        let mut model = flat_plate(2);
        for i in 0..=2 {
            model.add_support(&format!("N{}_0", i), Support::fixed()).unwrap();
        }
        model
            .add_surface_pressure("P1_1", SurfacePressure::new(10.0, "Liquid"))
            .unwrap();
        model
            .add_load_combo(LoadCombination::single("Service", "Liquid"))
            .unwrap();
        model
            .add_load_combo(LoadCombination::new("Factored").with_case("Liquid", 1.7))
            .unwrap();

        let reports = model.analyze_linear().unwrap();
        let combos: Vec<&str> = reports.iter().map(|r| r.combo.as_str()).collect();
        assert_eq!(combos, vec!["Factored", "Service"]);

        let service = model.node_displacement("N2_2", "Service").unwrap().dz;
        let factored = model.node_displacement("N2_2", "Factored").unwrap().dz;
        assert_relative_eq!(factored, 1.7 * service, max_relative = 1e-10);

        assert!(matches!(
            model.node_displacement("N2_2", "Combo 1"),
            Err(FEAError::NotAnalyzed(_))
        ));
    }

    #[test]
    fn test_analyze_unknown_combo() {
        let mut model = flat_plate(1);
        let err = model
            .analyze_combo("Nope", &AnalysisOptions::linear())
            .unwrap_err();
        assert!(matches!(err, FEAError::LoadCombinationNotFound(_)));
    }

    #[test]
    fn test_mesh_generation_is_atomic() {
        let mut model = FEModel::new();
        model
            .add_material("Concrete", Material::concrete_us(4000.0))
            .unwrap();
        model.add_node("Tank-N5", Node::new(0.0, 0.0, 0.0)).unwrap();
        model
            .add_cylinder_mesh("Tank", CylinderMesh::new(2.0, 10.0, 4.0, 0.5, "Concrete"))
            .unwrap();

        let err = model.generate_mesh("Tank").unwrap_err();
        assert!(matches!(err, FEAError::DuplicateName(n) if n == "Tank-N5"));
        assert_eq!(model.nodes().len(), 1);
        assert!(model.shells().is_empty());
        assert!(!model.mesh("Tank").unwrap().is_generated());
    }

    #[test]
    fn test_generate_mesh_twice_is_noop() {
        let mut model = FEModel::new();
        model
            .add_material("Concrete", Material::concrete_us(4000.0))
            .unwrap();
        model
            .add_cylinder_mesh(
                "Tank",
                CylinderMesh::new(2.0, 10.0, 4.0, 0.5, "Concrete").with_kind(ElementKind::Rect),
            )
            .unwrap();
        let (nc, nv) = model.generate_mesh("Tank").unwrap().divisions();
        let count = model.nodes().len();
        assert_eq!(count, nc * (nv + 1));
        model.generate_mesh("Tank").unwrap();
        assert_eq!(model.nodes().len(), count);
        assert_eq!(model.mesh("Tank").unwrap().base_nodes().len(), nc);
        assert_eq!(model.node("Tank-N0").unwrap().name, "Tank-N0");
    }

    #[test]
    fn test_invalid_mesh_rejected_at_registration() {
        let mut model = FEModel::new();
        model
            .add_material("Concrete", Material::concrete_us(4000.0))
            .unwrap();
        let err = model
            .add_cylinder_mesh("Tank", CylinderMesh::new(1.0, 0.0, 20.0, 0.8, "Concrete"))
            .unwrap_err();
        assert!(matches!(err, FEAError::InvalidGeometry(_)));
        assert!(model.meshes.is_empty());

        let err = model
            .add_cylinder_mesh("Tank", CylinderMesh::new(1.0, 27.0, 20.0, 0.8, "Steel"))
            .unwrap_err();
        assert!(matches!(err, FEAError::MaterialNotFound(_)));
    }

    #[test]
    fn test_json_roundtrip_keeps_results() {
        let mut model = flat_plate(2);
        for i in 0..=2 {
            model.add_support(&format!("N{}_0", i), Support::fixed()).unwrap();
        }
        model
            .add_surface_pressure("P0_1", SurfacePressure::new(5.0, "Case 1"))
            .unwrap();
        model.analyze_linear().unwrap();

        let json = model.to_json().unwrap();
        let restored = FEModel::from_json(&json).unwrap();
        assert_eq!(restored.node_id("N1_1"), model.node_id("N1_1"));
        assert_relative_eq!(
            restored.node_displacement("N2_2", "Combo 1").unwrap().dz,
            model.node_displacement("N2_2", "Combo 1").unwrap().dz,
            max_relative = 1e-12
        );
        let a = restored.shell_results("P0_1", "Combo 1").unwrap().moment(0.0, 0.0);
        let b = model.shell_results("P0_1", "Combo 1").unwrap().moment(0.0, 0.0);
        assert_relative_eq!(a.my, b.my, max_relative = 1e-12);
        assert_eq!(restored.load_cases(), vec!["Case 1".to_string()]);
    }
}
