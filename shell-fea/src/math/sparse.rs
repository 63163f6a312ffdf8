//! Sparse matrix utilities for efficient FEA solves
//!
//! Shell stiffness matrices are typically 99%+ sparse. Assembly goes through
//! COO triplets into CSR, and the free-free block is factorized with a
//! profile (skyline) Cholesky after Reverse Cuthill-McKee reordering.

use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse matrix builder using COO format
/// More efficient for incremental assembly
pub struct SparseMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    /// Create a new sparse matrix builder
    pub fn new(size: usize) -> Self {
        // Shell meshes couple each node to ~9 nodes, 6 DOFs each
        let estimated_nnz = size * 54;
        Self {
            size,
            entries: Vec::with_capacity(estimated_nnz),
        }
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter a dense element matrix through its global DOF map
    pub fn add_element_matrix<const N: usize>(
        &mut self,
        dofs: &[usize; N],
        k_elem: &nalgebra::SMatrix<f64, N, N>,
    ) {
        for (i, &di) in dofs.iter().enumerate() {
            for (j, &dj) in dofs.iter().enumerate() {
                self.add(di, dj, k_elem[(i, j)]);
            }
        }
    }

    /// Convert to CSR format for efficient solves (duplicates are summed)
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);

        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }

        CsrMatrix::from(&coo)
    }

    /// Convert to dense matrix (for comparison/debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);

        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }

        mat
    }

    /// Number of stored triplets (before duplicates are summed)
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// A non-positive or non-finite pivot found during factorization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotError {
    /// Row of the (permuted) matrix where factorization broke down
    pub index: usize,
    /// Pivot value relative to the original diagonal
    pub pivot: f64,
}

/// Profile (skyline) Cholesky factorization for symmetric positive definite matrices
///
/// Row `i` stores `L[i, first[i]..=i]` contiguously, so the inner products of
/// the factorization are dense slice dot products.
pub struct SkylineCholesky {
    first: Vec<usize>,
    rows: Vec<Vec<f64>>,
}

impl SkylineCholesky {
    /// Load the lower profile of a symmetric CSR matrix
    pub fn new(csr: &CsrMatrix<f64>) -> Self {
        let size = csr.nrows();

        let mut first: Vec<usize> = (0..size).collect();
        for (row, col, _) in csr.triplet_iter() {
            if col < first[row] {
                first[row] = col;
            }
        }

        let mut rows: Vec<Vec<f64>> = (0..size).map(|i| vec![0.0; i - first[i] + 1]).collect();
        for (row, col, &val) in csr.triplet_iter() {
            if col <= row {
                rows[row][col - first[row]] += val;
            }
        }

        Self { first, rows }
    }

    /// Number of stored entries in the lower profile
    pub fn profile_size(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// Factorize in place, K = L L^T
    ///
    /// A pivot that is not greater than `pivot_tolerance` times the original
    /// diagonal marks a singular (or indefinite) matrix.
    pub fn factorize(mut self, pivot_tolerance: f64) -> Result<Self, PivotError> {
        for i in 0..self.rows.len() {
            let fi = self.first[i];
            let (done, rest) = self.rows.split_at_mut(i);
            let row_i = &mut rest[0];
            let original = row_i[i - fi];

            for j in fi..i {
                let fj = self.first[j];
                let row_j = &done[j];
                let start = fi.max(fj);
                let sum = dot(&row_i[start - fi..j - fi], &row_j[start - fj..j - fj]);
                row_i[j - fi] = (row_i[j - fi] - sum) / row_j[j - fj];
            }

            let off = &row_i[..i - fi];
            let diag = original - dot(off, off);
            if !(diag > pivot_tolerance * original) || !diag.is_finite() {
                let pivot = if original != 0.0 { diag / original } else { diag };
                return Err(PivotError { index: i, pivot });
            }
            row_i[i - fi] = diag.sqrt();
        }

        Ok(self)
    }

    /// Solve L * L^T * x = b with a factorized matrix
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();

        // Forward substitution: L * y = b
        for i in 0..self.rows.len() {
            let fi = self.first[i];
            let row = &self.rows[i];
            let sum = dot(&row[..i - fi], &x.as_slice()[fi..i]);
            x[i] = (x[i] - sum) / row[i - fi];
        }

        // Backward substitution: L^T * x = y
        for i in (0..self.rows.len()).rev() {
            let fi = self.first[i];
            let row = &self.rows[i];
            x[i] /= row[i - fi];
            let xi = x[i];
            for (k, &l) in row[..i - fi].iter().enumerate() {
                x[fi + k] -= l * xi;
            }
        }

        x
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Bandwidth reduction using Reverse Cuthill-McKee algorithm
///
/// Returns a permutation vector (`perm[new] = old`) that reorders rows to
/// shrink the profile. Each connected component starts from a
/// pseudo-peripheral vertex found by repeated breadth-first sweeps.
pub fn reverse_cuthill_mckee(csr: &CsrMatrix<f64>) -> Vec<usize> {
    let n = csr.nrows();
    if n == 0 {
        return vec![];
    }

    // Build adjacency list
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (row, col, &val) in csr.triplet_iter() {
        if val != 0.0 && row != col {
            adj[row].push(col);
        }
    }

    // Get degrees for sorting
    let degrees: Vec<usize> = adj.iter().map(|v| v.len()).collect();

    // Sort adjacencies by degree (for tie-breaking)
    for neighbors in &mut adj {
        neighbors.sort_by_key(|&i| (degrees[i], i));
        neighbors.dedup();
    }

    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by_key(|&i| (degrees[i], i));

    let mut visited = vec![false; n];
    let mut result = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    let mut scratch = vec![false; n];

    for &seed in &by_degree {
        if visited[seed] {
            continue;
        }
        let start = pseudo_peripheral(&adj, &degrees, seed, &mut scratch);

        queue.push_back(start);
        visited[start] = true;
        while let Some(node) = queue.pop_front() {
            result.push(node);
            for &neighbor in &adj[node] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    // Reverse the ordering (Cuthill-McKee -> Reverse Cuthill-McKee)
    result.reverse();
    result
}

/// Breadth-first level structure rooted at `root`
fn level_structure(adj: &[Vec<usize>], root: usize, seen: &mut [bool]) -> Vec<Vec<usize>> {
    let mut levels = vec![vec![root]];
    seen[root] = true;
    loop {
        let mut next = Vec::new();
        for &node in levels.last().map(|l| l.as_slice()).unwrap_or(&[]) {
            for &neighbor in &adj[node] {
                if !seen[neighbor] {
                    seen[neighbor] = true;
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        levels.push(next);
    }
    for &node in levels.iter().flatten() {
        seen[node] = false;
    }
    levels
}

/// George-Liu search for a vertex of (nearly) maximal eccentricity
fn pseudo_peripheral(adj: &[Vec<usize>], degrees: &[usize], seed: usize, seen: &mut [bool]) -> usize {
    let mut root = seed;
    let mut depth = level_structure(adj, root, seen).len();
    loop {
        let levels = level_structure(adj, root, seen);
        let candidate = levels
            .last()
            .and_then(|last| last.iter().copied().min_by_key(|&i| (degrees[i], i)))
            .unwrap_or(root);
        let candidate_depth = level_structure(adj, candidate, seen).len();
        if candidate_depth > depth {
            root = candidate;
            depth = candidate_depth;
        } else {
            return root;
        }
    }
}

/// Renumber a square matrix symmetrically: `out[new_i, new_j] = csr[perm[new_i], perm[new_j]]`
pub fn permute_symmetric(csr: &CsrMatrix<f64>, perm: &[usize]) -> CsrMatrix<f64> {
    let inv = inverse_permutation(perm);
    let mut coo = CooMatrix::new(csr.nrows(), csr.ncols());
    for (row, col, &val) in csr.triplet_iter() {
        coo.push(inv[row], inv[col], val);
    }
    CsrMatrix::from(&coo)
}

/// Apply permutation to reorder values (`out[new] = vec[perm[new]]`)
pub fn apply_permutation<T: Clone>(vec: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&i| vec[i].clone()).collect()
}

/// Create inverse permutation
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new_idx, &old_idx) in perm.iter().enumerate() {
        inv[old_idx] = new_idx;
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tridiagonal(n: usize) -> SparseMatrixBuilder {
        let mut builder = SparseMatrixBuilder::new(n);
        for i in 0..n {
            builder.add(i, i, 4.0);
            if i + 1 < n {
                builder.add(i, i + 1, -1.0);
                builder.add(i + 1, i, -1.0);
            }
        }
        builder
    }

    #[test]
    fn test_sparse_builder_sums_duplicates() {
        let mut builder = SparseMatrixBuilder::new(3);
        builder.add(0, 0, 4.0);
        builder.add(0, 0, 1.5);
        builder.add(1, 2, 1.0);
        builder.add(2, 2, 0.0);

        assert_eq!(builder.nnz(), 3);
        let csr = builder.to_csr();
        let dense = builder.to_dense();
        assert_relative_eq!(dense[(0, 0)], 5.5, epsilon = 1e-12);
        let stored: f64 = csr
            .triplet_iter()
            .filter(|&(r, c, _)| r == 0 && c == 0)
            .map(|(_, _, &v)| v)
            .sum();
        assert_relative_eq!(stored, 5.5, epsilon = 1e-12);
    }

    #[test]
    fn test_skyline_solve_matches_dense() {
        let mut builder = tridiagonal(6);
        builder.add(0, 5, -0.5);
        builder.add(5, 0, -0.5);
        let csr = builder.to_csr();
        let dense = builder.to_dense();

        let b = DVector::from_vec(vec![1.0, 2.0, 3.0, -1.0, 0.5, 2.5]);
        let chol = SkylineCholesky::new(&csr).factorize(1e-12).unwrap();
        let x = chol.solve(&b);

        let residual = &dense * &x - &b;
        assert!(residual.norm() < 1e-12, "residual {}", residual.norm());
        assert_eq!(chol.profile_size(), 6 + 5 + 4);
    }

    #[test]
    fn test_singular_pivot_detected() {
        // Two springs in series with nothing holding the chain down
        let mut builder = SparseMatrixBuilder::new(3);
        for (a, b) in [(0, 1), (1, 2)] {
            builder.add(a, a, 1.0);
            builder.add(b, b, 1.0);
            builder.add(a, b, -1.0);
            builder.add(b, a, -1.0);
        }
        let err = SkylineCholesky::new(&builder.to_csr())
            .factorize(1e-9)
            .err()
            .unwrap();
        assert_eq!(err.index, 2);
        assert!(err.pivot.abs() < 1e-9);
    }

    #[test]
    fn test_zero_diagonal_is_singular() {
        let mut builder = SparseMatrixBuilder::new(2);
        builder.add(0, 0, 3.0);
        let err = SkylineCholesky::new(&builder.to_csr()).factorize(1e-9).err().unwrap();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_rcm_recovers_narrow_band() {
        // A path graph with scrambled numbering has a wide profile
        let order = [0, 7, 3, 9, 1, 5, 8, 2, 6, 4];
        let mut builder = SparseMatrixBuilder::new(10);
        for i in 0..10 {
            builder.add(order[i], order[i], 4.0);
            if i + 1 < 10 {
                builder.add(order[i], order[i + 1], -1.0);
                builder.add(order[i + 1], order[i], -1.0);
            }
        }
        let csr = builder.to_csr();
        let perm = reverse_cuthill_mckee(&csr);
        let inv = inverse_permutation(&perm);

        let mut sorted = perm.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());

        for i in 0..9 {
            let (a, b) = (inv[order[i]], inv[order[i + 1]]);
            assert_eq!(a.abs_diff(b), 1);
        }
    }

    #[test]
    fn test_permuted_solve_matches() {
        let builder = tridiagonal(5);
        let csr = builder.to_csr();
        let perm = vec![3, 0, 4, 1, 2];
        let permuted = permute_symmetric(&csr, &perm);

        let b = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0, 1.5]);
        let direct = SkylineCholesky::new(&csr).factorize(1e-12).unwrap().solve(&b);

        let b_perm = DVector::from_vec(apply_permutation(b.as_slice(), &perm));
        let x_perm = SkylineCholesky::new(&permuted)
            .factorize(1e-12)
            .unwrap()
            .solve(&b_perm);
        for (new, &old) in perm.iter().enumerate() {
            assert_relative_eq!(x_perm[new], direct[old], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_permutation_helpers() {
        let perm = vec![2, 0, 1];
        assert_eq!(apply_permutation(&['a', 'b', 'c'], &perm), vec!['c', 'a', 'b']);
        assert_eq!(inverse_permutation(&perm), vec![1, 2, 0]);
    }
}
