//! Sparse matrix engine for the hydraulic solver.
//!
//! Solves `A * h = F` where `A` is symmetric positive definite of order
//! `njuncs` with the sparsity of the junction subgraph plus fill-in. The
//! symbolic phase (parallel-link merging, minimum-degree reordering and the
//! column-compressed factor structure) runs once per topology change; the
//! numeric factorization and solve run every Newton iteration.

use crate::network::adjacency::AdjEntry;
use crate::network::Network;

#[derive(Debug, Default)]
pub(crate) struct Smatrix {
    /// Matrix order (number of junctions).
    n: usize,
    /// Number of off-diagonal coefficient slots (links + fill-in).
    pub ncoeffs: usize,
    /// order[row] = original node index occupying that row.
    pub order: Vec<usize>,
    /// row[node] = row of the node in the reordered system.
    pub row: Vec<usize>,
    /// ndx[link] = off-diagonal slot the link contributes to. Parallel
    /// links between the same node pair share one slot.
    pub ndx: Vec<usize>,
    /// Column start positions into `nzsub`/`lnz` for the factor L.
    xlnz: Vec<usize>,
    /// Row index of each nonzero of L, sorted within each column.
    nzsub: Vec<usize>,
    /// Coefficient slot of each nonzero of L.
    lnz: Vec<usize>,
    /// Diagonal coefficients, indexed by row.
    pub aii: Vec<f64>,
    /// Off-diagonal coefficients, indexed by slot.
    pub aij: Vec<f64>,
    /// Right-hand side on entry to `solve`, solution on exit; indexed by row.
    pub f: Vec<f64>,
    // factorization workspace
    temp: Vec<f64>,
    link: Vec<usize>,
    first: Vec<usize>,
}

impl Smatrix {
    /// Runs the symbolic phase against the current network topology.
    pub fn create(net: &Network) -> Self {
        let nnodes = net.nnodes();
        let njuncs = net.njuncs;
        let nlinks = net.nlinks();

        let mut sm = Smatrix {
            n: njuncs,
            ..Smatrix::default()
        };

        // Local adjacency lists with parallel links merged onto one slot.
        let mut adj: Vec<Vec<AdjEntry>> = vec![Vec::new(); nnodes + 1];
        sm.ndx = vec![0; nlinks + 1];
        for k in 1..=nlinks {
            let (i, j) = (net.links[k].n1, net.links[k].n2);
            if let Some(e) = adj[i].iter().find(|e| e.node == j) {
                sm.ndx[k] = e.link;
            } else {
                sm.ndx[k] = k;
                adj[i].push(AdjEntry { node: j, link: k });
                adj[j].push(AdjEntry { node: i, link: k });
            }
        }

        // Degree of each junction; tanks stay at zero so they are never
        // eliminated and contribute no fill.
        let mut degree = vec![0usize; nnodes + 1];
        for (i, list) in adj.iter().enumerate().take(njuncs + 1).skip(1) {
            degree[i] = list.len();
        }

        // Minimum-degree elimination. Ties break toward the earliest node in
        // the current ordering, which makes the permutation deterministic.
        sm.order = (0..=nnodes).collect();
        sm.row = (0..=nnodes).collect();
        sm.ncoeffs = nlinks;
        for k in 1..=njuncs {
            let m = (k..=njuncs)
                .min_by_key(|&i| degree[sm.order[i]])
                .expect("at least one active junction");
            let knode = sm.order[m];
            sm.eliminate(knode, &mut adj, &mut degree);
            sm.order[m] = sm.order[k];
            sm.order[k] = knode;
            degree[knode] = 0;
            sm.row[knode] = k;
        }

        sm.store_sparse(njuncs, &adj);
        sm.order_sparse(njuncs);

        sm.aii = vec![0.0; nnodes + 1];
        sm.aij = vec![0.0; sm.ncoeffs + 1];
        sm.f = vec![0.0; nnodes + 1];
        sm.temp = vec![0.0; nnodes + 1];
        sm.link = vec![0; nnodes + 1];
        sm.first = vec![0; nnodes + 1];
        sm
    }

    /// Eliminates `knode`: its still-active neighbors become pairwise
    /// connected, each new connection taking a fresh coefficient slot.
    fn eliminate(
        &mut self,
        knode: usize,
        adj: &mut Vec<Vec<AdjEntry>>,
        degree: &mut [usize],
    ) {
        for idx in 0..adj[knode].len() {
            let inode = adj[knode][idx].node;
            if degree[inode] == 0 {
                continue;
            }
            degree[inode] -= 1;
            for jdx in idx + 1..adj[knode].len() {
                let jnode = adj[knode][jdx].node;
                if degree[jnode] == 0 || jnode == inode {
                    continue;
                }
                if adj[inode].iter().any(|e| e.node == jnode) {
                    continue;
                }
                self.ncoeffs += 1;
                adj[inode].push(AdjEntry { node: jnode, link: self.ncoeffs });
                adj[jnode].push(AdjEntry { node: inode, link: self.ncoeffs });
                degree[inode] += 1;
                degree[jnode] += 1;
            }
        }
    }

    /// Records the nonzero pattern of L column by column in elimination
    /// order. Only junction-to-junction connections enter the factor.
    fn store_sparse(&mut self, n: usize, adj: &[Vec<AdjEntry>]) {
        self.xlnz = vec![0; n + 2];
        self.nzsub = vec![0; self.ncoeffs + 2];
        self.lnz = vec![0; self.ncoeffs + 2];
        let mut k = 0;
        self.xlnz[1] = 1;
        for i in 1..=n {
            let ii = self.order[i];
            let mut m = 0;
            for e in &adj[ii] {
                let j = self.row[e.node];
                if j > i && j <= n {
                    m += 1;
                    k += 1;
                    self.nzsub[k] = j;
                    self.lnz[k] = e.link;
                }
            }
            self.xlnz[i + 1] = self.xlnz[i] + m;
        }
    }

    /// Sorts the row indices within each column of L (two transpositions),
    /// carrying the coefficient slots along.
    fn order_sparse(&mut self, n: usize) {
        let nz = self.ncoeffs;
        let mut xlnzt = vec![0usize; n + 2];
        let mut nzsubt = vec![0usize; nz + 2];
        let mut lnzt = vec![0usize; nz + 2];
        let mut nzt = vec![0usize; n + 2];
        transpose(
            n, &self.xlnz, &self.nzsub, &self.lnz,
            &mut xlnzt, &mut nzsubt, &mut lnzt, &mut nzt,
        );
        let (xl, nzs, lz) = (xlnzt.clone(), nzsubt.clone(), lnzt.clone());
        transpose(
            n, &xl, &nzs, &lz,
            &mut self.xlnz, &mut self.nzsub, &mut self.lnz, &mut nzt,
        );
    }

    /// Zeroes the coefficient arrays ahead of an assembly pass.
    pub fn reset(&mut self) {
        self.aii.iter_mut().for_each(|v| *v = 0.0);
        self.aij.iter_mut().for_each(|v| *v = 0.0);
        self.f.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Cholesky-factorizes the assembled system in place and solves for the
    /// junction heads, leaving them in `f`. On a non-positive pivot the
    /// offending row is returned; `order[row]` names the node responsible.
    pub fn solve(&mut self) -> std::result::Result<(), usize> {
        let n = self.n;
        self.temp.iter_mut().for_each(|v| *v = 0.0);
        self.link.iter_mut().for_each(|v| *v = 0);
        self.first.iter_mut().for_each(|v| *v = 0);

        // Numeric factorization, column by column.
        for j in 1..=n {
            let mut diagj = 0.0;
            let mut k = self.link[j];
            while k != 0 {
                let newk = self.link[k];
                let kfirst = self.first[k];
                let ljk = self.aij[self.lnz[kfirst]];
                diagj += ljk * ljk;
                let istrt = kfirst + 1;
                let istop = self.xlnz[k + 1] - 1;
                if istop >= istrt {
                    self.first[k] = istrt;
                    let isub = self.nzsub[istrt];
                    self.link[k] = self.link[isub];
                    self.link[isub] = k;
                    for i in istrt..=istop {
                        let isub = self.nzsub[i];
                        self.temp[isub] += self.aij[self.lnz[i]] * ljk;
                    }
                }
                k = newk;
            }
            let diagj = self.aii[j] - diagj;
            if diagj <= 0.0 {
                return Err(j);
            }
            let diagj = diagj.sqrt();
            self.aii[j] = diagj;
            let istrt = self.xlnz[j];
            let istop = self.xlnz[j + 1] - 1;
            if istop >= istrt {
                self.first[j] = istrt;
                let isub = self.nzsub[istrt];
                self.link[j] = self.link[isub];
                self.link[isub] = j;
                for i in istrt..=istop {
                    let isub = self.nzsub[i];
                    let bj = (self.aij[self.lnz[i]] - self.temp[isub]) / diagj;
                    self.aij[self.lnz[i]] = bj;
                    self.temp[isub] = 0.0;
                }
            }
        }

        // Forward substitution.
        for j in 1..=n {
            let bj = self.f[j] / self.aii[j];
            self.f[j] = bj;
            for i in self.xlnz[j]..self.xlnz[j + 1] {
                let isub = self.nzsub[i];
                self.f[isub] -= self.aij[self.lnz[i]] * bj;
            }
        }

        // Backward substitution.
        for j in (1..=n).rev() {
            let mut bj = self.f[j];
            for i in self.xlnz[j]..self.xlnz[j + 1] {
                let isub = self.nzsub[i];
                bj -= self.aij[self.lnz[i]] * self.f[isub];
            }
            self.f[j] = bj / self.aii[j];
        }
        Ok(())
    }
}

/// Transposes a column-compressed structure, permuting the payload (`xl`)
/// alongside the row indices.
#[allow(clippy::too_many_arguments)]
fn transpose(
    n: usize,
    il: &[usize],
    jl: &[usize],
    xl: &[usize],
    ilt: &mut [usize],
    jlt: &mut [usize],
    xlt: &mut [usize],
    nzt: &mut [usize],
) {
    nzt[..=n + 1].iter_mut().for_each(|v| *v = 0);
    for i in 1..=n {
        for k in il[i]..il[i + 1] {
            nzt[jl[k]] += 1;
        }
    }
    ilt[1] = 1;
    for i in 1..=n {
        ilt[i + 1] = ilt[i] + nzt[i];
    }
    nzt[1..=n].copy_from_slice(&ilt[1..=n]);
    for i in 1..=n {
        for k in il[i]..il[i + 1] {
            let j = jl[k];
            let kk = nzt[j];
            jlt[kk] = i;
            xlt[kk] = xl[k];
            nzt[j] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::types::link::LinkType;
    use crate::types::node::NodeType;

    /// Four junctions in a ring plus a reservoir feeding one corner.
    fn ring_network() -> Network {
        let mut net = Network::new();
        for id in ["J1", "J2", "J3", "J4"] {
            net.add_node(id, NodeType::Junction).unwrap();
        }
        net.add_node("R1", NodeType::Reservoir).unwrap();
        net.add_link("P1", LinkType::Pipe, 1, 2).unwrap();
        net.add_link("P2", LinkType::Pipe, 2, 3).unwrap();
        net.add_link("P3", LinkType::Pipe, 3, 4).unwrap();
        net.add_link("P4", LinkType::Pipe, 4, 1).unwrap();
        net.add_link("P5", LinkType::Pipe, 5, 1).unwrap();
        net
    }

    #[test]
    fn ordering_is_a_permutation_of_the_junctions() {
        let net = ring_network();
        let sm = Smatrix::create(&net);
        let mut seen = vec![false; 5];
        for i in 1..=4 {
            let node = sm.order[i];
            assert!(node >= 1 && node <= 4);
            assert!(!seen[node]);
            seen[node] = true;
            assert_eq!(sm.row[node], i);
        }
    }

    #[test]
    fn parallel_links_share_a_coefficient_slot() {
        let mut net = ring_network();
        net.add_link("P6", LinkType::Pipe, 1, 2).unwrap();
        let sm = Smatrix::create(&net);
        assert_eq!(sm.ndx[6], sm.ndx[1]);
    }

    #[test]
    fn solves_a_known_spd_system() {
        let net = ring_network();
        let mut sm = Smatrix::create(&net);
        sm.reset();
        // A = 2I + ring off-diagonals of -0.5; RHS chosen so the exact
        // solution is all ones: F_i = 2 - 0.5 * (#ring neighbors of i).
        for k in 1..=4 {
            let link = &net.links[k];
            let (r1, r2) = (sm.row[link.n1], sm.row[link.n2]);
            sm.aij[sm.ndx[k]] -= 0.5;
            sm.aii[r1] += 0.5;
            sm.aii[r2] += 0.5;
        }
        // Each junction has two ring neighbors: diagonal 2.0, row sum 1.0.
        for i in 1..=4 {
            sm.aii[i] += 1.0;
            sm.f[i] = 1.0;
        }
        sm.solve().unwrap();
        for i in 1..=4 {
            assert!((sm.f[i] - 1.0).abs() < 1e-12, "row {} = {}", i, sm.f[i]);
        }
    }

    #[test]
    fn nonpositive_pivot_names_a_row() {
        let net = ring_network();
        let mut sm = Smatrix::create(&net);
        sm.reset();
        // All-zero matrix is singular; the first pivot fails.
        let err = sm.solve().unwrap_err();
        assert_eq!(err, 1);
        assert!(sm.order[err] >= 1 && sm.order[err] <= 4);
    }
}
