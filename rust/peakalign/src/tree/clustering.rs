//! Guide tree construction from all-vs-all pairwise alignments.
//!
//! Every pair of input alignments is merged once just to get its
//! similarity, the similarities are turned into distances and clustered
//! with average linkage (UPGMA). The merge order of the clustering is the
//! guide tree.

use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use super::{
    GuideTree,
    NodeRef,
    TreeAligner,
    TreeNode,
};
use crate::aligner::DpAligner;
use crate::dp::{
    DpSolver,
    MinCostDp,
};
use crate::errors::{
    PeakAlignError,
    Result,
};
use crate::models::Alignment;

/// All-vs-all alignment of a set of alignments.
#[derive(Debug, Clone)]
pub struct PairwiseAlignment<S: DpSolver = MinCostDp> {
    leaves: Vec<Alignment>,
    aligner: DpAligner<S>,
    sim_matrix: Vec<Vec<f64>>,
    dist_matrix: Vec<Vec<f64>>,
}

impl<S: DpSolver> PairwiseAlignment<S> {
    /// Aligns every pair of `leaves` with `aligner`.
    ///
    /// The pairs are independent and get aligned in parallel, the
    /// resulting matrices do not depend on scheduling.
    pub fn new(leaves: Vec<Alignment>, aligner: DpAligner<S>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(PeakAlignError::invalid_input(
                "pairwise alignment needs at least one alignment",
            ));
        }

        let n = leaves.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        info!("Calculating pairwise alignments for {} pairs", pairs.len());
        let st = Instant::now();

        let similarities = pairs
            .par_iter()
            .map(|&(i, j)| {
                let merged = aligner.align(&leaves[i], &leaves[j])?;
                merged.similarity().ok_or_else(|| {
                    PeakAlignError::data_integrity(format!(
                        "merge of {} and {} carries no similarity",
                        i, j
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        info!("Pairwise alignments took {:?}", st.elapsed());

        let mut sim_matrix = vec![vec![0.0; n]; n];
        for (&(i, j), sim) in pairs.iter().zip(similarities.into_iter()) {
            sim_matrix[i][j] = sim;
            sim_matrix[j][i] = sim;
        }
        let dist_matrix = similarity_to_distance(&sim_matrix);

        Ok(Self {
            leaves,
            aligner,
            sim_matrix,
            dist_matrix,
        })
    }

    pub fn leaves(&self) -> &[Alignment] {
        &self.leaves
    }

    pub fn sim_matrix(&self) -> &[Vec<f64>] {
        &self.sim_matrix
    }

    pub fn dist_matrix(&self) -> &[Vec<f64>] {
        &self.dist_matrix
    }

    /// Average linkage clustering of the distance matrix, carrying the
    /// aligner's retention time tolerance and gap penalty.
    pub fn guide_tree(&self) -> GuideTree {
        GuideTree::new(
            average_linkage(&self.dist_matrix),
            self.aligner.rt_tolerance(),
            self.aligner.gap_penalty(),
        )
    }

    /// Runs the multiple alignment along [`PairwiseAlignment::guide_tree`].
    pub fn align(&self, min_peaks: usize) -> Result<Alignment> {
        TreeAligner::new()
            .with_accumulation(self.aligner.accumulation())
            .with_solver(self.aligner.solver())
            .align(&self.leaves, &self.guide_tree(), min_peaks)
    }
}

/// `max(sim) - sim`, with a zero diagonal.
///
/// The maximum runs over the whole matrix (diagonal included), so the
/// distances are never negative.
pub fn similarity_to_distance(sim_matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let max_sim = sim_matrix
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    sim_matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, s)| if i == j { 0.0 } else { max_sim - s })
                .collect()
        })
        .collect()
}

/// Agglomerative clustering with average linkage (UPGMA).
///
/// Returns the `n - 1` merges in the order they happen, children are
/// referenced as leaves (`0..n`) or earlier merges. When several pairs
/// are equally close the first one in row-major scan order wins.
///
/// ```
/// use peakalign::tree::clustering::average_linkage;
/// use peakalign::{
///     NodeRef,
///     TreeNode,
/// };
///
/// let dist = vec![
///     vec![0.0, 1.0, 5.0],
///     vec![1.0, 0.0, 4.0],
///     vec![5.0, 4.0, 0.0],
/// ];
/// let nodes = average_linkage(&dist);
/// assert_eq!(nodes, vec![TreeNode::new(0, 1), TreeNode::new(-1, 2)]);
/// ```
pub fn average_linkage(dist_matrix: &[Vec<f64>]) -> Vec<TreeNode> {
    let n = dist_matrix.len();
    let mut clusters: Vec<(NodeRef, usize)> = (0..n).map(|i| (NodeRef::Leaf(i), 1)).collect();
    let mut dist: Vec<Vec<f64>> = dist_matrix.to_vec();
    let mut nodes = Vec::with_capacity(n.saturating_sub(1));

    while clusters.len() > 1 {
        let mut best = (0, 1);
        let mut best_dist = f64::INFINITY;
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                if dist[a][b] < best_dist {
                    best_dist = dist[a][b];
                    best = (a, b);
                }
            }
        }

        let (a, b) = best;
        let (ref_a, size_a) = clusters[a];
        let (ref_b, size_b) = clusters[b];
        nodes.push(TreeNode {
            left: ref_a,
            right: ref_b,
        });

        // The merged cluster takes the place of `a`, `b` goes away.
        let total = (size_a + size_b) as f64;
        for x in 0..clusters.len() {
            if x == a || x == b {
                continue;
            }
            let d = (size_a as f64 * dist[a][x] + size_b as f64 * dist[b][x]) / total;
            dist[a][x] = d;
            dist[x][a] = d;
        }
        clusters[a] = (NodeRef::Internal(nodes.len() - 1), size_a + size_b);
        clusters.remove(b);
        dist.remove(b);
        for row in dist.iter_mut() {
            row.remove(b);
        }
    }

    nodes
}
