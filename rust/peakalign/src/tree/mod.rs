//! Guide tree driven multiple alignment.
//!
//! A guide tree is the merge order produced by hierarchical clustering of
//! the experiments. Each internal node merges two children, a child is
//! either one of the input leaves or the result of an earlier node.
//! Nodes are processed strictly in the order given, so every child must
//! already be available when its parent comes up.

pub mod clustering;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use crate::aligner::{
    DpAligner,
    validate_parameters,
};
use crate::dp::{
    DpSolver,
    MinCostDp,
};
use crate::errors::{
    PeakAlignError,
    Result,
};
use crate::models::Alignment;
use crate::scoring::Accumulation;

pub use clustering::PairwiseAlignment;

/// Reference to a child of a guide tree node.
///
/// Serialized with the signed convention of clustering libraries:
/// leaves are `0..n`, internal node `k` is `-(k + 1)`.
///
/// ```
/// use peakalign::NodeRef;
///
/// assert_eq!(NodeRef::from(3), NodeRef::Leaf(3));
/// assert_eq!(NodeRef::from(-1), NodeRef::Internal(0));
/// assert_eq!(i64::from(NodeRef::Internal(4)), -5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum NodeRef {
    Leaf(usize),
    Internal(usize),
}

impl From<i64> for NodeRef {
    fn from(value: i64) -> Self {
        if value >= 0 {
            NodeRef::Leaf(value as usize)
        } else {
            NodeRef::Internal((-(value + 1)) as usize)
        }
    }
}

impl From<NodeRef> for i64 {
    fn from(value: NodeRef) -> Self {
        match value {
            NodeRef::Leaf(i) => i as i64,
            NodeRef::Internal(k) => -(k as i64) - 1,
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Leaf(i) => write!(f, "leaf {}", i),
            NodeRef::Internal(k) => write!(f, "node {}", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub left: NodeRef,
    pub right: NodeRef,
}

impl TreeNode {
    pub fn new(left: impl Into<NodeRef>, right: impl Into<NodeRef>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Merge order for `nodes.len() + 1` leaves, plus the parameters every
/// merge uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideTree {
    pub nodes: Vec<TreeNode>,
    /// Retention time tolerance `D`, in seconds.
    pub rt_tolerance: f64,
    pub gap_penalty: f64,
}

impl GuideTree {
    pub fn new(nodes: Vec<TreeNode>, rt_tolerance: f64, gap_penalty: f64) -> Self {
        Self {
            nodes,
            rt_tolerance,
            gap_penalty,
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.len() + 1
    }

    /// The node holding the final alignment.
    pub fn root(&self) -> NodeRef {
        match self.nodes.len() {
            0 => NodeRef::Leaf(0),
            n => NodeRef::Internal(n - 1),
        }
    }
}

/// Progress notifications emitted while walking a guide tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeProgress {
    Started {
        items: usize,
        rt_tolerance: f64,
        gap_penalty: f64,
    },
    NodeStarted {
        node: usize,
        left: NodeRef,
        right: NodeRef,
    },
    NodeMerged {
        node: usize,
        remaining: usize,
    },
    Finished {
        rows: usize,
        columns: usize,
    },
}

/// Storage for the leaves and the results of the internal nodes.
///
/// Every slot but the root has to be merged into exactly one parent.
struct AlignmentArena<'a> {
    leaves: &'a [Alignment],
    internal: Vec<Option<Alignment>>,
    leaf_used: Vec<bool>,
    internal_used: Vec<bool>,
}

impl<'a> AlignmentArena<'a> {
    fn new(leaves: &'a [Alignment], num_nodes: usize) -> Self {
        Self {
            leaves,
            internal: vec![None; num_nodes],
            leaf_used: vec![false; leaves.len()],
            internal_used: vec![false; num_nodes],
        }
    }

    /// Marks `reference` as consumed by `node`.
    ///
    /// With `n - 1` nodes there are exactly `2n - 2` child slots, so
    /// rejecting any second use also rules out slots that are never used.
    /// Out of range references are left for [`AlignmentArena::resolve`].
    fn claim(&mut self, node: usize, reference: NodeRef) -> Result<()> {
        let slot = match reference {
            NodeRef::Leaf(i) => self.leaf_used.get_mut(i),
            NodeRef::Internal(k) => self.internal_used.get_mut(k),
        };
        if let Some(used) = slot {
            if *used {
                return Err(PeakAlignError::MalformedTree {
                    node: Some(node),
                    reference: Some(reference),
                    context: "already merged by an earlier node".to_string(),
                });
            }
            *used = true;
        }
        Ok(())
    }

    fn resolve(&self, node: usize, reference: NodeRef) -> Result<&Alignment> {
        let found = match reference {
            NodeRef::Leaf(i) => self.leaves.get(i),
            NodeRef::Internal(k) => self.internal.get(k).and_then(|slot| slot.as_ref()),
        };
        found.ok_or_else(|| PeakAlignError::MalformedTree {
            node: Some(node),
            reference: Some(reference),
            context: match reference {
                NodeRef::Leaf(_) => format!("only {} leaves are available", self.leaves.len()),
                NodeRef::Internal(_) => "referenced node has not been aligned yet".to_string(),
            },
        })
    }

    fn store(&mut self, node: usize, alignment: Alignment) {
        self.internal[node] = Some(alignment);
    }

    fn into_root(mut self) -> Option<Alignment> {
        match self.internal.pop() {
            Some(root) => root,
            None => self.leaves.first().cloned(),
        }
    }
}

/// Walks guide trees, merging alignments with a [`DpAligner`] built from
/// each tree's parameters.
#[derive(Debug, Clone)]
pub struct TreeAligner<S: DpSolver = MinCostDp> {
    accumulation: Accumulation,
    solver: S,
}

impl TreeAligner<MinCostDp> {
    pub fn new() -> Self {
        Self {
            accumulation: Accumulation::default(),
            solver: MinCostDp,
        }
    }
}

impl Default for TreeAligner<MinCostDp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DpSolver> TreeAligner<S> {
    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_solver<T: DpSolver>(self, solver: T) -> TreeAligner<T> {
        TreeAligner {
            accumulation: self.accumulation,
            solver,
        }
    }

    pub fn align(
        &self,
        leaves: &[Alignment],
        tree: &GuideTree,
        min_peaks: usize,
    ) -> Result<Alignment> {
        self.align_observed(leaves, tree, min_peaks, &mut |_| {})
    }

    /// Aligns `leaves` following `tree`, reporting progress to `observer`.
    ///
    /// When `min_peaks > 1` the final alignment only keeps positions
    /// populated in at least `min_peaks` experiments. This is meant for
    /// replicates of a single condition, not for the final cross condition
    /// alignment.
    pub fn align_observed(
        &self,
        leaves: &[Alignment],
        tree: &GuideTree,
        min_peaks: usize,
        observer: &mut dyn FnMut(TreeProgress),
    ) -> Result<Alignment> {
        if leaves.is_empty() {
            return Err(PeakAlignError::invalid_input(
                "guide tree alignment needs at least one alignment",
            ));
        }
        validate_parameters(tree.rt_tolerance, tree.gap_penalty)?;
        if tree.num_leaves() != leaves.len() {
            return Err(PeakAlignError::MalformedTree {
                node: None,
                reference: None,
                context: format!(
                    "{} nodes cannot join {} alignments, expected {}",
                    tree.nodes.len(),
                    leaves.len(),
                    leaves.len() - 1
                ),
            });
        }

        let aligner = DpAligner::new(tree.rt_tolerance, tree.gap_penalty)?
            .with_accumulation(self.accumulation)
            .with_solver(&self.solver);

        info!(
            "Aligning {} items with guide tree (D={:.2}, gap={:.2})",
            leaves.len(),
            tree.rt_tolerance,
            tree.gap_penalty
        );
        observer(TreeProgress::Started {
            items: leaves.len(),
            rt_tolerance: tree.rt_tolerance,
            gap_penalty: tree.gap_penalty,
        });

        let mut arena = AlignmentArena::new(leaves, tree.nodes.len());
        for (k, node) in tree.nodes.iter().enumerate() {
            arena.claim(k, node.left)?;
            arena.claim(k, node.right)?;
            observer(TreeProgress::NodeStarted {
                node: k,
                left: node.left,
                right: node.right,
            });
            let left = arena.resolve(k, node.left)?;
            let right = arena.resolve(k, node.right)?;
            let merged = aligner
                .align(left, right)
                .map_err(|e| e.append_to_context(&format!("while merging node {}", k)))?;
            arena.store(k, merged);
            observer(TreeProgress::NodeMerged {
                node: k,
                remaining: tree.nodes.len() - k - 1,
            });
        }

        let mut root = arena.into_root().ok_or_else(|| PeakAlignError::MalformedTree {
            node: None,
            reference: Some(tree.root()),
            context: "root alignment is missing".to_string(),
        })?;
        let expected_rows: usize = leaves.iter().map(Alignment::nrows).sum();
        if root.nrows() != expected_rows {
            return Err(PeakAlignError::data_integrity(format!(
                "root alignment has {} rows, the leaves have {}",
                root.nrows(),
                expected_rows
            )));
        }

        if min_peaks > 1 {
            root.filter_min_peaks(min_peaks);
        }

        info!(
            "Final alignment has {} rows and {} positions",
            root.nrows(),
            root.ncols()
        );
        observer(TreeProgress::Finished {
            rows: root.nrows(),
            columns: root.ncols(),
        });
        Ok(root)
    }
}

/// Aligns `leaves` following `tree` with the default solver and
/// accumulation policy.
pub fn align_with_tree(
    leaves: &[Alignment],
    tree: &GuideTree,
    min_peaks: usize,
) -> Result<Alignment> {
    TreeAligner::new().align(leaves, tree, min_peaks)
}

/// [`align_with_tree`] reporting progress to `observer`.
pub fn align_with_tree_observed(
    leaves: &[Alignment],
    tree: &GuideTree,
    min_peaks: usize,
    observer: &mut dyn FnMut(TreeProgress),
) -> Result<Alignment> {
    TreeAligner::new().align_observed(leaves, tree, min_peaks, observer)
}
