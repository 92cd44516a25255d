#![doc = include_str!("../README.md")]

// Declare modules
pub mod aligner;
pub mod dp;
pub mod errors;
pub mod models;
pub mod scoring;
pub mod tree;

// Re-export main structures
pub use crate::aligner::{
    DpAligner,
    merge_alignments,
};
pub use crate::dp::{
    DpResult,
    DpSolver,
    MinCostDp,
    TraceStep,
};
pub use crate::models::{
    Alignment,
    Experiment,
    Peak,
    ScoreMatrix,
};
pub use crate::scoring::Accumulation;
pub use crate::tree::{
    GuideTree,
    NodeRef,
    PairwiseAlignment,
    TreeAligner,
    TreeNode,
    TreeProgress,
    align_with_tree,
    align_with_tree_observed,
};

// Re-export errors
pub use crate::errors::{
    PeakAlignError,
    Result,
};
