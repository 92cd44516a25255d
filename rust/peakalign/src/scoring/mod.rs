//! Scores used when merging two alignments.
//!
//! [`position::score_matrix`] compares every aligned position of one
//! alignment against every position of the other, the dynamic programming
//! step consumes that matrix, and [`similarity::alignment_similarity`]
//! condenses the resulting traceback into a single merge quality.

pub mod position;
pub mod similarity;

pub use position::{
    Accumulation,
    position_similarity,
    score_matrix,
};
pub use similarity::alignment_similarity;
