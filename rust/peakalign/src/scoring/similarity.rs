use crate::dp::TraceStep;
use crate::errors::{
    PeakAlignError,
    Result,
};
use crate::models::ScoreMatrix;

/// Quality of a merge, higher means the two alignments agree more.
///
/// Matched positions add `1 - M[i][j]`, every gap subtracts `gap`.
/// The value is diagnostic, nothing downstream steers on it apart from
/// guide tree construction.
pub fn alignment_similarity(trace: &[TraceStep], matrix: &ScoreMatrix, gap: f64) -> Result<f64> {
    let similarities = matrix.complement();
    let mut similarity = 0.0;
    let mut idx_l = 0;
    let mut idx_r = 0;

    for step in trace.iter() {
        match step {
            TraceStep::Match => {
                let value = similarities.get(idx_l, idx_r).ok_or_else(|| {
                    PeakAlignError::data_integrity(format!(
                        "match at ({}, {}) outside of a {}x{} score matrix",
                        idx_l,
                        idx_r,
                        matrix.nrows(),
                        matrix.ncols()
                    ))
                })?;
                similarity += value;
                idx_l += 1;
                idx_r += 1;
            }
            TraceStep::GapRight => {
                similarity -= gap;
                idx_l += 1;
            }
            TraceStep::GapLeft => {
                similarity -= gap;
                idx_r += 1;
            }
        }
    }

    Ok(similarity)
}
