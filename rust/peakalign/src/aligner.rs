use tracing::debug;

use crate::dp::{
    DpResult,
    DpSolver,
    MinCostDp,
    TraceStep,
};
use crate::errors::{
    PeakAlignError,
    Result,
};
use crate::models::{
    Alignment,
    Cell,
};
use crate::scoring::{
    Accumulation,
    alignment_similarity,
    score_matrix,
};

/// Merges two alignments into one by dynamic programming.
///
/// Holds the retention time tolerance (seconds), the gap penalty, the
/// accumulation policy used for position scores and the DP solver.
///
/// Example:
/// ```
/// use peakalign::{
///     Alignment,
///     DpAligner,
///     Experiment,
///     Peak,
/// };
///
/// let a = Experiment::new("a", vec![Peak::new(100.0, vec![1.0, 0.0, 0.0])]);
/// let b = Experiment::new("b", vec![Peak::new(101.0, vec![1.0, 0.0, 0.0])]);
/// let left = Alignment::from_experiment(&a).unwrap();
/// let right = Alignment::from_experiment(&b).unwrap();
/// let aligner = DpAligner::new(5.0, 0.2).unwrap();
/// let merged = aligner.align(&left, &right).unwrap();
/// assert_eq!(merged.nrows(), 2);
/// assert_eq!(merged.ncols(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DpAligner<S: DpSolver = MinCostDp> {
    rt_tolerance: f64,
    gap_penalty: f64,
    accumulation: Accumulation,
    solver: S,
}

impl DpAligner<MinCostDp> {
    pub fn new(rt_tolerance: f64, gap_penalty: f64) -> Result<Self> {
        validate_parameters(rt_tolerance, gap_penalty)?;
        Ok(Self {
            rt_tolerance,
            gap_penalty,
            accumulation: Accumulation::default(),
            solver: MinCostDp,
        })
    }
}

pub(crate) fn validate_parameters(rt_tolerance: f64, gap_penalty: f64) -> Result<()> {
    // Infinity is allowed, it switches off the retention time term.
    if rt_tolerance.is_nan() || rt_tolerance <= 0.0 {
        return Err(PeakAlignError::invalid_input(format!(
            "retention time tolerance must be positive, got {}",
            rt_tolerance
        )));
    }
    if !gap_penalty.is_finite() {
        return Err(PeakAlignError::invalid_input(format!(
            "gap penalty must be finite, got {}",
            gap_penalty
        )));
    }
    Ok(())
}

impl<S: DpSolver> DpAligner<S> {
    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_solver<T: DpSolver>(self, solver: T) -> DpAligner<T> {
        DpAligner {
            rt_tolerance: self.rt_tolerance,
            gap_penalty: self.gap_penalty,
            accumulation: self.accumulation,
            solver,
        }
    }

    pub fn rt_tolerance(&self) -> f64 {
        self.rt_tolerance
    }

    pub fn gap_penalty(&self) -> f64 {
        self.gap_penalty
    }

    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Aligns two alignments, the merged result carries the merge similarity.
    pub fn align(&self, left: &Alignment, right: &Alignment) -> Result<Alignment> {
        self.align_traced(left, right).map(|(merged, _)| merged)
    }

    /// Same as [`DpAligner::align`] but also hands back the raw DP result.
    pub fn align_traced(
        &self,
        left: &Alignment,
        right: &Alignment,
    ) -> Result<(Alignment, DpResult)> {
        let matrix = score_matrix(left, right, self.rt_tolerance, self.accumulation);
        let dp = self.solver.solve(&matrix, self.gap_penalty);

        let mut merged = merge_alignments(left, right, &dp.trace)?;
        let similarity = alignment_similarity(&dp.trace, &matrix, self.gap_penalty)?;
        merged.set_similarity(similarity);

        debug!(
            "Merged {}x{} with {}x{} into {}x{} (similarity {:.4})",
            left.nrows(),
            left.ncols(),
            right.nrows(),
            right.ncols(),
            merged.nrows(),
            merged.ncols(),
            similarity
        );
        Ok((merged, dp))
    }
}

/// Builds the merged alignment described by a traceback.
///
/// Rows of `left` come first, then rows of `right`. Every trace step
/// becomes one output column, after which the columns are reordered by
/// mean retention time.
pub fn merge_alignments(
    left: &Alignment,
    right: &Alignment,
    trace: &[TraceStep],
) -> Result<Alignment> {
    let (left_cols, right_cols) = (left.ncols(), right.ncols());
    let mut rows: Vec<Vec<Cell>> = (0..left.nrows() + right.nrows())
        .map(|_| Vec::with_capacity(trace.len()))
        .collect();

    let (left_rows, right_rows) = rows.split_at_mut(left.nrows());
    let mut idx_l = 0;
    let mut idx_r = 0;
    for (pos, step) in trace.iter().enumerate() {
        let (take_l, take_r) = match step {
            TraceStep::Match => (true, true),
            TraceStep::GapRight => (true, false),
            TraceStep::GapLeft => (false, true),
        };
        if (take_l && idx_l >= left_cols) || (take_r && idx_r >= right_cols) {
            return Err(PeakAlignError::data_integrity(format!(
                "trace step {} ({:?}) reads past the operands ({} and {} columns)",
                pos, step, left_cols, right_cols
            )));
        }

        append_column(left_rows, left, take_l.then_some(idx_l));
        append_column(right_rows, right, take_r.then_some(idx_r));
        idx_l += take_l as usize;
        idx_r += take_r as usize;
    }

    if idx_l != left_cols || idx_r != right_cols {
        return Err(PeakAlignError::data_integrity(format!(
            "trace consumed {} of {} left and {} of {} right columns",
            idx_l, left_cols, idx_r, right_cols
        )));
    }

    let expr_code = left
        .expr_code()
        .iter()
        .chain(right.expr_code().iter())
        .cloned()
        .collect();
    let mut merged = Alignment::from_parts(expr_code, rows, None)?;
    merged.sort_columns();

    if merged.nrows() != left.nrows() + right.nrows() || merged.ncols() != trace.len() {
        return Err(PeakAlignError::data_integrity(format!(
            "merge produced {}x{}, expected {}x{}",
            merged.nrows(),
            merged.ncols(),
            left.nrows() + right.nrows(),
            trace.len()
        )));
    }
    Ok(merged)
}

/// Appends column `col` of `src` to `out_rows`, or a gap to every row when `None`.
fn append_column(out_rows: &mut [Vec<Cell>], src: &Alignment, col: Option<usize>) {
    for (out, row) in out_rows.iter_mut().zip(src.peakpos().iter()) {
        out.push(col.and_then(|c| row[c].clone()));
    }
}
