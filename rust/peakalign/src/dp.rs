//! Dynamic programming alignment of two position sequences.
//!
//! The aligners only depend on the [`DpSolver`] trait, a cost matrix and a
//! gap penalty go in and a traceback comes out. [`MinCostDp`] is the
//! default global (end to end) minimum cost solver.

use serde::{
    Deserialize,
    Serialize,
};

use crate::models::ScoreMatrix;

/// One output column of a pairwise merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceStep {
    /// A left and a right position are paired.
    Match,
    /// A left position is kept, the right alignment gets a gap.
    GapRight,
    /// A right position is kept, the left alignment gets a gap.
    GapLeft,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DpResult {
    pub trace: Vec<TraceStep>,
    pub score: f64,
}

impl DpResult {
    /// Number of (match, gap-right, gap-left) steps.
    pub fn step_counts(&self) -> (usize, usize, usize) {
        self.trace
            .iter()
            .fold((0, 0, 0), |(m, r, l), step| match step {
                TraceStep::Match => (m + 1, r, l),
                TraceStep::GapRight => (m, r + 1, l),
                TraceStep::GapLeft => (m, r, l + 1),
            })
    }
}

pub trait DpSolver: Sync {
    /// Aligns the rows of `costs` against its columns.
    ///
    /// A valid trace consumes every row (`Match` + `GapRight` steps) and
    /// every column (`Match` + `GapLeft` steps) exactly once.
    fn solve(&self, costs: &ScoreMatrix, gap: f64) -> DpResult;
}

impl<S: DpSolver + ?Sized> DpSolver for &S {
    fn solve(&self, costs: &ScoreMatrix, gap: f64) -> DpResult {
        (**self).solve(costs, gap)
    }
}

/// Global alignment minimizing the summed cost.
///
/// `D[i][j] = min(D[i-1][j-1] + M[i-1][j-1], D[i-1][j] + gap, D[i][j-1] + gap)`
/// with the borders filled with accumulated gaps. Ties prefer a match,
/// then a gap in the right alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinCostDp;

impl DpSolver for MinCostDp {
    fn solve(&self, costs: &ScoreMatrix, gap: f64) -> DpResult {
        let (nrows, ncols) = costs.shape();
        let width = ncols + 1;
        let mut acc = vec![0.0f64; (nrows + 1) * width];
        let mut prev = vec![TraceStep::Match; (nrows + 1) * width];

        for i in 1..=nrows {
            acc[i * width] = acc[(i - 1) * width] + gap;
            prev[i * width] = TraceStep::GapRight;
        }
        for j in 1..=ncols {
            acc[j] = acc[j - 1] + gap;
            prev[j] = TraceStep::GapLeft;
        }

        for (i, cost_row) in (1..=nrows).zip(costs.rows()) {
            for j in 1..=ncols {
                let diagonal = acc[(i - 1) * width + (j - 1)] + cost_row[j - 1];
                let up = acc[(i - 1) * width + j] + gap;
                let left = acc[i * width + (j - 1)] + gap;

                let (best, step) = if diagonal <= up && diagonal <= left {
                    (diagonal, TraceStep::Match)
                } else if up <= left {
                    (up, TraceStep::GapRight)
                } else {
                    (left, TraceStep::GapLeft)
                };
                acc[i * width + j] = best;
                prev[i * width + j] = step;
            }
        }

        // Walk back from the bottom right corner
        let mut trace = Vec::with_capacity(nrows + ncols);
        let (mut i, mut j) = (nrows, ncols);
        while i > 0 || j > 0 {
            let step = prev[i * width + j];
            trace.push(step);
            match step {
                TraceStep::Match => {
                    i -= 1;
                    j -= 1;
                }
                TraceStep::GapRight => i -= 1,
                TraceStep::GapLeft => j -= 1,
            }
        }
        trace.reverse();

        DpResult {
            trace,
            score: acc[nrows * width + ncols],
        }
    }
}
