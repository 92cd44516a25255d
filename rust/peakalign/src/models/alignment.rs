use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::peak::{
    Experiment,
    Peak,
};
use crate::errors::{
    PeakAlignError,
    Result,
};

/// One cell of an alignment, `None` is a gap.
pub type Cell = Option<Arc<Peak>>;

/// A table of peaks with one row per experiment and one column per
/// aligned position.
///
/// Leaf alignments wrap a single experiment, merged alignments are
/// produced by [`crate::DpAligner::align`]. Rows are never shared
/// between two alignments, only the (immutable) peaks are.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    expr_code: Vec<String>,
    peakpos: Vec<Vec<Cell>>,
    similarity: Option<f64>,
}

impl Alignment {
    /// Wraps a single experiment into a leaf alignment.
    pub fn from_experiment(experiment: &Experiment) -> Result<Self> {
        experiment.validate()?;
        Ok(Self::leaf(experiment))
    }

    /// Builds one leaf alignment per experiment, in input order.
    ///
    /// The whole collection is validated before anything is built:
    /// it must be non-empty, experiment codes must be unique, every
    /// experiment must be retention-time ordered and all spectra must
    /// share the same number of channels.
    pub fn from_experiments(experiments: &[Experiment]) -> Result<Vec<Self>> {
        if experiments.is_empty() {
            return Err(PeakAlignError::invalid_input(
                "expected at least one experiment",
            ));
        }

        let mut seen = HashSet::with_capacity(experiments.len());
        let mut run_channels: Option<(usize, &str)> = None;
        for expr in experiments.iter() {
            if !seen.insert(expr.expr_code.as_str()) {
                return Err(PeakAlignError::invalid_input(format!(
                    "experiment code '{}' is used more than once",
                    expr.expr_code
                )));
            }
            let Some(channels) = expr.validate()? else {
                continue;
            };
            match run_channels {
                None => run_channels = Some((channels, &expr.expr_code)),
                Some((expected, first)) if expected != channels => {
                    return Err(PeakAlignError::invalid_input(format!(
                        "experiment '{}' has {} mass channels but '{}' has {}",
                        expr.expr_code, channels, first, expected
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(experiments.iter().map(Self::leaf).collect())
    }

    /// Same as [`Alignment::from_experiments`].
    pub fn build(experiments: &[Experiment]) -> Result<Vec<Self>> {
        Self::from_experiments(experiments)
    }

    fn leaf(experiment: &Experiment) -> Self {
        let row = experiment
            .peaks
            .iter()
            .map(|p| Some(Arc::new(p.clone())))
            .collect();
        Self {
            expr_code: vec![experiment.expr_code.clone()],
            peakpos: vec![row],
            similarity: None,
        }
    }

    /// Assembles an alignment from freshly built rows, checking the
    /// dimension invariants.
    pub(crate) fn from_parts(
        expr_code: Vec<String>,
        peakpos: Vec<Vec<Cell>>,
        similarity: Option<f64>,
    ) -> Result<Self> {
        if expr_code.len() != peakpos.len() {
            return Err(PeakAlignError::data_integrity(format!(
                "{} experiment codes for {} rows",
                expr_code.len(),
                peakpos.len()
            )));
        }
        if let Some(first) = peakpos.first() {
            let ncols = first.len();
            if let Some((i, row)) = peakpos.iter().enumerate().find(|(_, r)| r.len() != ncols) {
                return Err(PeakAlignError::data_integrity(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    ncols
                )));
            }
        }
        Ok(Self {
            expr_code,
            peakpos,
            similarity,
        })
    }

    pub fn expr_code(&self) -> &[String] {
        &self.expr_code
    }

    pub fn peakpos(&self) -> &[Vec<Cell>] {
        &self.peakpos
    }

    pub fn similarity(&self) -> Option<f64> {
        self.similarity
    }

    pub(crate) fn set_similarity(&mut self, similarity: f64) {
        self.similarity = Some(similarity);
    }

    pub fn nrows(&self) -> usize {
        self.peakpos.len()
    }

    pub fn ncols(&self) -> usize {
        self.peakpos.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of populated (non-gap) cells.
    pub fn num_peaks(&self) -> usize {
        self.peakpos
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    /// Cells of one aligned position, in row order.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&Peak>> + '_ {
        self.peakpos.iter().map(move |row| row[idx].as_deref())
    }

    /// Column-major view of the table, one entry per aligned position.
    pub fn peakalgt(&self) -> Vec<Vec<Option<&Peak>>> {
        (0..self.ncols())
            .map(|idx| self.column(idx).collect())
            .collect()
    }

    /// Number of populated rows in every column.
    pub fn populated_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.ncols()];
        for row in self.peakpos.iter() {
            for (count, cell) in counts.iter_mut().zip(row.iter()) {
                if cell.is_some() {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Mean retention time of the populated peaks of a column,
    /// `None` for an all-gap column.
    pub fn column_mean_rt(&self, idx: usize) -> Option<f64> {
        let (sum, n) = self
            .column(idx)
            .flatten()
            .fold((0.0, 0usize), |(sum, n), p| (sum + p.rt, n + 1));
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    /// Reorders the columns by ascending mean retention time.
    ///
    /// The reordering is stable and applying it twice is the same
    /// as applying it once.
    pub fn sort_columns(&mut self) {
        let keys: Vec<Option<f64>> = (0..self.ncols())
            .map(|idx| self.column_mean_rt(idx))
            .collect();
        let order = sorted_column_order(&keys);
        if order.iter().enumerate().all(|(i, &o)| i == o) {
            return;
        }
        self.peakpos = self
            .peakpos
            .iter()
            .map(|row| order.iter().map(|&o| row[o].clone()).collect())
            .collect();
    }

    /// Drops every column with fewer than `min_peaks` populated rows.
    ///
    /// Only meant for alignments of replicates of the same condition,
    /// where a compound seen in a single run is most likely noise.
    pub fn filter_min_peaks(&mut self, min_peaks: usize) {
        let keep: Vec<bool> = self
            .populated_counts()
            .into_iter()
            .map(|c| c >= min_peaks)
            .collect();
        let before = keep.len();
        self.peakpos = self
            .peakpos
            .iter()
            .map(|row| {
                row.iter()
                    .zip(keep.iter())
                    .filter(|(_, k)| **k)
                    .map(|(cell, _)| cell.clone())
                    .collect()
            })
            .collect();
        debug!(
            "Min peaks filter ({}) kept {} of {} positions",
            min_peaks,
            self.ncols(),
            before
        );
    }
}

/// Comparator for two column mean retention times.
///
/// All-gap columns (`None`) compare equal to every other column.
pub fn compare_mean_rt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

// The comparator is only a partial order once all-gap columns show up,
// insertion sort stays well defined (and stable) in that case.
// Merged columns arrive almost sorted so this is close to linear.
fn sorted_column_order(keys: &[Option<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    for i in 1..order.len() {
        let mut j = i;
        while j > 0 && compare_mean_rt(keys[order[j - 1]], keys[order[j]]) == Ordering::Greater {
            order.swap(j - 1, j);
            j -= 1;
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(rt: f64) -> Option<Arc<Peak>> {
        Some(Arc::new(Peak::new(rt, vec![1.0, 0.0])))
    }

    fn rts(algt: &Alignment, row: usize) -> Vec<Option<f64>> {
        algt.peakpos()[row]
            .iter()
            .map(|c| c.as_ref().map(|p| p.rt))
            .collect()
    }

    #[test]
    fn test_leaf_from_experiments() {
        let exprs = vec![
            Experiment::new("a", vec![Peak::new(1.0, vec![1.0]), Peak::new(2.0, vec![1.0])]),
            Experiment::new("b", vec![Peak::new(1.5, vec![2.0])]),
        ];
        let leaves = Alignment::from_experiments(&exprs).unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].expr_code(), &["a".to_string()]);
        assert_eq!(leaves[0].nrows(), 1);
        assert_eq!(leaves[0].ncols(), 2);
        assert_eq!(leaves[1].ncols(), 1);
        assert_eq!(leaves[1].similarity(), None);
        assert_eq!(leaves[1].peakalgt().len(), 1);
    }

    #[test]
    fn test_from_experiments_rejects_bad_collections() {
        assert!(matches!(
            Alignment::from_experiments(&[]),
            Err(PeakAlignError::InvalidInput { .. })
        ));

        let dup = vec![Experiment::new("a", vec![]), Experiment::new("a", vec![])];
        assert!(Alignment::from_experiments(&dup).is_err());

        let channels = vec![
            Experiment::new("a", vec![Peak::new(1.0, vec![1.0, 2.0])]),
            Experiment::new("b", vec![]),
            Experiment::new("c", vec![Peak::new(1.0, vec![1.0])]),
        ];
        assert!(Alignment::from_experiments(&channels).is_err());
    }

    #[test]
    fn test_from_parts_checks_dimensions() {
        let ok = Alignment::from_parts(
            vec!["a".into(), "b".into()],
            vec![vec![peak(1.0), None], vec![None, peak(2.0)]],
            None,
        );
        assert!(ok.is_ok());

        let ragged = Alignment::from_parts(
            vec!["a".into(), "b".into()],
            vec![vec![peak(1.0), None], vec![None]],
            None,
        );
        assert!(matches!(ragged, Err(PeakAlignError::DataIntegrity { .. })));

        let missing_code =
            Alignment::from_parts(vec!["a".into()], vec![vec![peak(1.0)], vec![peak(2.0)]], None);
        assert!(matches!(
            missing_code,
            Err(PeakAlignError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_sort_columns_by_mean_rt() {
        let mut algt = Alignment::from_parts(
            vec!["a".into(), "b".into()],
            vec![
                vec![peak(30.0), peak(10.0), None],
                vec![peak(32.0), None, peak(20.0)],
            ],
            None,
        )
        .unwrap();
        algt.sort_columns();
        assert_eq!(rts(&algt, 0), vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(rts(&algt, 1), vec![None, Some(20.0), Some(32.0)]);

        let snapshot = algt.clone();
        algt.sort_columns();
        assert_eq!(algt, snapshot);
    }

    #[test]
    fn test_sort_columns_all_gap_is_stable() {
        let mut algt = Alignment::from_parts(
            vec!["a".into()],
            vec![vec![peak(5.0), None, peak(3.0)]],
            None,
        )
        .unwrap();
        algt.sort_columns();
        // The gap column is "equal" to both neighbours, nothing moves.
        assert_eq!(rts(&algt, 0), vec![Some(5.0), None, Some(3.0)]);
        let snapshot = algt.clone();
        algt.sort_columns();
        assert_eq!(algt, snapshot);
    }

    #[test]
    fn test_filter_min_peaks() {
        // Populated counts per column: [4, 1, 3, 1]
        let mut algt = Alignment::from_parts(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                vec![peak(1.0), peak(2.0), peak(3.0), None],
                vec![peak(1.1), None, peak(3.1), None],
                vec![peak(1.2), None, peak(3.2), peak(4.0)],
                vec![peak(1.3), None, None, None],
            ],
            None,
        )
        .unwrap();
        assert_eq!(algt.populated_counts(), vec![4, 1, 3, 1]);

        algt.filter_min_peaks(2);
        assert_eq!(algt.ncols(), 2);
        assert_eq!(algt.nrows(), 4);
        assert_eq!(rts(&algt, 0), vec![Some(1.0), Some(3.0)]);
        assert_eq!(rts(&algt, 3), vec![Some(1.3), None]);
        assert_eq!(algt.populated_counts(), vec![4, 3]);
    }

    #[test]
    fn test_column_mean_rt() {
        let algt = Alignment::from_parts(
            vec!["a".into(), "b".into()],
            vec![vec![peak(10.0), None], vec![peak(20.0), None]],
            None,
        )
        .unwrap();
        assert_eq!(algt.column_mean_rt(0), Some(15.0));
        assert_eq!(algt.column_mean_rt(1), None);
        assert_eq!(algt.num_peaks(), 2);
    }
}
