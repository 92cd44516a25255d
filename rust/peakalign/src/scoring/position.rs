use serde::{
    Deserialize,
    Serialize,
};
use tracing::trace;

use crate::models::{
    Alignment,
    Peak,
    ScoreMatrix,
};

/// How the pairwise contributions of two columns are normalized.
///
/// Both policies divide by `|column_a| * |column_b|` (gaps included in
/// the counts), they differ in when the division happens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accumulation {
    /// Divide the running sum after every pair is added.
    /// This reproduces historical results bit for bit.
    #[default]
    #[serde(rename = "iterative")]
    Iterative,
    /// Divide the total once, after all pairs are added.
    #[serde(rename = "single_shot")]
    SingleShot,
}

/// Cosine similarity between two spectra.
///
/// A spectrum with zero magnitude has no direction, its similarity to
/// anything is reported as 0.
///
/// ```
/// use peakalign::scoring::position::spectrum_cosine;
///
/// let a = vec![1.0, 0.0, 1.0];
/// let b = vec![2.0, 0.0, 2.0];
/// assert!((spectrum_cosine(&a, &b) - 1.0).abs() < 1e-12);
/// assert_eq!(spectrum_cosine(&a, &[0.0, 1.0, 0.0]), 0.0);
/// ```
pub fn spectrum_cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot_product: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let magnitude_a: f64 = a.iter().map(|&x| x * x).sum::<f64>().sqrt();
    let magnitude_b: f64 = b.iter().map(|&x| x * x).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        trace!("Zero magnitude spectrum in cosine similarity");
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Gaussian decay of the similarity with the retention time difference.
///
/// `rt_tolerance` is the standard deviation, in seconds. An infinite
/// tolerance disables the retention time term.
pub fn rt_proximity(rt_a: f64, rt_b: f64, rt_tolerance: f64) -> f64 {
    let z = (rt_a - rt_b) / rt_tolerance;
    (-(z * z) / 2.0).exp()
}

/// Dissimilarity contribution of a single pair of peaks, `1 - cos * rtime`.
pub fn peak_pair_score(a: &Peak, b: &Peak, rt_tolerance: f64) -> f64 {
    let cos = spectrum_cosine(&a.mass_spectrum, &b.mass_spectrum);
    let rtime = rt_proximity(a.rt, b.rt, rt_tolerance);
    1.0 - (cos * rtime)
}

/// Score between two aligned positions (columns), lower is more similar.
///
/// Every pair of non-gap peaks drawn from the two columns contributes
/// [`peak_pair_score`], normalized according to `accumulation`.
/// Columns without any non-gap pair score 0.
pub fn position_similarity(
    column_a: &[Option<&Peak>],
    column_b: &[Option<&Peak>],
    rt_tolerance: f64,
    accumulation: Accumulation,
) -> f64 {
    let norm = (column_a.len() * column_b.len()) as f64;
    let mut score = 0.0;
    let mut any_pair = false;

    for a in column_a.iter().flatten() {
        for b in column_b.iter().flatten() {
            score += peak_pair_score(a, b, rt_tolerance);
            any_pair = true;
            if accumulation == Accumulation::Iterative {
                score /= norm;
            }
        }
    }

    if !any_pair {
        return 0.0;
    }
    match accumulation {
        Accumulation::Iterative => score,
        Accumulation::SingleShot => score / norm,
    }
}

/// Dense matrix of [`position_similarity`] between every position of
/// `left` (rows) and every position of `right` (columns).
pub fn score_matrix(
    left: &Alignment,
    right: &Alignment,
    rt_tolerance: f64,
    accumulation: Accumulation,
) -> ScoreMatrix {
    let left_cols = left.peakalgt();
    let right_cols = right.peakalgt();
    let mut out = ScoreMatrix::zeros(left_cols.len(), right_cols.len());
    for (row, lcol) in out.iter_mut_rows().zip(left_cols.iter()) {
        for (cell, rcol) in row.iter_mut().zip(right_cols.iter()) {
            *cell = position_similarity(lcol, rcol, rt_tolerance, accumulation);
        }
    }
    trace!(
        "Computed a {} by {} similarity matrix",
        out.nrows(),
        out.ncols()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Experiment;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_single_pair_matches_closed_form() {
        let a = Peak::new(100.0, vec![1.0, 0.0, 0.0]);
        let b = Peak::new(101.0, vec![1.0, 0.0, 0.0]);
        let expected = 1.0 - (-(0.2f64 * 0.2) / 2.0).exp();
        for acc in [Accumulation::Iterative, Accumulation::SingleShot] {
            let got = position_similarity(&[Some(&a)], &[Some(&b)], 5.0, acc);
            assert!(close(got, expected), "{:?}: {} != {}", acc, got, expected);
        }
        assert!(close(expected, 0.019801326693244747));
    }

    #[test]
    fn test_accumulation_policies_differ() {
        // Orthogonal spectra, every pair contributes exactly 1.
        let a1 = Peak::new(10.0, vec![1.0, 0.0]);
        let a2 = Peak::new(11.0, vec![1.0, 0.0]);
        let b = Peak::new(10.0, vec![0.0, 1.0]);
        let col_a = [Some(&a1), Some(&a2)];
        let col_b = [Some(&b)];

        let iterative = position_similarity(&col_a, &col_b, 5.0, Accumulation::Iterative);
        let single = position_similarity(&col_a, &col_b, 5.0, Accumulation::SingleShot);
        // ((0 + 1) / 2 + 1) / 2
        assert!(close(iterative, 0.75));
        assert!(close(single, 1.0));
    }

    #[test]
    fn test_gaps_count_towards_normalization() {
        let a = Peak::new(10.0, vec![0.0, 1.0]);
        let b = Peak::new(10.0, vec![1.0, 0.0]);
        let got = position_similarity(&[Some(&a), None], &[Some(&b)], 5.0, Accumulation::Iterative);
        assert!(close(got, 0.5));
    }

    #[test]
    fn test_no_pairs_scores_zero() {
        let a = Peak::new(10.0, vec![1.0]);
        assert_eq!(
            position_similarity(&[None, None], &[Some(&a)], 5.0, Accumulation::Iterative),
            0.0
        );
        assert_eq!(
            position_similarity(&[], &[Some(&a)], 5.0, Accumulation::SingleShot),
            0.0
        );
    }

    #[test]
    fn test_infinite_tolerance_ignores_rt() {
        let a = Peak::new(10.0, vec![1.0, 1.0]);
        let near = Peak::new(10.5, vec![1.0, 0.0]);
        let far = Peak::new(900.0, vec![1.0, 0.0]);
        let acc = Accumulation::Iterative;
        let s_near = position_similarity(&[Some(&a)], &[Some(&near)], f64::INFINITY, acc);
        let s_far = position_similarity(&[Some(&a)], &[Some(&far)], f64::INFINITY, acc);
        assert!(close(s_near, s_far));
        assert!(close(s_near, 1.0 - 1.0 / 2f64.sqrt()));

        // With a large but finite tolerance the two converge.
        let s_near = position_similarity(&[Some(&a)], &[Some(&near)], 1e9, acc);
        let s_far = position_similarity(&[Some(&a)], &[Some(&far)], 1e9, acc);
        assert!((s_near - s_far).abs() < 1e-9);
    }

    #[test]
    fn test_zero_spectrum_is_dissimilar() {
        let a = Peak::new(10.0, vec![0.0, 0.0]);
        let b = Peak::new(10.0, vec![1.0, 0.0]);
        assert_eq!(peak_pair_score(&a, &b, 5.0), 1.0);
    }

    #[test]
    fn test_score_matrix_shape() {
        let left = Alignment::from_experiment(&Experiment::new(
            "a",
            vec![Peak::new(10.0, vec![1.0, 0.0]), Peak::new(20.0, vec![0.0, 1.0])],
        ))
        .unwrap();
        let right = Alignment::from_experiment(&Experiment::new(
            "b",
            vec![
                Peak::new(10.0, vec![1.0, 0.0]),
                Peak::new(15.0, vec![1.0, 1.0]),
                Peak::new(20.0, vec![0.0, 1.0]),
            ],
        ))
        .unwrap();
        let m = score_matrix(&left, &right, 5.0, Accumulation::Iterative);
        assert_eq!(m.shape(), (2, 3));
        assert!(close(m.get(0, 0).unwrap(), 0.0));
        assert!(close(m.get(1, 2).unwrap(), 0.0));
        assert!(m.get(0, 2).unwrap() > 0.99);
    }
}
