use crate::errors::{
    PeakAlignError,
    Result,
};

/// Dense row-major matrix of position similarities between two alignments.
///
/// `values` is a flattened array of values
/// `ncols` is the number of values in each row (positions of the right alignment)
/// `nrows` is the number of rows (positions of the left alignment)
///
/// Values that belong to the same row are adjacent in memory.
/// Either dimension may be zero, merging against an empty alignment
/// is still a valid (all gaps) operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    values: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl ScoreMatrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            values: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    pub fn from_flat_vector(values: Vec<f64>, nrows: usize, ncols: usize) -> Result<Self> {
        if values.len() != nrows * ncols {
            return Err(PeakAlignError::data_integrity(format!(
                "expected {}x{} = {} values, got {}",
                nrows,
                ncols,
                nrows * ncols,
                values.len()
            )));
        }
        Ok(Self {
            values,
            nrows,
            ncols,
        })
    }

    /// Builds a matrix from nested rows.
    ///
    /// ```
    /// use peakalign::ScoreMatrix;
    /// let m = ScoreMatrix::new(vec![vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap();
    /// assert_eq!(m.get(1, 0), Some(0.3));
    /// assert_eq!(m.shape(), (2, 2));
    /// ```
    pub fn new<S: AsRef<[f64]>, C: AsRef<[S]>>(rows: C) -> Result<Self> {
        let nrows = rows.as_ref().len();
        let ncols = rows.as_ref().first().map(|r| r.as_ref().len()).unwrap_or(0);
        let values: Vec<f64> = rows
            .as_ref()
            .iter()
            .flat_map(|x| x.as_ref())
            .cloned()
            .collect();
        Self::from_flat_vector(values, nrows, ncols)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        Some(self.values[row * self.ncols + col])
    }

    /// Iterates over the rows, an empty iterator when there are no columns.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.ncols.max(1))
    }

    pub fn iter_mut_rows(&mut self) -> impl Iterator<Item = &mut [f64]> {
        // chunks_mut panics on a zero chunk size
        self.values.chunks_mut(self.ncols.max(1))
    }

    /// Returns `1 - x` for every element.
    pub fn complement(&self) -> ScoreMatrix {
        ScoreMatrix {
            values: self.values.iter().map(|x| 1.0 - x).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_get() {
        let m = ScoreMatrix::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(0, 2), Some(3.0));
        assert_eq!(m.get(1, 1), Some(5.0));
        assert_eq!(m.get(2, 0), None);
        let rows: Vec<&[f64]> = m.rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0, 3.0][..], &[4.0, 5.0, 6.0][..]]);
    }

    #[test]
    fn test_ragged_rows_fail() {
        let m = ScoreMatrix::new(vec![vec![1.0, 2.0], vec![4.0]]);
        assert!(matches!(m, Err(PeakAlignError::DataIntegrity { .. })));
    }

    #[test]
    fn test_empty_dimensions() {
        let m = ScoreMatrix::zeros(3, 0);
        assert_eq!(m.shape(), (3, 0));
        assert_eq!(m.get(0, 0), None);
        let m = ScoreMatrix::new(Vec::<Vec<f64>>::new()).unwrap();
        assert_eq!(m.shape(), (0, 0));
    }

    #[test]
    fn test_complement_and_rows() {
        let mut m = ScoreMatrix::new(vec![vec![0.0, 0.25], vec![0.0, 0.0]]).unwrap();
        for row in m.iter_mut_rows() {
            row[0] = 0.5;
        }
        let c = m.complement();
        assert_eq!(c.get(0, 0), Some(0.5));
        assert_eq!(c.get(0, 1), Some(0.75));
        assert_eq!(c.get(1, 1), Some(1.0));
    }
}
