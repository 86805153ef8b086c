//! Dense CFADS scenario matrix

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// `n_simulations x n_periods` CFADS values, row-major
///
/// Every row is one simulated path with a value for every period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMatrix {
    n_periods: usize,
    values: Vec<f64>,
}

impl ScenarioMatrix {
    /// Build from per-path rows; rows must be non-empty, equal length and finite
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ShapeError> {
        let first = rows.first().ok_or(ShapeError::Empty)?;
        let n_periods = first.as_ref().len();
        if n_periods == 0 {
            return Err(ShapeError::Empty);
        }

        let mut values = Vec::with_capacity(rows.len() * n_periods);
        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_periods {
                return Err(ShapeError::RaggedRow {
                    row: row_idx,
                    expected: n_periods,
                    actual: row.len(),
                });
            }
            if let Some(idx) = row.iter().position(|v| !v.is_finite()) {
                return Err(ShapeError::NonFinite {
                    row: row_idx,
                    period: idx + 1,
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self { n_periods, values })
    }

    /// Build from a flat row-major buffer
    pub fn from_flat(values: Vec<f64>, n_periods: usize) -> Result<Self, ShapeError> {
        if values.is_empty() || n_periods == 0 {
            return Err(ShapeError::Empty);
        }
        if values.len() % n_periods != 0 {
            return Err(ShapeError::RaggedRow {
                row: values.len() / n_periods,
                expected: n_periods,
                actual: values.len() % n_periods,
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ShapeError::NonFinite {
                row: idx / n_periods,
                period: idx % n_periods + 1,
            });
        }
        Ok(Self { n_periods, values })
    }

    /// Same path repeated `n_simulations` times
    pub fn repeated(path: &[f64], n_simulations: usize) -> Result<Self, ShapeError> {
        let rows = vec![path; n_simulations];
        Self::from_rows(&rows)
    }

    pub fn n_simulations(&self) -> usize {
        self.values.len() / self.n_periods
    }

    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// CFADS path for one simulation
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.n_periods;
        &self.values[start..start + self.n_periods]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.n_periods)
    }

    /// Mean CFADS per period across simulations
    pub fn period_means(&self) -> Vec<f64> {
        let n = self.n_simulations() as f64;
        let mut means = vec![0.0; self.n_periods];
        for row in self.rows() {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);
        means
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_round_trip() {
        let m = ScenarioMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.n_simulations(), 2);
        assert_eq!(m.n_periods(), 3);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.rows().count(), 2);
        assert_eq!(m.period_means(), vec![2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = ScenarioMatrix::from_rows(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_rejected() {
        let rows: Vec<Vec<f64>> = Vec::new();
        assert_eq!(ScenarioMatrix::from_rows(&rows), Err(ShapeError::Empty));
        assert_eq!(ScenarioMatrix::from_flat(vec![], 3), Err(ShapeError::Empty));
    }

    #[test]
    fn test_non_finite_located() {
        let err = ScenarioMatrix::from_flat(vec![1.0, 2.0, 3.0, f64::INFINITY], 2).unwrap_err();
        assert_eq!(err, ShapeError::NonFinite { row: 1, period: 2 });
    }

    #[test]
    fn test_repeated() {
        let m = ScenarioMatrix::repeated(&[1.0, 2.0], 3).unwrap();
        assert_eq!(m.n_simulations(), 3);
        assert_eq!(m.row(2), &[1.0, 2.0]);
    }
}
