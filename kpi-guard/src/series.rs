//! Per-column numeric series and their summary statistics.

use serde::{Deserialize, Serialize};

/// Ordered numeric values of one metric column, extracted for a single pass.
///
/// Missing or unusable cells are `None` and keep their row position.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    name: String,
    values: Vec<Option<f64>>,
}

impl MetricSeries {
    /// Creates a series for the named column.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the values in row order.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Returns the number of rows, including missing cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(row, value)` for every present value.
    pub fn present(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(row, value)| value.map(|v| (row, v)))
    }

    /// Computes summary statistics over the present values.
    pub fn stats(&self) -> SeriesStats {
        SeriesStats::compute(self.present().map(|(_, v)| v))
    }
}

/// Mean and sample standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Number of present values.
    pub count: usize,
    /// Arithmetic mean, `None` for an empty series.
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator), `None` below two values.
    pub std_dev: Option<f64>,
}

impl SeriesStats {
    /// Computes count, mean and sample standard deviation in two passes.
    pub fn compute<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().collect();
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: None,
                std_dev: None,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            None
        } else {
            let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            Some((sum_sq / (count - 1) as f64).sqrt())
        };

        Self {
            count,
            mean: Some(mean),
            std_dev,
        }
    }
}
