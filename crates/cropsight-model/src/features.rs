//! Feature vectors consumed by the classifiers.
//!
//! Soil readings produce dense rows, text produces sparse rows. Classifiers
//! are written against [`FeatureRow`] so the same fitted model code serves
//! both.

/// Read access to one row of features.
pub trait FeatureRow {
    /// Number of columns in the row, zeros included.
    fn dimension(&self) -> usize;

    /// Value at `column`, zero when the column is absent or out of range.
    fn value(&self, column: usize) -> f64;

    /// Dot product with a dense weight row of the same dimension.
    fn dot(&self, weights: &[f64]) -> f64;

    /// Squared Euclidean distance to a dense point of the same dimension.
    fn squared_distance(&self, point: &[f64]) -> f64 {
        (0..self.dimension())
            .map(|i| {
                let d = self.value(i) - point.get(i).copied().unwrap_or(0.0);
                d * d
            })
            .sum()
    }
}

impl FeatureRow for [f64] {
    fn dimension(&self) -> usize {
        self.len()
    }

    fn value(&self, column: usize) -> f64 {
        self.get(column).copied().unwrap_or(0.0)
    }

    fn dot(&self, weights: &[f64]) -> f64 {
        self.iter().zip(weights).map(|(x, w)| x * w).sum()
    }

    fn squared_distance(&self, point: &[f64]) -> f64 {
        self.iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Sparse row: sorted column indices with their non-zero values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    dimension: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Build from `(column, value)` pairs. Pairs are sorted, duplicate
    /// columns summed, zeros and out-of-range columns dropped.
    pub fn from_pairs(dimension: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut pairs: Vec<(usize, f64)> = pairs
            .into_iter()
            .filter(|(col, _)| *col < dimension)
            .collect();
        pairs.sort_by_key(|(col, _)| *col);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (col, v) in pairs {
            if indices.last() == Some(&col) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(col);
                values.push(v);
            }
        }

        let mut out = Self {
            dimension,
            indices: Vec::with_capacity(values.len()),
            values: Vec::with_capacity(values.len()),
        };
        for (col, v) in indices.into_iter().zip(values) {
            if v != 0.0 {
                out.indices.push(col);
                out.values.push(v);
            }
        }
        out
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over the stored `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub(crate) fn map_values(&mut self, mut f: impl FnMut(usize, f64) -> f64) {
        for (col, v) in self.indices.iter().zip(self.values.iter_mut()) {
            *v = f(*col, *v);
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }
}

impl FeatureRow for SparseVector {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn value(&self, column: usize) -> f64 {
        match self.indices.binary_search(&column) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    fn dot(&self, weights: &[f64]) -> f64 {
        self.iter()
            .map(|(col, v)| v * weights.get(col).copied().unwrap_or(0.0))
            .sum()
    }

    fn squared_distance(&self, point: &[f64]) -> f64 {
        // |x - p|^2 = |p|^2 + sum over stored columns of (x_i - p_i)^2 - p_i^2
        let base: f64 = point.iter().map(|p| p * p).sum();
        self.iter().fold(base, |acc, (col, v)| {
            let p = point.get(col).copied().unwrap_or(0.0);
            acc + (v - p) * (v - p) - p * p
        })
    }
}
