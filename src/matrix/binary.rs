use crate::core::types::{KitId, VariantId};

/// Fully solid kit x variant matrix: `true` = derived, `false` = ancestral.
///
/// Rows are variants and columns are kits, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMatrix {
    rows: Vec<VariantId>,
    cols: Vec<KitId>,
    data: Vec<bool>,
}

impl BinaryMatrix {
    /// # Panics
    ///
    /// Panics if `data` does not hold exactly `rows.len() * cols.len()` cells.
    #[must_use]
    pub fn new(rows: Vec<VariantId>, cols: Vec<KitId>, data: Vec<bool>) -> Self {
        assert_eq!(
            data.len(),
            rows.len() * cols.len(),
            "matrix data does not match its dimensions"
        );
        Self { rows, cols, data }
    }

    /// Build from 0/1 rows; convenient for fixtures and exports
    ///
    /// # Panics
    ///
    /// Panics if any row length differs from `cols.len()`.
    #[must_use]
    pub fn from_rows(rows: Vec<VariantId>, cols: Vec<KitId>, values: &[Vec<u8>]) -> Self {
        assert!(values.iter().all(|r| r.len() == cols.len()));
        let data = values.iter().flatten().map(|&v| v != 0).collect();
        Self::new(rows, cols, data)
    }

    #[must_use]
    pub fn rows(&self) -> &[VariantId] {
        &self.rows
    }

    #[must_use]
    pub fn cols(&self) -> &[KitId] {
        &self.cols
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols.len() + col]
    }

    /// Cell as 0/1
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> u8 {
        u8::from(self.get(row, col))
    }

    /// Copy of the matrix restricted to (and ordered by) the given indices
    #[must_use]
    pub fn select(&self, row_idx: &[usize], col_idx: &[usize]) -> Self {
        let data = row_idx
            .iter()
            .flat_map(|&r| col_idx.iter().map(move |&c| (r, c)))
            .map(|(r, c)| self.get(r, c))
            .collect();
        Self {
            rows: row_idx.iter().map(|&r| self.rows[r]).collect(),
            cols: col_idx.iter().map(|&c| self.cols[c].clone()).collect(),
            data,
        }
    }

    /// Render as lines of 0/1, one per row
    #[must_use]
    pub fn to_bit_rows(&self) -> Vec<String> {
        (0..self.n_rows())
            .map(|r| {
                (0..self.n_cols())
                    .map(|c| if self.get(r, c) { '1' } else { '0' })
                    .collect()
            })
            .collect()
    }
}
