use serde::Serialize;
use tracing::warn;

use crate::core::types::{KitId, VariantId};
use crate::matrix::BinaryMatrix;

/// Rectangle of uniform value in a sorted matrix (bounds inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    /// 1 for derived, 0 for ancestral
    pub value: u8,
    pub col_min: usize,
    pub col_max: usize,
    pub row_min: usize,
    pub row_max: usize,
}

impl Block {
    #[must_use]
    pub fn width(&self) -> usize {
        self.col_max - self.col_min + 1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.row_max - self.row_min + 1
    }

    #[must_use]
    pub fn cells(&self) -> usize {
        self.width() * self.height()
    }

    #[must_use]
    pub fn same_columns(&self, other: &Block) -> bool {
        self.col_min == other.col_min && self.col_max == other.col_max
    }

    /// Column range strictly wider than and enclosing `other`'s
    #[must_use]
    pub fn strictly_contains(&self, other: &Block) -> bool {
        self.col_min <= other.col_min && other.col_max <= self.col_max && !self.same_columns(other)
    }

    #[must_use]
    pub fn kits<'a>(&self, matrix: &'a BinaryMatrix) -> &'a [KitId] {
        &matrix.cols()[self.col_min..=self.col_max]
    }

    #[must_use]
    pub fn variants<'a>(&self, matrix: &'a BinaryMatrix) -> &'a [VariantId] {
        &matrix.rows()[self.row_min..=self.row_max]
    }

    fn covers(&self, value: u8, col_min: usize, col_max: usize, row: usize) -> bool {
        self.value == value
            && self.col_min == col_min
            && self.col_max == col_max
            && (self.row_min..=self.row_max).contains(&row)
    }
}

/// A block whose re-summed cells disagree with its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconsistentBlock {
    pub block: Block,
    pub expected: usize,
    pub observed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockScan {
    pub positive: Vec<Block>,
    pub negative: Vec<Block>,
    pub inconsistent: Vec<InconsistentBlock>,
}

/// Find candidate clade blocks in a matrix sorted by [`partition4`](super::partition4).
///
/// For each row, the leading run of ancestral cells and the first run of
/// derived cells after it each start a block, which grows downward while the
/// next row keeps the same value at the block's inner edge column. Rows
/// already inside a block with the same columns do not start a new one.
/// Every block is re-summed afterwards; mismatches are kept but reported.
#[must_use]
pub fn get_blocks(matrix: &BinaryMatrix) -> BlockScan {
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    let mut scan = BlockScan::default();

    for row in 0..n_rows {
        let first_one = (0..n_cols).find(|&c| matrix.get(row, c));

        // Leading ancestral run
        let zero_end = first_one.unwrap_or(n_cols);
        if zero_end > 0 {
            let edge = zero_end - 1;
            if !scan.negative.iter().any(|b| b.covers(0, 0, edge, row)) {
                let row_max = extend_down(matrix, row, edge, false);
                scan.negative.push(Block {
                    value: 0,
                    col_min: 0,
                    col_max: edge,
                    row_min: row,
                    row_max,
                });
            }
        }

        // First derived run
        if let Some(start) = first_one {
            let end = (start..n_cols)
                .find(|&c| !matrix.get(row, c))
                .map_or(n_cols - 1, |c| c - 1);
            if !scan.positive.iter().any(|b| b.covers(1, start, end, row)) {
                let row_max = extend_down(matrix, row, end, true);
                scan.positive.push(Block {
                    value: 1,
                    col_min: start,
                    col_max: end,
                    row_min: row,
                    row_max,
                });
            }
        }
    }

    for block in scan.positive.iter().chain(&scan.negative) {
        let expected = block.cells();
        let observed = (block.row_min..=block.row_max)
            .flat_map(|r| (block.col_min..=block.col_max).map(move |c| (r, c)))
            .filter(|&(r, c)| matrix.value(r, c) == block.value)
            .count();
        if observed != expected {
            warn!(
                "Inconsistent block: value {} rows {}..={} cols {}..={} ({} of {} cells match)",
                block.value, block.row_min, block.row_max, block.col_min, block.col_max, observed, expected
            );
            scan.inconsistent.push(InconsistentBlock {
                block: *block,
                expected,
                observed,
            });
        }
    }

    scan
}

/// Last row of the run starting at `row` whose cell at `col` equals `value`
fn extend_down(matrix: &BinaryMatrix, row: usize, col: usize, value: bool) -> usize {
    let mut last = row;
    while last + 1 < matrix.n_rows() && matrix.get(last + 1, col) == value {
        last += 1;
    }
    last
}
