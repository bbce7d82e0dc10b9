use crate::matrix::BinaryMatrix;

/// Reorder rows and columns so nested clades appear as contiguous blocks.
///
/// Rows derived in every column come first. The remaining row with the most
/// derived cells is the pivot: its derived columns (A) move left of the others
/// (B), rows touching A go above rows that do not, and both quadrants are
/// ordered recursively. Ties keep the input order, so sorting an already
/// sorted matrix returns it unchanged.
#[must_use]
pub fn partition4(matrix: &BinaryMatrix) -> BinaryMatrix {
    let rows: Vec<usize> = (0..matrix.n_rows()).collect();
    let cols: Vec<usize> = (0..matrix.n_cols()).collect();
    let (rows, cols) = order(matrix, rows, cols);
    matrix.select(&rows, &cols)
}

fn order(m: &BinaryMatrix, rows: Vec<usize>, cols: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    if rows.len() < 2 || cols.len() < 2 {
        return order_thin(m, rows, cols);
    }

    let (mut out_rows, rest): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| cols.iter().all(|&c| m.get(r, c)));

    let mut pivot = None;
    let mut best = 0;
    for &r in &rest {
        let derived = cols.iter().filter(|&&c| m.get(r, c)).count();
        if derived > best {
            best = derived;
            pivot = Some(r);
        }
    }
    let Some(pivot) = pivot else {
        out_rows.extend(rest);
        return (out_rows, cols);
    };

    let (a, b): (Vec<usize>, Vec<usize>) = cols.into_iter().partition(|&c| m.get(pivot, c));
    let (g1, g2): (Vec<usize>, Vec<usize>) =
        rest.into_iter().partition(|&r| a.iter().any(|&c| m.get(r, c)));

    let (r1, mut c1) = order(m, g1, a);
    let (r2, c2) = order(m, g2, b);
    out_rows.extend(r1);
    out_rows.extend(r2);
    c1.extend(c2);
    (out_rows, c1)
}

/// A single row or column: derived cells first
fn order_thin(m: &BinaryMatrix, rows: Vec<usize>, cols: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    if rows.len() == 1 {
        let r = rows[0];
        let (mut derived, ancestral): (Vec<usize>, Vec<usize>) = cols.into_iter().partition(|&c| m.get(r, c));
        derived.extend(ancestral);
        return (rows, derived);
    }
    if cols.len() == 1 {
        let c = cols[0];
        let (mut derived, ancestral): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&r| m.get(r, c));
        derived.extend(ancestral);
        return (derived, cols);
    }
    (rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{KitId, VariantId};

    fn matrix(values: &[Vec<u8>]) -> BinaryMatrix {
        let n_cols = values.first().map_or(0, Vec::len);
        BinaryMatrix::from_rows(
            (0..values.len()).map(|i| VariantId(i as u32)).collect(),
            (0..n_cols).map(|i| KitId::new(format!("k{i}"))).collect(),
            values,
        )
    }

    #[test]
    fn test_scenario_two_nested_clades() {
        // V1 derived in A and B, V2 in A only; columns A, B, C
        let m = matrix(&[vec![1, 1, 0], vec![1, 0, 0]]);
        let sorted = partition4(&m);
        assert_eq!(sorted.to_bit_rows(), vec!["110", "100"]);
        assert_eq!(sorted.cols(), m.cols());
    }

    #[test]
    fn test_nested_blocks_are_left_aligned() {
        let m = matrix(&[
            vec![0, 1, 0, 1, 0],
            vec![1, 0, 1, 0, 0],
            vec![1, 1, 1, 1, 1],
            vec![0, 0, 0, 1, 0],
            vec![1, 0, 1, 0, 1],
        ]);
        let sorted = partition4(&m);
        assert_eq!(
            sorted.to_bit_rows(),
            vec!["11111", "11100", "11000", "00011", "00010"]
        );
        assert_eq!(sorted.rows()[0], VariantId(2));
        assert_eq!(sorted.rows()[1], VariantId(4));
    }

    #[test]
    fn test_partition_is_idempotent() {
        let m = matrix(&[
            vec![0, 1, 1, 0, 1, 0],
            vec![0, 1, 0, 0, 0, 0],
            vec![1, 0, 0, 1, 0, 0],
            vec![0, 0, 1, 0, 1, 0],
            vec![0, 0, 0, 0, 0, 0],
        ]);
        let once = partition4(&m);
        let twice = partition4(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_all_zero_rows_go_last() {
        let m = matrix(&[vec![0, 0], vec![0, 1], vec![0, 0]]);
        let sorted = partition4(&m);
        assert_eq!(sorted.to_bit_rows(), vec!["10", "00", "00"]);
        assert_eq!(sorted.rows(), &[VariantId(1), VariantId(0), VariantId(2)]);
    }

    #[test]
    fn test_thin_matrices() {
        let row = matrix(&[vec![0, 1, 0, 1]]);
        assert_eq!(partition4(&row).to_bit_rows(), vec!["1100"]);

        let col = matrix(&[vec![0], vec![1], vec![1]]);
        assert_eq!(partition4(&col).to_bit_rows(), vec!["1", "1", "0"]);

        let empty = matrix(&[]);
        assert!(partition4(&empty).is_empty());
    }
}
