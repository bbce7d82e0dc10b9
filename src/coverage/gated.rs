use crate::coverage::classify::CoverageRange;

/// Compute the raw covered length of `ranges_a` and its overlap with `ranges_b`.
///
/// Returns `(total, gated)` where `total` is the sum of the lengths of
/// `ranges_a` and `gated` is the number of bases covered by both lists.
///
/// Both lists are swept once after sorting their endpoints together, so the
/// cost is O((n + m) log(n + m)) rather than the O(n * m) pairwise check.
/// Overlapping ranges within one list are tracked with a depth counter, so a
/// base covered twice by `ranges_a` counts once toward `gated`.
#[must_use]
pub fn total_and_gated_coverage(ranges_a: &[CoverageRange], ranges_b: &[CoverageRange]) -> (u64, u64) {
    let total = ranges_a.iter().map(CoverageRange::len).sum();

    // (coordinate, delta, source); closing edges sort before opening ones at
    // the same coordinate so abutting ranges never double-count
    let mut edges: Vec<(u64, i8, usize)> = Vec::with_capacity(2 * (ranges_a.len() + ranges_b.len()));
    for range in ranges_a.iter().filter(|r| !r.is_empty()) {
        edges.push((range.min, 1, 0));
        edges.push((range.max, -1, 0));
    }
    for range in ranges_b.iter().filter(|r| !r.is_empty()) {
        edges.push((range.min, 1, 1));
        edges.push((range.max, -1, 1));
    }
    edges.sort_unstable();

    let mut depth = [0_i64; 2];
    let mut gated = 0;
    let mut previous = 0;
    for (coordinate, delta, source) in edges {
        if depth[0] > 0 && depth[1] > 0 {
            gated += coordinate - previous;
        }
        depth[source] += i64::from(delta);
        previous = coordinate;
    }

    (total, gated)
}
