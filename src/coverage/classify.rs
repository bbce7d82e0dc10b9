use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::KitId;

/// A sequenced region of one kit.
///
/// BED convention: `min` is zero-based, `max` is exclusive, so the range covers
/// the 1-based positions `min + 1 ..= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageRange {
    pub min: u64,
    pub max: u64,
}

impl CoverageRange {
    /// Create a range, swapping the bounds if they arrive reversed
    #[must_use]
    pub fn new(min: u64, max: u64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.max - self.min
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max == self.min
    }

    /// Whether the 1-based `position` lies inside the range
    #[must_use]
    pub fn contains(&self, position: u64) -> bool {
        self.min < position && position <= self.max
    }
}

/// How a position relates to the covered ranges of a kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageClass {
    NotCovered,
    /// First base of a covered range
    LowerBoundary,
    /// Last base of a covered range (or a span ending exactly there)
    UpperBoundary,
    /// Both boundaries at once: a single-base range or a span filling the range
    SingleBaseRegion,
    /// Strictly inside a covered range
    FullyCovered,
}

impl CoverageClass {
    /// Stable numeric code used in tabular exports
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::NotCovered => 0,
            Self::LowerBoundary => 1,
            Self::UpperBoundary => 2,
            Self::SingleBaseRegion => 3,
            Self::FullyCovered => 4,
        }
    }

    #[must_use]
    pub fn is_covered(self) -> bool {
        !matches!(self, Self::NotCovered)
    }

    #[must_use]
    pub fn is_boundary(self) -> bool {
        matches!(
            self,
            Self::LowerBoundary | Self::UpperBoundary | Self::SingleBaseRegion
        )
    }
}

/// Forward-only classifier over one kit's sorted ranges.
///
/// Each scanner keeps a single pointer into the ranges, so a whole sequence of
/// non-decreasing queries costs O(n + m). Querying a position lower than the
/// previous one is a caller bug and panics.
#[derive(Debug)]
pub struct CoverageScanner<'a> {
    ranges: &'a [CoverageRange],
    cursor: usize,
    last_position: u64,
}

impl<'a> CoverageScanner<'a> {
    /// `ranges` must be sorted ascending by lower bound
    #[must_use]
    pub fn new(ranges: &'a [CoverageRange]) -> Self {
        debug_assert!(
            ranges.windows(2).all(|w| w[0].min <= w[1].min),
            "coverage ranges must be sorted by lower bound"
        );
        Self {
            ranges,
            cursor: 0,
            last_position: 0,
        }
    }

    /// Classify a single-base site at `position`
    pub fn classify(&mut self, position: u64) -> CoverageClass {
        self.classify_span(position, 1)
    }

    /// Classify a site starting at `position` and spanning `span` bases.
    ///
    /// # Panics
    ///
    /// Panics if `position` is lower than the previously queried position.
    pub fn classify_span(&mut self, position: u64, span: u64) -> CoverageClass {
        assert!(
            position >= self.last_position,
            "coverage queried out of order: position {position} after {}",
            self.last_position
        );
        self.last_position = position;

        while self.cursor < self.ranges.len() && self.ranges[self.cursor].max < position {
            self.cursor += 1;
        }

        let Some(range) = self.ranges.get(self.cursor) else {
            return CoverageClass::NotCovered;
        };
        if !range.contains(position) {
            return CoverageClass::NotCovered;
        }

        let end = position + span.max(1) - 1;
        if end > range.max {
            return CoverageClass::NotCovered;
        }

        let lower = position == range.min + 1;
        let upper = end == range.max;
        match (lower, upper) {
            (true, true) => CoverageClass::SingleBaseRegion,
            (true, false) => CoverageClass::LowerBoundary,
            (false, true) => CoverageClass::UpperBoundary,
            (false, false) => CoverageClass::FullyCovered,
        }
    }
}

/// Covered ranges for every kit, sorted on [`finalize`](Self::finalize)
#[derive(Debug, Clone, Default)]
pub struct CoverageIndex {
    ranges: BTreeMap<KitId, Vec<CoverageRange>>,
    sorted: bool,
}

impl CoverageIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
            sorted: true,
        }
    }

    /// Add a range for `kit`; input need not be sorted
    pub fn insert(&mut self, kit: KitId, range: CoverageRange) {
        self.ranges.entry(kit).or_default().push(range);
        self.sorted = false;
    }

    /// Register `kit` even if it has no ranges (known but uncovered everywhere)
    pub fn ensure_kit(&mut self, kit: KitId) {
        self.ranges.entry(kit).or_default();
    }

    /// Sort every kit's ranges and merge those that overlap or touch
    pub fn finalize(&mut self) {
        if self.sorted {
            return;
        }
        for ranges in self.ranges.values_mut() {
            *ranges = reduce(std::mem::take(ranges));
        }
        self.sorted = true;
    }

    /// Sorted ranges for `kit` (empty when the kit has no coverage data)
    ///
    /// # Panics
    ///
    /// Panics if called before [`finalize`](Self::finalize) after an insert.
    #[must_use]
    pub fn ranges(&self, kit: &KitId) -> &[CoverageRange] {
        assert!(self.sorted, "CoverageIndex::finalize must run before queries");
        self.ranges.get(kit).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn scanner(&self, kit: &KitId) -> CoverageScanner<'_> {
        CoverageScanner::new(self.ranges(kit))
    }

    #[must_use]
    pub fn has_kit(&self, kit: &KitId) -> bool {
        self.ranges.contains_key(kit)
    }

    /// Total number of bases covered for `kit`
    #[must_use]
    pub fn covered_bases(&self, kit: &KitId) -> u64 {
        super::gated::total_and_gated_coverage(self.ranges(kit), &[]).0
    }

    pub fn kits(&self) -> impl Iterator<Item = &KitId> {
        self.ranges.keys()
    }
}

/// Sorted, disjoint, non-adjacent ranges covering the same bases
fn reduce(mut ranges: Vec<CoverageRange>) -> Vec<CoverageRange> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_unstable();

    let mut merged: Vec<CoverageRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(current) if range.min <= current.max => current.max = current.max.max(range.max),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges() -> Vec<CoverageRange> {
        vec![
            CoverageRange::new(0, 20),
            CoverageRange::new(30, 40),
            CoverageRange::new(41, 42),
            CoverageRange::new(45, 50),
        ]
    }

    const POSITIONS: [u64; 9] = [1, 1, 5, 30, 35, 40, 42, 47, 52];

    #[test]
    fn test_reference_vector_without_spans() {
        let ranges = ranges();
        let mut scanner = CoverageScanner::new(&ranges);
        let codes: Vec<u8> = POSITIONS
            .iter()
            .map(|&p| scanner.classify(p).code())
            .collect();
        assert_eq!(codes, vec![1, 1, 4, 0, 4, 2, 3, 4, 0]);
    }

    #[test]
    fn test_reference_vector_with_spans() {
        let ranges = ranges();
        let spans = [20, 1, 1, 3, 6, 2, 2, 3, 1];
        let mut scanner = CoverageScanner::new(&ranges);
        let codes: Vec<u8> = POSITIONS
            .iter()
            .zip(spans)
            .map(|(&p, s)| scanner.classify_span(p, s).code())
            .collect();
        assert_eq!(codes, vec![3, 1, 4, 0, 2, 0, 0, 4, 0]);
    }

    #[test]
    fn test_classes_by_name() {
        let ranges = ranges();
        let mut scanner = CoverageScanner::new(&ranges);
        assert_eq!(scanner.classify(1), CoverageClass::LowerBoundary);
        assert_eq!(scanner.classify(10), CoverageClass::FullyCovered);
        assert_eq!(scanner.classify(20), CoverageClass::UpperBoundary);
        assert_eq!(scanner.classify(25), CoverageClass::NotCovered);
        assert_eq!(scanner.classify(42), CoverageClass::SingleBaseRegion);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_decreasing_query_panics() {
        let ranges = ranges();
        let mut scanner = CoverageScanner::new(&ranges);
        scanner.classify(35);
        scanner.classify(5);
    }

    #[test]
    fn test_empty_ranges_never_covered() {
        let mut scanner = CoverageScanner::new(&[]);
        assert_eq!(scanner.classify(1), CoverageClass::NotCovered);
        assert_eq!(scanner.classify(1_000), CoverageClass::NotCovered);
    }

    #[test]
    fn test_index_sorts_unsorted_input() {
        let mut index = CoverageIndex::new();
        let kit = KitId::new("K1");
        index.insert(kit.clone(), CoverageRange::new(45, 50));
        index.insert(kit.clone(), CoverageRange::new(0, 20));
        index.insert(kit.clone(), CoverageRange::new(30, 40));
        index.finalize();

        let sorted: Vec<u64> = index.ranges(&kit).iter().map(|r| r.min).collect();
        assert_eq!(sorted, vec![0, 30, 45]);
        assert_eq!(index.covered_bases(&kit), 35);

        let mut scanner = index.scanner(&kit);
        assert_eq!(scanner.classify(31), CoverageClass::LowerBoundary);
        assert!(index.ranges(&KitId::new("missing")).is_empty());
    }

    #[test]
    fn test_index_merges_overlapping_and_touching_ranges() {
        let mut index = CoverageIndex::new();
        let kit = KitId::new("K1");
        index.insert(kit.clone(), CoverageRange::new(0, 100));
        index.insert(kit.clone(), CoverageRange::new(0, 20));
        index.insert(kit.clone(), CoverageRange::new(100, 200));
        index.insert(kit.clone(), CoverageRange::new(300, 300));
        index.finalize();

        assert_eq!(index.ranges(&kit), &[CoverageRange::new(0, 200)]);
        assert_eq!(index.covered_bases(&kit), 200);

        let mut scanner = index.scanner(&kit);
        assert_eq!(scanner.classify(20), CoverageClass::FullyCovered);
        assert_eq!(scanner.classify_span(95, 10), CoverageClass::FullyCovered);
        assert_eq!(scanner.classify(100), CoverageClass::FullyCovered);
        assert_eq!(scanner.classify(200), CoverageClass::UpperBoundary);
    }

    #[test]
    fn test_reversed_bounds_are_normalized() {
        let range = CoverageRange::new(40, 30);
        assert_eq!(range.min, 30);
        assert_eq!(range.len(), 10);
        assert!(range.contains(31));
        assert!(!range.contains(30));
    }
}
