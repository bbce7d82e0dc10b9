use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::core::call::{CallState, RawCall};
use crate::core::types::{KitId, VariantId};
use crate::core::variant::VariantCatalog;
use crate::coverage::{CoverageClass, CoverageIndex};
use crate::matrix::binary::BinaryMatrix;

/// State of one kit x variant cell after combining calls with coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    SolidDerived,
    SolidAncestral,
    Unknown,
    Ambiguous,
}

impl CellState {
    #[must_use]
    pub fn is_solid(self) -> bool {
        matches!(self, Self::SolidDerived | Self::SolidAncestral)
    }

    /// One-character annotation used by the tabular export
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::SolidDerived => '+',
            Self::SolidAncestral => '-',
            Self::Unknown => '?',
            Self::Ambiguous => '*',
        }
    }
}

/// How calls on reference-swapped sites are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPolicy {
    /// Calls on the companion are inverted onto the canonical id; calls that
    /// arrive on the canonical id are taken as they are
    #[default]
    CompanionOnly,
    /// As `CompanionOnly`, but calls on the canonical id of a swapped pair are
    /// rejected because the caller is expected to always use the companion
    Strict,
    /// No substitution at all
    Disabled,
}

/// Whether range edges count as confirmed coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Any covered class implies ancestral when no call was recorded
    #[default]
    Covered,
    /// Boundary classes are treated like missing coverage
    Unknown,
}

/// Two differing calls for the same kit and variant; the later one was kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContradictoryCall {
    pub kit: KitId,
    pub variant: VariantId,
    pub previous: CallState,
    pub kept: CallState,
}

/// Diagnostics gathered while collecting calls
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallDiagnostics {
    pub contradictory_calls: Vec<ContradictoryCall>,
    /// Calls refused by the swap policy
    pub rejected_calls: usize,
    /// Calls whose variant was substituted by its canonical twin
    pub swapped_calls: usize,
}

/// Collects raw calls and turns them into a [`CallMatrix`]
#[derive(Debug)]
pub struct CallMatrixBuilder<'a> {
    catalog: &'a VariantCatalog,
    swap_policy: SwapPolicy,
    boundary_policy: BoundaryPolicy,
    calls: HashMap<KitId, HashMap<VariantId, CallState>>,
    diagnostics: CallDiagnostics,
}

impl<'a> CallMatrixBuilder<'a> {
    #[must_use]
    pub fn new(catalog: &'a VariantCatalog) -> Self {
        Self {
            catalog,
            swap_policy: SwapPolicy::default(),
            boundary_policy: BoundaryPolicy::default(),
            calls: HashMap::new(),
            diagnostics: CallDiagnostics::default(),
        }
    }

    #[must_use]
    pub fn with_swap_policy(mut self, policy: SwapPolicy) -> Self {
        self.swap_policy = policy;
        self
    }

    #[must_use]
    pub fn with_boundary_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.boundary_policy = policy;
        self
    }

    /// Record one call, resolving reference swaps first.
    ///
    /// A later call for the same kit and variant replaces an earlier one; if
    /// the two disagree the conflict is kept in the diagnostics.
    pub fn add_call(&mut self, call: RawCall) {
        let RawCall {
            kit,
            variant,
            state,
        } = call;

        let (variant, state) = match self.swap_policy {
            SwapPolicy::Disabled => (variant, state),
            policy => {
                if let Some(canonical) = self.catalog.swap_canonical(variant) {
                    self.diagnostics.swapped_calls += 1;
                    (canonical, state.inverted())
                } else if policy == SwapPolicy::Strict && self.catalog.is_swap_canonical(variant) {
                    warn!(
                        "Rejecting call for kit {} on canonical id {} of a reference-swapped site",
                        kit, variant
                    );
                    self.diagnostics.rejected_calls += 1;
                    return;
                } else {
                    (variant, state)
                }
            }
        };

        let previous = self.calls.entry(kit.clone()).or_default().insert(variant, state);
        if let Some(previous) = previous {
            if previous != state {
                warn!(
                    "Contradictory calls for kit {} at {}: {:?} replaced by {:?}",
                    kit, variant, previous, state
                );
                self.diagnostics.contradictory_calls.push(ContradictoryCall {
                    kit,
                    variant,
                    previous,
                    kept: state,
                });
            }
        }
    }

    pub fn add_calls(&mut self, calls: impl IntoIterator<Item = RawCall>) {
        for call in calls {
            self.add_call(call);
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &CallDiagnostics {
        &self.diagnostics
    }

    /// Build the matrix for the selected kits (columns) and variants (rows).
    ///
    /// Each kit is scanned once over the variants in position order, so the
    /// coverage lookups stay linear.
    #[must_use]
    pub fn build(&self, coverage: &CoverageIndex, kits: &[KitId], variants: &[VariantId]) -> CallMatrix {
        let n_rows = variants.len();
        let n_cols = kits.len();
        let mut cells = vec![CellState::Unknown; n_rows * n_cols];
        let mut classes = vec![CoverageClass::NotCovered; n_rows * n_cols];
        let mut called = vec![false; n_rows * n_cols];

        let mut scan_order: Vec<(u64, u64, usize)> = variants
            .iter()
            .enumerate()
            .filter_map(|(row, &id)| self.catalog.get(id).map(|v| (v.position, v.span(), row)))
            .collect();
        scan_order.sort_unstable();

        let empty = HashMap::new();
        for (col, kit) in kits.iter().enumerate() {
            let kit_calls = self.calls.get(kit).unwrap_or(&empty);
            let mut scanner = coverage.scanner(kit);

            for &(position, span, row) in &scan_order {
                let class = scanner.classify_span(position, span);
                let call = kit_calls.get(&variants[row]);
                let cell = match call {
                    Some(CallState::Derived) => CellState::SolidDerived,
                    Some(CallState::Ancestral) => CellState::SolidAncestral,
                    Some(CallState::Ambiguous) => CellState::Ambiguous,
                    Some(CallState::Unknown) => CellState::Unknown,
                    None => self.infer_from_coverage(class),
                };
                cells[row * n_cols + col] = cell;
                classes[row * n_cols + col] = class;
                called[row * n_cols + col] = call.is_some();
            }
        }

        debug!("Built call matrix: {} variants x {} kits", n_rows, n_cols);

        CallMatrix {
            kits: kits.to_vec(),
            variants: variants.to_vec(),
            cells,
            classes,
            called,
        }
    }

    /// Finish collecting and hand back the diagnostics
    #[must_use]
    pub fn into_diagnostics(self) -> CallDiagnostics {
        self.diagnostics
    }

    fn infer_from_coverage(&self, class: CoverageClass) -> CellState {
        match (class, self.boundary_policy) {
            (CoverageClass::NotCovered, _) => CellState::Unknown,
            (c, BoundaryPolicy::Unknown) if c.is_boundary() => CellState::Unknown,
            _ => CellState::SolidAncestral,
        }
    }
}

/// Kit x variant matrix of [`CellState`]s; rows are variants, columns are kits
#[derive(Debug, Clone)]
pub struct CallMatrix {
    kits: Vec<KitId>,
    variants: Vec<VariantId>,
    cells: Vec<CellState>,
    classes: Vec<CoverageClass>,
    called: Vec<bool>,
}

impl CallMatrix {
    #[must_use]
    pub fn kits(&self) -> &[KitId] {
        &self.kits
    }

    #[must_use]
    pub fn variants(&self) -> &[VariantId] {
        &self.variants
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.kits.len()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[row * self.n_cols() + col]
    }

    /// Coverage class observed for the cell, whether or not a call decided it
    #[must_use]
    pub fn coverage_class(&self, row: usize, col: usize) -> CoverageClass {
        self.classes[row * self.n_cols() + col]
    }

    /// Whether the cell was decided by coverage rather than a recorded call
    #[must_use]
    pub fn is_inferred(&self, row: usize, col: usize) -> bool {
        !self.called[row * self.n_cols() + col]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[CellState] {
        let n = self.n_cols();
        &self.cells[row * n..(row + 1) * n]
    }

    #[must_use]
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    /// Variants whose cells are solid ancestral for every one of `kits`
    #[must_use]
    pub fn ancestral_in(&self, kits: &[KitId]) -> BTreeSet<VariantId> {
        let wanted: BTreeSet<&KitId> = kits.iter().collect();
        let cols: Vec<usize> = (0..self.n_cols()).filter(|&c| wanted.contains(&self.kits[c])).collect();
        (0..self.n_rows())
            .filter(|&r| cols.iter().all(|&c| self.get(r, c) == CellState::SolidAncestral))
            .map(|r| self.variants[r])
            .collect()
    }

    /// Largest fully solid sub-matrix, as derived (true) / ancestral (false).
    ///
    /// Greedily drops whichever variant or kit has the highest fraction of
    /// unknown or ambiguous cells until none remain (variants lose ties), then
    /// drops variants derived in no remaining kit.
    #[must_use]
    pub fn perfect_submatrix(&self) -> BinaryMatrix {
        let n_rows = self.n_rows();
        let n_cols = self.n_cols();
        let mut row_alive = vec![true; n_rows];
        let mut col_alive = vec![true; n_cols];
        let mut row_bad = vec![0_usize; n_rows];
        let mut col_bad = vec![0_usize; n_cols];

        for row in 0..n_rows {
            for col in 0..n_cols {
                if !self.get(row, col).is_solid() {
                    row_bad[row] += 1;
                    col_bad[col] += 1;
                }
            }
        }

        let mut alive_rows = n_rows;
        let mut alive_cols = n_cols;
        loop {
            let worst_row = (0..n_rows)
                .filter(|&r| row_alive[r] && row_bad[r] > 0)
                .max_by_key(|&r| (row_bad[r], std::cmp::Reverse(r)));
            let worst_col = (0..n_cols)
                .filter(|&c| col_alive[c] && col_bad[c] > 0)
                .max_by_key(|&c| (col_bad[c], std::cmp::Reverse(c)));

            // Compare bad fractions bad_row / alive_cols vs bad_col / alive_rows
            let drop_row = match (worst_row, worst_col) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(r), Some(c)) => row_bad[r] * alive_rows >= col_bad[c] * alive_cols,
            };

            if drop_row {
                let Some(r) = worst_row else { break };
                row_alive[r] = false;
                alive_rows -= 1;
                for c in (0..n_cols).filter(|&c| col_alive[c]) {
                    if !self.get(r, c).is_solid() {
                        col_bad[c] -= 1;
                    }
                }
            } else {
                let Some(c) = worst_col else { break };
                col_alive[c] = false;
                alive_cols -= 1;
                for r in (0..n_rows).filter(|&r| row_alive[r]) {
                    if !self.get(r, c).is_solid() {
                        row_bad[r] -= 1;
                    }
                }
            }
        }

        let cols: Vec<usize> = (0..n_cols).filter(|&c| col_alive[c]).collect();
        let rows: Vec<usize> = (0..n_rows)
            .filter(|&r| row_alive[r])
            .filter(|&r| cols.iter().any(|&c| self.get(r, c) == CellState::SolidDerived))
            .collect();

        debug!(
            "Perfect sub-matrix: {} of {} variants, {} of {} kits",
            rows.len(),
            n_rows,
            cols.len(),
            n_cols
        );

        let data = rows
            .iter()
            .flat_map(|&r| cols.iter().map(move |&c| (r, c)))
            .map(|(r, c)| self.get(r, c) == CellState::SolidDerived)
            .collect();

        BinaryMatrix::new(
            rows.iter().map(|&r| self.variants[r]).collect(),
            cols.iter().map(|&c| self.kits[c].clone()).collect(),
            data,
        )
    }
}
