//! Inference pipeline: calls and coverage in, merged clade tree out.
//!
//! Each stage is a plain method on [`Pipeline`] so it can be run and tested on
//! its own; [`Pipeline::run`] chains them:
//!
//! | Stage            | Input                   | Output                    |
//! |------------------|-------------------------|---------------------------|
//! | `build_matrix`   | [`Dataset`]             | [`CallMatrix`]            |
//! | `select_perfect` | [`CallMatrix`]          | [`BinaryMatrix`]          |
//! | `partition`      | [`BinaryMatrix`]        | sorted [`BinaryMatrix`]   |
//! | `find_blocks`    | sorted matrix           | [`BlockScan`]             |
//! | `candidate_tree` | sorted matrix + blocks  | candidate [`CladeTree`]   |
//! | `absent_variants` | matrix + perfect matrix | ancestral-everywhere set |
//! | `merge_into`     | target + candidate tree | [`MergeReport`]           |
//!
//! Behaviour is controlled by a [`PipelineConfig`], usually read from JSON:
//!
//! ```json
//! { "swap_policy": "strict", "boundary_policy": "unknown", "min_clade_kits": 2 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::call::{KitRoster, RawCall};
use crate::core::types::{KitId, VariantId};
use crate::core::variant::VariantCatalog;
use crate::coverage::CoverageIndex;
use crate::matrix::{
    BinaryMatrix, BoundaryPolicy, CallDiagnostics, CallMatrix, CallMatrixBuilder, ContradictoryCall,
    SwapPolicy,
};
use crate::parsing::LoadStats;
use crate::partition::{get_blocks, partition4, BlockScan, CandidateBuilder, InconsistentBlock};
use crate::tree::{CladeTree, DisjointPolicy, MergeReport, TreeError, TreeMerger, UnmergeableClade};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("min_clade_kits must be at least 1, got {0}")]
    InvalidMinCladeKits(usize),
}

/// Settings for one inference run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Interpretation of calls on reference-swapped sites
    pub swap_policy: SwapPolicy,
    /// Whether range edges confirm ancestral state
    pub boundary_policy: BoundaryPolicy,
    /// Placement of candidate clades sharing nothing with the target tree
    pub disjoint_policy: DisjointPolicy,
    /// Smallest number of kits a block needs to become a clade
    pub min_clade_kits: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            swap_policy: SwapPolicy::default(),
            boundary_policy: BoundaryPolicy::default(),
            disjoint_policy: DisjointPolicy::default(),
            min_clade_kits: 1,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON config; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the JSON is invalid or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMinCladeKits` if `min_clade_kits` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_clade_kits == 0 {
            return Err(ConfigError::InvalidMinCladeKits(self.min_clade_kits));
        }
        Ok(())
    }
}

/// Everything loaded for one run
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub catalog: VariantCatalog,
    pub coverage: CoverageIndex,
    pub calls: Vec<RawCall>,
    /// Kits taking part; empty means every kit with coverage or calls
    pub roster: KitRoster,
    /// Record counts summed over every input
    pub stats: LoadStats,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort coverage; must run once all inputs are loaded
    pub fn finalize(&mut self) {
        self.coverage.finalize();
    }

    /// Matrix columns: the roster, or every kit seen in coverage and calls
    #[must_use]
    pub fn kits(&self) -> Vec<KitId> {
        if !self.roster.is_empty() {
            return self.roster.kits().to_vec();
        }
        let kits: BTreeSet<KitId> = self
            .coverage
            .kits()
            .cloned()
            .chain(self.calls.iter().map(|c| c.kit.clone()))
            .collect();
        kits.into_iter().collect()
    }

    /// Matrix rows: every catalog variant, minus swap companions when calls on
    /// them are folded onto their canonical twin
    #[must_use]
    pub fn variants(&self, swap_policy: SwapPolicy) -> Vec<VariantId> {
        self.catalog
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| swap_policy == SwapPolicy::Disabled || !self.catalog.is_swap_companion(id))
            .collect()
    }
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub records: usize,
    pub malformed_records: usize,
    pub matrix_variants: usize,
    pub matrix_kits: usize,
    pub perfect_variants: usize,
    pub perfect_kits: usize,
    pub swapped_calls: usize,
    pub rejected_calls: usize,
    pub contradictory_calls: Vec<ContradictoryCall>,
    pub inconsistent_blocks: Vec<InconsistentBlock>,
    pub candidate_clades: usize,
    pub placed_clades: usize,
    pub set_aside: Vec<UnmergeableClade>,
}

/// Result of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub matrix: CallMatrix,
    pub candidate: CladeTree,
    pub merge: MergeReport,
    pub report: RunReport,
}

/// Runs the inference stages with one configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Combine calls with coverage for the dataset's kits and variants
    #[must_use]
    pub fn build_matrix(&self, dataset: &Dataset) -> (CallMatrix, CallDiagnostics) {
        let mut builder = CallMatrixBuilder::new(&dataset.catalog)
            .with_swap_policy(self.config.swap_policy)
            .with_boundary_policy(self.config.boundary_policy);
        builder.add_calls(dataset.calls.iter().cloned());

        let kits = dataset.kits();
        let variants = dataset.variants(self.config.swap_policy);
        let matrix = builder.build(&dataset.coverage, &kits, &variants);
        (matrix, builder.into_diagnostics())
    }

    #[must_use]
    pub fn select_perfect(&self, matrix: &CallMatrix) -> BinaryMatrix {
        matrix.perfect_submatrix()
    }

    #[must_use]
    pub fn partition(&self, matrix: &BinaryMatrix) -> BinaryMatrix {
        partition4(matrix)
    }

    #[must_use]
    pub fn find_blocks(&self, sorted: &BinaryMatrix) -> BlockScan {
        get_blocks(sorted)
    }

    /// # Errors
    ///
    /// Propagates `TreeError` from tree construction.
    pub fn candidate_tree(&self, sorted: &BinaryMatrix, scan: &BlockScan, kits: &[KitId]) -> Result<CladeTree, TreeError> {
        CandidateBuilder::new()
            .with_min_clade_kits(self.config.min_clade_kits)
            .build(sorted, &scan.positive, kits)
    }

    /// Variants called ancestral in every kit that made it into `perfect`
    #[must_use]
    pub fn absent_variants(&self, matrix: &CallMatrix, perfect: &BinaryMatrix) -> BTreeSet<VariantId> {
        matrix.ancestral_in(perfect.cols())
    }

    /// Merge `candidate` into `target`; `absent` lists variants none of the
    /// candidate's kits carry, which lets the merger split target clades.
    ///
    /// # Errors
    ///
    /// Returns `TreeError` if the merge would break a tree invariant; `target`
    /// is then unchanged.
    pub fn merge_into(
        &self,
        target: &mut CladeTree,
        candidate: &CladeTree,
        absent: &BTreeSet<VariantId>,
    ) -> Result<MergeReport, TreeError> {
        TreeMerger::new()
            .with_disjoint_policy(self.config.disjoint_policy)
            .with_absent_variants(absent.iter().copied())
            .merge(target, candidate)
    }

    /// Run every stage and merge the result into `target`.
    ///
    /// Pass `CladeTree::new()` to build a tree from scratch.
    ///
    /// # Errors
    ///
    /// Returns `TreeError` from the candidate or merge stages.
    pub fn run(&self, dataset: &Dataset, target: &mut CladeTree) -> Result<RunOutput, TreeError> {
        let (matrix, diagnostics) = self.build_matrix(dataset);
        info!(
            "Call matrix: {} variants x {} kits",
            matrix.n_rows(),
            matrix.n_cols()
        );

        let perfect = self.select_perfect(&matrix);
        let sorted = self.partition(&perfect);
        let scan = self.find_blocks(&sorted);
        debug!(
            "Found {} positive and {} negative blocks",
            scan.positive.len(),
            scan.negative.len()
        );

        let candidate = self.candidate_tree(&sorted, &scan, matrix.kits())?;
        let absent = self.absent_variants(&matrix, &perfect);
        let merge = self.merge_into(target, &candidate, &absent)?;
        info!(
            "Merged {} candidate clades ({} set aside); tree has {} clades",
            candidate.len() - 1,
            merge.set_aside.len(),
            target.len() - 1
        );

        let report = RunReport {
            records: dataset.stats.records,
            malformed_records: dataset.stats.malformed,
            matrix_variants: matrix.n_rows(),
            matrix_kits: matrix.n_cols(),
            perfect_variants: sorted.n_rows(),
            perfect_kits: sorted.n_cols(),
            swapped_calls: diagnostics.swapped_calls,
            rejected_calls: diagnostics.rejected_calls,
            contradictory_calls: diagnostics.contradictory_calls,
            inconsistent_blocks: scan.inconsistent,
            candidate_clades: candidate.len() - 1,
            placed_clades: merge.placements.len().saturating_sub(1),
            set_aside: merge.set_aside.clone(),
        };

        Ok(RunOutput {
            matrix,
            candidate,
            merge,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call::CallState;
    use crate::core::variant::Variant;
    use crate::coverage::CoverageRange;

    /// Kits A, B, C all covered; V1 derived in A and B, V2 derived in A
    fn scenario() -> (Dataset, VariantId, VariantId) {
        let mut dataset = Dataset::new();
        let v1 = dataset.catalog.get_or_insert(Variant::new("hg38", 100, "C", "T").with_name("V1"));
        let v2 = dataset.catalog.get_or_insert(Variant::new("hg38", 200, "G", "A").with_name("V2"));
        for kit in ["A", "B", "C"] {
            dataset.coverage.insert(KitId::new(kit), CoverageRange::new(0, 1_000));
        }
        dataset.calls = vec![
            RawCall::new("A", v1, CallState::Derived),
            RawCall::new("B", v1, CallState::Derived),
            RawCall::new("A", v2, CallState::Derived),
        ];
        dataset.finalize();
        (dataset, v1, v2)
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());

        let config = PipelineConfig::from_json(r#"{"swap_policy": "strict", "min_clade_kits": 2}"#).unwrap();
        assert_eq!(config.swap_policy, SwapPolicy::Strict);
        assert_eq!(config.min_clade_kits, 2);
        assert_eq!(config.boundary_policy, BoundaryPolicy::Covered);
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{"min_clade_kits": 0}"#),
            Err(ConfigError::InvalidMinCladeKits(0))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"swap_policy": "sometimes"}"#),
            Err(ConfigError::ParseError(_))
        ));
        assert!(PipelineConfig::from_json(r#"{"skip_to": 3}"#).is_err());
    }

    #[test]
    fn test_dataset_kits_prefers_roster() {
        let (mut dataset, _, _) = scenario();
        assert_eq!(dataset.kits(), vec![KitId::new("A"), KitId::new("B"), KitId::new("C")]);

        dataset.roster = KitRoster::new([KitId::new("C"), KitId::new("A")]);
        assert_eq!(dataset.kits(), vec![KitId::new("C"), KitId::new("A")]);
    }

    #[test]
    fn test_companions_are_not_rows() {
        let (mut dataset, v1, _) = scenario();
        let companion = dataset.catalog.register_reference_swap(v1).unwrap();
        assert!(!dataset.variants(SwapPolicy::CompanionOnly).contains(&companion));
        assert!(dataset.variants(SwapPolicy::Disabled).contains(&companion));
    }

    #[test]
    fn test_run_scenario_from_scratch() {
        let (dataset, v1, v2) = scenario();
        let mut tree = CladeTree::new();
        let output = Pipeline::default().run(&dataset, &mut tree).unwrap();

        let root = tree.root();
        let children = tree.children(root);
        assert_eq!(children.len(), 1);
        let c1 = children[0];
        assert_eq!(tree.get(c1).unwrap().variants, BTreeSet::from([v1]));
        let c2 = tree.children(c1)[0];
        assert_eq!(tree.get(c2).unwrap().variants, BTreeSet::from([v2]));

        assert_eq!(tree.kit_owner(&KitId::new("A")), Some(c2));
        assert_eq!(tree.kit_owner(&KitId::new("B")), Some(c1));
        assert_eq!(tree.kit_owner(&KitId::new("C")), Some(root));

        assert_eq!(output.report.matrix_variants, 2);
        assert_eq!(output.report.matrix_kits, 3);
        assert_eq!(output.report.candidate_clades, 2);
        assert!(output.report.set_aside.is_empty());
        assert!(output.report.inconsistent_blocks.is_empty());
    }

    #[test]
    fn test_rerun_is_stable() {
        let (dataset, _, _) = scenario();
        let pipeline = Pipeline::default();
        let mut tree = CladeTree::new();
        pipeline.run(&dataset, &mut tree).unwrap();
        let before = tree.paths();

        pipeline.run(&dataset, &mut tree).unwrap();
        assert_eq!(tree.paths(), before);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_later_batch_splits_collapsed_clade_in_order() {
        let (mut dataset, v1, v2) = scenario();
        let pipeline = Pipeline::default();
        let mut tree = CladeTree::new();

        // A alone cannot tell V1 from V2
        dataset.roster = KitRoster::new([KitId::new("A")]);
        pipeline.run(&dataset, &mut tree).unwrap();
        assert_eq!(tree.len(), 2);

        dataset.roster = KitRoster::new([KitId::new("A"), KitId::new("B")]);
        let output = pipeline.run(&dataset, &mut tree).unwrap();
        assert!(output.report.set_aside.is_empty());

        let c1 = tree.variant_owner(v1).unwrap();
        let c2 = tree.variant_owner(v2).unwrap();
        assert_eq!(tree.parent(c1), Some(tree.root()));
        assert_eq!(tree.parent(c2), Some(c1));
        assert_eq!(tree.kit_owner(&KitId::new("A")), Some(c2));
        assert_eq!(tree.kit_owner(&KitId::new("B")), Some(c1));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_min_clade_kits_filters_private_clades() {
        let (dataset, v1, _) = scenario();
        let config = PipelineConfig {
            min_clade_kits: 2,
            ..PipelineConfig::default()
        };
        let mut tree = CladeTree::new();
        Pipeline::new(config).run(&dataset, &mut tree).unwrap();

        assert_eq!(tree.len(), 2);
        let c1 = tree.children(tree.root())[0];
        assert_eq!(tree.get(c1).unwrap().variants, BTreeSet::from([v1]));
        assert_eq!(tree.kit_owner(&KitId::new("A")), Some(c1));
    }

    #[test]
    fn test_uncovered_kit_drops_out_of_perfect_matrix() {
        let (mut dataset, _, _) = scenario();
        dataset.calls.push(RawCall::new("D", VariantId(0), CallState::Derived));
        let pipeline = Pipeline::default();

        let (matrix, _) = pipeline.build_matrix(&dataset);
        assert_eq!(matrix.n_cols(), 4);
        let perfect = pipeline.select_perfect(&matrix);
        assert!(!perfect.cols().contains(&KitId::new("D")));
    }

    #[test]
    fn test_contradictions_reported() {
        let (mut dataset, v1, _) = scenario();
        dataset.calls.push(RawCall::new("B", v1, CallState::Ancestral));
        let mut tree = CladeTree::new();
        let output = Pipeline::default().run(&dataset, &mut tree).unwrap();
        assert_eq!(output.report.contradictory_calls.len(), 1);
        assert_eq!(output.report.contradictory_calls[0].kit, KitId::new("B"));
    }
}
