use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use super::blocks::Block;
use crate::core::types::{CladeId, KitId, VariantId};
use crate::matrix::BinaryMatrix;
use crate::tree::{CladeTree, TreeError};

/// Turns the positive blocks of a sorted matrix into a candidate clade tree.
///
/// Blocks covering the same kit columns become one clade. Clades are created
/// widest first; each hangs below the narrowest clade whose columns enclose its
/// own, or below the root. All roster kits start in the root and are pushed
/// down as clades claim them.
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    min_clade_kits: usize,
}

impl Default for CandidateBuilder {
    fn default() -> Self {
        Self { min_clade_kits: 1 }
    }
}

impl CandidateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore blocks spanning fewer kits than `n`
    #[must_use]
    pub fn with_min_clade_kits(mut self, n: usize) -> Self {
        self.min_clade_kits = n.max(1);
        self
    }

    /// # Errors
    ///
    /// Propagates `TreeError` from tree construction, which only happens if a
    /// block refers to columns outside `sorted`.
    pub fn build(&self, sorted: &BinaryMatrix, blocks: &[Block], roster: &[KitId]) -> Result<CladeTree, TreeError> {
        let mut groups: BTreeMap<(usize, usize), BTreeSet<usize>> = BTreeMap::new();
        for block in blocks
            .iter()
            .filter(|b| b.value == 1 && b.width() >= self.min_clade_kits)
        {
            groups
                .entry((block.col_min, block.col_max))
                .or_default()
                .extend(block.row_min..=block.row_max);
        }

        let mut ordered: Vec<((usize, usize), BTreeSet<usize>)> = groups.into_iter().collect();
        ordered.sort_by_key(|((lo, hi), rows)| {
            (std::cmp::Reverse(hi - lo), *lo, rows.first().copied().unwrap_or(0))
        });

        let mut tree = CladeTree::new();
        let root = tree.root();
        tree.add_kits(root, roster.iter().cloned())?;
        tree.add_kits(root, sorted.cols().iter().cloned())?;

        let mut placed: Vec<((usize, usize), CladeId)> = Vec::new();
        let mut claimed: HashSet<VariantId> = HashSet::new();

        for ((lo, hi), rows) in ordered {
            if let Some(((plo, phi), _)) = placed
                .iter()
                .find(|((plo, phi), _)| *plo <= hi && lo <= *phi && !(*plo <= lo && hi <= *phi))
            {
                warn!(
                    "Skipping block over kit columns {}..={}: overlaps block {}..={}",
                    lo, hi, plo, phi
                );
                continue;
            }

            let variants: BTreeSet<VariantId> = rows
                .iter()
                .map(|&r| sorted.rows()[r])
                .filter(|v| claimed.insert(*v))
                .collect();
            if variants.is_empty() {
                continue;
            }

            let parent = placed
                .iter()
                .filter(|((plo, phi), _)| *plo <= lo && hi <= *phi)
                .min_by_key(|((plo, phi), _)| phi - plo)
                .map_or(root, |&(_, id)| id);

            let kits = sorted.cols()[lo..=hi].iter().cloned();
            let clade = tree.new_clade(kits, variants, None);
            tree.add_child(parent, clade)?;
            placed.push(((lo, hi), clade));
        }

        debug!("Candidate tree: {} clades from {} blocks", tree.len() - 1, blocks.len());
        Ok(tree)
    }
}
