use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::clade_tree::{CladeTree, TreeError};
use crate::core::types::{CladeId, KitId, VariantId};

/// What to do with a candidate clade that shares no variant with the target tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisjointPolicy {
    /// Create a new clade under the common parent of its placed children (root if none)
    #[default]
    AttachToRoot,
    /// Report the clade without touching the tree
    SetAside,
}

/// How a candidate clade related to the clade it was merged into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeCase {
    /// The candidate root; only contributes kits
    Root,
    /// Same variant set as the target clade
    Identical,
    /// Carries every target variant plus new ones
    Superset,
    /// Carries part of the target's variants; the target was split
    Subset,
    /// Both sides carry variants the other lacks; the target was split
    PartialOverlap,
    /// Shares no variant with any target clade
    Disjoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub candidate: CladeId,
    pub target: CladeId,
    pub case: MergeCase,
}

/// A candidate clade that could not be merged
#[derive(Debug, Clone, Serialize)]
pub struct UnmergeableClade {
    pub candidate: CladeId,
    pub name: Option<String>,
    pub variants: Vec<VariantId>,
    pub kits: Vec<KitId>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub placements: Vec<Placement>,
    pub set_aside: Vec<UnmergeableClade>,
}

impl MergeReport {
    #[must_use]
    pub fn count(&self, case: MergeCase) -> usize {
        self.placements.iter().filter(|p| p.case == case).count()
    }
}

enum Outcome {
    Placed { target: CladeId, case: MergeCase },
    SetAside(String),
}

/// Merges a candidate tree into an existing tree without breaking its invariants.
///
/// Candidate clades are visited children-first. Each one is matched against the
/// deepest target clade sharing one of its variants:
///
/// | Overlap with target | Action                                                  |
/// |---------------------|---------------------------------------------------------|
/// | identical           | reuse the target                                        |
/// | superset            | add a child carrying the new variants                   |
/// | subset              | split the target around the shared variants             |
/// | partial             | split, then add a child carrying the new variants       |
/// | none                | new clade (see [`DisjointPolicy`])                      |
///
/// A split orders the target's leftover variants by the candidate's own
/// lineage: leftovers carried by the candidate clade's ancestors stay above the
/// shared variants, the others move below them together with the target's kits
/// and children. A leftover below the shared variants must be known to be
/// absent from the candidate clade: it appears elsewhere in the candidate tree,
/// or it is listed in [`with_absent_variants`](Self::with_absent_variants).
/// Without that list every leftover outside the lineage counts as absent.
///
/// Variants already carried by an ancestor of the target count as shared. A
/// clade whose new variants already belong elsewhere in the tree, or whose
/// variants are split across sibling clades, is set aside and reported.
///
/// The merge runs against a copy and is committed only if the result passes
/// [`CladeTree::check_invariants`].
#[derive(Debug, Clone, Default)]
pub struct TreeMerger {
    disjoint_policy: DisjointPolicy,
    absent: Option<BTreeSet<VariantId>>,
}

/// A candidate clade on its way into the target
struct Incoming<'a> {
    name: Option<&'a str>,
    variants: &'a BTreeSet<VariantId>,
    kits: &'a BTreeSet<KitId>,
    /// Variants of the clade's candidate ancestors
    lineage: BTreeSet<VariantId>,
    /// Target clades holding the already merged candidate children
    children: Vec<CladeId>,
}

impl TreeMerger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_disjoint_policy(mut self, policy: DisjointPolicy) -> Self {
        self.disjoint_policy = policy;
        self
    }

    /// Variants confirmed ancestral in every kit of the candidate tree
    #[must_use]
    pub fn with_absent_variants(mut self, variants: impl IntoIterator<Item = VariantId>) -> Self {
        self.absent = Some(variants.into_iter().collect());
        self
    }

    /// Merge every clade of `candidate` into `target`.
    ///
    /// # Errors
    ///
    /// Returns a `TreeError` if the merged tree would violate an invariant; in
    /// that case `target` is left untouched.
    pub fn merge(&self, target: &mut CladeTree, candidate: &CladeTree) -> Result<MergeReport, TreeError> {
        let mut work = target.clone();
        let mut report = MergeReport::default();
        let mut placed: HashMap<CladeId, CladeId> = HashMap::new();

        // leftovers the candidate is known not to carry at a given clade
        let known = self.absent.as_ref().map(|absent| {
            let mut known = absent.clone();
            known.extend(candidate.iter().flat_map(|c| c.variants.iter().copied()));
            known
        });

        for node in candidate.post_order() {
            let Some(clade) = candidate.get(node) else {
                continue;
            };

            let outcome = if node == candidate.root() {
                let root = work.root();
                Self::place_kits(&mut work, &clade.kits, root)?;
                Outcome::Placed { target: root, case: MergeCase::Root }
            } else {
                let incoming = Incoming {
                    name: clade.name.as_deref(),
                    variants: &clade.variants,
                    kits: &clade.kits,
                    lineage: candidate
                        .ancestors(node)
                        .into_iter()
                        .filter_map(|a| candidate.get(a))
                        .flat_map(|a| a.variants.iter().copied())
                        .collect(),
                    children: candidate
                        .children(node)
                        .iter()
                        .filter_map(|c| placed.get(c).copied())
                        .collect(),
                };
                self.merge_node(&mut work, &incoming, known.as_ref())?
            };

            match outcome {
                Outcome::Placed { target, case } => {
                    debug!("Merged {} into {} ({:?})", node, target, case);
                    placed.insert(node, target);
                    report.placements.push(Placement { candidate: node, target, case });
                }
                Outcome::SetAside(reason) => {
                    warn!("Setting aside clade {}: {}", node, reason);
                    report.set_aside.push(UnmergeableClade {
                        candidate: node,
                        name: clade.name.clone(),
                        variants: clade.variants.iter().copied().collect(),
                        kits: clade.kits.iter().cloned().collect(),
                        reason,
                    });
                }
            }
        }

        work.check_invariants()?;
        *target = work;
        Ok(report)
    }

    /// Merge a single clade (given by its kits and variants) into `target`
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merge_clade(
        &self,
        target: &mut CladeTree,
        kits: impl IntoIterator<Item = KitId>,
        variants: impl IntoIterator<Item = VariantId>,
        name: Option<String>,
    ) -> Result<MergeReport, TreeError> {
        let mut candidate = CladeTree::new();
        let clade = candidate.new_clade(kits, variants, name);
        candidate.add_child(candidate.root(), clade)?;
        self.merge(target, &candidate)
    }

    fn merge_node(
        &self,
        work: &mut CladeTree,
        node: &Incoming<'_>,
        known: Option<&BTreeSet<VariantId>>,
    ) -> Result<Outcome, TreeError> {
        let variants = node.variants;
        let root = work.root();
        let mut sharing: Vec<(u32, CladeId)> = work
            .iter()
            .filter(|c| c.id != root && !c.variants.is_disjoint(variants))
            .map(|c| (work.depth(c.id), c.id))
            .collect();
        sharing.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let Some(&(deepest, target)) = sharing.first() else {
            return self.merge_disjoint(work, node);
        };
        if sharing.iter().skip(1).any(|&(depth, _)| depth == deepest) {
            return Ok(Outcome::SetAside("variants are split across sibling clades".to_string()));
        }

        let target_variants = work.get(target).ok_or(TreeError::UnknownClade(target))?.variants.clone();
        let shared: BTreeSet<VariantId> = variants.intersection(&target_variants).copied().collect();
        let outside: BTreeSet<VariantId> = variants.difference(&shared).copied().collect();
        let (above, below): (BTreeSet<VariantId>, BTreeSet<VariantId>) = target_variants
            .difference(&shared)
            .copied()
            .partition(|v| node.lineage.contains(v));
        let inherited: BTreeSet<VariantId> = work
            .ancestors(target)
            .into_iter()
            .filter_map(|a| work.get(a))
            .flat_map(|c| c.variants.iter().copied())
            .collect();
        let extra: BTreeSet<VariantId> = outside.difference(&inherited).copied().collect();

        if let Some(v) = extra.iter().find(|&&v| work.variant_owner(v).is_some()) {
            return Ok(Outcome::SetAside(format!(
                "variant {} already belongs to clade {}",
                v,
                work.variant_owner(*v).map_or_else(String::new, |c| c.to_string())
            )));
        }
        if let Some(v) = known.and_then(|known| below.iter().find(|&v| !known.contains(v))) {
            return Ok(Outcome::SetAside(format!(
                "clade {target} carries variant {v}, which was not called in the candidate kits"
            )));
        }

        let case = match (above.is_empty() && below.is_empty(), outside.is_empty()) {
            (true, true) => MergeCase::Identical,
            (true, false) => MergeCase::Superset,
            (false, true) => MergeCase::Subset,
            (false, false) => MergeCase::PartialOverlap,
        };
        let new_child = !extra.is_empty();

        // Check every re-parenting before mutating anything
        let mut moves = Vec::new();
        for &x in &node.children {
            if x == target || work.is_ancestor(x, target) {
                return Ok(Outcome::SetAside(format!("child {x} is placed above the matching clade")));
            }
            if work.is_ancestor(target, x) {
                if !below.is_empty() {
                    return Ok(Outcome::SetAside(format!(
                        "child {x} sits below variants the clade does not carry"
                    )));
                }
                if !new_child {
                    continue;
                }
                if work.parent(x) != Some(target) {
                    return Ok(Outcome::SetAside(format!(
                        "child {x} sits below variants the clade does not carry"
                    )));
                }
                moves.push(x);
                continue;
            }
            let Some(parent) = work.parent(x) else {
                continue;
            };
            if work.is_ancestor(parent, target) {
                moves.push(x);
            } else {
                return Ok(Outcome::SetAside(format!("child {x} is placed on another branch")));
            }
        }

        // `anchor` ends up holding exactly the shared variants
        let anchor = if above.is_empty() {
            target
        } else {
            let moving: BTreeSet<VariantId> = target_variants.difference(&above).copied().collect();
            Self::split(work, target, moving)?
        };
        if !below.is_empty() {
            Self::split(work, anchor, below)?;
        }

        let placement = if new_child {
            let clade = work.new_clade([], extra, node.name.map(str::to_string));
            work.add_child(anchor, clade)?;
            clade
        } else {
            anchor
        };

        if let Some(name) = node.name {
            if work.get(placement).is_some_and(|c| c.name.is_none()) {
                work.set_name(placement, name)?;
            }
        }

        for x in moves {
            work.add_child(placement, x)?;
        }
        Self::place_kits(work, node.kits, placement)?;

        work.merge_child_clades(target)?;
        if anchor != target {
            work.merge_child_clades(anchor)?;
        }
        if placement != anchor {
            work.merge_child_clades(placement)?;
        }

        Ok(Outcome::Placed { target: placement, case })
    }

    fn merge_disjoint(&self, work: &mut CladeTree, node: &Incoming<'_>) -> Result<Outcome, TreeError> {
        if self.disjoint_policy == DisjointPolicy::SetAside {
            return Ok(Outcome::SetAside("no clade shares its variants".to_string()));
        }

        let parents: BTreeSet<CladeId> = node.children.iter().filter_map(|&x| work.parent(x)).collect();
        let anchor = match parents.len() {
            0 => work.root(),
            1 => parents.into_iter().next().unwrap_or_else(|| work.root()),
            _ => {
                return Ok(Outcome::SetAside(
                    "children are placed under different clades".to_string(),
                ))
            }
        };

        let clade = work.new_clade([], node.variants.iter().copied(), node.name.map(str::to_string));
        work.add_child(anchor, clade)?;
        for &x in &node.children {
            work.add_child(clade, x)?;
        }
        Self::place_kits(work, node.kits, clade)?;
        work.merge_child_clades(anchor)?;

        Ok(Outcome::Placed { target: clade, case: MergeCase::Disjoint })
    }

    /// Move `moving` (with the target's kits and children) into a new clade below `target`
    fn split(work: &mut CladeTree, target: CladeId, moving: BTreeSet<VariantId>) -> Result<CladeId, TreeError> {
        let kits = work.get(target).map(|c| c.kits.clone()).unwrap_or_default();
        let children = work.children(target);
        let lower = work.new_clade(kits, moving, None);

        // attaching pushes the duplicated kits and variants down out of `target`
        match children.split_first() {
            Some((&first, rest)) => {
                work.insert_between(lower, target, first)?;
                for &child in rest {
                    work.add_child(lower, child)?;
                }
            }
            None => work.add_child(target, lower)?,
        }
        Ok(lower)
    }

    /// Place kits in `clade` unless they already sit deeper in its subtree
    fn place_kits(work: &mut CladeTree, kits: &BTreeSet<KitId>, clade: CladeId) -> Result<(), TreeError> {
        for kit in kits {
            match work.kit_owner(kit) {
                Some(owner) if owner == clade || work.is_ancestor(clade, owner) => {}
                _ => work.place_kit(kit.clone(), clade)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kits(names: &[&str]) -> Vec<KitId> {
        names.iter().map(|&n| KitId::new(n)).collect()
    }

    fn vars(ids: &[u32]) -> Vec<VariantId> {
        ids.iter().map(|&i| VariantId(i)).collect()
    }

    fn set(ids: &[u32]) -> BTreeSet<VariantId> {
        vars(ids).into_iter().collect()
    }

    /// Top -> {1}[B] -> {2}[A]
    fn two_level() -> (CladeTree, CladeId, CladeId) {
        let mut tree = CladeTree::new();
        let outer = tree.new_clade(kits(&["B"]), vars(&[1]), None);
        let inner = tree.new_clade(kits(&["A"]), vars(&[2]), None);
        tree.add_child(tree.root(), outer).unwrap();
        tree.add_child(outer, inner).unwrap();
        tree.add_kits(tree.root(), kits(&["C"])).unwrap();
        (tree, outer, inner)
    }

    #[test]
    fn test_merge_into_empty_tree_rebuilds_structure() {
        let (candidate, _, _) = two_level();
        let mut target = CladeTree::new();
        let report = TreeMerger::new().merge(&mut target, &candidate).unwrap();

        assert_eq!(report.count(MergeCase::Disjoint), 2);
        assert!(report.set_aside.is_empty());
        let outer = target.variant_owner(VariantId(1)).unwrap();
        let inner = target.variant_owner(VariantId(2)).unwrap();
        assert_eq!(target.parent(outer), Some(target.root()));
        assert_eq!(target.parent(inner), Some(outer));
        assert_eq!(target.kit_owner(&KitId::new("A")), Some(inner));
        assert_eq!(target.kit_owner(&KitId::new("B")), Some(outer));
        assert_eq!(target.kit_owner(&KitId::new("C")), Some(target.root()));
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_identity() {
        let (mut target, _, _) = two_level();
        let copy = target.clone();
        let report = TreeMerger::new().merge(&mut target, &copy).unwrap();

        assert_eq!(report.count(MergeCase::Identical), 2);
        assert_eq!(target.paths(), copy.paths());
        assert_eq!(target.iter().collect::<Vec<_>>(), copy.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_identical_clade_adds_kits() {
        let (mut target, outer, _) = two_level();
        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["D"]), vars(&[1]), None)
            .unwrap();
        assert_eq!(report.count(MergeCase::Identical), 1);
        assert_eq!(target.kit_owner(&KitId::new("D")), Some(outer));
    }

    #[test]
    fn test_kit_already_deeper_keeps_its_place() {
        let (mut target, _, inner) = two_level();
        TreeMerger::new()
            .merge_clade(&mut target, kits(&["A"]), vars(&[1]), None)
            .unwrap();
        assert_eq!(target.kit_owner(&KitId::new("A")), Some(inner));
    }

    #[test]
    fn test_superset_adds_child() {
        let (mut target, _, inner) = two_level();
        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["E"]), vars(&[2, 3]), Some("new".into()))
            .unwrap();

        assert_eq!(report.count(MergeCase::Superset), 1);
        let added = target.variant_owner(VariantId(3)).unwrap();
        assert_eq!(target.parent(added), Some(inner));
        assert_eq!(target.get(added).unwrap().name.as_deref(), Some("new"));
        assert_eq!(target.kit_owner(&KitId::new("E")), Some(added));
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_ancestor_variants_count_as_shared() {
        let (mut target, _, inner) = two_level();
        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["F"]), vars(&[1, 2]), None)
            .unwrap();
        assert_eq!(report.count(MergeCase::Superset), 1);
        assert_eq!(target.kit_owner(&KitId::new("F")), Some(inner));
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn test_subset_splits_target() {
        let mut target = CladeTree::new();
        let clade = target.new_clade(kits(&["A", "B"]), vars(&[1, 2]), None);
        let child = target.new_clade(kits(&["X"]), vars(&[9]), None);
        target.add_child(target.root(), clade).unwrap();
        target.add_child(clade, child).unwrap();

        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["C"]), vars(&[1]), None)
            .unwrap();
        assert_eq!(report.count(MergeCase::Subset), 1);

        assert_eq!(target.get(clade).unwrap().variants, set(&[1]));
        let lower = target.variant_owner(VariantId(2)).unwrap();
        assert_eq!(target.parent(lower), Some(clade));
        assert_eq!(target.parent(child), Some(lower));
        assert_eq!(target.get(lower).unwrap().kits, kits(&["A", "B"]).into_iter().collect());
        assert_eq!(target.get(clade).unwrap().kits, kits(&["C"]).into_iter().collect());
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_partial_overlap_splits_and_adds() {
        let mut target = CladeTree::new();
        let clade = target.new_clade(kits(&["A"]), vars(&[1, 2]), None);
        target.add_child(target.root(), clade).unwrap();

        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["C"]), vars(&[1, 3]), None)
            .unwrap();
        assert_eq!(report.count(MergeCase::PartialOverlap), 1);

        let lower = target.variant_owner(VariantId(2)).unwrap();
        let added = target.variant_owner(VariantId(3)).unwrap();
        assert_eq!(target.parent(lower), Some(clade));
        assert_eq!(target.parent(added), Some(clade));
        assert_eq!(target.kit_owner(&KitId::new("A")), Some(lower));
        assert_eq!(target.kit_owner(&KitId::new("C")), Some(added));
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_conflicting_variant_is_set_aside() {
        let mut target = CladeTree::new();
        let left = target.new_clade([], vars(&[1]), None);
        let right = target.new_clade([], vars(&[2]), None);
        target.add_child(target.root(), left).unwrap();
        target.add_child(target.root(), right).unwrap();
        let before = target.paths();

        let report = TreeMerger::new()
            .merge_clade(&mut target, kits(&["Z"]), vars(&[1, 2]), None)
            .unwrap();
        assert_eq!(report.set_aside.len(), 1);
        assert_eq!(report.set_aside[0].kits, kits(&["Z"]));
        assert_eq!(target.paths(), before);
        assert_eq!(target.kit_owner(&KitId::new("Z")), None);
    }

    #[test]
    fn test_disjoint_policy_set_aside() {
        let mut target = CladeTree::new();
        let report = TreeMerger::new()
            .with_disjoint_policy(DisjointPolicy::SetAside)
            .merge_clade(&mut target, kits(&["A"]), vars(&[5]), None)
            .unwrap();
        assert_eq!(report.set_aside.len(), 1);
        assert_eq!(target.len(), 1);
    }

    /// Top -> {1}[B] -> {2}[C] -> {3}[D]
    fn three_level() -> CladeTree {
        let mut tree = CladeTree::new();
        let a = tree.new_clade(kits(&["B"]), vars(&[1]), None);
        let b = tree.new_clade(kits(&["C"]), vars(&[2]), None);
        let c = tree.new_clade(kits(&["D"]), vars(&[3]), None);
        tree.add_child(tree.root(), a).unwrap();
        tree.add_child(a, b).unwrap();
        tree.add_child(b, c).unwrap();
        tree
    }

    #[test]
    fn test_split_keeps_candidate_ancestors_above() {
        // the target has not yet seen a kit separating variants 1 and 2
        let mut target = CladeTree::new();
        let collapsed = target.new_clade(kits(&["A"]), vars(&[1, 2]), None);
        target.add_child(target.root(), collapsed).unwrap();

        let report = TreeMerger::new().merge(&mut target, &three_level()).unwrap();
        assert!(report.set_aside.is_empty());
        assert_eq!(report.count(MergeCase::Subset), 1);

        let v1 = target.variant_owner(VariantId(1)).unwrap();
        let v2 = target.variant_owner(VariantId(2)).unwrap();
        let v3 = target.variant_owner(VariantId(3)).unwrap();
        assert_eq!(v1, collapsed);
        assert_eq!(target.parent(v1), Some(target.root()));
        assert_eq!(target.parent(v2), Some(v1));
        assert_eq!(target.parent(v3), Some(v2));
        assert_eq!(target.kit_owner(&KitId::new("A")), Some(v2));
        assert_eq!(target.kit_owner(&KitId::new("B")), Some(v1));
        assert_eq!(target.kit_owner(&KitId::new("C")), Some(v2));
        assert_eq!(target.kit_owner(&KitId::new("D")), Some(v3));
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_split_three_ways() {
        let mut target = CladeTree::new();
        let collapsed = target.new_clade(kits(&["A"]), vars(&[1, 2, 3]), None);
        target.add_child(target.root(), collapsed).unwrap();

        // Top -> {1} -> {2}[B]; variant 3 lies below 2
        let mut candidate = CladeTree::new();
        let outer = candidate.new_clade([], vars(&[1]), None);
        let inner = candidate.new_clade(kits(&["B"]), vars(&[2]), None);
        candidate.add_child(candidate.root(), outer).unwrap();
        candidate.add_child(outer, inner).unwrap();

        TreeMerger::new().merge(&mut target, &candidate).unwrap();
        let v1 = target.variant_owner(VariantId(1)).unwrap();
        let v2 = target.variant_owner(VariantId(2)).unwrap();
        let v3 = target.variant_owner(VariantId(3)).unwrap();
        assert_eq!(target.parent(v2), Some(v1));
        assert_eq!(target.parent(v3), Some(v2));
        assert_eq!(target.get(v1).unwrap().variants, set(&[1]));
        assert_eq!(target.kit_owner(&KitId::new("A")), Some(v3));
        assert_eq!(target.kit_owner(&KitId::new("B")), Some(v2));
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_uncalled_leftover_sets_clade_aside() {
        let build = || {
            let mut target = CladeTree::new();
            let clade = target.new_clade(kits(&["A"]), vars(&[1, 2]), None);
            target.add_child(target.root(), clade).unwrap();
            target
        };

        // nothing says whether kit B carries variant 2
        let mut target = build();
        let before = target.paths();
        let report = TreeMerger::new()
            .with_absent_variants([])
            .merge_clade(&mut target, kits(&["B"]), vars(&[1]), None)
            .unwrap();
        assert_eq!(report.set_aside.len(), 1);
        assert_eq!(target.paths(), before);

        // confirmed ancestral: 2 moves below 1
        let mut target = build();
        let report = TreeMerger::new()
            .with_absent_variants(vars(&[2]))
            .merge_clade(&mut target, kits(&["B"]), vars(&[1]), None)
            .unwrap();
        assert!(report.set_aside.is_empty());
        let v1 = target.variant_owner(VariantId(1)).unwrap();
        let v2 = target.variant_owner(VariantId(2)).unwrap();
        assert_eq!(target.parent(v2), Some(v1));
        assert_eq!(target.kit_owner(&KitId::new("B")), Some(v1));
    }

    #[test]
    fn test_child_moves_under_new_parent() {
        // target: Top -> {2}; candidate: Top -> {1} -> {2}
        let mut target = CladeTree::new();
        let v2 = target.new_clade(kits(&["A"]), vars(&[2]), None);
        target.add_child(target.root(), v2).unwrap();

        let (candidate, _, _) = two_level();
        TreeMerger::new().merge(&mut target, &candidate).unwrap();

        let v1 = target.variant_owner(VariantId(1)).unwrap();
        assert_eq!(target.parent(v2), Some(v1));
        assert_eq!(target.parent(v1), Some(target.root()));
        target.check_invariants().unwrap();
    }
}
