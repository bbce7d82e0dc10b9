//! Randomized checks of the coverage, partition and merge invariants.

use std::collections::BTreeSet;

use clade_solver::coverage::{total_and_gated_coverage, CoverageClass, CoverageRange, CoverageScanner};
use clade_solver::matrix::BinaryMatrix;
use clade_solver::partition::{get_blocks, partition4, CandidateBuilder};
use clade_solver::{
    CallState, CladeTree, Dataset, KitId, KitRoster, Pipeline, RawCall, TreeMerger, Variant, VariantCatalog,
    VariantId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SPACE: u64 = 2_000;

fn random_ranges(rng: &mut StdRng, max_len: usize) -> Vec<CoverageRange> {
    let n = rng.random_range(0..=max_len);
    (0..n)
        .map(|_| {
            let min = rng.random_range(0..SPACE - 100);
            let len = rng.random_range(0..100);
            CoverageRange::new(min, min + len)
        })
        .collect()
}

fn covered_bases(ranges: &[CoverageRange]) -> Vec<bool> {
    let mut covered = vec![false; SPACE as usize];
    for range in ranges {
        for base in range.min..range.max {
            covered[base as usize] = true;
        }
    }
    covered
}

#[test]
fn test_gated_coverage_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..60 {
        let a = random_ranges(&mut rng, 200);
        let b = random_ranges(&mut rng, 200);

        let total: u64 = a.iter().map(|r| r.max - r.min).sum();
        let in_a = covered_bases(&a);
        let in_b = covered_bases(&b);
        let gated = in_a.iter().zip(&in_b).filter(|(x, y)| **x && **y).count() as u64;

        assert_eq!(total_and_gated_coverage(&a, &b), (total, gated), "a={a:?} b={b:?}");
    }
}

#[test]
fn test_scanner_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        // disjoint sorted ranges, possibly abutting
        let mut ranges = Vec::new();
        let mut next = rng.random_range(0..20);
        while next < SPACE - 50 && ranges.len() < 200 {
            let len = rng.random_range(1..30);
            ranges.push(CoverageRange::new(next, next + len));
            next += len + rng.random_range(0..20);
        }

        let mut positions: Vec<u64> = (0..100).map(|_| rng.random_range(1..SPACE)).collect();
        positions.sort_unstable();

        let mut scanner = CoverageScanner::new(&ranges);
        for p in positions {
            let expected = match ranges.iter().find(|r| r.min < p && p <= r.max) {
                None => CoverageClass::NotCovered,
                Some(r) => match (p == r.min + 1, p == r.max) {
                    (true, true) => CoverageClass::SingleBaseRegion,
                    (true, false) => CoverageClass::LowerBoundary,
                    (false, true) => CoverageClass::UpperBoundary,
                    (false, false) => CoverageClass::FullyCovered,
                },
            };
            assert_eq!(scanner.classify(p), expected, "position {p} in {ranges:?}");
        }
    }
}

#[test]
fn test_partition_is_idempotent_on_random_matrices() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
        let n_rows = rng.random_range(0..12);
        let n_cols = rng.random_range(0..12);
        let values: Vec<Vec<u8>> = (0..n_rows)
            .map(|_| (0..n_cols).map(|_| u8::from(rng.random_bool(0.4))).collect())
            .collect();
        let m = BinaryMatrix::from_rows(
            (0..n_rows).map(|i| VariantId(i as u32)).collect(),
            (0..n_cols).map(|i| KitId::new(format!("k{i}"))).collect(),
            &values,
        );

        let sorted = partition4(&m);
        let again = partition4(&sorted);
        assert_eq!(again, sorted);
        assert_eq!(get_blocks(&again).positive, get_blocks(&sorted).positive);
    }
}

#[test]
fn test_three_kit_scenario() {
    let kits: Vec<KitId> = ["A", "B", "C"].into_iter().map(KitId::new).collect();
    let (v1, v2) = (VariantId(0), VariantId(1));
    let m = BinaryMatrix::from_rows(vec![v1, v2], kits.clone(), &[vec![1, 1, 0], vec![1, 0, 0]]);

    let sorted = partition4(&m);
    let scan = get_blocks(&sorted);
    let blocks: Vec<(BTreeSet<KitId>, Vec<VariantId>)> = scan
        .positive
        .iter()
        .map(|b| (b.kits(&sorted).iter().cloned().collect(), b.variants(&sorted).to_vec()))
        .collect();
    assert!(blocks.contains(&(BTreeSet::from([KitId::new("A"), KitId::new("B")]), vec![v1])));
    assert!(blocks.contains(&(BTreeSet::from([KitId::new("A")]), vec![v2])));

    let tree = CandidateBuilder::new().build(&sorted, &scan.positive, &kits).unwrap();
    let outer = tree.variant_owner(v1).unwrap();
    let inner = tree.variant_owner(v2).unwrap();
    assert_eq!(tree.parent(outer), Some(tree.root()));
    assert_eq!(tree.parent(inner), Some(outer));
}

/// A random phylogeny: each clade lists its own variants; kits sit in clades
struct Truth {
    catalog: VariantCatalog,
    kit_variants: Vec<(KitId, BTreeSet<VariantId>)>,
}

fn random_truth(rng: &mut StdRng) -> Truth {
    let n_clades = rng.random_range(4..14);
    let mut catalog = VariantCatalog::new();
    let mut parents = vec![0_usize];
    let mut own: Vec<Vec<VariantId>> = vec![Vec::new()];
    let mut position = 100;
    for i in 1..n_clades {
        parents.push(rng.random_range(0..i));
        let n_variants = rng.random_range(1..=3);
        own.push(
            (0..n_variants)
                .map(|_| {
                    position += 10;
                    catalog.get_or_insert(Variant::new("hg38", position, "C", "T"))
                })
                .collect(),
        );
    }

    let kit_variants = (0..30)
        .map(|k| {
            let mut clade = rng.random_range(0..n_clades);
            let mut variants = BTreeSet::new();
            while clade != 0 {
                variants.extend(own[clade].iter().copied());
                clade = parents[clade];
            }
            (KitId::new(format!("kit{k:02}")), variants)
        })
        .collect();

    Truth { catalog, kit_variants }
}

fn batch_dataset(truth: &Truth, rng: &mut StdRng) -> Dataset {
    let mut dataset = Dataset::new();
    dataset.catalog = truth.catalog.clone();
    let mut roster = Vec::new();
    for (kit, variants) in &truth.kit_variants {
        if !rng.random_bool(0.4) {
            continue;
        }
        roster.push(kit.clone());
        dataset.coverage.insert(kit.clone(), CoverageRange::new(0, 1_000_000));
        dataset
            .calls
            .extend(variants.iter().map(|&v| RawCall::new(kit.clone(), v, CallState::Derived)));
    }
    dataset.roster = KitRoster::new(roster);
    dataset.finalize();
    dataset
}

/// Kits that carry `variant` in the generating phylogeny
fn carriers(truth: &Truth, variant: VariantId) -> BTreeSet<&KitId> {
    truth
        .kit_variants
        .iter()
        .filter(|(_, variants)| variants.contains(&variant))
        .map(|(kit, _)| kit)
        .collect()
}

/// No two siblings share a variant and no clade repeats an ancestor's variant
fn assert_disjoint_lineages(tree: &CladeTree, seed: u64) {
    for clade in tree.iter() {
        let inherited: BTreeSet<VariantId> = tree
            .ancestors(clade.id)
            .into_iter()
            .filter_map(|a| tree.get(a))
            .flat_map(|a| a.variants.iter().copied())
            .collect();
        assert!(clade.variants.is_disjoint(&inherited), "seed {seed}");
        for sibling in tree.parent(clade.id).map(|p| tree.children(p)).unwrap_or_default() {
            if sibling != clade.id {
                let other = &tree.get(sibling).unwrap().variants;
                assert!(clade.variants.is_disjoint(other), "seed {seed}");
            }
        }
    }
}

/// Every placement in `tree` agrees with the phylogeny that generated the calls
fn assert_ancestry_matches_truth(tree: &CladeTree, truth: &Truth, seed: u64) {
    let truth_kits: std::collections::BTreeMap<&KitId, &BTreeSet<VariantId>> =
        truth.kit_variants.iter().map(|(k, v)| (k, v)).collect();

    for clade in tree.iter() {
        // variants collapsed into one clade lie on a single lineage
        for &a in &clade.variants {
            for &b in &clade.variants {
                let (ka, kb) = (carriers(truth, a), carriers(truth, b));
                assert!(ka.is_subset(&kb) || kb.is_subset(&ka), "seed {seed}: {a} and {b} in {}", clade.id);
            }
        }

        // a variant placed above another is carried by every kit carrying the lower one
        for ancestor in tree.ancestors(clade.id) {
            for &upper in &tree.get(ancestor).unwrap().variants {
                let upper_kits = carriers(truth, upper);
                for &lower in &clade.variants {
                    assert!(
                        carriers(truth, lower).is_subset(&upper_kits),
                        "seed {seed}: {upper} placed above {lower}"
                    );
                }
            }
        }

        // a kit carries every variant on its path from the root
        let mut path: BTreeSet<VariantId> = clade.variants.clone();
        for ancestor in tree.ancestors(clade.id) {
            path.extend(tree.get(ancestor).unwrap().variants.iter().copied());
        }
        for kit in &clade.kits {
            let carried = truth_kits[kit];
            assert!(path.is_subset(carried), "seed {seed}: kit {kit} in {}", clade.id);
        }
    }
}

#[test]
fn test_random_merges_preserve_invariants() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let truth = random_truth(&mut rng);
        let pipeline = Pipeline::default();
        let mut tree = CladeTree::new();

        for _ in 0..5 {
            let dataset = batch_dataset(&truth, &mut rng);
            if dataset.roster.is_empty() {
                continue;
            }
            pipeline.run(&dataset, &mut tree).unwrap();
            tree.check_invariants().unwrap();
            assert_disjoint_lineages(&tree, seed);
        }

        // merging the result into a copy of itself changes nothing
        let copy = tree.clone();
        let before = tree.paths();
        let kits_before: Vec<_> = tree.iter().map(|c| (c.id, c.kits.clone(), c.variants.clone())).collect();
        TreeMerger::new().merge(&mut tree, &copy).unwrap();
        assert_eq!(tree.paths(), before, "seed {seed}");
        let kits_after: Vec<_> = tree.iter().map(|c| (c.id, c.kits.clone(), c.variants.clone())).collect();
        assert_eq!(kits_after, kits_before, "seed {seed}");
    }
}

#[test]
fn test_batches_keep_ancestor_order_of_generating_tree() {
    for seed in 100..130 {
        let mut rng = StdRng::seed_from_u64(seed);
        let truth = random_truth(&mut rng);
        let pipeline = Pipeline::default();
        let mut tree = CladeTree::new();

        for _ in 0..6 {
            let dataset = batch_dataset(&truth, &mut rng);
            if dataset.roster.is_empty() {
                continue;
            }
            pipeline.run(&dataset, &mut tree).unwrap();
            tree.check_invariants().unwrap();
            assert_ancestry_matches_truth(&tree, &truth, seed);
        }
    }
}

/// Calls for one batch with no-calls, ambiguous calls and partial coverage mixed in
fn noisy_batch_dataset(truth: &Truth, rng: &mut StdRng) -> Dataset {
    let mut dataset = Dataset::new();
    dataset.catalog = truth.catalog.clone();
    let n_variants = truth.catalog.len() as u32;
    let mut roster = Vec::new();
    for (kit, variants) in &truth.kit_variants {
        if !rng.random_bool(0.5) {
            continue;
        }
        roster.push(kit.clone());
        let max = if rng.random_bool(0.3) { rng.random_range(100..600) } else { 1_000_000 };
        dataset.coverage.insert(kit.clone(), CoverageRange::new(0, max));

        for &v in variants {
            let state = match rng.random_range(0..20) {
                0 | 1 => CallState::Unknown,
                2 => CallState::Ambiguous,
                _ => CallState::Derived,
            };
            dataset.calls.push(RawCall::new(kit.clone(), v, state));
        }
        if n_variants > 0 && rng.random_bool(0.2) {
            let v = VariantId(rng.random_range(0..n_variants));
            dataset.calls.push(RawCall::new(kit.clone(), v, CallState::Ambiguous));
        }
    }
    dataset.roster = KitRoster::new(roster);
    dataset.finalize();
    dataset
}

#[test]
fn test_noisy_batches_preserve_invariants() {
    for seed in 200..225 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut truth = random_truth(&mut rng);

        // recurrent variants: arisen again in kits outside their own lineage
        let n_variants = truth.catalog.len() as u32;
        for _ in 0..2 {
            let v = VariantId(rng.random_range(0..n_variants));
            for (_, variants) in truth.kit_variants.iter_mut() {
                if rng.random_bool(0.15) {
                    variants.insert(v);
                }
            }
        }

        let pipeline = Pipeline::default();
        let mut tree = CladeTree::new();
        for _ in 0..5 {
            let dataset = noisy_batch_dataset(&truth, &mut rng);
            if dataset.roster.is_empty() {
                continue;
            }
            pipeline.run(&dataset, &mut tree).unwrap();
            tree.check_invariants().unwrap();
            assert_disjoint_lineages(&tree, seed);
        }
    }
}
