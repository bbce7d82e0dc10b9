use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::types::{next_dense_id, CladeId, KitId, VariantId};

/// Name given to the root clade
pub const ROOT_NAME: &str = "Top";

/// Arena size a snapshot may use without renumbering, however few clades it holds
const MIN_SPARSE_ARENA: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Unknown clade: {0}")]
    UnknownClade(CladeId),

    #[error("Clade {0} still has children")]
    HasChildren(CladeId),

    #[error("The root clade cannot be deleted or re-parented")]
    RootImmutable,

    #[error("Clade {child} is not a direct child of {parent}")]
    NotAChild { parent: CladeId, child: CladeId },

    #[error("Attaching {child} under {parent} would create a cycle")]
    Cycle { parent: CladeId, child: CladeId },

    #[error("Clade {0} is already part of the tree")]
    AlreadyAttached(CladeId),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),
}

/// A node of the clade tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clade {
    pub id: CladeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Variants attributed to this clade and not to any ancestor
    pub variants: BTreeSet<VariantId>,

    /// Kits placed directly in this clade
    pub kits: BTreeSet<KitId>,
}

/// One closure-table row: `descendant` lies `depth` edges below `ancestor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TreePath {
    pub ancestor: CladeId,
    pub descendant: CladeId,
    pub depth: u32,
}

/// Clade tree stored as an arena plus a closure table.
///
/// Every (ancestor, descendant, depth) pair is indexed in both directions, so
/// ancestor, descendant and child queries are lookups rather than traversals.
/// Each live clade has a depth-0 path to itself. Deleted clades leave a hole in
/// the arena so ids stay stable.
#[derive(Debug, Clone)]
pub struct CladeTree {
    clades: Vec<Option<Clade>>,

    /// Index: ancestor -> (descendant -> depth)
    down: Vec<BTreeMap<CladeId, u32>>,

    /// Index: descendant -> (ancestor -> depth)
    up: Vec<BTreeMap<CladeId, u32>>,

    root: CladeId,
}

/// Move clade ids onto `0..n` in their current order, rewriting `paths` and `root` to match
fn renumber(root: CladeId, clades: &mut [Clade], paths: &[TreePath]) -> Result<(CladeId, Vec<TreePath>), TreeError> {
    clades.sort_by_key(|c| c.id);
    let mut ids = BTreeMap::new();
    for (index, clade) in clades.iter_mut().enumerate() {
        let id = CladeId(next_dense_id(index));
        if ids.insert(clade.id, id).is_some() {
            return Err(TreeError::SchemaViolation(format!("duplicate clade id {}", clade.id)));
        }
        clade.id = id;
    }

    let lookup = |id: CladeId| {
        ids.get(&id)
            .copied()
            .ok_or_else(|| TreeError::SchemaViolation(format!("reference to missing clade {id}")))
    };
    let paths = paths
        .iter()
        .map(|p| {
            Ok(TreePath {
                ancestor: lookup(p.ancestor)?,
                descendant: lookup(p.descendant)?,
                depth: p.depth,
            })
        })
        .collect::<Result<Vec<_>, TreeError>>()?;
    Ok((lookup(root)?, paths))
}

impl Default for CladeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CladeTree {
    /// Create a tree holding only the root ("Top") clade
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Self {
            clades: Vec::new(),
            down: Vec::new(),
            up: Vec::new(),
            root: CladeId(0),
        };
        tree.root = tree.new_clade([], [], Some(ROOT_NAME.to_string()));
        tree
    }

    /// Rebuild a tree from persisted clades and closure rows.
    ///
    /// Clade ids are kept unless they are sparse: when the largest id would
    /// make the arena more than twice the clade count, the clades are
    /// renumbered densely in id order before loading.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::SchemaViolation` if the rows do not describe a
    /// consistent tree rooted at `root`.
    pub fn from_parts(root: CladeId, mut clades: Vec<Clade>, paths: &[TreePath]) -> Result<Self, TreeError> {
        let size = clades.iter().map(|c| c.id.index() + 1).max().unwrap_or(0);
        if size > clades.len().saturating_mul(2).max(MIN_SPARSE_ARENA) {
            tracing::warn!("Renumbering {} clades with ids up to {}", clades.len(), size - 1);
            let (root, paths) = renumber(root, &mut clades, paths)?;
            return Self::from_parts(root, clades, &paths);
        }
        let mut tree = Self {
            clades: vec![None; size],
            down: vec![BTreeMap::new(); size],
            up: vec![BTreeMap::new(); size],
            root,
        };

        for clade in clades {
            let index = clade.id.index();
            if tree.clades[index].is_some() {
                return Err(TreeError::SchemaViolation(format!(
                    "duplicate clade id {}",
                    clade.id
                )));
            }
            tree.clades[index] = Some(clade);
        }

        for path in paths {
            if !tree.contains(path.ancestor) || !tree.contains(path.descendant) {
                return Err(TreeError::SchemaViolation(format!(
                    "path {} -> {} references a missing clade",
                    path.ancestor, path.descendant
                )));
            }
            tree.down[path.ancestor.index()].insert(path.descendant, path.depth);
            tree.up[path.descendant.index()].insert(path.ancestor, path.depth);
        }

        if !tree.contains(root) {
            return Err(TreeError::SchemaViolation(format!("missing root {root}")));
        }
        tree.check_invariants()?;
        Ok(tree)
    }

    #[must_use]
    pub fn root(&self) -> CladeId {
        self.root
    }

    /// Create a detached clade with its self path; attach it with [`add_child`](Self::add_child)
    pub fn new_clade(
        &mut self,
        kits: impl IntoIterator<Item = KitId>,
        variants: impl IntoIterator<Item = VariantId>,
        name: Option<String>,
    ) -> CladeId {
        let id = CladeId(next_dense_id(self.clades.len()));
        self.clades.push(Some(Clade {
            id,
            name,
            variants: variants.into_iter().collect(),
            kits: kits.into_iter().collect(),
        }));
        self.down.push(BTreeMap::from([(id, 0)]));
        self.up.push(BTreeMap::from([(id, 0)]));
        id
    }

    #[must_use]
    pub fn get(&self, id: CladeId) -> Option<&Clade> {
        self.clades.get(id.index()).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn contains(&self, id: CladeId) -> bool {
        self.get(id).is_some()
    }

    fn clade(&self, id: CladeId) -> Result<&Clade, TreeError> {
        self.get(id).ok_or(TreeError::UnknownClade(id))
    }

    fn clade_mut(&mut self, id: CladeId) -> Result<&mut Clade, TreeError> {
        self.clades
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownClade(id))
    }

    /// Live clades in id order
    pub fn iter(&self) -> impl Iterator<Item = &Clade> {
        self.clades.iter().flatten()
    }

    /// Number of live clades, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A tree always holds its root, so it is never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn parent(&self, id: CladeId) -> Option<CladeId> {
        self.up
            .get(id.index())?
            .iter()
            .find(|(_, &depth)| depth == 1)
            .map(|(&a, _)| a)
    }

    /// Direct children in id order
    #[must_use]
    pub fn children(&self, id: CladeId) -> Vec<CladeId> {
        self.down.get(id.index()).map_or_else(Vec::new, |rows| {
            rows.iter()
                .filter(|(_, &depth)| depth == 1)
                .map(|(&d, _)| d)
                .collect()
        })
    }

    /// Strict ancestors, nearest first
    #[must_use]
    pub fn ancestors(&self, id: CladeId) -> Vec<CladeId> {
        let Some(rows) = self.up.get(id.index()) else {
            return Vec::new();
        };
        let mut ancestors: Vec<(u32, CladeId)> = rows
            .iter()
            .filter(|(_, &depth)| depth > 0)
            .map(|(&a, &depth)| (depth, a))
            .collect();
        ancestors.sort_unstable();
        ancestors.into_iter().map(|(_, a)| a).collect()
    }

    /// Strict descendants, shallowest first
    #[must_use]
    pub fn descendants(&self, id: CladeId) -> Vec<CladeId> {
        let Some(rows) = self.down.get(id.index()) else {
            return Vec::new();
        };
        let mut descendants: Vec<(u32, CladeId)> = rows
            .iter()
            .filter(|(_, &depth)| depth > 0)
            .map(|(&d, &depth)| (depth, d))
            .collect();
        descendants.sort_unstable();
        descendants.into_iter().map(|(_, d)| d).collect()
    }

    /// Distance from the root (0 for the root and for detached clades)
    #[must_use]
    pub fn depth(&self, id: CladeId) -> u32 {
        self.up
            .get(id.index())
            .and_then(|rows| rows.get(&self.root))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `ancestor` lies strictly above `descendant`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: CladeId, descendant: CladeId) -> bool {
        ancestor != descendant
            && self
                .down
                .get(ancestor.index())
                .is_some_and(|rows| rows.contains_key(&descendant))
    }

    #[must_use]
    pub fn is_attached(&self, id: CladeId) -> bool {
        id == self.root || self.is_ancestor(self.root, id)
    }

    /// Attach `child` (with its subtree) under `parent`.
    ///
    /// A child already attached elsewhere is moved. Kits and variants found in
    /// both clades afterwards stay with the child only. Attaching a clade to
    /// its current parent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::UnknownClade` for missing ids, `TreeError::RootImmutable`
    /// when `child` is the root, or `TreeError::Cycle` when `parent` lies in
    /// `child`'s subtree.
    pub fn add_child(&mut self, parent: CladeId, child: CladeId) -> Result<(), TreeError> {
        self.clade(parent)?;
        self.clade(child)?;
        if child == self.root {
            return Err(TreeError::RootImmutable);
        }
        if self.parent(child) == Some(parent) {
            return Ok(());
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }

        self.detach_subtree(child);

        let above: Vec<(CladeId, u32)> = self.up[parent.index()].iter().map(|(&a, &d)| (a, d)).collect();
        let below: Vec<(CladeId, u32)> = self.down[child.index()].iter().map(|(&d, &e)| (d, e)).collect();
        for &(ancestor, d1) in &above {
            for &(descendant, d2) in &below {
                let depth = d1 + 1 + d2;
                self.down[ancestor.index()].insert(descendant, depth);
                self.up[descendant.index()].insert(ancestor, depth);
            }
        }

        self.push_down(parent, child)
    }

    /// Splice `new_node` onto the edge `parent -> child`.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::NotAChild` if `child` is not directly under `parent`,
    /// or `TreeError::AlreadyAttached` if `new_node` already has a parent or children.
    pub fn insert_between(&mut self, new_node: CladeId, parent: CladeId, child: CladeId) -> Result<(), TreeError> {
        self.clade(new_node)?;
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        if new_node == self.root || self.up[new_node.index()].len() > 1 || self.down[new_node.index()].len() > 1 {
            return Err(TreeError::AlreadyAttached(new_node));
        }

        self.add_child(parent, new_node)?;
        self.add_child(new_node, child)
    }

    /// Remove a childless, non-root clade and return it
    ///
    /// # Errors
    ///
    /// Returns `TreeError::RootImmutable` for the root and `TreeError::HasChildren`
    /// if the clade still has children.
    pub fn delete_leaf(&mut self, id: CladeId) -> Result<Clade, TreeError> {
        self.clade(id)?;
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        if !self.children(id).is_empty() {
            return Err(TreeError::HasChildren(id));
        }

        self.detach_subtree(id);
        self.up[id.index()].clear();
        self.down[id.index()].clear();
        self.clades[id.index()]
            .take()
            .ok_or(TreeError::UnknownClade(id))
    }

    /// Collapse children of `parent` that carry identical variant sets.
    ///
    /// The lowest id of each group survives and absorbs the kits and children of
    /// the others, which are then deleted. Returns the deleted ids.
    ///
    /// # Errors
    ///
    /// Propagates tree errors from re-parenting or deletion.
    pub fn merge_child_clades(&mut self, parent: CladeId) -> Result<Vec<CladeId>, TreeError> {
        let mut groups: BTreeMap<BTreeSet<VariantId>, Vec<CladeId>> = BTreeMap::new();
        for child in self.children(parent) {
            groups
                .entry(self.clade(child)?.variants.clone())
                .or_default()
                .push(child);
        }

        let mut deleted = Vec::new();
        for ids in groups.into_values().filter(|ids| ids.len() > 1) {
            let keep = ids[0];
            for &other in &ids[1..] {
                self.move_kits(other, keep)?;
                for grandchild in self.children(other) {
                    self.add_child(keep, grandchild)?;
                }
                self.delete_leaf(other)?;
                deleted.push(other);
            }
        }
        Ok(deleted)
    }

    pub fn set_name(&mut self, id: CladeId, name: impl Into<String>) -> Result<(), TreeError> {
        self.clade_mut(id)?.name = Some(name.into());
        Ok(())
    }

    pub fn add_kits(&mut self, id: CladeId, kits: impl IntoIterator<Item = KitId>) -> Result<(), TreeError> {
        self.clade_mut(id)?.kits.extend(kits);
        Ok(())
    }

    /// Remove and return the kits placed directly in `id`
    pub fn take_kits(&mut self, id: CladeId) -> Result<BTreeSet<KitId>, TreeError> {
        Ok(std::mem::take(&mut self.clade_mut(id)?.kits))
    }

    pub fn add_variants(&mut self, id: CladeId, variants: impl IntoIterator<Item = VariantId>) -> Result<(), TreeError> {
        self.clade_mut(id)?.variants.extend(variants);
        Ok(())
    }

    pub fn remove_variants(&mut self, id: CladeId, variants: &BTreeSet<VariantId>) -> Result<(), TreeError> {
        self.clade_mut(id)?.variants.retain(|v| !variants.contains(v));
        Ok(())
    }

    /// Rewrite every variant id, e.g. when moving the tree onto another catalog
    pub fn remap_variants(&mut self, mut f: impl FnMut(VariantId) -> VariantId) {
        for clade in self.clades.iter_mut().flatten() {
            clade.variants = clade.variants.iter().map(|&v| f(v)).collect();
        }
    }

    /// Move every kit placed directly in `from` into `to`
    pub fn move_kits(&mut self, from: CladeId, to: CladeId) -> Result<(), TreeError> {
        self.clade(to)?;
        let kits = self.take_kits(from)?;
        self.clade_mut(to)?.kits.extend(kits);
        Ok(())
    }

    /// Move `kit` into `id`, removing it from whichever clade held it
    pub fn place_kit(&mut self, kit: KitId, id: CladeId) -> Result<(), TreeError> {
        self.clade(id)?;
        if let Some(owner) = self.kit_owner(&kit) {
            self.clade_mut(owner)?.kits.remove(&kit);
        }
        self.clade_mut(id)?.kits.insert(kit);
        Ok(())
    }

    #[must_use]
    pub fn kit_owner(&self, kit: &KitId) -> Option<CladeId> {
        self.iter().find(|c| c.kits.contains(kit)).map(|c| c.id)
    }

    #[must_use]
    pub fn variant_owner(&self, variant: VariantId) -> Option<CladeId> {
        self.iter()
            .find(|c| c.variants.contains(&variant))
            .map(|c| c.id)
    }

    /// The clade's own variants plus those of all its ancestors
    #[must_use]
    pub fn effective_variants(&self, id: CladeId) -> BTreeSet<VariantId> {
        self.up.get(id.index()).map_or_else(BTreeSet::new, |rows| {
            rows.keys()
                .filter_map(|&a| self.get(a))
                .flat_map(|c| c.variants.iter().copied())
                .collect()
        })
    }

    /// Kits placed anywhere in the subtree rooted at `id`
    #[must_use]
    pub fn subtree_kits(&self, id: CladeId) -> BTreeSet<KitId> {
        self.down.get(id.index()).map_or_else(BTreeSet::new, |rows| {
            rows.keys()
                .filter_map(|&d| self.get(d))
                .flat_map(|c| c.kits.iter().cloned())
                .collect()
        })
    }

    /// All clades of the subtree rooted at the root, children before parents
    #[must_use]
    pub fn post_order(&self) -> Vec<CladeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Every closure-table row, ordered by (ancestor, descendant)
    #[must_use]
    pub fn paths(&self) -> Vec<TreePath> {
        self.down
            .iter()
            .enumerate()
            .flat_map(|(a, rows)| {
                rows.iter().map(move |(&descendant, &depth)| TreePath {
                    ancestor: CladeId(next_dense_id(a)),
                    descendant,
                    depth,
                })
            })
            .collect()
    }

    /// Verify the structural and schema invariants.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::SchemaViolation` describing the first broken rule:
    /// closure rows out of sync, a detached clade, an empty variant set below
    /// the root, a variant owned twice, or a kit placed twice.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let violation = |msg: String| -> Result<(), TreeError> { Err(TreeError::SchemaViolation(msg)) };

        let root = self.clade(self.root)?;
        if !root.variants.is_empty() {
            return violation("root clade carries variants".to_string());
        }

        let mut variant_owner: BTreeMap<VariantId, CladeId> = BTreeMap::new();
        let mut kit_owner: BTreeMap<&KitId, CladeId> = BTreeMap::new();

        for clade in self.iter() {
            let id = clade.id;
            if self.down[id.index()].get(&id) != Some(&0) || self.up[id.index()].get(&id) != Some(&0) {
                return violation(format!("clade {id} lacks its self path"));
            }
            for (&d, &depth) in &self.down[id.index()] {
                if self.up.get(d.index()).and_then(|rows| rows.get(&id)) != Some(&depth) {
                    return violation(format!("closure rows {id} -> {d} out of sync"));
                }
            }

            if id != self.root {
                if !self.is_attached(id) {
                    return violation(format!("clade {id} is detached from the root"));
                }
                let Some(parent) = self.parent(id) else {
                    return violation(format!("clade {id} has no parent"));
                };
                if self.up[id.index()].len() != self.up[parent.index()].len() + 1 {
                    return violation(format!("clade {id} has inconsistent ancestor depths"));
                }
                if clade.variants.is_empty() {
                    return violation(format!("clade {id} has no variants of its own"));
                }
            }

            for &variant in &clade.variants {
                if let Some(other) = variant_owner.insert(variant, id) {
                    return violation(format!("variant {variant} owned by both {other} and {id}"));
                }
            }
            for kit in &clade.kits {
                if let Some(other) = kit_owner.insert(kit, id) {
                    return violation(format!("kit {kit} placed in both {other} and {id}"));
                }
            }
        }

        Ok(())
    }

    /// Remove all rows linking the strict ancestors of `node` to its subtree
    fn detach_subtree(&mut self, node: CladeId) {
        let ancestors: Vec<CladeId> = self.up[node.index()]
            .iter()
            .filter(|(_, &depth)| depth > 0)
            .map(|(&a, _)| a)
            .collect();
        let subtree: Vec<CladeId> = self.down[node.index()].keys().copied().collect();
        for &ancestor in &ancestors {
            for &descendant in &subtree {
                self.down[ancestor.index()].remove(&descendant);
                self.up[descendant.index()].remove(&ancestor);
            }
        }
    }

    /// Drop from `parent` every kit and variant that `child` also holds
    fn push_down(&mut self, parent: CladeId, child: CladeId) -> Result<(), TreeError> {
        let (kits, variants) = {
            let child = self.clade(child)?;
            (child.kits.clone(), child.variants.clone())
        };
        let parent = self.clade_mut(parent)?;
        parent.kits.retain(|k| !kits.contains(k));
        parent.variants.retain(|v| !variants.contains(v));
        Ok(())
    }
}
