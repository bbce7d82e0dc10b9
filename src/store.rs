//! Persistence boundary for clade trees.
//!
//! A saved tree carries the variant catalog its ids index into, so a snapshot
//! can be restored on its own or imported onto another catalog.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::core::types::{CladeId, VariantId};
use crate::core::variant::{Variant, VariantCatalog};
use crate::tree::{Clade, CladeTree, TreeError, TreePath};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read tree: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse tree: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid tree: {0}")]
    InvalidTree(#[from] TreeError),
}

/// Snapshot format version for compatibility checking
pub const TREE_FORMAT_VERSION: &str = "1.0.0";

/// Serializable tree format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub version: String,
    pub created_at: String,
    pub root: CladeId,

    /// Variant catalog in id order
    pub variants: Vec<Variant>,

    /// Registered (canonical, companion) reference-swap pairs
    #[serde(default)]
    pub reference_swaps: Vec<(VariantId, VariantId)>,

    pub clades: Vec<Clade>,
    pub paths: Vec<TreePath>,
}

impl TreeSnapshot {
    #[must_use]
    pub fn capture(tree: &CladeTree, catalog: &VariantCatalog) -> Self {
        Self {
            version: TREE_FORMAT_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            root: tree.root(),
            variants: catalog.iter().map(|(_, v)| v.clone()).collect(),
            reference_swaps: catalog.swap_pairs(),
            clades: tree.iter().cloned().collect(),
            paths: tree.paths(),
        }
    }

    /// Rebuild the tree and its own catalog
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidTree` if the catalog or closure rows are inconsistent.
    pub fn restore(self) -> Result<(CladeTree, VariantCatalog), StoreError> {
        if self.version != TREE_FORMAT_VERSION {
            warn!(
                "Tree format version mismatch (expected {}, found {})",
                TREE_FORMAT_VERSION, self.version
            );
        }

        let mut catalog = VariantCatalog::new();
        for (index, variant) in self.variants.into_iter().enumerate() {
            let id = catalog.get_or_insert(variant);
            if id.index() != index {
                return Err(invalid(format!("duplicate variant at index {index}")));
            }
        }
        for (canonical, companion) in self.reference_swaps {
            if catalog.register_reference_swap(canonical) != Some(companion) {
                return Err(invalid(format!(
                    "reference swap {canonical} -> {companion} does not match the catalog"
                )));
            }
        }

        if let Some(v) = self
            .clades
            .iter()
            .flat_map(|c| c.variants.iter())
            .find(|v| v.index() >= catalog.len())
        {
            return Err(invalid(format!("clade refers to unknown variant {v}")));
        }

        let tree = CladeTree::from_parts(self.root, self.clades, &self.paths)?;
        Ok((tree, catalog))
    }

    /// Rebuild the tree with its variant ids moved onto `catalog`, adding any
    /// variants `catalog` does not know yet
    ///
    /// # Errors
    ///
    /// See [`restore`](Self::restore).
    pub fn import_into(self, catalog: &mut VariantCatalog) -> Result<CladeTree, StoreError> {
        let (mut tree, own) = self.restore()?;
        let mut mapping = Vec::with_capacity(own.len());
        for (_, variant) in own.iter() {
            mapping.push(catalog.get_or_insert(variant.clone()));
        }
        for (canonical, _) in own.swap_pairs() {
            catalog.register_reference_swap(mapping[canonical.index()]);
        }
        tree.remap_variants(|v| mapping[v.index()]);
        Ok(tree)
    }
}

fn invalid(msg: String) -> StoreError {
    StoreError::InvalidTree(TreeError::SchemaViolation(msg))
}

/// Where trees are loaded from and saved to
pub trait TreeStore {
    /// # Errors
    ///
    /// Returns a `StoreError` if the snapshot cannot be read or parsed.
    fn load(&self) -> Result<TreeSnapshot, StoreError>;

    /// # Errors
    ///
    /// Returns a `StoreError` if the snapshot cannot be written.
    fn save(&self, snapshot: &TreeSnapshot) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonTreeStore {
    path: PathBuf,
}

impl JsonTreeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreeStore for JsonTreeStore {
    fn load(&self) -> Result<TreeSnapshot, StoreError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, snapshot: &TreeSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::KitId;
    use tempfile::tempdir;

    fn fixture() -> (CladeTree, VariantCatalog) {
        let mut catalog = VariantCatalog::new();
        let v1 = catalog.get_or_insert(Variant::new("hg38", 100, "A", "G").with_name("M269"));
        let v2 = catalog.get_or_insert(Variant::new("hg38", 200, "C", "T"));
        catalog.register_reference_swap(v2);

        let mut tree = CladeTree::new();
        let outer = tree.new_clade([KitId::new("B")], [v1], None);
        let inner = tree.new_clade([KitId::new("A")], [v2], None);
        tree.add_child(tree.root(), outer).unwrap();
        tree.add_child(outer, inner).unwrap();
        (tree, catalog)
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = JsonTreeStore::new(dir.path().join("tree.json"));
        let (tree, catalog) = fixture();

        store.save(&TreeSnapshot::capture(&tree, &catalog)).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.version, TREE_FORMAT_VERSION);
        assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.created_at).is_ok());

        let (restored, restored_catalog) = snapshot.restore().unwrap();
        assert_eq!(restored.paths(), tree.paths());
        assert_eq!(restored.iter().collect::<Vec<_>>(), tree.iter().collect::<Vec<_>>());
        assert_eq!(restored_catalog.len(), catalog.len());
        assert_eq!(restored_catalog.swap_pairs(), catalog.swap_pairs());
        assert_eq!(restored_catalog.find_by_name("m269"), Some(VariantId(0)));
    }

    #[test]
    fn test_import_into_other_catalog() {
        let (tree, catalog) = fixture();
        let snapshot = TreeSnapshot::capture(&tree, &catalog);

        let mut other = VariantCatalog::new();
        other.get_or_insert(Variant::new("hg38", 5, "G", "C"));
        let shared = other.get_or_insert(Variant::new("hg38", 200, "C", "T"));

        let imported = snapshot.import_into(&mut other).unwrap();
        assert_eq!(imported.variant_owner(shared), tree.variant_owner(VariantId(1)));
        let m269 = other.find_by_name("M269").unwrap();
        assert!(imported.variant_owner(m269).is_some());
        assert!(other.is_swap_canonical(shared));
        imported.check_invariants().unwrap();
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let (tree, catalog) = fixture();
        let mut snapshot = TreeSnapshot::capture(&tree, &catalog);
        snapshot.variants.truncate(1);
        snapshot.reference_swaps.clear();
        assert!(matches!(snapshot.restore(), Err(StoreError::InvalidTree(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let store = JsonTreeStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StoreError::ReadError(_))));
    }
}
