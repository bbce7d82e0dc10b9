use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::types::{next_dense_id, VariantId};

/// A genetic variant on a reference build
///
/// Identity is `(build, position, ancestral, derived)`; names are aliases only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Reference genome build (e.g. "hg38")
    pub build: String,

    /// 1-based position of the first base
    pub position: u64,

    /// Ancestral allele
    pub ancestral: String,

    /// Derived allele
    pub derived: String,

    /// Human-readable aliases (e.g. "M269", "L21")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

/// Identity key of a variant
pub type VariantKey = (String, u64, String, String);

impl Variant {
    pub fn new(
        build: impl Into<String>,
        position: u64,
        ancestral: impl Into<String>,
        derived: impl Into<String>,
    ) -> Self {
        Self {
            build: build.into(),
            position,
            ancestral: ancestral.into(),
            derived: derived.into(),
            names: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Number of reference bases the variant spans: 1 for SNPs, the longest allele for indels
    #[must_use]
    pub fn span(&self) -> u64 {
        let longest = self.ancestral.len().max(self.derived.len()).max(1);
        u64::try_from(longest).unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn is_indel(&self) -> bool {
        self.ancestral.len() != self.derived.len() || self.ancestral.len() > 1
    }

    #[must_use]
    pub fn key(&self) -> VariantKey {
        (
            self.build.clone(),
            self.position,
            self.ancestral.clone(),
            self.derived.clone(),
        )
    }

    /// The same site with ancestral and derived alleles exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            build: self.build.clone(),
            position: self.position,
            ancestral: self.derived.clone(),
            derived: self.ancestral.clone(),
            names: Vec::new(),
        }
    }

    /// Preferred display label: first alias, or `position.anc.der`
    #[must_use]
    pub fn label(&self) -> String {
        self.names.first().cloned().unwrap_or_else(|| {
            format!("{}.{}.{}", self.position, self.ancestral, self.derived)
        })
    }
}

/// Dense variant storage with identity, alias and reference-swap lookups
#[derive(Debug, Clone, Default)]
pub struct VariantCatalog {
    variants: Vec<Variant>,

    /// Index: identity key -> id
    by_key: HashMap<VariantKey, VariantId>,

    /// Index: upper-cased alias -> id
    by_name: HashMap<String, VariantId>,

    /// Index: swapped companion -> canonical
    companion_to_canonical: HashMap<VariantId, VariantId>,

    /// Index: canonical -> swapped companion
    canonical_to_companion: HashMap<VariantId, VariantId>,
}

impl VariantCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variant, merging aliases when the identity already exists
    pub fn get_or_insert(&mut self, variant: Variant) -> VariantId {
        if let Some(&id) = self.by_key.get(&variant.key()) {
            for name in variant.names {
                self.add_name(id, name);
            }
            return id;
        }

        let id = VariantId(next_dense_id(self.variants.len()));
        self.by_key.insert(variant.key(), id);
        for name in &variant.names {
            self.by_name.insert(name.to_uppercase(), id);
        }
        self.variants.push(variant);
        id
    }

    /// Attach an alias to an existing variant
    pub fn add_name(&mut self, id: VariantId, name: String) {
        let Some(variant) = self.variants.get_mut(id.index()) else {
            return;
        };
        if !variant.names.contains(&name) {
            self.by_name.insert(name.to_uppercase(), id);
            variant.names.push(name);
        }
    }

    #[must_use]
    pub fn get(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id.index())
    }

    #[must_use]
    pub fn find(&self, build: &str, position: u64, ancestral: &str, derived: &str) -> Option<VariantId> {
        self.by_key
            .get(&(
                build.to_string(),
                position,
                ancestral.to_string(),
                derived.to_string(),
            ))
            .copied()
    }

    /// Case-insensitive alias lookup
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<VariantId> {
        self.by_name.get(&name.to_uppercase()).copied()
    }

    /// Register `canonical` as a reference-swapped site.
    ///
    /// The companion (alleles exchanged) is inserted if needed and returned.
    pub fn register_reference_swap(&mut self, canonical: VariantId) -> Option<VariantId> {
        let swapped = self.get(canonical)?.swapped();
        let companion = self.get_or_insert(swapped);
        if companion == canonical {
            return None;
        }
        self.companion_to_canonical.insert(companion, canonical);
        self.canonical_to_companion.insert(canonical, companion);
        Some(companion)
    }

    /// Canonical id when `id` is the companion of a registered swap
    #[must_use]
    pub fn swap_canonical(&self, id: VariantId) -> Option<VariantId> {
        self.companion_to_canonical.get(&id).copied()
    }

    #[must_use]
    pub fn is_swap_canonical(&self, id: VariantId) -> bool {
        self.canonical_to_companion.contains_key(&id)
    }

    #[must_use]
    pub fn is_swap_companion(&self, id: VariantId) -> bool {
        self.companion_to_canonical.contains_key(&id)
    }

    /// Registered (canonical, companion) pairs in canonical order
    #[must_use]
    pub fn swap_pairs(&self) -> Vec<(VariantId, VariantId)> {
        let mut pairs: Vec<(VariantId, VariantId)> =
            self.canonical_to_companion.iter().map(|(&c, &t)| (c, t)).collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariantId, &Variant)> {
        self.variants
            .iter()
            .enumerate()
            .map(|(i, v)| (VariantId(next_dense_id(i)), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
