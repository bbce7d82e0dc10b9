use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::types::{KitId, VariantId};

/// Genotype state recorded for one kit at one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Carries the derived allele
    Derived,
    /// Carries the ancestral allele
    Ancestral,
    /// No information at this site
    Unknown,
    /// A call exists but is neither purely ancestral nor purely derived
    Ambiguous,
}

impl CallState {
    /// Parse a raw genotype string as found in VCF `GT` fields.
    ///
    /// Haploid (`1`), diploid (`1/1`, `0|0`) and multi-allelic (`1/2`) forms are
    /// accepted. Missing alleles (`.`, `./.`) yield `Unknown`. Returns `None` for
    /// anything that is not a genotype at all.
    #[must_use]
    pub fn from_genotype(raw: &str) -> Option<Self> {
        Self::for_allele(raw, 1)
    }

    /// Like [`from_genotype`](Self::from_genotype), with `allele` (1-based ALT
    /// index) as the derived allele
    #[must_use]
    pub fn for_allele(raw: &str, allele: u32) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let mut alleles = Vec::new();
        for a in raw.split(['/', '|']) {
            match a {
                "." => alleles.push(None),
                a => alleles.push(Some(a.parse::<u32>().ok()?)),
            }
        }

        if alleles.iter().all(Option::is_none) {
            return Some(Self::Unknown);
        }
        if alleles.iter().any(Option::is_none) {
            return Some(Self::Ambiguous);
        }

        let called: BTreeSet<u32> = alleles.into_iter().flatten().collect();
        Some(match called.into_iter().collect::<Vec<_>>().as_slice() {
            [0] => Self::Ancestral,
            [a] if *a == allele => Self::Derived,
            _ => Self::Ambiguous,
        })
    }

    /// Exchange derived and ancestral; other states are unchanged
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Derived => Self::Ancestral,
            Self::Ancestral => Self::Derived,
            other => other,
        }
    }

    #[must_use]
    pub fn is_solid(self) -> bool {
        matches!(self, Self::Derived | Self::Ancestral)
    }
}

/// One genotype observation handed over by the ingestion layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    pub kit: KitId,
    pub variant: VariantId,
    pub state: CallState,
}

impl RawCall {
    pub fn new(kit: impl Into<KitId>, variant: VariantId, state: CallState) -> Self {
        Self {
            kit: kit.into(),
            variant,
            state,
        }
    }
}

/// Ordered selection of kits taking part in one inference run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitRoster {
    kits: Vec<KitId>,
}

impl KitRoster {
    /// Build a roster, dropping duplicates while keeping first-seen order
    pub fn new(kits: impl IntoIterator<Item = KitId>) -> Self {
        let mut seen = BTreeSet::new();
        let kits = kits
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();
        Self { kits }
    }

    #[must_use]
    pub fn kits(&self) -> &[KitId] {
        &self.kits
    }

    #[must_use]
    pub fn contains(&self, kit: &KitId) -> bool {
        self.kits.contains(kit)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }
}
