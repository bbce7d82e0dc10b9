use serde::{Deserialize, Serialize};

/// Opaque identifier of a DNA test kit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KitId(pub String);

impl KitId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Dense index of a variant in a [`VariantCatalog`](crate::core::variant::VariantCatalog)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VariantId(pub u32);

impl VariantId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Dense index of a clade in a [`CladeTree`](crate::tree::clade_tree::CladeTree) arena
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CladeId(pub u32);

impl CladeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CladeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Convert an arena length into the next dense id.
///
/// Arenas never come close to `u32::MAX` entries; exceeding it is a caller bug.
#[inline]
pub(crate) fn next_dense_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("arena exceeded {} entries", u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(KitId::new("B1234").to_string(), "B1234");
        assert_eq!(VariantId(7).to_string(), "v7");
        assert_eq!(CladeId(3).to_string(), "c3");
    }

    #[test]
    fn test_kit_ordering_is_lexical() {
        let mut kits = vec![KitId::new("b"), KitId::new("a"), KitId::new("c")];
        kits.sort();
        assert_eq!(kits[0], KitId::new("a"));
        assert_eq!(kits[2], KitId::new("c"));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&KitId::new("K1")).unwrap();
        assert_eq!(json, "\"K1\"");
        let id: VariantId = serde_json::from_str("12").unwrap();
        assert_eq!(id, VariantId(12));
    }
}
