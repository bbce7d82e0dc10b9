//! Core data types for clade inference.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`KitId`], [`VariantId`], [`CladeId`]: identifiers for kits, variants and clades
//! - [`Variant`]: a site on a reference build with ancestral and derived alleles
//! - [`VariantCatalog`]: dense variant storage with alias and reference-swap lookups
//! - [`CallState`]: the closed set of genotype states a kit can report
//! - [`KitRoster`]: the kits selected for one inference run
//!
//! ## Reference swaps
//!
//! At some sites the reference assembly carries the derived allele. Callers
//! report these sites with ancestral and derived exchanged; the catalog pairs
//! such a "companion" with its canonical variant so calls can be inverted on
//! ingestion:
//!
//! | Variant   | Ancestral | Derived | Role      |
//! |-----------|-----------|---------|-----------|
//! | canonical | C         | T       | in tree   |
//! | companion | T         | C       | in calls  |
//!
//! [`KitId`]: types::KitId
//! [`VariantId`]: types::VariantId
//! [`CladeId`]: types::CladeId
//! [`Variant`]: variant::Variant
//! [`VariantCatalog`]: variant::VariantCatalog
//! [`CallState`]: call::CallState
//! [`KitRoster`]: call::KitRoster

pub mod call;
pub mod types;
pub mod variant;
