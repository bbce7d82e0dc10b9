//! Coverage model: how a genome position relates to a kit's sequenced regions.
//!
//! Sequencing only reaches part of the genome, so the absence of a derived call
//! means "ancestral" only where the kit was actually covered. This module
//! answers that question:
//!
//! - [`CoverageRange`]: one sequenced interval (BED convention)
//! - [`CoverageIndex`]: sorted ranges for every kit
//! - [`CoverageScanner`]: single forward-pointer classifier for ascending queries
//! - [`total_and_gated_coverage`]: one-sweep total and intersection lengths
//!
//! ## Classification
//!
//! | Class              | Code | Meaning                                   |
//! |--------------------|------|-------------------------------------------|
//! | `NotCovered`       | 0    | outside every range                       |
//! | `LowerBoundary`    | 1    | first base of a range                     |
//! | `UpperBoundary`    | 2    | last base of a range                      |
//! | `SingleBaseRegion` | 3    | first and last base at once               |
//! | `FullyCovered`     | 4    | strictly inside a range                   |
//!
//! Range edges and single-base ranges are unreliable in short-read data, so
//! they are reported separately from solid internal coverage.
//!
//! [`CoverageRange`]: classify::CoverageRange
//! [`CoverageIndex`]: classify::CoverageIndex
//! [`CoverageScanner`]: classify::CoverageScanner
//! [`total_and_gated_coverage`]: gated::total_and_gated_coverage

pub mod classify;
pub mod gated;

pub use classify::{CoverageClass, CoverageIndex, CoverageRange, CoverageScanner};
pub use gated::total_and_gated_coverage;
