//! # clade-solver
//!
//! A library for inferring a tree of clades from sparse genotype calls.
//!
//! Direct-to-consumer DNA kits are sequenced over different regions, and a kit
//! that reports no call at a position may simply not have been sequenced
//! there. `clade-solver` combines each kit's calls with its coverage to decide
//! what is truly ancestral, finds groups of kits sharing derived variants, and
//! merges those groups into a persistent tree without breaking its structure.
//!
//! ## Features
//!
//! - **Coverage-aware calls**: Covered positions without a call count as ancestral
//! - **Reference swaps**: Calls on sites where the reference carries the derived allele are inverted
//! - **Block partitioning**: Sorts the fully called matrix so clades appear as nested blocks
//! - **Incremental merging**: New clades are placed into an existing tree case by case
//! - **Closure table**: Every ancestor/descendant pair is indexed for constant-time queries
//! - **Exports**: Annotated matrix TSV, Graphviz DOT, graph JSON and closure rows
//!
//! ## Example
//!
//! ```rust
//! use clade_solver::{CallState, CladeTree, Dataset, KitId, Pipeline, RawCall, Variant};
//! use clade_solver::coverage::CoverageRange;
//!
//! let mut dataset = Dataset::new();
//! let m269 = dataset.catalog.get_or_insert(Variant::new("hg38", 2_887_824, "G", "A").with_name("M269"));
//! for kit in ["A", "B", "C"] {
//!     dataset.coverage.insert(KitId::new(kit), CoverageRange::new(2_000_000, 3_000_000));
//! }
//! dataset.calls.push(RawCall::new("A", m269, CallState::Derived));
//! dataset.calls.push(RawCall::new("B", m269, CallState::Derived));
//! dataset.finalize();
//!
//! let mut tree = CladeTree::new();
//! Pipeline::default().run(&dataset, &mut tree).unwrap();
//!
//! let clade = tree.variant_owner(m269).unwrap();
//! assert_eq!(tree.parent(clade), Some(tree.root()));
//! assert_eq!(tree.kit_owner(&KitId::new("C")), Some(tree.root()));
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Kit, variant and call types
//! - [`coverage`]: Coverage classification and gated coverage sums
//! - [`matrix`]: Kit x variant call matrix
//! - [`partition`]: Block partitioning and candidate trees
//! - [`tree`]: Clade tree, merger and exports
//! - [`parsing`]: Readers for catalogs, coverage, calls, VCFs and rosters
//! - [`pipeline`]: Configured end-to-end run
//! - [`store`]: Tree persistence
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod coverage;
pub mod matrix;
pub mod parsing;
pub mod partition;
pub mod pipeline;
pub mod store;
pub mod tree;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::call::{CallState, KitRoster, RawCall};
pub use core::types::*;
pub use core::variant::{Variant, VariantCatalog};
pub use pipeline::{Dataset, Pipeline, PipelineConfig, RunReport};
pub use store::{JsonTreeStore, TreeSnapshot, TreeStore};
pub use tree::{CladeTree, MergeReport, TreeMerger};
