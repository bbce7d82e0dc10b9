//! Clade tree, merging and exports.
//!
//! A clade groups the kits that share a set of derived variants. The tree is
//! held as an arena with a closure table beside it (see [`CladeTree`]), and
//! always satisfies:
//!
//! | Rule | Statement                                                        |
//! |------|------------------------------------------------------------------|
//! | 1    | a variant belongs to at most one clade                           |
//! | 2    | every clade below the root carries at least one variant          |
//! | 3    | a kit is placed in at most one clade                             |
//! | 4    | every clade is reachable from the root                           |
//!
//! [`TreeMerger`] folds a candidate tree into an existing one and commits only
//! when the result still satisfies these rules.
//!
//! [`CladeTree`]: clade_tree::CladeTree
//! [`TreeMerger`]: merge::TreeMerger

pub mod clade_tree;
pub mod export;
pub mod merge;

pub use clade_tree::{Clade, CladeTree, TreeError, TreePath, ROOT_NAME};
pub use merge::{DisjointPolicy, MergeCase, MergeReport, Placement, TreeMerger, UnmergeableClade};
