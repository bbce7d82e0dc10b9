//! Block partitioning of the perfect sub-matrix.
//!
//! 1. [`partition4`] reorders rows (variants) and columns (kits) so that every
//!    clade shows up as a contiguous, left-aligned rectangle of derived calls.
//! 2. [`get_blocks`] scans the sorted matrix for those rectangles.
//! 3. [`CandidateBuilder`] nests the rectangles into a candidate clade tree.
//!
//! [`partition4`]: partition4::partition4
//! [`get_blocks`]: blocks::get_blocks
//! [`CandidateBuilder`]: candidate::CandidateBuilder

pub mod blocks;
pub mod candidate;
pub mod partition4;

pub use blocks::{get_blocks, Block, BlockScan, InconsistentBlock};
pub use candidate::CandidateBuilder;
pub use partition4::partition4;
