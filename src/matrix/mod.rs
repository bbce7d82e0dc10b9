//! Kit x variant call matrix.
//!
//! Raw calls only say where a kit carries something; the matrix fills in the
//! rest from coverage:
//!
//! 1. A recorded unambiguous call wins.
//! 2. A recorded heterozygous or multi-allelic call is `Ambiguous`.
//! 3. Otherwise a covered position is `SolidAncestral` and an uncovered one
//!    is `Unknown`.
//!
//! Calls on reference-swapped companions are inverted onto the canonical
//! variant before they enter the matrix (see [`SwapPolicy`]).
//!
//! [`CallMatrix::perfect_submatrix`] extracts the fully solid part consumed by
//! the block partitioner as a [`BinaryMatrix`].
//!
//! [`SwapPolicy`]: calls::SwapPolicy
//! [`CallMatrix::perfect_submatrix`]: calls::CallMatrix::perfect_submatrix
//! [`BinaryMatrix`]: binary::BinaryMatrix

pub mod binary;
pub mod calls;

pub use binary::BinaryMatrix;
pub use calls::{
    BoundaryPolicy, CallDiagnostics, CallMatrix, CallMatrixBuilder, CellState, ContradictoryCall,
    SwapPolicy,
};
