//! Read-level data model shared by the traversal and downsampling code.
//!
//! Reads and pileups arrive fully materialized from upstream collaborators
//! and are treated as immutable here.

mod pileup;
mod types;

pub use pileup::{simple_base_index, Pileup, PileupElement, NUM_BASES};
pub use types::{AlignedRead, Allele, CigarOp, CigarOpKind, ReadGroup};
