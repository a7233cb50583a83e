//! # Active regions and allele-biased downsampling
//!
//! Building blocks for a locus-walking genomic analysis engine.
//!
//! ## Components
//!
//! 1. **Active-region traversal**: tile analysis intervals into contiguous
//!    active/inactive regions from a per-base activity signal, then label
//!    every overlapping read `PRIMARY`, `NONPRIMARY` or `EXTENDED`.
//! 2. **Allele-biased downsampling**: remove a fraction of pileup elements or
//!    reads per supported allele, so no allele gains weight from removal.
//!
//! Both operate on already-materialized loci, reads and pileups; file I/O,
//! interval merging and sharding belong to the caller.
//!
//! ## Usage Example
//!
//! ```
//! use activeregion::activeregion::{ActivityFn, TraversalConfig, TraverseActiveRegions};
//! use activeregion::locus::{IntervalSet, SequenceDictionary};
//!
//! let dict = SequenceDictionary::new([("chr1", 10_000)]);
//! let intervals = IntervalSet::new(vec![dict.loc("chr1", 100, 300).unwrap()]).unwrap();
//! let mut traversal = TraverseActiveRegions::new(intervals, dict, TraversalConfig::default());
//! let mut walker = ActivityFn::new(|locus: &activeregion::GenomeLoc| {
//!     if locus.start() < 200 { 1.0 } else { 0.0 }
//! });
//!
//! let regions = traversal.traverse_intervals(&mut walker, &[]).unwrap();
//! assert_eq!(regions.len(), 2);
//! assert!(regions[0].is_active());
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod activeregion; // Region tiling and read-state classification
pub mod downsampling; // Allele-stratified pileup/read downsampling
pub mod genomics;     // Reads, pileups, alleles
pub mod locus;        // Genome locations, dictionaries, interval sets

// Re-exports for convenience
pub use activeregion::{
    ActiveRegion, ActiveRegionWalker, ReadState, ReadStates, TraversalConfig, TraversalError,
    TraverseActiveRegions,
};
pub use downsampling::{AlleleBiasedDownsampler, IndexSampler, RandomIndexSampler, RemovalLog};
pub use genomics::{AlignedRead, Pileup, PileupElement};
pub use locus::{GenomeLoc, IntervalSet, LocusError, SequenceDictionary};
