//! Genomic coordinates shared by the region classifier and the downsampler.

mod genome_loc;
mod interval_set;

pub use genome_loc::{Contig, GenomeLoc, LocusError, SequenceDictionary};
pub use interval_set::IntervalSet;
