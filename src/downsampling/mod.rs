//! Allele-stratified downsampling of pileups and read lists.
//!
//! Randomness is drawn exclusively through an injected [`IndexSampler`],
//! and removed reads can be reported to a shared [`RemovalLog`].

mod allele_biased;
mod audit;
mod sampler;

pub use allele_biased::AlleleBiasedDownsampler;
pub use audit::{format_removed_read, RemovalLog};
pub use sampler::{IndexSampler, RandomIndexSampler};
