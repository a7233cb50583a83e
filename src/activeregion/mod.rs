//! Active-region determination and read-state classification.
//!
//! A traversal tiles each analysis interval into contiguous regions of
//! same-activity bases. Every read touching a region is classified there:
//!
//! * `Primary` in the single region whose core it overlaps most (earliest
//!   region on ties),
//! * `NonPrimary` in every other region whose core it overlaps,
//! * `Extended` where it only reaches the padded extension.
//!
//! Walkers choose which of these states are exposed; the assignment itself
//! never depends on that choice.

mod activity;
mod region;
mod traversal;

pub use activity::{ActiveRegionWalker, ActivityFn, ActivityResult};
pub use region::{ActiveRegion, ReadAssignment, ReadState, ReadStates};
pub use traversal::{
    ExtensionBounds, LocusWindow, TraversalConfig, TraversalError, TraverseActiveRegions,
    DEFAULT_ACTIVE_THRESHOLD, DEFAULT_EXTENSION,
};
