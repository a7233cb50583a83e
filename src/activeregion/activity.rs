use std::sync::Arc;

use crate::activeregion::{ReadStates, TraversalError};
use crate::genomics::AlignedRead;
use crate::locus::GenomeLoc;

/// Validated activity probability for one base.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    locus: GenomeLoc,
    value: f64,
}

impl ActivityResult {
    /// Pair `value` with `locus`, rejecting values outside `[0, 1]` (NaN included).
    pub fn new(locus: GenomeLoc, value: f64) -> Result<Self, TraversalError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(TraversalError::PreconditionViolation { locus, value });
        }
        Ok(Self { locus, value })
    }

    /// Base the value applies to.
    pub fn locus(&self) -> &GenomeLoc {
        &self.locus
    }

    /// Probability that the base is active.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Consumer driving an active-region traversal.
pub trait ActiveRegionWalker {
    /// Activity probability for a single base, given the reads covering it.
    fn is_active(&mut self, locus: &GenomeLoc, reads: &[Arc<AlignedRead>]) -> f64;

    /// Read states to expose on emitted regions.
    fn desired_read_states(&self) -> ReadStates {
        ReadStates::default()
    }
}

impl<W: ActiveRegionWalker + ?Sized> ActiveRegionWalker for &mut W {
    fn is_active(&mut self, locus: &GenomeLoc, reads: &[Arc<AlignedRead>]) -> f64 {
        (**self).is_active(locus, reads)
    }

    fn desired_read_states(&self) -> ReadStates {
        (**self).desired_read_states()
    }
}

/// Walker built from a per-locus activity closure.
#[derive(Debug, Clone)]
pub struct ActivityFn<F> {
    activity: F,
    states: ReadStates,
}

impl<F> ActivityFn<F>
where
    F: FnMut(&GenomeLoc) -> f64,
{
    /// Walker reporting primary reads only.
    pub fn new(activity: F) -> Self {
        Self {
            activity,
            states: ReadStates::default(),
        }
    }

    /// Report `states` instead of the default.
    pub fn with_read_states(mut self, states: ReadStates) -> Self {
        self.states = states;
        self
    }
}

impl<F> ActiveRegionWalker for ActivityFn<F>
where
    F: FnMut(&GenomeLoc) -> f64,
{
    fn is_active(&mut self, locus: &GenomeLoc, _reads: &[Arc<AlignedRead>]) -> f64 {
        (self.activity)(locus)
    }

    fn desired_read_states(&self) -> ReadStates {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locus::SequenceDictionary;
    use test_case::test_case;

    #[test_case(-0.1, false ; "below zero")]
    #[test_case(0.0, true ; "zero")]
    #[test_case(0.5, true ; "middle")]
    #[test_case(1.0, true ; "one")]
    #[test_case(1.1, false ; "above one")]
    #[test_case(f64::NAN, false ; "nan")]
    fn activity_range_is_enforced(value: f64, valid: bool) {
        let dict = SequenceDictionary::new([("1", 100)]);
        let locus = dict.loc("1", 10, 10).unwrap();
        let result = ActivityResult::new(locus, value);
        assert_eq!(result.is_ok(), valid);
        if !valid {
            assert!(matches!(
                result,
                Err(TraversalError::PreconditionViolation { .. })
            ));
        }
    }
}
