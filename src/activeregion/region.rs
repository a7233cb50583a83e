use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::genomics::AlignedRead;
use crate::locus::GenomeLoc;

/// Classification of a read relative to one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReadState {
    /// Region with the largest core overlap (earliest on ties).
    Primary,
    /// Any other region whose core the read overlaps.
    NonPrimary,
    /// Region overlapped only through its extension.
    Extended,
}

impl ReadState {
    const fn bit(self) -> u8 {
        match self {
            ReadState::Primary => 0b001,
            ReadState::NonPrimary => 0b010,
            ReadState::Extended => 0b100,
        }
    }
}

impl fmt::Display for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadState::Primary => "PRIMARY",
            ReadState::NonPrimary => "NONPRIMARY",
            ReadState::Extended => "EXTENDED",
        };
        f.write_str(name)
    }
}

/// Set of read states a walker wants reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadStates(u8);

impl ReadStates {
    /// No states.
    pub const NONE: Self = Self(0);
    /// Only primary reads (the default).
    pub const PRIMARY: Self = Self(ReadState::Primary.bit());
    /// Primary and non-primary reads.
    pub const OVERLAPPING: Self = Self(ReadState::Primary.bit() | ReadState::NonPrimary.bit());
    /// Every state.
    pub const ALL: Self =
        Self(ReadState::Primary.bit() | ReadState::NonPrimary.bit() | ReadState::Extended.bit());

    /// Whether `state` is in the set.
    pub fn contains(self, state: ReadState) -> bool {
        self.0 & state.bit() != 0
    }

    /// Set with `state` added.
    pub fn with(self, state: ReadState) -> Self {
        Self(self.0 | state.bit())
    }

    /// Whether the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for ReadStates {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl BitOr for ReadStates {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<ReadState> for ReadStates {
    fn from(state: ReadState) -> Self {
        Self(state.bit())
    }
}

impl FromIterator<ReadState> for ReadStates {
    fn from_iter<I: IntoIterator<Item = ReadState>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// A read and its state within one region.
#[derive(Debug, Clone)]
pub struct ReadAssignment {
    /// Assigned read.
    pub read: Arc<AlignedRead>,
    /// State of the read in the region.
    pub state: ReadState,
}

/// Contiguous run of same-activity bases within one analysis interval.
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    location: GenomeLoc,
    extended: GenomeLoc,
    is_active: bool,
    assignments: Vec<ReadAssignment>,
    desired: ReadStates,
}

impl ActiveRegion {
    pub(crate) fn new(
        location: GenomeLoc,
        extended: GenomeLoc,
        is_active: bool,
        assignments: Vec<ReadAssignment>,
        desired: ReadStates,
    ) -> Self {
        Self {
            location,
            extended,
            is_active,
            assignments,
            desired,
        }
    }

    /// Core span.
    pub fn location(&self) -> &GenomeLoc {
        &self.location
    }

    /// Core span padded by the extension margin.
    pub fn extended_location(&self) -> &GenomeLoc {
        &self.extended
    }

    /// Whether the region's activity exceeded the threshold.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// States the owning walker asked for.
    pub fn desired_read_states(&self) -> ReadStates {
        self.desired
    }

    /// Reads in a desired state, ordered by alignment start then name.
    pub fn reads(&self) -> impl Iterator<Item = &Arc<AlignedRead>> + '_ {
        self.assignments
            .iter()
            .filter(move |assignment| self.desired.contains(assignment.state))
            .map(|assignment| &assignment.read)
    }

    /// Reads holding `state`, whether or not it was requested.
    pub fn reads_in_state(&self, state: ReadState) -> impl Iterator<Item = &Arc<AlignedRead>> + '_ {
        self.assignments
            .iter()
            .filter(move |assignment| assignment.state == state)
            .map(|assignment| &assignment.read)
    }

    /// Every assignment, unfiltered.
    pub fn assignments(&self) -> &[ReadAssignment] {
        &self.assignments
    }

    /// State of the read named `name`, if it touches this region.
    pub fn state_of(&self, name: &str) -> Option<ReadState> {
        self.assignments
            .iter()
            .find(|assignment| assignment.read.name.as_ref() == name)
            .map(|assignment| assignment.state)
    }

    /// Number of reads in a desired state.
    pub fn read_count(&self) -> usize {
        self.reads().count()
    }
}

impl fmt::Display for ActiveRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} active={} extended={} reads={}",
            self.location,
            self.is_active,
            self.extended,
            self.read_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_states_set_operations() {
        let states: ReadStates = [ReadState::Primary, ReadState::Extended].into_iter().collect();
        assert!(states.contains(ReadState::Primary));
        assert!(!states.contains(ReadState::NonPrimary));
        assert!(states.contains(ReadState::Extended));
        assert_eq!(ReadStates::default(), ReadStates::PRIMARY);
        assert_eq!(
            ReadStates::PRIMARY | ReadStates::from(ReadState::NonPrimary),
            ReadStates::OVERLAPPING
        );
        assert!(ReadStates::NONE.is_empty());
        assert_eq!(ReadStates::OVERLAPPING.with(ReadState::Extended), ReadStates::ALL);
    }
}
