use super::{GenomeLoc, LocusError};

/// Ordered, non-overlapping analysis intervals.
///
/// Intervals are taken as already merged; touching intervals stay separate
/// and each one keeps its own region boundaries.
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    intervals: Vec<GenomeLoc>,
}

impl IntervalSet {
    /// Build a set from intervals in ascending order.
    pub fn new(intervals: Vec<GenomeLoc>) -> Result<Self, LocusError> {
        for pair in intervals.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if previous >= next || previous.overlaps(next) {
                return Err(LocusError::UnsortedIntervals {
                    previous: previous.to_string(),
                    next: next.to_string(),
                });
            }
        }
        Ok(Self { intervals })
    }

    /// Iterate intervals in order.
    pub fn iter(&self) -> std::slice::Iter<'_, GenomeLoc> {
        self.intervals.iter()
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total number of bases covered.
    pub fn base_count(&self) -> u64 {
        self.intervals.iter().map(|loc| loc.size() as u64).sum()
    }

    /// Interval that fully contains `loc`, if any.
    pub fn containing(&self, loc: &GenomeLoc) -> Option<&GenomeLoc> {
        let idx = self
            .intervals
            .partition_point(|interval| {
                (interval.contig_index(), interval.stop()) < (loc.contig_index(), loc.start())
            });
        self.intervals
            .get(idx)
            .filter(|interval| interval.contains(loc))
    }

    /// First interval base on `contig_index` strictly after `pos`.
    pub fn next_base_after(&self, contig_index: usize, pos: u32) -> Option<u32> {
        let idx = self.intervals.partition_point(|interval| {
            (interval.contig_index(), interval.stop()) <= (contig_index, pos)
        });
        self.intervals
            .get(idx)
            .filter(|interval| interval.contig_index() == contig_index)
            .map(|interval| interval.start().max(pos + 1))
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a GenomeLoc;
    type IntoIter = std::slice::Iter<'a, GenomeLoc>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
