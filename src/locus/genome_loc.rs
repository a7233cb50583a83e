use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::genomics::AlignedRead;

/// Errors raised while building loci and interval sets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocusError {
    /// Contig name absent from the sequence dictionary.
    #[error("unknown contig '{0}'")]
    UnknownContig(String),

    /// Coordinates violate `1 <= start <= stop <= contig length`.
    #[error("invalid bounds {contig}:{start}-{stop} (contig length {length})")]
    InvalidBounds {
        /// Contig name.
        contig: String,
        /// Requested start (1-based).
        start: u32,
        /// Requested stop (1-based, inclusive).
        stop: u32,
        /// Length of the contig.
        length: u32,
    },

    /// Interval set elements are not sorted or overlap.
    #[error("intervals out of order or overlapping: {previous} then {next}")]
    UnsortedIntervals {
        /// Earlier interval in the supplied order.
        previous: String,
        /// Interval that breaks the ordering.
        next: String,
    },
}

/// Reference contig with its dictionary index and length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contig {
    /// Position of the contig in the sequence dictionary.
    pub index: usize,
    /// Contig name.
    pub name: Arc<str>,
    /// Contig length in bases.
    pub length: u32,
}

/// Ordered set of reference contigs.
#[derive(Debug, Clone, Default)]
pub struct SequenceDictionary {
    contigs: Vec<Contig>,
}

impl SequenceDictionary {
    /// Build a dictionary from `(name, length)` pairs in reference order.
    pub fn new<N: Into<Arc<str>>>(entries: impl IntoIterator<Item = (N, u32)>) -> Self {
        let contigs = entries
            .into_iter()
            .enumerate()
            .map(|(index, (name, length))| Contig {
                index,
                name: name.into(),
                length,
            })
            .collect();
        Self { contigs }
    }

    /// Look up a contig by name.
    pub fn contig(&self, name: &str) -> Result<&Contig, LocusError> {
        self.contigs
            .iter()
            .find(|contig| contig.name.as_ref() == name)
            .ok_or_else(|| LocusError::UnknownContig(name.to_string()))
    }

    /// Contig at a dictionary index.
    pub fn get(&self, index: usize) -> Option<&Contig> {
        self.contigs.get(index)
    }

    /// Number of contigs.
    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    /// Whether the dictionary holds no contigs.
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    /// Build a validated location on a named contig.
    pub fn loc(&self, contig: &str, start: u32, stop: u32) -> Result<GenomeLoc, LocusError> {
        let contig = self.contig(contig)?;
        GenomeLoc::on_contig(contig, start, stop)
    }
}

/// Genomic span `(contig, start, stop)`, 1-based and inclusive.
///
/// Ordered by `(contig index, start, stop)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GenomeLoc {
    contig: Arc<str>,
    contig_index: usize,
    start: u32,
    stop: u32,
}

impl GenomeLoc {
    /// Build a location on a known contig, validating its bounds.
    pub fn on_contig(contig: &Contig, start: u32, stop: u32) -> Result<Self, LocusError> {
        if start == 0 || start > stop || stop > contig.length {
            return Err(LocusError::InvalidBounds {
                contig: contig.name.to_string(),
                start,
                stop,
                length: contig.length,
            });
        }
        Ok(Self {
            contig: Arc::clone(&contig.name),
            contig_index: contig.index,
            start,
            stop,
        })
    }

    /// Reference span covered by an aligned read.
    pub(crate) fn from_read_span(read: &AlignedRead) -> Self {
        let start = read.start.max(1);
        Self {
            contig: Arc::clone(&read.contig),
            contig_index: read.contig_index,
            start,
            stop: read.end().max(start),
        }
    }

    // Callers guarantee `1 <= start <= stop` and that the span stays on the contig.
    pub(crate) fn with_bounds(&self, start: u32, stop: u32) -> Self {
        debug_assert!(start >= 1 && start <= stop);
        Self {
            contig: Arc::clone(&self.contig),
            contig_index: self.contig_index,
            start,
            stop,
        }
    }

    /// Contig name.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// Dictionary index of the contig.
    pub fn contig_index(&self) -> usize {
        self.contig_index
    }

    /// First base (1-based).
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last base (1-based, inclusive).
    pub fn stop(&self) -> u32 {
        self.stop
    }

    /// Number of bases covered.
    pub fn size(&self) -> u32 {
        self.stop - self.start + 1
    }

    /// Whether both locations lie on the same contig.
    pub fn on_same_contig(&self, other: &Self) -> bool {
        self.contig_index == other.contig_index
    }

    /// Whether the spans share at least one base.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.overlap_len(other) > 0
    }

    /// Number of bases shared with `other`.
    pub fn overlap_len(&self, other: &Self) -> u32 {
        if !self.on_same_contig(other) {
            return 0;
        }
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        if start > stop {
            0
        } else {
            stop - start + 1
        }
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &Self) -> bool {
        self.on_same_contig(other) && self.start <= other.start && other.stop <= self.stop
    }

    /// Single-base location at the start.
    pub fn start_location(&self) -> Self {
        self.with_bounds(self.start, self.start)
    }

    /// Single-base location at the stop.
    pub fn stop_location(&self) -> Self {
        self.with_bounds(self.stop, self.stop)
    }

    /// Iterate over every base of the span as a single-base location.
    pub fn single_bases(&self) -> impl Iterator<Item = GenomeLoc> + '_ {
        (self.start..=self.stop).map(move |pos| self.with_bounds(pos, pos))
    }
}

impl Ord for GenomeLoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.contig_index
            .cmp(&other.contig_index)
            .then(self.start.cmp(&other.start))
            .then(self.stop.cmp(&other.stop))
            .then_with(|| self.contig.cmp(&other.contig))
    }
}

impl PartialOrd for GenomeLoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GenomeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.stop {
            write!(f, "{}:{}", self.contig, self.start)
        } else {
            write!(f, "{}:{}-{}", self.contig, self.start, self.stop)
        }
    }
}
