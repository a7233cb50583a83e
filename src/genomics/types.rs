use std::sync::Arc;

use crate::locus::{Contig, GenomeLoc};

/// Simple CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

impl CigarOpKind {
    /// Whether the operation advances along the reference.
    pub fn consumes_reference(self) -> bool {
        matches!(self, CigarOpKind::Match | CigarOpKind::Deletion)
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Read group metadata written to the downsampling audit log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadGroup {
    /// Read group identifier.
    pub id: String,
    /// Sample name (`SM`).
    pub sample: Option<String>,
    /// Library name (`LB`).
    pub library: Option<String>,
    /// Platform unit (`PU`).
    pub platform_unit: Option<String>,
}

impl ReadGroup {
    /// Read group with all metadata fields populated.
    pub fn new(
        id: impl Into<String>,
        sample: impl Into<String>,
        library: impl Into<String>,
        platform_unit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sample: Some(sample.into()),
            library: Some(library.into()),
            platform_unit: Some(platform_unit.into()),
        }
    }
}

/// Aligned read with sequence and quality information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Read name.
    pub name: Arc<str>,
    /// Reference contig name.
    pub contig: Arc<str>,
    /// Dictionary index of the contig.
    pub contig_index: usize,
    /// 1-based leftmost reference coordinate.
    pub start: u32,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
    /// Read group the read belongs to.
    pub read_group: Option<Arc<ReadGroup>>,
    /// Whether the read is a reduced (consensus) read standing in for many.
    pub is_reduced: bool,
}

impl AlignedRead {
    /// Construct a new aligned read on `contig` starting at `start` (1-based).
    pub fn new(
        name: impl Into<Arc<str>>,
        contig: &Contig,
        start: u32,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            contig: Arc::clone(&contig.name),
            contig_index: contig.index,
            start,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            read_group: None,
            is_reduced: false,
        }
    }

    /// Read covering `start..=end` with an all-match CIGAR and `A` bases.
    pub fn matching(name: impl Into<Arc<str>>, contig: &Contig, start: u32, end: u32) -> Self {
        let len = (end + 1).saturating_sub(start).max(1);
        Self::new(
            name,
            contig,
            start,
            vec![CigarOp::new(CigarOpKind::Match, len)],
            vec![b'A'; len as usize],
            vec![30u8; len as usize],
        )
    }

    /// Attach a read group.
    pub fn with_read_group(mut self, read_group: Arc<ReadGroup>) -> Self {
        self.read_group = Some(read_group);
        self
    }

    /// Flag the read as a reduced read.
    pub fn with_reduced(mut self, is_reduced: bool) -> Self {
        self.is_reduced = is_reduced;
        self
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Number of reference bases spanned by the alignment.
    pub fn reference_len(&self) -> u32 {
        self.cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len)
            .sum()
    }

    /// Last aligned reference base (1-based, inclusive).
    pub fn end(&self) -> u32 {
        self.start + self.reference_len().max(1) - 1
    }

    /// Reference span of the alignment.
    pub fn location(&self) -> GenomeLoc {
        GenomeLoc::from_read_span(self)
    }

    /// Read offset aligned to reference position `pos`, if any.
    ///
    /// Deleted and clipped positions yield `None`.
    pub fn offset_at(&self, pos: u32) -> Option<usize> {
        if pos < self.start || pos > self.end() {
            return None;
        }
        let mut ref_pos = self.start;
        let mut read_offset = 0usize;
        for op in &self.cigar {
            let len = op.len;
            match op.kind {
                CigarOpKind::Match => {
                    if pos < ref_pos + len {
                        return Some(read_offset + (pos - ref_pos) as usize);
                    }
                    ref_pos += len;
                    read_offset += len as usize;
                }
                CigarOpKind::Deletion => {
                    if pos < ref_pos + len {
                        return None;
                    }
                    ref_pos += len;
                }
                CigarOpKind::Insertion | CigarOpKind::SoftClip => read_offset += len as usize,
                CigarOpKind::HardClip => {}
            }
        }
        None
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }
}

/// Allele supporting a set of reads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Allele {
    /// Allele bases (uppercase ASCII).
    pub bases: Arc<[u8]>,
    /// Whether this is the reference allele.
    pub is_reference: bool,
}

impl Allele {
    /// Reference allele.
    pub fn reference(bases: &[u8]) -> Self {
        Self {
            bases: Arc::from(bases.to_ascii_uppercase()),
            is_reference: true,
        }
    }

    /// Alternate allele.
    pub fn alternate(bases: &[u8]) -> Self {
        Self {
            bases: Arc::from(bases.to_ascii_uppercase()),
            is_reference: false,
        }
    }
}
