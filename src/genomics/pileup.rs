use std::sync::Arc;

use crate::genomics::AlignedRead;
use crate::locus::GenomeLoc;

/// Number of canonical nucleotides (A, C, G, T).
pub const NUM_BASES: usize = 4;

/// Index of a canonical base in `[A, C, G, T]` order.
///
/// Lowercase bases map like their uppercase forms; anything else is `None`.
pub fn simple_base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// One read's contribution to a single locus.
#[derive(Debug, Clone)]
pub struct PileupElement {
    read: Arc<AlignedRead>,
    offset: usize,
}

impl PileupElement {
    /// Element for the base at `offset` within `read`.
    pub fn new(read: Arc<AlignedRead>, offset: usize) -> Self {
        Self { read, offset }
    }

    /// Source read.
    pub fn read(&self) -> &Arc<AlignedRead> {
        &self.read
    }

    /// Offset of the base within the read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Base call, or `N` when the offset lies past the read sequence.
    pub fn base(&self) -> u8 {
        self.read.base_at(self.offset).unwrap_or(b'N')
    }

    /// Base quality, or 0 when missing.
    pub fn quality(&self) -> u8 {
        self.read.quality_at(self.offset).unwrap_or(0)
    }
}

/// Ordered pileup elements at one genomic locus.
#[derive(Debug, Clone)]
pub struct Pileup {
    location: GenomeLoc,
    elements: Vec<PileupElement>,
}

impl Pileup {
    /// Pileup from pre-built elements.
    pub fn new(location: GenomeLoc, elements: Vec<PileupElement>) -> Self {
        Self { location, elements }
    }

    /// Empty pileup at `location`.
    pub fn empty(location: GenomeLoc) -> Self {
        Self::new(location, Vec::new())
    }

    /// Build the pileup at a single-base `location` from overlapping reads.
    ///
    /// Reads are visited in the given order. Reads on other contigs, or
    /// whose CIGAR deletes or clips the locus, contribute nothing.
    pub fn from_reads(location: GenomeLoc, reads: &[Arc<AlignedRead>]) -> Self {
        let pos = location.start();
        let elements = reads
            .iter()
            .filter(|read| read.contig_index == location.contig_index())
            .filter_map(|read| {
                read.offset_at(pos)
                    .map(|offset| PileupElement::new(Arc::clone(read), offset))
            })
            .collect();
        Self { location, elements }
    }

    /// Locus of the pileup.
    pub fn location(&self) -> &GenomeLoc {
        &self.location
    }

    /// Elements in pileup order.
    pub fn elements(&self) -> &[PileupElement] {
        &self.elements
    }

    /// Iterate elements in pileup order.
    pub fn iter(&self) -> std::slice::Iter<'_, PileupElement> {
        self.elements.iter()
    }

    /// Number of elements, canonical or not.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the pileup holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Per-base observation counts `[A, C, G, T]`.
    pub fn base_counts(&self) -> [u32; NUM_BASES] {
        let mut counts = [0u32; NUM_BASES];
        for element in &self.elements {
            if let Some(idx) = simple_base_index(element.base()) {
                counts[idx] += 1;
            }
        }
        counts
    }

    /// Whether any element comes from a reduced read.
    pub fn has_reduced_reads(&self) -> bool {
        self.elements.iter().any(|element| element.read.is_reduced)
    }

    /// Consume the pileup, returning its elements.
    pub fn into_elements(self) -> Vec<PileupElement> {
        self.elements
    }
}

impl<'a> IntoIterator for &'a Pileup {
    type Item = &'a PileupElement;
    type IntoIter = std::slice::Iter<'a, PileupElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{CigarOp, CigarOpKind};
    use crate::locus::SequenceDictionary;

    #[test]
    fn from_reads_collects_covering_bases() {
        let dict = SequenceDictionary::new([("chr1", 1000), ("chr2", 1000)]);
        let chr1 = dict.contig("chr1").unwrap();
        let chr2 = dict.contig("chr2").unwrap();
        let reads = vec![
            Arc::new(AlignedRead::new(
                "a",
                chr1,
                100,
                vec![CigarOp::new(CigarOpKind::Match, 4)],
                b"ACGT".to_vec(),
                vec![30; 4],
            )),
            Arc::new(AlignedRead::new(
                "b",
                chr1,
                101,
                vec![CigarOp::new(CigarOpKind::Match, 4)],
                b"CGTA".to_vec(),
                vec![25; 4],
            )),
            Arc::new(AlignedRead::new(
                "deleted",
                chr1,
                100,
                vec![
                    CigarOp::new(CigarOpKind::Match, 1),
                    CigarOp::new(CigarOpKind::Deletion, 2),
                    CigarOp::new(CigarOpKind::Match, 1),
                ],
                b"AT".to_vec(),
                vec![20; 2],
            )),
            Arc::new(AlignedRead::new(
                "other_contig",
                chr2,
                101,
                vec![CigarOp::new(CigarOpKind::Match, 4)],
                b"GGGG".to_vec(),
                vec![25; 4],
            )),
        ];

        let pileup = Pileup::from_reads(dict.loc("chr1", 101, 101).unwrap(), &reads);
        assert_eq!(pileup.len(), 2);
        assert_eq!(pileup.elements()[0].base(), b'C');
        assert_eq!(pileup.elements()[1].base(), b'C');
        assert_eq!(pileup.elements()[1].quality(), 25);
        assert_eq!(pileup.base_counts(), [0, 2, 0, 0]);
        assert!(!pileup.has_reduced_reads());
    }

    #[test]
    fn non_canonical_bases_are_not_counted() {
        assert_eq!(simple_base_index(b'N'), None);
        assert_eq!(simple_base_index(b'U'), None);
        assert_eq!(simple_base_index(b'g'), Some(2));
    }
}
