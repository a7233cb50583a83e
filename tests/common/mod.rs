#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use activeregion::genomics::{AlignedRead, CigarOp, CigarOpKind, Pileup, PileupElement, ReadGroup};
use activeregion::locus::{GenomeLoc, IntervalSet, SequenceDictionary};
use activeregion::ActiveRegion;

/// Dictionary used by the traversal scenarios.
pub fn dictionary() -> SequenceDictionary {
    SequenceDictionary::new([("1", 50_000), ("2", 50_000), ("20", 50_000)])
}

pub fn intervals(dict: &SequenceDictionary, spans: &[(&str, u32, u32)]) -> IntervalSet {
    IntervalSet::new(
        spans
            .iter()
            .map(|&(contig, start, stop)| dict.loc(contig, start, stop).expect("valid interval"))
            .collect(),
    )
    .expect("sorted intervals")
}

pub fn read(
    dict: &SequenceDictionary,
    name: &str,
    contig: &str,
    start: u32,
    end: u32,
) -> Arc<AlignedRead> {
    let contig = dict.contig(contig).expect("known contig");
    Arc::new(AlignedRead::matching(name, contig, start, end))
}

/// Core span of every region, as `contig:start-stop`.
pub fn cores(regions: &[ActiveRegion]) -> Vec<String> {
    regions.iter().map(|region| region.location().to_string()).collect()
}

/// Names of the reads a region exposes, in region order.
pub fn read_names(region: &ActiveRegion) -> Vec<String> {
    region.reads().map(|read| read.name.to_string()).collect()
}

pub fn region<'a>(regions: &'a [ActiveRegion], core: &str) -> &'a ActiveRegion {
    regions
        .iter()
        .find(|region| region.location().to_string() == core)
        .unwrap_or_else(|| panic!("no region {core}"))
}

/// Single-locus pileup where each `(name, start, base)` read ends on `locus`.
pub fn pileup_at(
    dict: &SequenceDictionary,
    locus: &GenomeLoc,
    rows: &[(&str, u32, u8)],
    group: Option<Arc<ReadGroup>>,
) -> Pileup {
    let contig = dict.contig(locus.contig()).expect("known contig");
    let elements = rows
        .iter()
        .map(|&(name, start, base)| {
            let len = locus.start() - start + 1;
            let mut bases = vec![b'N'; len as usize];
            bases[len as usize - 1] = base;
            let mut read = AlignedRead::new(
                name,
                contig,
                start,
                vec![CigarOp::new(CigarOpKind::Match, len)],
                bases,
                vec![30u8; len as usize],
            );
            if let Some(group) = &group {
                read = read.with_read_group(Arc::clone(group));
            }
            PileupElement::new(Arc::new(read), len as usize - 1)
        })
        .collect();
    Pileup::new(locus.clone(), elements)
}

/// In-memory writer whose contents stay readable after being handed out.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("buffer lock").clone();
        String::from_utf8(bytes).expect("utf8 log")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
